use super::{StoreError, StoreResult, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type Row = Vec<Value>;

/// Identity of a table: a name plus an optional namespace ("space").
///
/// This is the join key between writes and live-query registrations: the
/// mutation hook reports the identity of the written row's table, and the
/// analyzer matches it against each registration's query description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentity {
    name: String,
    space: Option<String>,
}

impl TableIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            space: None,
        }
    }

    pub fn in_space(name: impl Into<String>, space: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            space: Some(space.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn space(&self) -> Option<&str> {
        self.space.as_deref()
    }
}

impl fmt::Display for TableIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.space {
            Some(space) => write!(f, "{}.{}", space, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The five kinds of row writes the store distinguishes.
///
/// Each successful write notifies the interceptor chain with its kind and the
/// table it touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Update,
    SoftDelete,
    Restore,
    HardDelete,
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::SoftDelete => "soft-delete",
            Self::Restore => "restore",
            Self::HardDelete => "hard-delete",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
}

impl DataType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (DataType::Integer, Value::Integer(_))
                | (DataType::Float, Value::Float(_))
                | (DataType::Float, Value::Integer(_))
                | (DataType::Text, Value::Text(_))
                | (DataType::Boolean, Value::Boolean(_))
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "INTEGER",
            Self::Float => "FLOAT",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn validate(&self, value: &Value) -> StoreResult<()> {
        if value.is_null() {
            if !self.nullable {
                return Err(StoreError::ConstraintViolation(format!(
                    "Column '{}' cannot be NULL",
                    self.name
                )));
            }
            return Ok(());
        }

        if !self.data_type.is_compatible(value) {
            return Err(StoreError::TypeMismatch(format!(
                "Column '{}' expects type {}, got {}",
                self.name,
                self.data_type,
                value.type_name()
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_identity_display() {
        assert_eq!(TableIdentity::new("projects").to_string(), "projects");
        assert_eq!(
            TableIdentity::in_space("projects", "app").to_string(),
            "app.projects"
        );
    }

    #[test]
    fn test_table_identity_equality() {
        assert_eq!(TableIdentity::new("projects"), TableIdentity::new("projects"));
        assert_ne!(
            TableIdentity::new("projects"),
            TableIdentity::in_space("projects", "app")
        );
    }

    #[test]
    fn test_column_validation() {
        let col = Column::new("name", DataType::Text).not_null();
        assert!(col.validate(&Value::Text("Groceries".into())).is_ok());
        assert!(matches!(
            col.validate(&Value::Null),
            Err(StoreError::ConstraintViolation(_))
        ));
        assert!(matches!(
            col.validate(&Value::Integer(1)),
            Err(StoreError::TypeMismatch(_))
        ));
    }
}

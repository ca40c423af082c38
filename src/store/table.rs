use crate::core::{Column, Row, StoreError, StoreResult, TableIdentity};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    identity: TableIdentity,
    columns: Vec<Column>,
}

impl TableSchema {
    pub fn new(identity: TableIdentity, columns: Vec<Column>) -> Self {
        Self { identity, columns }
    }

    pub fn identity(&self) -> &TableIdentity {
        &self.identity
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn validate_row(&self, values: &Row) -> StoreResult<()> {
        if values.len() != self.columns.len() {
            return Err(StoreError::ConstraintViolation(format!(
                "Table '{}' expects {} values, got {}",
                self.identity,
                self.columns.len(),
                values.len()
            )));
        }
        for (column, value) in self.columns.iter().zip(values) {
            column.validate(value)?;
        }
        Ok(())
    }
}

/// A row plus the bookkeeping the store needs: a stable id and the
/// soft-delete flag. Soft-deleted rows are invisible to scans until restored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRow {
    pub id: u64,
    pub values: Row,
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    schema: TableSchema,
    rows: Vec<StoredRow>,
    next_row_id: u64,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            next_row_id: 1,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn insert(&mut self, values: Row) -> StoreResult<u64> {
        self.schema.validate_row(&values)?;
        let id = self.next_row_id;
        self.next_row_id += 1;
        self.rows.push(StoredRow {
            id,
            values,
            deleted: false,
        });
        Ok(id)
    }

    /// Update a row's values. Soft-deleted rows can still be updated.
    pub fn update(&mut self, row_id: u64, values: Row) -> StoreResult<()> {
        self.schema.validate_row(&values)?;
        let row = self.find_mut(row_id)?;
        row.values = values;
        Ok(())
    }

    pub fn soft_delete(&mut self, row_id: u64) -> StoreResult<()> {
        let row = self.find_mut(row_id)?;
        row.deleted = true;
        Ok(())
    }

    pub fn restore(&mut self, row_id: u64) -> StoreResult<()> {
        let row = self.find_mut(row_id)?;
        row.deleted = false;
        Ok(())
    }

    pub fn hard_delete(&mut self, row_id: u64) -> StoreResult<()> {
        let position = self
            .rows
            .iter()
            .position(|row| row.id == row_id)
            .ok_or_else(|| StoreError::RowNotFound(self.schema.identity().to_string(), row_id))?;
        self.rows.remove(position);
        Ok(())
    }

    /// All rows that are not soft-deleted, in insertion order.
    pub fn live_rows(&self) -> Vec<Row> {
        self.rows
            .iter()
            .filter(|row| !row.deleted)
            .map(|row| row.values.clone())
            .collect()
    }

    /// All rows, including soft-deleted ones.
    pub fn all_rows(&self) -> Vec<Row> {
        self.rows.iter().map(|row| row.values.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.iter().filter(|row| !row.deleted).count()
    }

    fn find_mut(&mut self, row_id: u64) -> StoreResult<&mut StoredRow> {
        let identity = self.schema.identity().to_string();
        self.rows
            .iter_mut()
            .find(|row| row.id == row_id)
            .ok_or(StoreError::RowNotFound(identity, row_id))
    }
}

//! Persistence targets: where the backing data lives.

use crate::core::ContextError;
use std::path::{Path, PathBuf};

/// Storage medium for a context's store.
#[derive(Debug, Clone)]
pub enum PersistenceTarget {
    /// Nothing survives the process. Always starts empty.
    Memory,
    /// Snapshot file named after the percent-encoded logical name, placed
    /// under the configured data directory. Supports destructive recovery.
    File { name: String },
    /// Pre-migrated, immutable snapshot shipped with the application.
    /// Migrations are skipped and every write is rejected.
    Bundle { path: PathBuf },
}

impl PersistenceTarget {
    pub fn file(name: impl Into<String>) -> Self {
        Self::File { name: name.into() }
    }

    pub fn bundle(path: impl Into<PathBuf>) -> Self {
        Self::Bundle { path: path.into() }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::Bundle { .. })
    }

    /// Whether the backing medium can be wiped by a recovery policy.
    pub fn supports_deletion(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Memory => "in-memory",
            Self::File { .. } => "file",
            Self::Bundle { .. } => "read-only bundle",
        }
    }

    /// Resolve the snapshot path for a file target: the percent-encoded
    /// logical name under `data_dir`. Names that encode to nothing are a
    /// configuration error.
    pub(crate) fn resolve_file_path(name: &str, data_dir: &Path) -> Result<PathBuf, ContextError> {
        let encoded = encode_persistence_name(name)
            .ok_or_else(|| ContextError::InvalidPersistenceName(name.to_string()))?;
        Ok(data_dir.join(format!("{}.store", encoded)))
    }
}

/// Percent-encode a logical persistence name into a file-system safe stem.
/// ASCII alphanumerics plus `-`, `_` and `.` pass through; everything else
/// is encoded byte-wise. Returns `None` for names with no substance.
fn encode_persistence_name(name: &str) -> Option<String> {
    if name.trim().is_empty() {
        return None;
    }
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    Some(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_names_pass_through() {
        assert_eq!(encode_persistence_name("todo-app"), Some("todo-app".into()));
    }

    #[test]
    fn test_special_characters_are_encoded() {
        assert_eq!(
            encode_persistence_name("my app/v2"),
            Some("my%20app%2Fv2".into())
        );
    }

    #[test]
    fn test_empty_names_are_rejected() {
        assert_eq!(encode_persistence_name(""), None);
        assert_eq!(encode_persistence_name("   "), None);
    }

    #[test]
    fn test_resolve_file_path() {
        let path =
            PersistenceTarget::resolve_file_path("todo app", Path::new("/tmp/data")).unwrap();
        assert_eq!(path, Path::new("/tmp/data/todo%20app.store"));

        assert!(matches!(
            PersistenceTarget::resolve_file_path("", Path::new("/tmp/data")),
            Err(ContextError::InvalidPersistenceName(_))
        ));
    }
}

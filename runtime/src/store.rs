//! Persistent sentinel store.
//!
//! The reboot supervisor observes a single integer key in a persistent
//! store it does not own. Absence of the key is the steady state, not an
//! error.

use std::io::ErrorKind;
use std::path::PathBuf;

use warden_core::{Result, WardenError};

/// Read-only view of the persistent store.
pub trait SentinelStore: Send + Sync {
    /// Read an integer value. An absent key is `Ok(None)`.
    fn read_integer(&self, key: &str) -> Result<Option<i64>>;
}

/// File-backed store: one file per key under a root directory, holding the
/// value as decimal text.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SentinelStore for FsStore {
    fn read_integer(&self, key: &str) -> Result<Option<i64>> {
        let path = self.root.join(key);

        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(WardenError::Store(format!(
                    "failed to read '{}': {e}",
                    path.display()
                )))
            }
        };

        let value = raw.trim().parse::<i64>().map_err(|_| {
            WardenError::Store(format!(
                "'{}' does not hold an integer: {raw:?}",
                path.display()
            ))
        })?;

        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        assert_eq!(store.read_integer("control/reboot").unwrap(), None);
    }

    #[test]
    fn test_reads_integer_value() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("control")).unwrap();
        std::fs::write(dir.path().join("control/reboot"), "2\n").unwrap();

        let store = FsStore::new(dir.path());
        assert_eq!(store.read_integer("control/reboot").unwrap(), Some(2));
    }

    #[test]
    fn test_malformed_value_is_store_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("reboot"), "soon").unwrap();

        let store = FsStore::new(dir.path());
        let err = store.read_integer("reboot").unwrap_err();
        assert!(matches!(err, WardenError::Store(_)));
    }

    #[test]
    fn test_negative_value_parses() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("reboot"), "-1").unwrap();

        let store = FsStore::new(dir.path());
        assert_eq!(store.read_integer("reboot").unwrap(), Some(-1));
    }
}

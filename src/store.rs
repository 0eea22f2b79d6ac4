use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};

/// String blobs under fixed keys, the same contract as browser local storage.
/// Writes are not transactional; the last writer wins.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_file(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(Error::Store(format!("invalid store key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_file(key)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Store(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_file(key)?;
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Store(format!("failed to create store dir: {e}")))?;
        std::fs::write(&path, value)
            .map_err(|e| Error::Store(format!("failed to write {}: {e}", path.display())))?;
        debug!(key, bytes = value.len(), "stored blob");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_file(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Store(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

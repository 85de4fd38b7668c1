use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use base64::Engine;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use uuid::Uuid;
use super::errors::{ClientError, Result};
use super::traits::KeyValueStore;

/// Directory-backed store, one file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Keys hold request ids, so they are encoded before touching the filesystem
    fn key_path(&self, key: &str) -> PathBuf {
        let encoded = BASE64_URL_SAFE_NO_PAD.encode(key);
        self.dir.join(format!("{}.json", encoded))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.key_path(key);
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));

        // Write-then-rename so readers never see half a record
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path).map_err(|err| {
            let _ = fs::remove_file(&tmp);
            ClientError::storage(format!("Failed to persist key {}: {}", key, err))
        })
    }
}

/// In-process store, used by tests and as a fallback when no directory is usable
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries
            .lock()
            .map_err(|_| ClientError::storage("Memory store poisoned"))?;

        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries
            .lock()
            .map_err(|_| ClientError::storage("Memory store poisoned"))?;

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

//! Session store.
//!
//! A single key is persisted: the deposit address handed out by the wallet
//! provider, so a later run reuses it instead of deriving a fresh one. The
//! store is a typed abstraction so tests can run against memory and the
//! binary against a JSON file in the datadir.

use std::collections::HashMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const DEFAULT_FILE_NAME: &str = "store.json";

/// Key under which the deposit address is cached. There is no expiry,
/// only `remove` invalidates it.
pub const DEPOSIT_ADDRESS_KEY: &str = "address";

#[derive(Debug, Clone)]
pub enum StoreError {
    ReadingFile(String),
    WritingFile(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ReadingFile(e) => write!(f, "Error while reading store file: {}", e),
            Self::WritingFile(e) => write!(f, "Error while writing store file: {}", e),
        }
    }
}

pub trait Store: fmt::Debug + Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Store backed by process memory. Contents die with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().expect("poisoned").get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .lock()
            .expect("poisoned")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.values.lock().expect("poisoned").remove(key);
        Ok(())
    }
}

/// Store backed by a JSON file, one object of string values. The file is
/// read on each access and rewritten whole on each update.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(DEFAULT_FILE_NAME),
        }
    }

    fn read_values(&self) -> Result<HashMap<String, String>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(content) => serde_json::from_slice(&content)
                .map_err(|e| StoreError::ReadingFile(format!("Parsing store file: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StoreError::ReadingFile(format!(
                "Reading store file: {}",
                e
            ))),
        }
    }

    fn write_values(&self, values: &HashMap<String, String>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(values)
            .map_err(|e| StoreError::WritingFile(format!("Failed to serialize store: {}", e)))?;

        let mut store_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| StoreError::WritingFile(e.to_string()))?;

        store_file.write_all(content.as_bytes()).map_err(|e| {
            tracing::warn!("failed to write to file: {:?}", e);
            StoreError::WritingFile(e.to_string())
        })
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.read_values()?;
        values.insert(key.to_string(), value.to_string());
        self.write_values(&values)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.read_values()?;
        if values.remove(key).is_some() {
            self.write_values(&values)?;
        }
        Ok(())
    }
}

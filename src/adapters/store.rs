use crate::ports;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("store parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("store serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Key-value store kept as a single TOML document, one top-level entry per
/// key. Every write replaces the file atomically.
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl TomlFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<toml::Table, StoreError> {
        match std::fs::read_to_string(self.path.as_path()) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(toml::Table::new()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn write_table(&self, table: &toml::Table) -> Result<(), StoreError> {
        let text = toml::to_string(table)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        atomic_write(&self.path, text.as_bytes()).map_err(|source| self.io_error(source))
    }

    fn update(&self, apply: impl FnOnce(&mut toml::Table)) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut table = self.read_table()?;
        apply(&mut table);
        self.write_table(&table)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.to_path_buf(),
            source,
        }
    }
}

impl ports::KeyValueStore for TomlFileStore {
    type Error = StoreError;

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Self::Error> {
        let table = {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.read_table()?
        };
        match table.get(key) {
            Some(value) => Ok(Some(value.clone().try_into()?)),
            None => Ok(None),
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Self::Error> {
        let value = toml::Value::try_from(value)?;
        self.update(|table| {
            table.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        self.update(|table| {
            table.remove(key);
        })
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("store.toml");
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();

    for attempt in 0..10u32 {
        let temp_path = parent.join(format!(".{file_name}.tmp-{pid}-{nanos}-{attempt}"));
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
        {
            Ok(mut file) => {
                use std::io::Write as _;
                let written = file.write_all(contents).and_then(|()| file.flush());
                drop(file);
                let result = written.and_then(|()| std::fs::rename(&temp_path, path));
                if result.is_err() {
                    let _ = std::fs::remove_file(&temp_path);
                }
                return result;
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate temporary store file",
    ))
}

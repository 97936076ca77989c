//! Key-value store for template overrides.
//!
//! Records are JSON documents keyed by a string (`<role>_template`). A
//! missing key is not an error: `load` returns `Ok(None)`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::StoreConfig;
use crate::models::TemplateRecord;

/// Errors from a [`TemplateStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("template store I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed template record {key:?}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Persistence collaborator for template overrides.
///
/// Implementations must be safe to share between threads; writes are
/// expected to be rare.
pub trait TemplateStore: Send + Sync {
    /// Load the record stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<TemplateRecord>, StoreError>;

    /// Store `record` under `key`, replacing any previous value.
    fn save(&self, key: &str, record: &TemplateRecord) -> Result<(), StoreError>;

    /// Remove the record under `key`. Returns `false` if nothing was stored.
    fn remove(&self, key: &str) -> Result<bool, StoreError>;

    /// List every stored key.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Stores each record as `<key>.json` inside a directory.
///
/// Saves write a temporary sibling file and rename it over the target, so
/// readers never observe a half-written record.
#[derive(Debug, Clone)]
pub struct FileTemplateStore {
    config: StoreConfig,
}

impl FileTemplateStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Convenience constructor for a store rooted at `dir`.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self::new(StoreConfig::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.config.templates_dir
    }

    fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl TemplateStore for FileTemplateStore {
    fn load(&self, key: &str) -> Result<Option<TemplateRecord>, StoreError> {
        let path = self.config.record_path(key);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_err(&path)(e)),
        };
        let record = serde_json::from_str(&contents).map_err(|source| StoreError::Malformed {
            key: key.to_owned(),
            source,
        })?;
        Ok(Some(record))
    }

    fn save(&self, key: &str, record: &TemplateRecord) -> Result<(), StoreError> {
        let dir = self.dir();
        std::fs::create_dir_all(dir).map_err(Self::io_err(dir))?;

        let path = self.config.record_path(key);
        let tmp = dir.join(format!(".{key}.json.{}.tmp", std::process::id()));
        let contents =
            serde_json::to_string_pretty(record).map_err(|source| StoreError::Malformed {
                key: key.to_owned(),
                source,
            })?;

        std::fs::write(&tmp, contents).map_err(Self::io_err(&tmp))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(Self::io_err(&path)(e));
        }

        tracing::debug!(key, path = %path.display(), "saved template record");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.config.record_path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_err(&path)(e)),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.dir();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_err(dir)(e)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(Self::io_err(dir))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            if let Some(key) = name.strip_suffix(".json") {
                keys.push(key.to_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A store that keeps raw JSON in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    records: Mutex<BTreeMap<String, String>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw, possibly malformed, JSON document under `key`.
    pub fn insert_raw(&self, key: impl Into<String>, raw: impl Into<String>) {
        self.lock().insert(key.into(), raw.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn load(&self, key: &str) -> Result<Option<TemplateRecord>, StoreError> {
        let records = self.lock();
        let Some(raw) = records.get(key) else {
            return Ok(None);
        };
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                key: key.to_owned(),
                source,
            })
    }

    fn save(&self, key: &str, record: &TemplateRecord) -> Result<(), StoreError> {
        let raw = serde_json::to_string(record).map_err(|source| StoreError::Malformed {
            key: key.to_owned(),
            source,
        })?;
        self.lock().insert(key.to_owned(), raw);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock().remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock().keys().cloned().collect())
    }
}

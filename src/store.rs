//! Key-value persistence for layout geometry
//!
//! Everything the workspace remembers between sessions goes through
//! [`KeyValueStore`]. Keys are namespaced per repository (see [`sanitize_identity`]),
//! so all repository views can share one store.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

/// Errors from the backing store. Never shown to the user; callers log and drop them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Best-effort string store. Writes are synchronous: `set` returns once the
/// value is durable (or has failed).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Shared handle used by every split and layout store of a window.
pub type SharedStore = Rc<dyn KeyValueStore>;

/// Make a repository path safe to embed in a storage key.
pub fn sanitize_identity(path: &str) -> String {
    path.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Key of the whole [`LayoutConfig`](crate::layout_state::LayoutConfig) record.
pub fn layout_key(repo_path: &str) -> String {
    format!("repo-layout-{}", sanitize_identity(repo_path))
}

/// Key of a single pane's size.
pub fn pane_key(repo_path: &str, pane: &str) -> String {
    format!("panel-size-{}-{}", sanitize_identity(repo_path), pane)
}

/// In-memory store. Used by tests and as a fallback when no config dir exists.
#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent reads fail, simulating an unavailable store.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    /// Make subsequent writes fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    /// Seed a raw value without counting it as a write.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.values.borrow_mut().insert(key.to_string(), value.to_string());
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.get() {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        self.values.borrow_mut().insert(key.to_string(), value.to_string());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }
}

/// JSON-file store. The whole object is rewritten on every `set`.
///
/// If the file exists but cannot be read, the store stays unavailable for
/// the session so a write never replaces data it could not load.
pub struct FileStore {
    path: PathBuf,
    values: RefCell<BTreeMap<String, String>>,
    unreadable: Option<String>,
}

impl FileStore {
    /// Open the store at `path`. A missing or malformed file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut unreadable = None;
        let values = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed layout store");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "layout store unreadable, not saving this session");
                unreadable = Some(format!("{}: {e}", path.display()));
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: RefCell::new(values),
            unreadable,
        }
    }

    /// Default location: `<config_dir>/prism-layout/layout.json`.
    pub fn default_path() -> Option<PathBuf> {
        crate::config::Config::config_dir().map(|d| d.join("layout.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_readable(&self) -> Result<(), StoreError> {
        match &self.unreadable {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| StoreError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&*self.values.borrow())?;
        fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_readable()?;
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_readable()?;
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.flush()
    }
}

//! Client-local preferences.
//!
//! A flat string key-value store with typed accessors on top. Keys match the
//! ones the browser client kept in local storage.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use aichat_types::Language;
use tracing::warn;

use crate::error::ClientError;

pub const SIDEBAR_WIDTH_KEY: &str = "sidebar-width";
pub const SIDEBAR_HELP_SEEN_KEY: &str = "sidebar-resize-help-seen";
pub const LANGUAGE_KEY: &str = "language";

pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), ClientError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// JSON object on disk, rewritten whole on every `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// `<config dir>/aichat/preferences.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|dir| dir.join("aichat").join("preferences.json"))
    }

    /// Open `path`, starting empty when it does not exist yet. A corrupt
    /// file is logged and ignored so a bad write never locks the user out.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "ignoring unreadable preferences file");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, values: Mutex::new(values) })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = values.clone();
        next.insert(key.to_owned(), value.to_owned());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(&next)?)?;
        // Memory only reflects what reached the disk.
        *values = next;
        Ok(())
    }
}

/// Typed view over a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    /// Stored sidebar width, unclamped. `None` when absent or not an integer.
    pub fn sidebar_width(&self) -> Option<i64> {
        self.store.get(SIDEBAR_WIDTH_KEY)?.trim().parse().ok()
    }

    pub fn set_sidebar_width(&self, width: u16) -> Result<(), ClientError> {
        self.store.set(SIDEBAR_WIDTH_KEY, &width.to_string())
    }

    pub fn sidebar_help_seen(&self) -> bool {
        self.store.get(SIDEBAR_HELP_SEEN_KEY).as_deref() == Some("true")
    }

    pub fn set_sidebar_help_seen(&self) -> Result<(), ClientError> {
        self.store.set(SIDEBAR_HELP_SEEN_KEY, "true")
    }

    /// Unknown codes fall back to English.
    pub fn language(&self) -> Language {
        self.store
            .get(LANGUAGE_KEY)
            .and_then(|code| code.parse().ok())
            .unwrap_or_default()
    }

    pub fn set_language(&self, language: Language) -> Result<(), ClientError> {
        self.store.set(LANGUAGE_KEY, &language.to_string())
    }
}

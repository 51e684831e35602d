//! Store configuration: the on-disk TOML schema and the runtime options the
//! root store is opened with.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::RootObject;

/// Callback run after every successful save.
pub type SavedHook = Arc<dyn Fn() + Send + Sync>;

/// File-level configuration, usually read from a TOML file.
///
/// ```toml
/// file = "db.json"
/// delay_ms = 250
/// beautify = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON database file.
    pub file: PathBuf,

    /// Milliseconds to wait before each write.
    #[serde(default)]
    pub delay_ms: u64,

    /// Pretty-print the file with 2-space indentation.
    #[serde(default)]
    pub beautify: bool,

    /// fsync the file on every write.
    #[serde(default)]
    pub sync: bool,
}

impl StoreConfig {
    pub fn new<P: AsRef<Path>>(file: P) -> Self {
        Self {
            file: file.as_ref().to_path_buf(),
            delay_ms: 0,
            beautify: false,
            sync: false,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_from_str(s: &str) -> Result<StoreConfig, ConfigError> {
    Ok(toml::from_str(s)?)
}

pub fn load_from_file(path: &Path) -> Result<StoreConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents)
}

/// Runtime options for [`RootStore::open`](crate::RootStore::open).
#[derive(Clone, Default)]
pub struct StoreOptions {
    /// Slept in full before every write. Zero disables the wait.
    pub delay: Duration,
    /// 2-space indented output instead of compact JSON.
    pub beautify: bool,
    /// Root object used when the file is missing or unparsable.
    pub init: RootObject,
    pub on_saved: Option<SavedHook>,
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("delay", &self.delay)
            .field("beautify", &self.beautify)
            .field("init", &self.init)
            .field("on_saved", &self.on_saved.is_some())
            .finish()
    }
}

impl From<&StoreConfig> for StoreOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            delay: config.delay(),
            beautify: config.beautify,
            ..Self::default()
        }
    }
}

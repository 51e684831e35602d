//! # Adapter
//!
//! Whole-file persistence for the record store. An adapter reads the entire
//! database file as text and replaces the entire file with new text. It owns
//! no in-memory view of the data; parsing and serialization live in the
//! `store` crate.
//!
//! Two implementations are provided:
//! - [`FileAdapter`] — a real file on disk, replaced atomically on every write.
//! - [`MemoryAdapter`] — an in-process buffer, used for tests and for
//!   embedding the store without touching the filesystem.
//!
//! ## Example
//! ```rust
//! use adapter::{Adapter, MemoryAdapter};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let a = MemoryAdapter::new();
//! assert!(a.read().await.unwrap().is_none());
//! a.write("{}").await.unwrap();
//! assert_eq!(a.read().await.unwrap().as_deref(), Some("{}"));
//! # });
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Byte-level access to the storage medium holding the root object.
///
/// `read` returns `Ok(None)` when there is nothing stored yet (first run).
/// `write` replaces the whole content.
#[async_trait]
pub trait Adapter: Send + Sync {
    async fn read(&self) -> Result<Option<String>, AdapterError>;
    async fn write(&self, text: &str) -> Result<(), AdapterError>;
}

/// Adapter over a single file on disk.
///
/// Writes go to `<path>.tmp` first, are flushed (and fsynced when `sync` is
/// enabled), then renamed over the target so a crash mid-write never leaves a
/// truncated database behind. A stale `.tmp` file is simply overwritten by
/// the next write.
#[derive(Debug, Clone)]
pub struct FileAdapter {
    path: PathBuf,
    sync: bool,
}

impl FileAdapter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sync: false,
        }
    }

    /// Calls `sync_all` on the temp file before the rename.
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl Adapter for FileAdapter {
    async fn read(&self) -> Result<Option<String>, AdapterError> {
        match tokio::fs::read(&self.path).await {
            // invalid utf-8 is treated like any other unparsable content
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AdapterError::Io(e)),
        }
    }

    async fn write(&self, text: &str) -> Result<(), AdapterError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.tmp_path();
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        if self.sync {
            file.sync_all().await?;
        }
        drop(file);

        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

/// In-memory adapter.
///
/// Keeps the last written text, counts successful writes, and can be switched
/// into a mode where every write fails with [`AdapterError::Rejected`].
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    content: Mutex<Option<String>>,
    writes: AtomicU64,
    reject: AtomicBool,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an adapter that already holds `text`, as if a file existed.
    pub fn with_content(text: impl Into<String>) -> Self {
        Self {
            content: Mutex::new(Some(text.into())),
            ..Self::default()
        }
    }

    /// Returns the current stored text without going through the async API.
    pub fn contents(&self) -> Option<String> {
        self.content.lock().clone()
    }

    /// Number of writes that completed successfully.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// When `true`, subsequent writes fail and leave the content untouched.
    pub fn reject_writes(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn read(&self) -> Result<Option<String>, AdapterError> {
        Ok(self.content.lock().clone())
    }

    async fn write(&self, text: &str) -> Result<(), AdapterError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(AdapterError::Rejected("memory adapter is read-only".into()));
        }
        *self.content.lock() = Some(text.to_owned());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

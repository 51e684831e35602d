//! # db
//!
//! Connection facade for the sorted JSON record store.
//!
//! [`connect`] loads the root object once from a file (or an injected
//! [`Adapter`]) and returns a [`Connection`]. The connection is a factory:
//! each [`Connection::collection`] call binds a name, a key field and an
//! optional ordering to a [`Collection`] that shares the connection's root
//! store and save routine.
//!
//! ```text
//! connect(options)
//!     └─ RootStore::open ── Adapter::read ── parse / fall back to `init`
//! connection.collection(name, key, comparator)
//!     └─ RootStore::get_or_create_array(name) ── sort once
//! collection.insert/update/remove
//!     └─ mutate shared Vec ── RootStore::save ── Adapter::write(whole root)
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use db::{connect, CollectionOptions, ConnectOptions};
//! use serde_json::json;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let conn = connect(ConnectOptions::new("db.json").beautify(true)).await?;
//! let users = conn.collection(CollectionOptions::new("users", "id"))?;
//!
//! let record = json!({"id": 1, "name": "ada"}).as_object().cloned().unwrap_or_default();
//! users.insert(record).await?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use adapter::{Adapter, AdapterError, FileAdapter, MemoryAdapter};
pub use collection::{by_key, compare_values, Collection, CollectionError, Comparator, Located};
pub use store::{
    Record, RootObject, RootStore, SavedHook, StoreConfig, StoreError, StoreOptions,
};

/// Where the root object lives.
#[derive(Clone)]
pub enum FileSource {
    Path { path: PathBuf, sync: bool },
    Adapter(Arc<dyn Adapter>),
}

/// Options for [`connect`].
#[derive(Clone)]
pub struct ConnectOptions {
    file: FileSource,
    store: StoreOptions,
}

impl ConnectOptions {
    /// Connect to the JSON file at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            file: FileSource::Path {
                path: path.as_ref().to_path_buf(),
                sync: false,
            },
            store: StoreOptions::default(),
        }
    }

    /// Connect through an injected adapter instead of a file path.
    pub fn with_adapter(adapter: Arc<dyn Adapter>) -> Self {
        Self {
            file: FileSource::Adapter(adapter),
            store: StoreOptions::default(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            file: FileSource::Path {
                path: config.file.clone(),
                sync: config.sync,
            },
            store: StoreOptions::from(config),
        }
    }

    /// Wait this long before every write. Defaults to zero.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.store.delay = delay;
        self
    }

    /// Root object used when the file is missing or unparsable.
    pub fn init(mut self, init: RootObject) -> Self {
        self.store.init = init;
        self
    }

    /// Pretty-print the file with 2-space indentation.
    pub fn beautify(mut self, beautify: bool) -> Self {
        self.store.beautify = beautify;
        self
    }

    /// fsync on every write. Only meaningful for path-based connections.
    pub fn sync(mut self, sync: bool) -> Self {
        if let FileSource::Path { sync: s, .. } = &mut self.file {
            *s = sync;
        }
        self
    }

    /// Run `hook` after every successful save.
    pub fn on_saved<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.store.on_saved = Some(Arc::new(hook));
        self
    }
}

/// Options for [`Connection::collection`].
#[derive(Clone)]
pub struct CollectionOptions {
    pub name: String,
    pub primary_key: String,
    pub comparator: Option<Comparator>,
}

impl CollectionOptions {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            comparator: None,
        }
    }

    pub fn comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = Some(comparator);
        self
    }
}

/// Loads the root store and returns the collection factory.
///
/// # Errors
///
/// Only a failing read of an existing file is an error; a missing or
/// malformed file yields the `init` root object.
pub async fn connect(options: ConnectOptions) -> Result<Connection, StoreError> {
    let adapter: Arc<dyn Adapter> = match options.file {
        FileSource::Path { path, sync } => {
            info!(path = %path.display(), "connecting");
            Arc::new(FileAdapter::new(path).with_sync(sync))
        }
        FileSource::Adapter(adapter) => adapter,
    };
    let store = RootStore::open(adapter, options.store).await?;
    Ok(Connection {
        store: Arc::new(store),
    })
}

/// A loaded root store, handing out collections.
#[derive(Clone)]
pub struct Connection {
    store: Arc<RootStore>,
}

impl Connection {
    /// Binds a sorted collection to `options.name`.
    ///
    /// Calling this twice with the same name yields two collections over the
    /// same backing array. They must use the same key and comparator: a
    /// different comparator re-sorts the shared array and breaks lookups
    /// through the collection bound first.
    pub fn collection(&self, options: CollectionOptions) -> Result<Collection, CollectionError> {
        Collection::new(
            Arc::clone(&self.store),
            &options.name,
            &options.primary_key,
            options.comparator,
        )
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.store.collection_names()
    }

    pub fn store(&self) -> &Arc<RootStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn options_builder() {
        let options = ConnectOptions::new("db.json")
            .delay(Duration::from_millis(5))
            .beautify(true)
            .sync(true)
            .on_saved(|| {});
        assert_eq!(options.store.delay, Duration::from_millis(5));
        assert!(options.store.beautify);
        assert!(options.store.on_saved.is_some());
        assert!(matches!(options.file, FileSource::Path { sync: true, .. }));
    }

    #[test]
    fn options_from_config() {
        let mut config = StoreConfig::new("data/db.json");
        config.delay_ms = 20;
        config.sync = true;

        let options = ConnectOptions::from_config(&config);
        assert_eq!(options.store.delay, Duration::from_millis(20));
        match options.file {
            FileSource::Path { path, sync } => {
                assert_eq!(path, PathBuf::from("data/db.json"));
                assert!(sync);
            }
            FileSource::Adapter(_) => panic!("expected a path source"),
        }
    }

    #[tokio::test]
    async fn connect_through_adapter() {
        let mem = Arc::new(MemoryAdapter::with_content(r#"{"users":[{"id":1}]}"#));
        let conn = connect(ConnectOptions::with_adapter(mem)).await.unwrap();
        assert_eq!(conn.collection_names(), vec!["users".to_string()]);

        let users = conn.collection(CollectionOptions::new("users", "id")).unwrap();
        let target = json!({"id": 1}).as_object().cloned().unwrap();
        assert!(users.has(&target).unwrap());
    }
}

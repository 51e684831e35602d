//! # Collection
//!
//! A named, key-sorted sequence of JSON records backed by one array of the
//! root store.
//!
//! Every record carries a **key field** that is unique within the collection.
//! The backing vector is kept sorted by the collection's [`Comparator`] at
//! all times, so lookups are a binary search and inserts shift the tail.
//!
//! ## Key properties
//! - **Sorted order**: iteration is always ascending under the comparator.
//! - **Unique keys**: inserting an existing key is a no-op returning `false`.
//! - **Write-through**: every successful mutation saves the whole root object
//!   through the shared [`RootStore`]; read operations never save.
//! - **Shared backing**: collections created for the same name operate on
//!   the same vector and see each other's mutations.
//!
//! ## Example
//! ```rust
//! use adapter::MemoryAdapter;
//! use collection::Collection;
//! use serde_json::json;
//! use std::sync::Arc;
//! use store::{RootStore, StoreOptions};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let store = Arc::new(
//!     RootStore::open(Arc::new(MemoryAdapter::new()), StoreOptions::default())
//!         .await
//!         .unwrap(),
//! );
//! let users = Collection::new(store, "users", "id", None).unwrap();
//!
//! let alice = json!({"id": 2, "name": "alice"}).as_object().unwrap().clone();
//! assert!(users.insert(alice).await.unwrap());
//!
//! let target = json!({"id": 2}).as_object().unwrap().clone();
//! assert_eq!(users.find(&target).unwrap().unwrap()["name"], "alice");
//! # });
//! ```

mod ordering;

pub use ordering::{by_key, compare_values, Comparator};

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use store::{Record, Records, RootStore, StoreError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CollectionError {
    /// The call cannot be served as given, e.g. the key field is missing.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a binary search.
///
/// When `found` is `true`, `index` is the position of the matching record.
/// Otherwise `index` is where the target would have to be inserted to keep
/// the sequence sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub index: usize,
    pub found: bool,
}

/// A sorted view over one named record array.
///
/// Cloning is cheap: clones share the backing vector and the root store.
#[derive(Clone)]
pub struct Collection {
    name: Arc<str>,
    key: Arc<str>,
    comparator: Comparator,
    records: Records,
    store: Arc<RootStore>,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("len", &self.len())
            .finish()
    }
}

impl Collection {
    /// Binds a collection to the array stored under `name`, creating it if
    /// needed, and sorts that array once with `comparator` (the default
    /// ordering on `primary_key` when `None`).
    ///
    /// Collections bound to the same name share one vector and must agree on
    /// key and ordering. Binding a second one with a different comparator
    /// re-sorts the shared records, after which lookups through the first
    /// collection are unreliable.
    ///
    /// # Errors
    ///
    /// [`StoreError::SchemaViolation`] if `name` holds something other than
    /// an array of objects.
    pub fn new(
        store: Arc<RootStore>,
        name: &str,
        primary_key: &str,
        comparator: Option<Comparator>,
    ) -> Result<Self, CollectionError> {
        let records = store.get_or_create_array(name)?;
        let comparator = comparator.unwrap_or_else(|| by_key(primary_key));

        let len = {
            let mut guard = records.lock();
            // stable, so equal keys keep their stored order
            guard.sort_by(|a, b| comparator(a, b));
            guard.len()
        };
        debug!(collection = name, key = primary_key, len, "collection bound");

        Ok(Self {
            name: Arc::from(name),
            key: Arc::from(primary_key),
            comparator,
            records,
            store,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn require_key(&self, target: &Record) -> Result<(), CollectionError> {
        if target.contains_key(&*self.key) {
            Ok(())
        } else {
            Err(CollectionError::InvalidArgument(format!(
                "record has no `{}` field",
                self.key
            )))
        }
    }

    fn search(&self, records: &[Record], target: &Record) -> Located {
        match records.binary_search_by(|element| (self.comparator)(element, target)) {
            Ok(index) => Located { index, found: true },
            Err(index) => Located {
                index,
                found: false,
            },
        }
    }

    /// Binary search for `target`, which only needs to carry the key field.
    ///
    /// If a misconfigured comparator lets several records tie with the
    /// target, which of them is reported is unspecified.
    pub fn locate(&self, target: &Record) -> Result<Located, CollectionError> {
        self.require_key(target)?;
        let records = self.records.lock();
        Ok(self.search(&records, target))
    }

    /// Inserts `record` at its sorted position.
    ///
    /// Returns `Ok(false)` without mutating or saving when a record with the
    /// same key already exists.
    pub async fn insert(&self, record: Record) -> Result<bool, CollectionError> {
        self.require_key(&record)?;
        {
            let mut records = self.records.lock();
            let at = self.search(&records, &record);
            if at.found {
                return Ok(false);
            }
            records.insert(at.index, record);
        }
        self.save().await?;
        Ok(true)
    }

    /// Merges the fields of `partial` into the stored record with the same
    /// key. Overlapping fields take the new value.
    ///
    /// Returns `Ok(false)` when no record has that key.
    ///
    /// # Errors
    ///
    /// [`CollectionError::InvalidArgument`] when the key field is missing, or
    /// when the comparator matched a record whose key value differs from the
    /// one in `partial` under [`compare_values`] (the merge would change the
    /// key and break the sort). Keys that only differ in representation,
    /// such as `1` and `1.0`, count as the same key and the stored one is kept.
    /// Nothing is mutated in either case.
    pub async fn update(&self, partial: Record) -> Result<bool, CollectionError> {
        self.require_key(&partial)?;
        {
            let mut records = self.records.lock();
            let at = self.search(&records, &partial);
            if !at.found {
                return Ok(false);
            }
            let existing = &mut records[at.index];
            let stored_key = existing.get(&*self.key).unwrap_or(&Value::Null);
            let new_key = partial.get(&*self.key).unwrap_or(&Value::Null);
            if compare_values(stored_key, new_key).is_ne() {
                return Err(CollectionError::InvalidArgument(format!(
                    "update would change key field `{}`",
                    self.key
                )));
            }
            // the stored key value wins, e.g. `1` stays `1` when updated via `1.0`
            for (field, value) in partial {
                if field.as_str() != &*self.key {
                    existing.insert(field, value);
                }
            }
        }
        self.save().await?;
        Ok(true)
    }

    /// Removes the record with the key of `partial`.
    ///
    /// Returns `Ok(false)` and leaves the collection unchanged when the key
    /// is absent.
    pub async fn remove(&self, partial: &Record) -> Result<bool, CollectionError> {
        self.require_key(partial)?;
        self.remove_matching(partial).await
    }

    async fn remove_matching(&self, target: &Record) -> Result<bool, CollectionError> {
        {
            let mut records = self.records.lock();
            let at = self.search(&records, target);
            if !at.found {
                return Ok(false);
            }
            records.remove(at.index);
        }
        self.save().await?;
        Ok(true)
    }

    /// Returns a copy of the record with the key of `partial`, if any.
    pub fn find(&self, partial: &Record) -> Result<Option<Record>, CollectionError> {
        self.require_key(partial)?;
        let records = self.records.lock();
        let at = self.search(&records, partial);
        Ok(at.found.then(|| records[at.index].clone()))
    }

    /// All records in sorted order.
    pub fn find_all(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    /// All records matching `predicate`, in sorted order.
    ///
    /// The predicate runs on a copy taken under the lock, so it may read this
    /// collection (or a sibling of the same name) without deadlocking.
    pub fn find_all_by<F>(&self, predicate: F) -> Vec<Record>
    where
        F: Fn(&Record) -> bool,
    {
        self.find_all()
            .into_iter()
            .filter(|r| predicate(r))
            .collect()
    }

    /// Removes every record, returning how many were removed.
    pub async fn remove_all(&self) -> Result<usize, CollectionError> {
        self.remove_all_by(|_| true).await
    }

    /// Removes every record matching `predicate`, returning the count.
    ///
    /// Works on a snapshot taken up front; each removal saves like
    /// [`remove`](Self::remove). Records removed concurrently by someone else
    /// are skipped and not counted.
    pub async fn remove_all_by<F>(&self, predicate: F) -> Result<usize, CollectionError>
    where
        F: Fn(&Record) -> bool,
    {
        let snapshot = self.find_all_by(predicate);
        let mut removed = 0;
        for record in &snapshot {
            if self.remove_matching(record).await? {
                removed += 1;
            }
        }
        debug!(collection = %self.name, removed, "bulk remove finished");
        Ok(removed)
    }

    /// Whether a record with the key of `partial` exists.
    pub fn has(&self, partial: &Record) -> Result<bool, CollectionError> {
        Ok(self.locate(partial)?.found)
    }

    /// Whether any record satisfies `predicate`, evaluated on a copy like
    /// [`find_all_by`](Self::find_all_by).
    pub fn has_by<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Record) -> bool,
    {
        self.find_all().iter().any(predicate)
    }

    /// Lazy ascending iteration over the current records.
    ///
    /// Each step clones one record under the lock; the iterator observes
    /// mutations made while it is alive. Call again to restart.
    ///
    /// The cursor is a plain index into the live vector: an insert before the
    /// cursor yields the current record again, and a removal before it skips
    /// one. Use [`find_all`](Self::find_all) for a stable snapshot.
    pub fn iter(&self) -> Iter {
        Iter {
            records: Arc::clone(&self.records),
            pos: 0,
        }
    }

    /// Saves the whole root object through the shared store.
    ///
    /// Mutations call this automatically. Calling it directly retries a save
    /// after a persistence failure left memory ahead of the file.
    pub async fn save(&self) -> Result<(), CollectionError> {
        self.store.save(&self.name).await?;
        Ok(())
    }
}

/// Iterator returned by [`Collection::iter`].
pub struct Iter {
    records: Records,
    pos: usize,
}

impl Iterator for Iter {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        let record = self.records.lock().get(self.pos).cloned()?;
        self.pos += 1;
        Some(record)
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = Record;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

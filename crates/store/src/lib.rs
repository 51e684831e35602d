//! # Store
//!
//! The root store bridges sorted collections to the single JSON file that
//! holds them.
//!
//! ## File layout
//!
//! ```text
//! {
//!   "users":  [ {"id": 1, ...}, {"id": 2, ...} ],   <- one array per collection
//!   "orders": [ ... ],
//!   "meta":   {"version": 3}                        <- unclaimed values survive saves
//! }
//! ```
//!
//! The root object is loaded once. A missing file or content that is not a
//! JSON object is replaced by the configured default root object. Every save
//! re-serializes the *whole* root object, never a per-collection diff.
//!
//! Arrays handed out by [`RootStore::get_or_create_array`] are shared: every
//! caller asking for the same name gets a handle to the same `Vec<Record>`,
//! and the next save writes whatever that vector holds at that moment.

mod config;
mod error;
mod root;

pub use config::{load_from_file, load_from_str, ConfigError, SavedHook, StoreConfig, StoreOptions};
pub use error::StoreError;
pub use root::RootStore;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;

/// One stored record: a JSON object with no fixed schema.
pub type Record = Map<String, Value>;

/// The top-level JSON object: collection name to value.
pub type RootObject = Map<String, Value>;

/// A record array shared between the root store and its collections.
pub type Records = Arc<Mutex<Vec<Record>>>;

/// Short name of a JSON value's type, used in diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

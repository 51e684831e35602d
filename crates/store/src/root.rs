use adapter::Adapter;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::StoreOptions;
use crate::{value_kind, Record, Records, RootObject, StoreError};

/// A root object property.
///
/// Properties stay `Raw` until a collection claims them; from then on the
/// root store and every collection for that name share one vector.
#[derive(Debug)]
enum Slot {
    Raw(Value),
    Bound(Records),
}

/// Owns the root object and the adapter it is persisted through.
///
/// # Save path
///
/// 1. Sleep for the configured delay (if any).
/// 2. Wait for the write gate; saves leave the gate in arrival order.
/// 3. Snapshot and serialize the whole root object.
/// 4. Write the text through the adapter.
/// 5. Run the `on_saved` hook.
///
/// The snapshot is taken while holding the gate, so writes never overlap and
/// the last save to finish always carries every mutation applied before it
/// started serializing.
pub struct RootStore {
    adapter: Arc<dyn Adapter>,
    slots: Mutex<BTreeMap<String, Slot>>,
    options: StoreOptions,
    write_gate: tokio::sync::Mutex<()>,
}

impl RootStore {
    /// Reads the adapter once and builds the root object from it.
    ///
    /// A missing file, unparsable text, or a top-level value that is not an
    /// object all fall back to `options.init`. Only a failing read is an
    /// error.
    pub async fn open(
        adapter: Arc<dyn Adapter>,
        options: StoreOptions,
    ) -> Result<Self, StoreError> {
        let root = match adapter.read().await? {
            None => {
                debug!("no stored root object, seeding from default");
                options.init.clone()
            }
            Some(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    warn!(
                        found = value_kind(&other),
                        "stored root is not a JSON object, using default"
                    );
                    options.init.clone()
                }
                Err(e) => {
                    warn!(error = %e, "stored root is not valid JSON, using default");
                    options.init.clone()
                }
            },
        };

        let slots: BTreeMap<String, Slot> = root
            .into_iter()
            .map(|(name, value)| (name, Slot::Raw(value)))
            .collect();
        info!(properties = slots.len(), "root store opened");

        Ok(Self {
            adapter,
            slots: Mutex::new(slots),
            options,
            write_gate: tokio::sync::Mutex::new(()),
        })
    }

    /// Returns the shared array stored under `name`, creating an empty one if
    /// the name is absent.
    ///
    /// # Errors
    ///
    /// [`StoreError::SchemaViolation`] if the existing value is not an array
    /// or holds a non-object element. The value is left untouched.
    pub fn get_or_create_array(&self, name: &str) -> Result<Records, StoreError> {
        let mut slots = self.slots.lock();
        let records = match slots.get(name) {
            Some(Slot::Bound(records)) => return Ok(Arc::clone(records)),
            Some(Slot::Raw(value)) => records_from_value(name, value)?,
            None => {
                debug!(collection = name, "creating empty collection");
                Vec::new()
            }
        };

        let shared: Records = Arc::new(Mutex::new(records));
        slots.insert(name.to_owned(), Slot::Bound(Arc::clone(&shared)));
        Ok(shared)
    }

    /// Property names of the root object, in serialization order.
    pub fn collection_names(&self) -> Vec<String> {
        self.slots.lock().keys().cloned().collect()
    }

    /// The root object exactly as the next save would write it.
    pub fn snapshot(&self) -> RootObject {
        let slots = self.slots.lock();
        slots
            .iter()
            .map(|(name, slot)| {
                let value = match slot {
                    Slot::Raw(value) => value.clone(),
                    Slot::Bound(records) => Value::Array(
                        records.lock().iter().cloned().map(Value::Object).collect(),
                    ),
                };
                (name.clone(), value)
            })
            .collect()
    }

    fn serialize(&self) -> Result<String, StoreError> {
        let root = Value::Object(self.snapshot());
        let text = if self.options.beautify {
            serde_json::to_string_pretty(&root)?
        } else {
            serde_json::to_string(&root)?
        };
        Ok(text)
    }

    /// Persists the whole root object on behalf of collection `name`.
    ///
    /// The array under `name` is the collection's own backing vector, so
    /// there is nothing to copy in before serializing.
    pub async fn save(&self, name: &str) -> Result<(), StoreError> {
        if !self.options.delay.is_zero() {
            tokio::time::sleep(self.options.delay).await;
        }

        let _gate = self.write_gate.lock().await;
        let text = self.serialize()?;
        if let Err(e) = self.adapter.write(&text).await {
            warn!(collection = name, error = %e, "save failed");
            return Err(e.into());
        }
        debug!(collection = name, bytes = text.len(), "root object saved");

        if let Some(hook) = &self.options.on_saved {
            hook();
        }
        Ok(())
    }
}

fn records_from_value(name: &str, value: &Value) -> Result<Vec<Record>, StoreError> {
    let Value::Array(items) = value else {
        return Err(StoreError::SchemaViolation {
            name: name.to_owned(),
            found: value_kind(value),
        });
    };

    items
        .iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record.clone()),
            other => Err(StoreError::SchemaViolation {
                name: name.to_owned(),
                found: match other {
                    Value::Array(_) => "an array of arrays",
                    _ => "an array with non-object elements",
                },
            }),
        })
        .collect()
}

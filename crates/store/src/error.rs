use adapter::AdapterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The value stored under a collection name is not an array of objects.
    #[error("schema violation: `{name}` holds {found}, expected an array of objects")]
    SchemaViolation { name: String, found: &'static str },
    #[error("persistence failure: {0}")]
    Persistence(#[from] AdapterError),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

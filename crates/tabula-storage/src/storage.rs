//! The `Storage` capability shared by history and dataset persistence.

use serde::de::DeserializeOwned;
use serde::Serialize;

use tabula_core::error::Result;

/// String key/value store.
///
/// Implementations must be safe to share between tasks; reads and writes
/// are synchronous and not transactional across keys.
pub trait Storage: Send + Sync {
    /// Value stored under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Read and deserialize a JSON value stored under `key`.
pub fn read_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Result<Option<T>> {
    match storage.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize `value` as JSON and store it under `key`.
pub fn write_json<T: Serialize + ?Sized>(storage: &dyn Storage, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    storage.set(key, &raw)
}

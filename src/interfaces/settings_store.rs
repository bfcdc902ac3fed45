//! Key-value settings storage interface.

use async_trait::async_trait;
use serde_json::Value;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during settings or order storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed settings document: {0}")]
    Malformed(String),
}

/// Interface for durable key-value settings.
///
/// Reads must observe writes made earlier in the same invocation.
///
/// Implementations:
/// - `MemorySettingsStore`: in-process map (tests, embedding)
/// - `JsonFileSettingsStore`: single JSON document on disk
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Read a value. Missing keys return `None`.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Read a string setting, falling back to `default` when absent or null.
///
/// Numbers and booleans are rendered as strings so that values written by
/// other tools read back the same way.
pub async fn get_string(store: &dyn SettingsStore, key: &str, default: &str) -> Result<String> {
    Ok(match store.get(key).await? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => if b { "yes" } else { "no" }.to_string(),
        _ => default.to_string(),
    })
}

/// Read an integer setting, falling back to `default` when absent or unparseable.
pub async fn get_int(store: &dyn SettingsStore, key: &str, default: i64) -> Result<i64> {
    Ok(store
        .get(key)
        .await?
        .as_ref()
        .and_then(int_value)
        .unwrap_or(default))
}

/// Integer held by a stored value, if it is a whole number or a numeric string.
pub fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read a "yes"/"no" flag. Anything other than "yes" (or JSON `true`) is false.
pub async fn get_flag(store: &dyn SettingsStore, key: &str) -> Result<bool> {
    Ok(match store.get(key).await? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s == "yes",
        _ => false,
    })
}

/// Serialize a flag the way the host stores it.
pub fn flag_value(enabled: bool) -> Value {
    Value::String(if enabled { "yes" } else { "no" }.to_string())
}

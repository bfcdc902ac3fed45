//! JSON-document settings store.
//!
//! The whole document is read once at open and rewritten on every `set`.
//! Writes go to a sibling temp file that is renamed over the original, so a
//! crash mid-write leaves the previous document intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::interfaces::settings_store::{Result, SettingsStore, StoreError};

/// Settings persisted as a single JSON object on disk.
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl JsonFileSettingsStore {
    /// Open (or start) a settings document at `path`.
    ///
    /// A missing file starts empty; its parent directory is created on first write.
    pub async fn open(path: &Path) -> Result<Self> {
        let values = match tokio::fs::read_to_string(path).await {
            Ok(content) if content.trim().is_empty() => Map::new(),
            Ok(content) => match serde_json::from_str::<Value>(&content)? {
                Value::Object(map) => map,
                _ => {
                    return Err(StoreError::Malformed(format!(
                        "{} is not a JSON object",
                        path.display()
                    )))
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = values.len(), "Opened settings document");

        Ok(Self {
            path: path.to_path_buf(),
            values: RwLock::new(values),
        })
    }

    async fn persist(&self, values: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.write().await;
        values.insert(key.to_string(), value);
        self.persist(&values).await
    }
}

//! Admin-visible activity log.
//!
//! A bounded list of `{time, message, type}` entries stored under one
//! settings key. Oldest entries are evicted first once the cap is reached.
//! Recording never fails the caller; storage errors are logged and dropped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::interfaces::settings_store::Result;
use crate::interfaces::{Clock, SettingsStore};

/// Settings key holding the log.
pub const ACTIVITY_LOG_KEY: &str = "activity_log";
/// Maximum retained entries.
pub const ACTIVITY_LOG_CAPACITY: usize = 100;

/// Severity tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Info,
    Success,
    Error,
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    /// Timestamp as `YYYY-MM-DD HH:MM:SS`, UTC.
    pub time: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
}

/// Handle to the persisted activity log.
#[derive(Clone)]
pub struct ActivityLog {
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
}

impl ActivityLog {
    pub fn new(settings: Arc<dyn SettingsStore>, clock: Arc<dyn Clock>) -> Self {
        Self { settings, clock }
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.record(ActivityKind::Info, message).await;
    }

    pub async fn success(&self, message: impl Into<String>) {
        self.record(ActivityKind::Success, message).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.record(ActivityKind::Error, message).await;
    }

    /// Append an entry, evicting the oldest beyond capacity.
    pub async fn record(&self, kind: ActivityKind, message: impl Into<String>) {
        let entry = ActivityEntry {
            time: self.clock.now().format("%Y-%m-%d %H:%M:%S").to_string(),
            message: message.into(),
            kind,
        };
        debug!(kind = ?entry.kind, message = %entry.message, "Activity");

        if let Err(e) = self.append(entry).await {
            error!(error = %e, "Failed to write activity log");
        }
    }

    /// Entries, oldest first.
    pub async fn entries(&self) -> Result<Vec<ActivityEntry>> {
        Ok(match self.settings.get(ACTIVITY_LOG_KEY).await? {
            Some(value @ Value::Array(_)) => serde_json::from_value(value).unwrap_or_else(|e| {
                error!(error = %e, "Activity log unreadable, starting fresh");
                Vec::new()
            }),
            _ => Vec::new(),
        })
    }

    pub async fn clear(&self) -> Result<()> {
        self.settings
            .set(ACTIVITY_LOG_KEY, Value::Array(Vec::new()))
            .await
    }

    async fn append(&self, entry: ActivityEntry) -> Result<()> {
        let mut entries = self.entries().await?;
        entries.push(entry);
        if entries.len() > ACTIVITY_LOG_CAPACITY {
            let overflow = entries.len() - ACTIVITY_LOG_CAPACITY;
            entries.drain(..overflow);
        }
        self.settings
            .set(ACTIVITY_LOG_KEY, serde_json::to_value(&entries)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::interfaces::FixedClock;
    use crate::storage::MemorySettingsStore;

    fn log() -> ActivityLog {
        ActivityLog::new(
            Arc::new(MemorySettingsStore::new()),
            Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2025, 1, 5).unwrap())),
        )
    }

    #[tokio::test]
    async fn test_record_and_read() {
        let log = log();
        log.info("rollover started").await;
        log.success("frcs promoted").await;
        log.error("crm down").await;

        let entries = log.entries().await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].kind, ActivityKind::Info);
        assert_eq!(entries[1].message, "frcs promoted");
        assert_eq!(entries[2].kind, ActivityKind::Error);
        assert_eq!(entries[0].time, "2025-01-05 12:00:00");
    }

    #[tokio::test]
    async fn test_capped_at_capacity_fifo() {
        let log = log();
        for i in 0..(ACTIVITY_LOG_CAPACITY + 5) {
            log.info(format!("entry {}", i)).await;
        }

        let entries = log.entries().await.unwrap();
        assert_eq!(entries.len(), ACTIVITY_LOG_CAPACITY);
        assert_eq!(entries[0].message, "entry 5");
        assert_eq!(
            entries[ACTIVITY_LOG_CAPACITY - 1].message,
            format!("entry {}", ACTIVITY_LOG_CAPACITY + 4)
        );
    }

    #[tokio::test]
    async fn test_serialized_shape() {
        let log = log();
        log.success("done").await;

        let raw = log.settings.get(ACTIVITY_LOG_KEY).await.unwrap().unwrap();
        assert_eq!(
            raw,
            serde_json::json!([{ "time": "2025-01-05 12:00:00", "message": "done", "type": "success" }])
        );
    }

    #[tokio::test]
    async fn test_clear() {
        let log = log();
        log.info("x").await;
        log.clear().await.unwrap();
        assert!(log.entries().await.unwrap().is_empty());
    }
}

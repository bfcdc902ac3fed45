//! Settings store and integration adapter configuration.

use chrono::NaiveTime;
use serde::Deserialize;

use super::ConfigError;

/// Default CRM contact source label.
pub const DEFAULT_CONTACT_SOURCE: &str = "edition-sync";

/// Settings store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Path to the JSON settings document. Empty = in-memory.
    pub path: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: "./data/settings.json".to_string(),
        }
    }
}

/// CRM REST adapter configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrmConfig {
    /// Master switch. Disabled = every dispatch is skipped.
    pub enabled: bool,
    /// REST API base URL (e.g. `https://shop.example/wp-json/crm/v2`).
    pub base_url: String,
    /// Basic-auth user.
    pub username: String,
    /// Basic-auth application password.
    pub password: String,
    /// Per-request timeout. None = no client-side timeout.
    pub timeout_secs: Option<u64>,
    /// Source label recorded on contacts this crate creates.
    pub contact_source: String,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: None,
            contact_source: DEFAULT_CONTACT_SOURCE.to_string(),
        }
    }
}

/// SMTP configuration for rollover notifications.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// SMTP relay host. Empty = notifications are logged, not sent.
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    /// Sender address, optionally with display name.
    pub from: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 587,
            username: String::new(),
            password: String::new(),
            from: "Edition Sync <noreply@localhost>".to_string(),
        }
    }
}

/// Daily timer configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Name used in logs for the daily callback.
    pub name: String,
    /// Local time of day to fire, `HH:MM`.
    pub daily_at: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            name: "edition_rollover".to_string(),
            daily_at: "00:05".to_string(),
        }
    }
}

impl ScheduleConfig {
    /// Parsed fire time.
    pub fn fire_at(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(self.daily_at.trim(), "%H:%M")
            .map_err(|_| ConfigError::ScheduleTime(self.daily_at.clone()))
    }
}

//! Edition state persistence over the settings store.
//!
//! Every course owns a block of keys under its settings prefix:
//!
//! | Key | Value |
//! |-----|-------|
//! | `current_edition` | integer |
//! | `edition_start` / `edition_end` | `YYYY-MM-DD` or empty |
//! | `early_bird_enabled` | `yes` / `no` |
//! | `early_bird_start` / `early_bird_end` | `YYYY-MM-DD` or empty |
//! | `next_enabled` | `yes` / `no` |
//! | `next_edition`, `next_start`, `next_end` | as above |
//! | `next_early_bird_enabled`, `next_early_bird_start`, `next_early_bird_end` | as above |

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{EarlyBird, EditionSlot, EditionState};
use crate::interfaces::settings_store::{flag_value, get_flag, get_string, int_value, Result};
use crate::interfaces::{SettingsStore, StoreError};
use crate::registry::Course;
use crate::validation::{parse_date, validate_slot, ValidationError, ValidationWarning, DATE_FORMAT};

/// Errors from validated edition updates.
#[derive(Debug, thiserror::Error)]
pub enum EditionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Key suffixes for one slot.
struct SlotKeys {
    number: &'static str,
    start: &'static str,
    end: &'static str,
    early_bird_enabled: &'static str,
    early_bird_start: &'static str,
    early_bird_end: &'static str,
}

const CURRENT_KEYS: SlotKeys = SlotKeys {
    number: "current_edition",
    start: "edition_start",
    end: "edition_end",
    early_bird_enabled: "early_bird_enabled",
    early_bird_start: "early_bird_start",
    early_bird_end: "early_bird_end",
};

const NEXT_KEYS: SlotKeys = SlotKeys {
    number: "next_edition",
    start: "next_start",
    end: "next_end",
    early_bird_enabled: "next_early_bird_enabled",
    early_bird_start: "next_early_bird_start",
    early_bird_end: "next_early_bird_end",
};

const NEXT_ENABLED: &str = "next_enabled";

/// Reads and writes per-course edition state.
#[derive(Clone)]
pub struct EditionStore {
    settings: Arc<dyn SettingsStore>,
}

impl EditionStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Load a course's state.
    ///
    /// Malformed dates read as unset and a missing or non-positive current
    /// edition reads as 1, each with a warning.
    pub async fn load(&self, course: &Course) -> Result<EditionState> {
        let current = self.read_slot(course, &CURRENT_KEYS, 1).await?;
        let next = if get_flag(self.settings.as_ref(), &key(course, NEXT_ENABLED)).await? {
            Some(self.read_slot(course, &NEXT_KEYS, 0).await?)
        } else {
            None
        };
        Ok(EditionState { current, next })
    }

    /// Persist a course's full state. An absent next slot is written disabled
    /// and blank.
    pub async fn save(&self, course: &Course, state: &EditionState) -> Result<()> {
        self.write_slot(course, &CURRENT_KEYS, &state.current).await?;
        match &state.next {
            Some(next) => self.write_next(course, next).await?,
            None => self.clear_next(course).await?,
        }
        debug!(course = %course.slug, edition = state.current.number, "Saved edition state");
        Ok(())
    }

    /// Admin edit of the current slot.
    ///
    /// Validated before anything is written; a rejected slot leaves the
    /// store untouched.
    pub async fn update_current(
        &self,
        course: &Course,
        slot: &EditionSlot,
    ) -> std::result::Result<Vec<ValidationWarning>, EditionError> {
        let warnings = validate_slot(slot)?;
        self.write_slot(course, &CURRENT_KEYS, slot).await?;
        log_warnings(course, &warnings);
        info!(course = %course.slug, edition = slot.number, "Current edition updated");
        Ok(warnings)
    }

    /// Admin edit that enables and fills the next slot.
    pub async fn update_next(
        &self,
        course: &Course,
        slot: &EditionSlot,
    ) -> std::result::Result<Vec<ValidationWarning>, EditionError> {
        let warnings = validate_slot(slot)?;
        self.write_next(course, slot).await?;
        log_warnings(course, &warnings);
        info!(course = %course.slug, edition = slot.number, "Next edition staged");
        Ok(warnings)
    }

    /// Disable the next slot and blank its fields.
    pub async fn disable_next(&self, course: &Course) -> Result<()> {
        self.clear_next(course).await?;
        info!(course = %course.slug, "Next edition disabled");
        Ok(())
    }

    async fn read_slot(&self, course: &Course, keys: &SlotKeys, default: u32) -> Result<EditionSlot> {
        let settings = self.settings.as_ref();
        let raw_number = match settings.get(&key(course, keys.number)).await? {
            None | Some(Value::Null) => i64::from(default),
            Some(Value::String(s)) if s.trim().is_empty() => i64::from(default),
            Some(value) => int_value(&value).unwrap_or_else(|| {
                warn!(
                    course = %course.slug,
                    key = keys.number,
                    value = %value,
                    "Unparseable edition number, using default"
                );
                i64::from(default)
            }),
        };
        let number = match u32::try_from(raw_number) {
            Ok(n) if n > 0 || default == 0 => n,
            _ => {
                warn!(
                    course = %course.slug,
                    key = keys.number,
                    value = raw_number,
                    "Invalid edition number, using default"
                );
                default
            }
        };

        Ok(EditionSlot {
            number,
            start: self.read_date(course, keys.start).await?,
            end: self.read_date(course, keys.end).await?,
            early_bird: EarlyBird {
                enabled: get_flag(settings, &key(course, keys.early_bird_enabled)).await?,
                start: self.read_date(course, keys.early_bird_start).await?,
                end: self.read_date(course, keys.early_bird_end).await?,
            },
        })
    }

    async fn read_date(&self, course: &Course, suffix: &str) -> Result<Option<NaiveDate>> {
        let raw = get_string(self.settings.as_ref(), &key(course, suffix), "").await?;
        match parse_date(&raw) {
            Ok(date) => Ok(date),
            Err(e) => {
                warn!(course = %course.slug, key = suffix, error = %e, "Ignoring malformed date");
                Ok(None)
            }
        }
    }

    async fn write_slot(&self, course: &Course, keys: &SlotKeys, slot: &EditionSlot) -> Result<()> {
        let settings = self.settings.as_ref();
        settings.set(&key(course, keys.number), json!(slot.number)).await?;
        settings.set(&key(course, keys.start), date_value(slot.start)).await?;
        settings.set(&key(course, keys.end), date_value(slot.end)).await?;
        settings
            .set(&key(course, keys.early_bird_enabled), flag_value(slot.early_bird.enabled))
            .await?;
        settings
            .set(&key(course, keys.early_bird_start), date_value(slot.early_bird.start))
            .await?;
        settings
            .set(&key(course, keys.early_bird_end), date_value(slot.early_bird.end))
            .await?;
        Ok(())
    }

    async fn write_next(&self, course: &Course, slot: &EditionSlot) -> Result<()> {
        self.settings
            .set(&key(course, NEXT_ENABLED), flag_value(true))
            .await?;
        self.write_slot(course, &NEXT_KEYS, slot).await
    }

    async fn clear_next(&self, course: &Course) -> Result<()> {
        let settings = self.settings.as_ref();
        settings.set(&key(course, NEXT_ENABLED), flag_value(false)).await?;
        settings.set(&key(course, NEXT_KEYS.number), blank()).await?;
        for suffix in [
            NEXT_KEYS.start,
            NEXT_KEYS.end,
            NEXT_KEYS.early_bird_start,
            NEXT_KEYS.early_bird_end,
        ] {
            settings.set(&key(course, suffix), blank()).await?;
        }
        settings
            .set(&key(course, NEXT_KEYS.early_bird_enabled), flag_value(false))
            .await?;
        Ok(())
    }
}

fn key(course: &Course, suffix: &str) -> String {
    format!("{}{}", course.settings_prefix, suffix)
}

fn date_value(date: Option<NaiveDate>) -> Value {
    match date {
        Some(d) => Value::String(d.format(DATE_FORMAT).to_string()),
        None => blank(),
    }
}

fn blank() -> Value {
    Value::String(String::new())
}

fn log_warnings(course: &Course, warnings: &[ValidationWarning]) {
    for warning in warnings {
        warn!(course = %course.slug, "{}", warning);
    }
}

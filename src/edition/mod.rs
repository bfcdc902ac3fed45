//! Edition slots and their persisted state.
//!
//! Each course has a `current` slot (always present, edition 1 with no dates
//! by default) and an optional staged `next` slot that replaces it at
//! rollover.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

mod store;

pub use store::{EditionError, EditionStore};

/// Early-bird sub-window of an edition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarlyBird {
    pub enabled: bool,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl EarlyBird {
    /// An enabled window. An unset start means "open since forever".
    pub fn window(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            enabled: true,
            start,
            end,
        }
    }
}

/// One numbered edition with its enrollment window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditionSlot {
    /// Edition number. A staged next slot may hold 0 (not yet numbered).
    pub number: u32,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub early_bird: EarlyBird,
}

impl Default for EditionSlot {
    fn default() -> Self {
        Self::new(1)
    }
}

impl EditionSlot {
    /// A slot with no dates and early bird disabled.
    pub fn new(number: u32) -> Self {
        Self {
            number,
            start: None,
            end: None,
            early_bird: EarlyBird::default(),
        }
    }

    pub fn with_dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn with_early_bird(mut self, early_bird: EarlyBird) -> Self {
        self.early_bird = early_bird;
        self
    }

    /// Both enrollment dates are configured.
    pub fn has_dates(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

/// Everything persisted for one course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditionState {
    pub current: EditionSlot,
    /// Present only while an admin has the next slot enabled.
    pub next: Option<EditionSlot>,
}

impl EditionState {
    pub fn new(current: EditionSlot) -> Self {
        Self {
            current,
            next: None,
        }
    }

    pub fn with_next(mut self, next: EditionSlot) -> Self {
        self.next = Some(next);
        self
    }
}

#[cfg(test)]
mod tests;

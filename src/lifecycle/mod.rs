//! Edition lifecycle engine.
//!
//! Pure, date-only rules evaluated against "today":
//! - registration status shown to customers
//! - slot phase shown to admins
//! - rollover (promote the staged next slot, or bump the number)
//!
//! The async jobs that load and persist state live in [`rollover`] and
//! [`discount`]; everything in this module is a function of its arguments.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::edition::{EarlyBird, EditionSlot, EditionState};
use crate::registry::Course;

pub mod discount;
pub mod rollover;

pub use discount::{select_discount, DiscountQuote, DiscountRates, DiscountService, DiscountTier};
pub use rollover::{RolloverEvent, RolloverJob, RolloverReport};

/// Days before the end date at which a slot counts as ending soon.
pub const ENDING_SOON_DAYS: i64 = 7;

/// Customer-facing registration status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    OpeningSoon,
    EarlyBird,
    Live,
}

impl RegistrationStatus {
    /// Stable identifier (`opening_soon`, `early_bird`, `live`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpeningSoon => "opening_soon",
            Self::EarlyBird => "early_bird",
            Self::Live => "live",
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Self::OpeningSoon => "Registration Opening Soon",
            Self::EarlyBird => "Early Bird Registration Open",
            Self::Live => "Registration Open",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin-facing phase of the current slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPhase {
    /// Start or end not configured.
    NeedsDates,
    Active,
    /// Within [`ENDING_SOON_DAYS`] of the end date.
    EndingSoon,
    /// Past the end date; the next rollover will act on it.
    Expired,
}

/// Phase plus the early-bird overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotStatus {
    pub phase: SlotPhase,
    pub early_bird: bool,
}

/// Whether today falls in `[start or -inf, end)` of an enabled early-bird window.
///
/// The end day itself is not early bird. An unset end never matches.
pub fn early_bird_active(early_bird: &EarlyBird, today: NaiveDate) -> bool {
    early_bird.enabled
        && early_bird.start.map_or(true, |start| today >= start)
        && early_bird.end.is_some_and(|end| today < end)
}

/// Registration status for a slot. Rules are ordered; first match wins.
pub fn registration_status(slot: &EditionSlot, today: NaiveDate) -> RegistrationStatus {
    // Past the end: the daily rollover is about to replace this slot.
    if slot.end.is_some_and(|end| today > end) {
        return RegistrationStatus::OpeningSoon;
    }

    if early_bird_active(&slot.early_bird, today) {
        return RegistrationStatus::EarlyBird;
    }

    // Early bird has closed (end day inclusive) but the edition has not.
    if slot.early_bird.enabled {
        if let (Some(eb_end), Some(end)) = (slot.early_bird.end, slot.end) {
            if today >= eb_end && today < end {
                return RegistrationStatus::Live;
            }
        }
    }

    match (slot.start, slot.end) {
        (Some(start), Some(_)) if today >= start => RegistrationStatus::Live,
        _ => RegistrationStatus::OpeningSoon,
    }
}

/// Phase of a slot, ignoring early bird.
pub fn slot_phase(slot: &EditionSlot, today: NaiveDate) -> SlotPhase {
    match (slot.start, slot.end) {
        (Some(_), Some(end)) if today > end => SlotPhase::Expired,
        (Some(_), Some(end)) if (end - today).num_days() <= ENDING_SOON_DAYS => {
            SlotPhase::EndingSoon
        }
        (Some(_), Some(_)) => SlotPhase::Active,
        _ => SlotPhase::NeedsDates,
    }
}

/// Phase of a slot with its early-bird overlay.
pub fn slot_status(slot: &EditionSlot, today: NaiveDate) -> SlotStatus {
    SlotStatus {
        phase: slot_phase(slot, today),
        early_bird: early_bird_active(&slot.early_bird, today),
    }
}

/// A decided state change for one course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rollover {
    /// Replace current with the staged next slot.
    Promote { from: u32, next: EditionSlot },
    /// Bump the edition number and clear the dates.
    Increment { from: u32 },
}

impl Rollover {
    /// Edition number after the change.
    pub fn new_number(&self) -> u32 {
        match self {
            Self::Promote { next, .. } => next.number,
            Self::Increment { from } => from.saturating_add(1),
        }
    }

    /// Edition number before the change.
    pub fn old_number(&self) -> u32 {
        match self {
            Self::Promote { from, .. } | Self::Increment { from } => *from,
        }
    }
}

/// Decide whether a course rolls over today.
///
/// Only an expired current slot (end set, today past it) rolls over. A slot
/// with no end date never does, so unconfigured courses are not bumped.
pub fn plan_rollover(state: &EditionState, today: NaiveDate) -> Option<Rollover> {
    let end = state.current.end?;
    if today <= end {
        return None;
    }

    let from = state.current.number;
    match &state.next {
        Some(next) if next.number > 0 => Some(Rollover::Promote {
            from,
            next: next.clone(),
        }),
        _ => Some(Rollover::Increment { from }),
    }
}

/// Apply a planned rollover.
///
/// Promotion consumes the next slot. Increment only touches the current
/// slot: number + 1, dates and early bird cleared.
pub fn apply_rollover(state: &EditionState, rollover: &Rollover) -> EditionState {
    match rollover {
        Rollover::Promote { next, .. } => EditionState::new(next.clone()),
        Rollover::Increment { from } => EditionState {
            current: EditionSlot::new(from.saturating_add(1)),
            next: state.next.clone(),
        },
    }
}

/// Admin "increment now": the increment branch, ignoring dates.
pub fn manual_increment(state: &EditionState) -> EditionState {
    apply_rollover(
        state,
        &Rollover::Increment {
            from: state.current.number,
        },
    )
}

/// English ordinal: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st, 111th.
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// Human-readable edition name, e.g. "12th FRCS".
pub fn edition_name(course: &Course, number: u32) -> String {
    format!("{} {}", ordinal(number), course.name)
}

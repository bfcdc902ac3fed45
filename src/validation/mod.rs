//! Input validation for admin and checkout data.
//!
//! Provides centralized validation for every value that crosses a trust
//! boundary (admin edition edits, date strings, membership numbers). A
//! rejected value never produces a partial state change.

use chrono::NaiveDate;

use crate::edition::EditionSlot;

mod membership;

pub use membership::MembershipNumber;

/// Length limits for validated fields.
pub mod limits {
    /// Minimum membership number length.
    pub const MIN_MEMBERSHIP_LENGTH: usize = 4;
    /// Maximum membership number length.
    pub const MAX_MEMBERSHIP_LENGTH: usize = 12;
}

/// Error constants for validation failures.
pub mod errmsg {
    pub const MEMBERSHIP_EMPTY: &str = "membership number cannot be empty";
    pub const MEMBERSHIP_LENGTH: &str = "membership number must be 4-12 characters";
    pub const MEMBERSHIP_INVALID_CHARS: &str =
        "membership number contains invalid characters (allowed: A-Z, a-z, 0-9)";
    pub const MEMBERSHIP_NO_DIGIT: &str = "membership number must contain at least one digit";
}

/// Date format used for every stored and submitted date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rejected input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Edition end {end} is before start {start}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("Early-bird end {end} is before early-bird start {start}")]
    InvertedEarlyBird { start: NaiveDate, end: NaiveDate },

    #[error("Edition number must be positive")]
    NonPositiveEdition,

    #[error("Malformed date '{0}' (expected YYYY-MM-DD)")]
    MalformedDate(String),

    #[error("Invalid membership number: {0}")]
    Membership(&'static str),
}

/// Accepted input that deserves a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// Early-bird window closes after the edition itself ends.
    EarlyBirdOutlastsEdition {
        early_bird_end: NaiveDate,
        edition_end: NaiveDate,
    },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EarlyBirdOutlastsEdition {
                early_bird_end,
                edition_end,
            } => write!(
                f,
                "early-bird end {} is after edition end {}",
                early_bird_end, edition_end
            ),
        }
    }
}

/// Parse an optional date string. Blank means "not set".
pub fn parse_date(raw: &str) -> Result<Option<NaiveDate>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(Some)
        .map_err(|_| ValidationError::MalformedDate(raw.to_string()))
}

/// Validate an edition slot submitted by an admin.
///
/// Rules:
/// - Edition number must be positive
/// - End must not be before start (when both are set)
/// - Early-bird end must not be before early-bird start (when both are set)
///
/// An early-bird window that outlasts the edition is accepted with a warning.
pub fn validate_slot(slot: &EditionSlot) -> Result<Vec<ValidationWarning>, ValidationError> {
    if slot.number == 0 {
        return Err(ValidationError::NonPositiveEdition);
    }

    if let (Some(start), Some(end)) = (slot.start, slot.end) {
        if end < start {
            return Err(ValidationError::InvertedRange { start, end });
        }
    }

    let early_bird = &slot.early_bird;
    if let (Some(start), Some(end)) = (early_bird.start, early_bird.end) {
        if end < start {
            return Err(ValidationError::InvertedEarlyBird { start, end });
        }
    }

    let mut warnings = Vec::new();
    if let (Some(early_bird_end), Some(edition_end)) = (early_bird.end, slot.end) {
        if early_bird_end > edition_end {
            warnings.push(ValidationWarning::EarlyBirdOutlastsEdition {
                early_bird_end,
                edition_end,
            });
        }
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edition::EarlyBird;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("").unwrap(), None);
        assert_eq!(parse_date("  ").unwrap(), None);
        assert_eq!(parse_date("2025-01-31").unwrap(), Some(date("2025-01-31")));
        assert_eq!(
            parse_date("31/01/2025"),
            Err(ValidationError::MalformedDate("31/01/2025".to_string()))
        );
        assert!(parse_date("2025-02-30").is_err());
    }

    #[test]
    fn test_validate_slot_accepts_open_dates() {
        let slot = EditionSlot::new(3);
        assert!(validate_slot(&slot).unwrap().is_empty());
    }

    #[test]
    fn test_validate_slot_rejects_inverted_range() {
        let slot = EditionSlot::new(3).with_dates(Some(date("2025-02-01")), Some(date("2025-01-01")));
        assert_eq!(
            validate_slot(&slot),
            Err(ValidationError::InvertedRange {
                start: date("2025-02-01"),
                end: date("2025-01-01"),
            })
        );
    }

    #[test]
    fn test_validate_slot_rejects_zero_edition() {
        let slot = EditionSlot::new(0);
        assert_eq!(validate_slot(&slot), Err(ValidationError::NonPositiveEdition));
    }

    #[test]
    fn test_validate_slot_rejects_inverted_early_bird() {
        let slot = EditionSlot::new(1).with_early_bird(EarlyBird::window(
            Some(date("2025-01-10")),
            Some(date("2025-01-01")),
        ));
        assert!(matches!(
            validate_slot(&slot),
            Err(ValidationError::InvertedEarlyBird { .. })
        ));
    }

    #[test]
    fn test_validate_slot_warns_on_long_early_bird() {
        let slot = EditionSlot::new(1)
            .with_dates(Some(date("2025-01-01")), Some(date("2025-01-31")))
            .with_early_bird(EarlyBird::window(None, Some(date("2025-02-10"))));

        let warnings = validate_slot(&slot).unwrap();
        assert_eq!(
            warnings,
            vec![ValidationWarning::EarlyBirdOutlastsEdition {
                early_bird_end: date("2025-02-10"),
                edition_end: date("2025-01-31"),
            }]
        );
        assert_eq!(
            warnings[0].to_string(),
            "early-bird end 2025-02-10 is after edition end 2025-01-31"
        );
    }
}

//! Membership number entered at checkout.

use std::fmt;

use super::{errmsg, limits, ValidationError};
use crate::order::{meta_keys, Order};

/// A validated membership number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipNumber(String);

impl MembershipNumber {
    /// Validate raw checkout input.
    ///
    /// Rules:
    /// - Surrounding whitespace is ignored
    /// - 4 to 12 characters
    /// - ASCII letters and digits only
    /// - At least one digit
    ///
    /// Letters are upper-cased so the same number always stores the same way.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Membership(errmsg::MEMBERSHIP_EMPTY));
        }
        if !(limits::MIN_MEMBERSHIP_LENGTH..=limits::MAX_MEMBERSHIP_LENGTH).contains(&trimmed.len())
        {
            return Err(ValidationError::Membership(errmsg::MEMBERSHIP_LENGTH));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::Membership(errmsg::MEMBERSHIP_INVALID_CHARS));
        }
        if !trimmed.chars().any(|c| c.is_ascii_digit()) {
            return Err(ValidationError::Membership(errmsg::MEMBERSHIP_NO_DIGIT));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Record the number on an order. Overwrites any earlier value.
    pub fn attach_to_order(&self, order: &mut Order) {
        order.meta.insert(
            meta_keys::MEMBERSHIP_NUMBER.to_string(),
            serde_json::Value::String(self.0.clone()),
        );
    }
}

impl fmt::Display for MembershipNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

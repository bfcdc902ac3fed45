//! CRM client interface.
//!
//! The sync dispatcher only needs four capabilities from a CRM: resolve a
//! contact, resolve a tag, attach a tag, and set a custom field. How an
//! adapter reaches each capability (bulk endpoints, meta records, raw keyed
//! writes) is the adapter's concern.

use std::fmt;

use async_trait::async_trait;

/// Result type for CRM operations.
pub type Result<T> = std::result::Result<T, CrmError>;

/// Errors from CRM calls.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("CRM integration unavailable: {0}")]
    Unavailable(String),

    #[error("CRM request failed: {0}")]
    Request(String),

    #[error("CRM returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("CRM response malformed: {0}")]
    Malformed(String),

    #[error("CRM rejected {operation}: {message}")]
    Rejected { operation: String, message: String },
}

/// CRM contact identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(pub u64);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CRM tag identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagId(pub u64);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fields used when a contact has to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDraft {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Subscription status for new contacts (e.g. "subscribed").
    pub status: String,
    /// Where the contact came from, shown in the CRM.
    pub source: String,
}

/// Interface for the external contact-management system.
///
/// Every mutating method must be idempotent: attaching a tag the contact
/// already holds, or writing the value a field already has, succeeds
/// without side effects. The dispatcher relies on this to retry whole
/// orders after a partial failure.
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Whether the integration is configured and reachable enough to try.
    ///
    /// `false` makes the dispatcher skip silently.
    fn is_available(&self) -> bool;

    /// Find a contact by exact (case-sensitive) email, creating it if absent.
    async fn find_or_create_contact(&self, draft: &ContactDraft) -> Result<ContactId>;

    /// Find a tag by title or slugified title, creating it if absent.
    async fn ensure_tag(&self, title: &str) -> Result<TagId>;

    /// Attach a tag to a contact. Already-attached is success.
    async fn attach_tag(&self, contact: ContactId, tag: TagId) -> Result<()>;

    /// Set custom field `field_slug` on a contact to `value`.
    async fn upsert_field(&self, contact: ContactId, field_slug: &str, value: &str) -> Result<()>;
}

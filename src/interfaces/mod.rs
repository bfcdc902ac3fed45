//! Abstract interfaces for edition-sync collaborators.
//!
//! These traits define the contracts for:
//! - Settings storage (key-value configuration, edition state, activity log)
//! - Storefront (product categories, coupon amounts)
//! - Order persistence (annotated purchase records)
//! - CRM client (contacts, tags, custom fields)
//! - Mailer (plaintext notifications)
//! - Clock (evaluation date)

pub mod clock;
pub mod crm;
pub mod mailer;
pub mod order_repository;
pub mod settings_store;
pub mod storefront;

pub use clock::{Clock, FixedClock, SystemClock};
pub use crm::{ContactDraft, ContactId, CrmClient, CrmError, TagId};
pub use mailer::{EmailMessage, MailError, Mailer};
pub use order_repository::OrderRepository;
pub use settings_store::{SettingsStore, StoreError};
pub use storefront::Storefront;

//! edition-sync - Course edition lifecycle and CRM sync
//!
//! Decides, per course, which edition is current, what registration status
//! to display, and when a staged "next" edition takes over. Purchases are
//! annotated with the edition they bought into and pushed to an external CRM
//! exactly once per annotation.
//!
//! ## Architecture
//! ```text
//! [registry] + [edition store] --> [lifecycle] --> status / rollover / discount
//!                     |
//!                     v
//!               [annotate] --(order meta)--> [sync] --> CRM
//!
//! [scheduler] --daily--> rollover + discount refresh
//! ```

pub mod activity;
pub mod annotate;
pub mod clients;
pub mod config;
pub mod edition;
pub mod interfaces;
pub mod lifecycle;
pub mod mail;
pub mod order;
pub mod registry;
pub mod scheduler;
pub mod storage;
pub mod sync;
pub mod utils;
pub mod validation;

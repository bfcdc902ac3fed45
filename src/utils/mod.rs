//! Pure utility functions.
//!
//! These are stateless helper functions used across the codebase.

pub mod bootstrap;
#[cfg(feature = "http")]
pub mod retry;
pub mod slug;

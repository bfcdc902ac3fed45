//! Storefront catalog interface.

use async_trait::async_trait;

use super::settings_store::Result;

/// Interface for the e-commerce catalog the lifecycle reads from.
#[async_trait]
pub trait Storefront: Send + Sync {
    /// Category slugs for a product, in the catalog's listing order.
    ///
    /// Unknown products return an empty list.
    async fn product_categories(&self, product_id: u64) -> Result<Vec<String>>;

    /// Set the percentage discount of a coupon.
    ///
    /// Returns `false` if the coupon does not exist.
    async fn set_coupon_percentage(&self, code: &str, percentage: u8) -> Result<bool>;
}

//! Order persistence interface.

use async_trait::async_trait;

use super::settings_store::Result;
use crate::order::{Order, OrderId};

/// Interface for reading and writing orders.
///
/// Orders are owned by the host storefront; this crate only reads them and
/// persists metadata changes.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Load an order by id.
    async fn get(&self, id: OrderId) -> Result<Option<Order>>;

    /// Persist an order, including line-item and order-level metadata.
    async fn save(&self, order: &Order) -> Result<()>;

    /// All orders, oldest first.
    async fn list(&self) -> Result<Vec<Order>>;
}

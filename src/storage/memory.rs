//! In-memory implementations of the collaborator interfaces.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::interfaces::settings_store::Result;
use crate::interfaces::{OrderRepository, SettingsStore, Storefront};
use crate::order::{Order, OrderId};

/// Settings store backed by a map.
#[derive(Default)]
pub struct MemorySettingsStore {
    values: RwLock<BTreeMap<String, Value>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored key.
    pub async fn dump(&self) -> BTreeMap<String, Value> {
        self.values.read().await.clone()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Order repository backed by a map.
#[derive(Default)]
pub struct MemoryOrderRepository {
    orders: RwLock<BTreeMap<OrderId, Order>>,
    saves: RwLock<u32>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id, order);
    }

    /// Number of `save` calls observed.
    pub async fn save_count(&self) -> u32 {
        *self.saves.read().await
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn get(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn save(&self, order: &Order) -> Result<()> {
        self.orders.write().await.insert(order.id, order.clone());
        *self.saves.write().await += 1;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.orders.read().await.values().cloned().collect())
    }
}

/// Storefront with a fixed product→category table and mutable coupons.
#[derive(Default)]
pub struct MemoryStorefront {
    categories: RwLock<HashMap<u64, Vec<String>>>,
    coupons: RwLock<BTreeMap<String, u8>>,
}

impl MemoryStorefront {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_product<I, S>(&self, product_id: u64, categories: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories
            .write()
            .await
            .insert(product_id, categories.into_iter().map(Into::into).collect());
    }

    pub async fn add_coupon(&self, code: &str, percentage: u8) {
        self.coupons
            .write()
            .await
            .insert(code.to_lowercase(), percentage);
    }

    pub async fn coupon_percentage(&self, code: &str) -> Option<u8> {
        self.coupons.read().await.get(&code.to_lowercase()).copied()
    }
}

#[async_trait]
impl Storefront for MemoryStorefront {
    async fn product_categories(&self, product_id: u64) -> Result<Vec<String>> {
        Ok(self
            .categories
            .read()
            .await
            .get(&product_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_coupon_percentage(&self, code: &str, percentage: u8) -> Result<bool> {
        let mut coupons = self.coupons.write().await;
        match coupons.get_mut(&code.to_lowercase()) {
            Some(amount) => {
                *amount = percentage;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

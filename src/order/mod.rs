//! Purchase records as seen by this crate.
//!
//! Orders and cart lines belong to the host storefront. The types here carry
//! only what annotation and sync need, plus free-form metadata maps that the
//! host persists verbatim.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Order identifier assigned by the storefront.
pub type OrderId = u64;

/// Arbitrary key/value metadata on an order or line item.
pub type Meta = BTreeMap<String, Value>;

/// Metadata keys written by the annotator and dispatcher.
pub mod meta_keys {
    /// Item-level course snapshot.
    pub const ITEM_ANNOTATION: &str = "_edition_annotation";
    /// Prefix for order-level snapshots, followed by the course slug.
    pub const COURSE_PREFIX: &str = "_course_edition:";
    /// Order has annotation data the CRM has not seen yet.
    pub const NEEDS_SYNC: &str = "_edition_needs_sync";
    /// Order's annotation data has been pushed to the CRM.
    pub const SYNCED: &str = "_edition_crm_synced";
    /// RFC 3339 timestamp of the last successful push.
    pub const SYNCED_AT: &str = "_edition_crm_synced_at";
    /// Coupon flag has been pushed to the CRM.
    pub const COUPON_SYNCED: &str = "_coupon_crm_synced";
    /// RFC 3339 timestamp of the coupon push.
    pub const COUPON_SYNCED_AT: &str = "_coupon_crm_synced_at";
    /// Validated membership number entered at checkout.
    pub const MEMBERSHIP_NUMBER: &str = "_membership_number";
}

/// Storefront order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Processing,
    OnHold,
    Completed,
    Cancelled,
    Refunded,
    Failed,
}

impl OrderStatus {
    /// Statuses at which a paid order should reach the CRM.
    pub fn triggers_sync(self) -> bool {
        matches!(self, Self::Processing | Self::Completed)
    }
}

/// Billing contact on an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Billing {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// A product line on a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: u64,
    pub name: String,
    pub quantity: u32,
    #[serde(default)]
    pub meta: Meta,
}

impl LineItem {
    pub fn new(product_id: u64, name: impl Into<String>) -> Self {
        Self {
            product_id,
            name: name.into(),
            quantity: 1,
            meta: Meta::new(),
        }
    }
}

/// A product line in a cart, before an order exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: u64,
    pub quantity: u32,
    #[serde(default)]
    pub meta: Meta,
}

impl CartLine {
    pub fn new(product_id: u64) -> Self {
        Self {
            product_id,
            quantity: 1,
            meta: Meta::new(),
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub billing: Billing,
    /// Coupon codes as the customer entered them.
    #[serde(default)]
    pub coupon_codes: Vec<String>,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub meta: Meta,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(id: OrderId, billing: Billing) -> Self {
        Self {
            id,
            status: OrderStatus::Pending,
            billing,
            coupon_codes: Vec::new(),
            items: Vec::new(),
            meta: Meta::new(),
            created_at: None,
        }
    }

    pub fn with_item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_codes.push(code.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Read a boolean metadata flag. Accepts JSON booleans and "yes".
    pub fn flag(&self, key: &str) -> bool {
        match self.meta.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "yes",
            _ => false,
        }
    }

    pub fn set_flag(&mut self, key: &str, value: bool) {
        self.meta.insert(key.to_string(), Value::Bool(value));
    }

    /// Whether any applied coupon equals `code`, ignoring ASCII case.
    pub fn uses_coupon(&self, code: &str) -> bool {
        let code = code.trim();
        !code.is_empty()
            && self
                .coupon_codes
                .iter()
                .any(|applied| applied.trim().eq_ignore_ascii_case(code))
    }
}

//! CRM sync dispatcher.
//!
//! Pushes annotated orders to the CRM at least once. Triggers may fire
//! repeatedly for the same order; the `synced` flag on the order is the
//! only deduplication.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::activity::ActivityLog;
use crate::annotate::{order_snapshots, CourseSnapshot};
use crate::interfaces::settings_store::Result;
use crate::interfaces::{Clock, ContactDraft, ContactId, CrmClient, CrmError, OrderRepository};
use crate::order::{meta_keys, Order, OrderId, OrderStatus};

pub mod coupon;

pub use coupon::{CouponMatch, CouponPushReport};

/// Subscription status given to contacts the dispatcher creates.
pub const NEW_CONTACT_STATUS: &str = "subscribed";

/// Why a dispatch made no CRM calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    OrderNotFound,
    AlreadySynced,
    NothingToSync,
    IntegrationUnavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OrderNotFound => "order not found",
            Self::AlreadySynced => "already synced",
            Self::NothingToSync => "no course annotations",
            Self::IntegrationUnavailable => "CRM integration unavailable",
        })
    }
}

/// Result of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every course was pushed; slugs in push order.
    Synced { courses: Vec<String> },
    Skipped(SkipReason),
    /// Nothing was marked; a later trigger retries every course.
    Failed(String),
}

/// Host events that may start a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    StatusChanged(OrderStatus),
    PaymentComplete,
    ThankYou,
}

impl SyncTrigger {
    fn fires(self) -> bool {
        match self {
            Self::StatusChanged(status) => status.triggers_sync(),
            Self::PaymentComplete | Self::ThankYou => true,
        }
    }
}

/// Idempotent order → CRM dispatcher.
#[derive(Clone)]
pub struct Dispatcher {
    orders: Arc<dyn OrderRepository>,
    crm: Arc<dyn CrmClient>,
    activity: ActivityLog,
    clock: Arc<dyn Clock>,
    contact_source: String,
}

impl Dispatcher {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        crm: Arc<dyn CrmClient>,
        activity: ActivityLog,
        clock: Arc<dyn Clock>,
        contact_source: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            crm,
            activity,
            clock,
            contact_source: contact_source.into(),
        }
    }

    /// Route a host event. Returns `None` when the event does not trigger sync.
    pub async fn handle_trigger(
        &self,
        order_id: OrderId,
        trigger: SyncTrigger,
    ) -> Option<DispatchOutcome> {
        if !trigger.fires() {
            debug!(order = order_id, ?trigger, "Trigger ignored");
            return None;
        }
        debug!(order = order_id, ?trigger, "Sync triggered");
        Some(self.dispatch(order_id).await)
    }

    /// Push one order's course snapshots to the CRM.
    pub async fn dispatch(&self, order_id: OrderId) -> DispatchOutcome {
        let mut order = match self.orders.get(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(order = order_id, "Sync skipped: order not found");
                return DispatchOutcome::Skipped(SkipReason::OrderNotFound);
            }
            Err(e) => return self.fail(order_id, e.to_string()).await,
        };

        if order.flag(meta_keys::SYNCED) {
            debug!(order = order_id, "Sync skipped: already synced");
            return DispatchOutcome::Skipped(SkipReason::AlreadySynced);
        }

        let snapshots = order_snapshots(&order);
        if snapshots.is_empty() {
            debug!(order = order_id, "Sync skipped: no course annotations");
            return DispatchOutcome::Skipped(SkipReason::NothingToSync);
        }

        if !self.crm.is_available() {
            info!(order = order_id, "Sync skipped: CRM integration unavailable");
            return DispatchOutcome::Skipped(SkipReason::IntegrationUnavailable);
        }

        if let Err(e) = self.push(&order, &snapshots).await {
            return self.fail(order_id, e.to_string()).await;
        }

        mark_synced(&mut order, meta_keys::SYNCED, meta_keys::SYNCED_AT, self.clock.as_ref());
        order.set_flag(meta_keys::NEEDS_SYNC, false);
        if let Err(e) = self.orders.save(&order).await {
            // CRM already holds the data; a retry repeats idempotent calls.
            return self.fail(order_id, format!("saving sync state: {}", e)).await;
        }

        let courses: Vec<String> = snapshots.into_iter().map(|s| s.course_slug).collect();
        info!(order = order_id, courses = ?courses, "Order synced to CRM");
        self.activity
            .success(format!(
                "Order #{} synced to CRM ({})",
                order_id,
                courses.join(", ")
            ))
            .await;
        DispatchOutcome::Synced { courses }
    }

    /// Admin retry: clear the synced flag so the next trigger pushes again.
    ///
    /// Returns `false` for an unknown order.
    pub async fn reset_sync(&self, order_id: OrderId) -> Result<bool> {
        let Some(mut order) = self.orders.get(order_id).await? else {
            return Ok(false);
        };
        order.meta.remove(meta_keys::SYNCED);
        order.meta.remove(meta_keys::SYNCED_AT);
        let has_snapshots = !order_snapshots(&order).is_empty();
        order.set_flag(meta_keys::NEEDS_SYNC, has_snapshots);
        self.orders.save(&order).await?;

        info!(order = order_id, "Sync state reset");
        self.activity
            .info(format!("Order #{} sync state reset", order_id))
            .await;
        Ok(true)
    }

    /// Dispatch every order that needs sync and is not yet synced.
    pub async fn sync_pending(&self) -> Result<Vec<(OrderId, DispatchOutcome)>> {
        let pending: Vec<OrderId> = self
            .orders
            .list()
            .await?
            .into_iter()
            .filter(|o| o.flag(meta_keys::NEEDS_SYNC) && !o.flag(meta_keys::SYNCED))
            .map(|o| o.id)
            .collect();

        info!(pending = pending.len(), "Syncing pending orders");
        let mut outcomes = Vec::with_capacity(pending.len());
        for order_id in pending {
            outcomes.push((order_id, self.dispatch(order_id).await));
        }
        Ok(outcomes)
    }

    async fn push(&self, order: &Order, snapshots: &[CourseSnapshot]) -> std::result::Result<(), CrmError> {
        let contact = self.resolve_contact(order).await?;

        for snapshot in snapshots {
            let tag = self.crm.ensure_tag(&snapshot.crm_tag).await?;
            self.crm.attach_tag(contact, tag).await?;
            self.crm
                .upsert_field(contact, &snapshot.crm_field, &snapshot.edition_name)
                .await?;
            debug!(
                order = order.id,
                contact = %contact,
                course = %snapshot.course_slug,
                tag = %snapshot.crm_tag,
                field = %snapshot.crm_field,
                "Course pushed"
            );
        }
        Ok(())
    }

    async fn resolve_contact(&self, order: &Order) -> std::result::Result<ContactId, CrmError> {
        let draft = ContactDraft {
            email: order.billing.email.clone(),
            first_name: order.billing.first_name.clone(),
            last_name: order.billing.last_name.clone(),
            status: NEW_CONTACT_STATUS.to_string(),
            source: self.contact_source.clone(),
        };
        self.crm.find_or_create_contact(&draft).await
    }

    async fn fail(&self, order_id: OrderId, reason: String) -> DispatchOutcome {
        error!(order = order_id, error = %reason, "CRM sync failed");
        self.activity
            .error(format!("Order #{} CRM sync failed: {}", order_id, reason))
            .await;
        DispatchOutcome::Failed(reason)
    }
}

fn mark_synced(order: &mut Order, flag: &str, at: &str, clock: &dyn Clock) {
    order.set_flag(flag, true);
    order
        .meta
        .insert(at.to_string(), Value::String(clock.now().to_rfc3339()));
}

//! Coupon usage bulk push.
//!
//! Scans orders for a coupon code and sets a yes-valued CRM field on each
//! buyer. Progress is tracked per order with its own flag, separate from
//! course sync.

use tracing::{debug, error, info, warn};

use super::{mark_synced, Dispatcher};
use crate::interfaces::settings_store::Result;
use crate::order::{meta_keys, OrderId};

/// Value written to the coupon field.
pub const COUPON_FIELD_VALUE: &str = "yes";

/// An order that used the coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponMatch {
    pub order_id: OrderId,
    pub email: String,
    pub synced: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CouponPushReport {
    pub pushed: Vec<OrderId>,
    /// Already pushed in an earlier run.
    pub skipped: Vec<OrderId>,
    pub failed: Vec<(OrderId, String)>,
}

impl Dispatcher {
    /// Orders whose applied coupons include `code`, ignoring case.
    pub async fn scan_coupon(&self, code: &str) -> Result<Vec<CouponMatch>> {
        let matches: Vec<CouponMatch> = self
            .orders
            .list()
            .await?
            .into_iter()
            .filter(|order| order.uses_coupon(code))
            .map(|order| CouponMatch {
                order_id: order.id,
                synced: order.flag(meta_keys::COUPON_SYNCED),
                email: order.billing.email,
            })
            .collect();

        info!(coupon = %code, matches = matches.len(), "Coupon scan finished");
        Ok(matches)
    }

    /// Set `field_slug = "yes"` on the buyer of every matching order not
    /// yet pushed.
    ///
    /// A failure on one order is recorded and the rest continue.
    pub async fn push_coupon(&self, code: &str, field_slug: &str) -> Result<CouponPushReport> {
        let mut report = CouponPushReport::default();
        if code.trim().is_empty() || field_slug.trim().is_empty() {
            warn!("Coupon push needs a coupon code and a field slug");
            return Ok(report);
        }
        if !self.crm.is_available() {
            info!(coupon = %code, "Coupon push skipped: CRM integration unavailable");
            return Ok(report);
        }

        for matched in self.scan_coupon(code).await? {
            if matched.synced {
                report.skipped.push(matched.order_id);
                continue;
            }
            match self.push_coupon_order(matched.order_id, field_slug).await {
                Ok(()) => report.pushed.push(matched.order_id),
                Err(reason) => {
                    error!(order = matched.order_id, error = %reason, "Coupon push failed");
                    report.failed.push((matched.order_id, reason));
                }
            }
        }

        info!(
            coupon = %code,
            pushed = report.pushed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Coupon push finished"
        );
        let summary = format!(
            "Coupon '{}' pushed to CRM: {} pushed, {} already synced, {} failed",
            code,
            report.pushed.len(),
            report.skipped.len(),
            report.failed.len()
        );
        if report.failed.is_empty() {
            self.activity.success(summary).await;
        } else {
            self.activity.error(summary).await;
        }
        Ok(report)
    }

    async fn push_coupon_order(
        &self,
        order_id: OrderId,
        field_slug: &str,
    ) -> std::result::Result<(), String> {
        let Some(mut order) = self.orders.get(order_id).await.map_err(|e| e.to_string())? else {
            return Err("order disappeared".to_string());
        };

        let contact = self
            .resolve_contact(&order)
            .await
            .map_err(|e| e.to_string())?;
        self.crm
            .upsert_field(contact, field_slug, COUPON_FIELD_VALUE)
            .await
            .map_err(|e| e.to_string())?;

        mark_synced(
            &mut order,
            meta_keys::COUPON_SYNCED,
            meta_keys::COUPON_SYNCED_AT,
            self.clock.as_ref(),
        );
        self.orders.save(&order).await.map_err(|e| e.to_string())?;
        debug!(order = order_id, contact = %contact, field = %field_slug, "Coupon field pushed");
        Ok(())
    }
}

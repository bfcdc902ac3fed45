//! Purchase annotation.
//!
//! Snapshots a course's edition identity onto cart lines and orders. The
//! snapshot is a point-in-time copy: later edition changes do not touch it
//! unless an admin explicitly refreshes the order.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::edition::EditionStore;
use crate::interfaces::settings_store::Result;
use crate::interfaces::{OrderRepository, SettingsStore, Storefront};
use crate::lifecycle::edition_name;
use crate::order::{meta_keys, CartLine, Meta, Order, OrderId};
use crate::registry::{CourseRegistry, RegistryCache};

/// Course and edition identity captured on a purchase record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSnapshot {
    pub course_slug: String,
    /// Category that matched, which may be a child of the course.
    pub category_slug: String,
    pub is_child_category: bool,
    /// `None` when the course does not manage editions.
    pub edition_number: Option<u32>,
    /// "12th FRCS", or the bare course name without edition management.
    pub edition_name: String,
    pub edition_start: Option<NaiveDate>,
    pub edition_end: Option<NaiveDate>,
    pub crm_tag: String,
    pub crm_field: String,
}

/// Order-level snapshots, in course slug order. Malformed entries are skipped.
pub fn order_snapshots(order: &Order) -> Vec<CourseSnapshot> {
    order
        .meta
        .iter()
        .filter(|(key, _)| key.starts_with(meta_keys::COURSE_PREFIX))
        .filter_map(|(key, value)| {
            match serde_json::from_value::<CourseSnapshot>(value.clone()) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(order = order.id, key = %key, error = %e, "Ignoring malformed course snapshot");
                    None
                }
            }
        })
        .collect()
}

/// Remove every annotation this crate wrote, item and order level.
fn strip_annotations(order: &mut Order) {
    order
        .meta
        .retain(|key, _| !key.starts_with(meta_keys::COURSE_PREFIX));
    for item in &mut order.items {
        item.meta.remove(meta_keys::ITEM_ANNOTATION);
    }
}

fn reset_sync_state(order: &mut Order, needs_sync: bool) {
    order.set_flag(meta_keys::NEEDS_SYNC, needs_sync);
    order.meta.remove(meta_keys::SYNCED);
    order.meta.remove(meta_keys::SYNCED_AT);
}

/// Writes course snapshots from live registry and edition settings.
#[derive(Clone)]
pub struct Annotator {
    settings: Arc<dyn SettingsStore>,
    editions: EditionStore,
    registry: Arc<RegistryCache>,
    storefront: Arc<dyn Storefront>,
    orders: Arc<dyn OrderRepository>,
}

impl Annotator {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        registry: Arc<RegistryCache>,
        storefront: Arc<dyn Storefront>,
        orders: Arc<dyn OrderRepository>,
    ) -> Self {
        Self {
            editions: EditionStore::new(Arc::clone(&settings)),
            settings,
            registry,
            storefront,
            orders,
        }
    }

    /// Snapshot for the first category that resolves to a course.
    pub async fn snapshot_for(&self, categories: &[String]) -> Result<Option<CourseSnapshot>> {
        let registry = self.registry.load(self.settings.as_ref()).await?;
        self.snapshot_with(&registry, categories).await
    }

    /// Provisional snapshot on a cart line.
    ///
    /// Lines whose categories match no course are left alone.
    pub async fn annotate_cart_line(
        &self,
        line: &mut CartLine,
        categories: &[String],
    ) -> Result<Option<CourseSnapshot>> {
        let Some(snapshot) = self.snapshot_for(categories).await? else {
            return Ok(None);
        };
        line.meta.insert(
            meta_keys::ITEM_ANNOTATION.to_string(),
            serde_json::to_value(&snapshot)?,
        );
        debug!(product = line.product_id, course = %snapshot.course_slug, "Cart line annotated");
        Ok(Some(snapshot))
    }

    /// Authoritative snapshots on an order, in memory.
    ///
    /// Each item maps to at most one course. Previous annotations are
    /// replaced and the sync state is reset. An order without course items
    /// is not modified and yields an empty list.
    pub async fn annotate_order(&self, order: &mut Order) -> Result<Vec<CourseSnapshot>> {
        let registry = self.registry.load(self.settings.as_ref()).await?;

        let mut per_item = Vec::with_capacity(order.items.len());
        for item in &order.items {
            let categories = self.storefront.product_categories(item.product_id).await?;
            per_item.push(self.snapshot_with(&registry, &categories).await?);
        }

        if per_item.iter().all(Option::is_none) {
            debug!(order = order.id, "No course items, order not annotated");
            return Ok(Vec::new());
        }

        strip_annotations(order);

        let mut by_course: BTreeMap<String, CourseSnapshot> = BTreeMap::new();
        for (item, snapshot) in order.items.iter_mut().zip(per_item) {
            let Some(snapshot) = snapshot else { continue };
            item.meta.insert(
                meta_keys::ITEM_ANNOTATION.to_string(),
                serde_json::to_value(&snapshot)?,
            );
            by_course
                .entry(snapshot.course_slug.clone())
                .or_insert(snapshot);
        }

        for (slug, snapshot) in &by_course {
            order.meta.insert(
                format!("{}{}", meta_keys::COURSE_PREFIX, slug),
                serde_json::to_value(snapshot)?,
            );
        }
        reset_sync_state(order, true);

        info!(
            order = order.id,
            courses = ?by_course.keys().collect::<Vec<_>>(),
            "Order annotated"
        );
        Ok(by_course.into_values().collect())
    }

    /// Admin "update edition data": recompute from live settings and save.
    ///
    /// Prior snapshots are always removed and the order must sync again.
    /// Returns `None` for an unknown order.
    pub async fn refresh_order(&self, order_id: OrderId) -> Result<Option<Vec<CourseSnapshot>>> {
        let Some(mut order) = self.orders.get(order_id).await? else {
            warn!(order = order_id, "Refresh requested for unknown order");
            return Ok(None);
        };

        strip_annotations(&mut order);
        let snapshots = self.annotate_order(&mut order).await?;
        if snapshots.is_empty() {
            reset_sync_state(&mut order, false);
        }

        self.orders.save(&order).await?;
        info!(order = order_id, courses = snapshots.len(), "Edition data refreshed");
        Ok(Some(snapshots))
    }

    async fn snapshot_with(
        &self,
        registry: &CourseRegistry,
        categories: &[String],
    ) -> Result<Option<CourseSnapshot>> {
        let Some((course, category)) = registry.resolve_first(categories.iter().map(String::as_str))
        else {
            return Ok(None);
        };

        let (edition_number, name, start, end) = if course.edition_management {
            let state = self.editions.load(course).await?;
            let current = state.current;
            (
                Some(current.number),
                edition_name(course, current.number),
                current.start,
                current.end,
            )
        } else {
            (None, course.name.clone(), None, None)
        };

        Ok(Some(CourseSnapshot {
            course_slug: course.slug.clone(),
            category_slug: category.to_string(),
            is_child_category: registry.is_child_category(category),
            edition_number,
            edition_name: name,
            edition_start: start,
            edition_end: end,
            crm_tag: course.crm_tag.clone(),
            crm_field: course.crm_field.clone(),
        }))
    }
}

/// Item-level snapshot, if the line was annotated.
pub fn item_snapshot(meta: &Meta) -> Option<CourseSnapshot> {
    meta.get(meta_keys::ITEM_ANNOTATION)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}

#[cfg(test)]
mod tests;

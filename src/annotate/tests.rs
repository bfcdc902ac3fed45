use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use super::*;
use crate::edition::{EditionSlot, EditionState};
use crate::order::{Billing, LineItem};
use crate::registry::Course;
use crate::storage::{MemoryOrderRepository, MemorySettingsStore, MemoryStorefront};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

struct Fixture {
    settings: Arc<MemorySettingsStore>,
    orders: Arc<MemoryOrderRepository>,
    annotator: Annotator,
}

async fn fixture() -> Fixture {
    let settings = Arc::new(MemorySettingsStore::new());
    let storefront = Arc::new(MemoryStorefront::new());
    let orders = Arc::new(MemoryOrderRepository::new());

    storefront.add_product(10, ["uncategorized", "frcs-vivas"]).await;
    storefront.add_product(11, ["frcs"]).await;
    storefront.add_product(20, ["mrcs", "frcs"]).await;
    storefront.add_product(30, ["workshops"]).await;
    storefront.add_product(99, ["hoodies"]).await;

    let registry = Arc::new(RegistryCache::with_courses([
        Course::new("frcs", "FRCS")
            .with_crm("FRCS Course", "frcs_edition")
            .with_children(["frcs-vivas"]),
        Course::new("mrcs", "MRCS"),
        Course::new("workshops", "Workshops").with_edition_management(false),
    ]));

    let editions = EditionStore::new(settings.clone());
    editions
        .save(
            &Course::new("frcs", "FRCS"),
            &EditionState::new(
                EditionSlot::new(12).with_dates(Some(date("2025-01-01")), Some(date("2025-01-31"))),
            ),
        )
        .await
        .unwrap();

    let annotator = Annotator::new(settings.clone(), registry, storefront, orders.clone());
    Fixture {
        settings,
        orders,
        annotator,
    }
}

fn billing() -> Billing {
    Billing {
        email: "jane@example.com".into(),
        first_name: "Jane".into(),
        last_name: "Doe".into(),
    }
}

#[tokio::test]
async fn test_cart_line_child_category() {
    let f = fixture().await;
    let mut line = CartLine::new(10);
    let categories = vec!["uncategorized".to_string(), "frcs-vivas".to_string()];

    let snapshot = f
        .annotator
        .annotate_cart_line(&mut line, &categories)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(snapshot.course_slug, "frcs");
    assert_eq!(snapshot.category_slug, "frcs-vivas");
    assert!(snapshot.is_child_category);
    assert_eq!(snapshot.edition_number, Some(12));
    assert_eq!(snapshot.edition_name, "12th FRCS");
    assert_eq!(snapshot.edition_start, Some(date("2025-01-01")));
    assert_eq!(snapshot.crm_tag, "FRCS Course");
    assert_eq!(item_snapshot(&line.meta), Some(snapshot));
}

#[tokio::test]
async fn test_cart_line_without_course_untouched() {
    let f = fixture().await;
    let mut line = CartLine::new(99);
    let result = f
        .annotator
        .annotate_cart_line(&mut line, &["hoodies".to_string()])
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(line.meta.is_empty());
}

#[tokio::test]
async fn test_order_with_two_courses() {
    let f = fixture().await;
    let mut order = Order::new(1, billing())
        .with_item(LineItem::new(10, "FRCS viva course"))
        .with_item(LineItem::new(20, "MRCS bundle"))
        .with_item(LineItem::new(99, "Hoodie"));

    let snapshots = f.annotator.annotate_order(&mut order).await.unwrap();
    let slugs: Vec<_> = snapshots.iter().map(|s| s.course_slug.as_str()).collect();
    assert_eq!(slugs, vec!["frcs", "mrcs"]);

    // Product 20 lists mrcs first, so frcs is ignored for that item.
    assert_eq!(
        item_snapshot(&order.items[1].meta).unwrap().course_slug,
        "mrcs"
    );
    assert!(item_snapshot(&order.items[2].meta).is_none());

    assert!(order.meta.contains_key("_course_edition:frcs"));
    assert!(order.meta.contains_key("_course_edition:mrcs"));
    assert!(order.flag(meta_keys::NEEDS_SYNC));
    assert_eq!(order_snapshots(&order), snapshots);

    let mrcs = &snapshots[1];
    assert_eq!(mrcs.edition_number, Some(1));
    assert_eq!(mrcs.edition_name, "1st MRCS");
    assert_eq!(mrcs.edition_start, None);
}

#[tokio::test]
async fn test_unmanaged_course_has_no_edition_number() {
    let f = fixture().await;
    let mut order = Order::new(2, billing()).with_item(LineItem::new(30, "Workshop"));

    let snapshots = f.annotator.annotate_order(&mut order).await.unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].edition_number, None);
    assert_eq!(snapshots[0].edition_name, "Workshops");
}

#[tokio::test]
async fn test_order_without_course_items_untouched() {
    let f = fixture().await;
    let mut order = Order::new(3, billing()).with_item(LineItem::new(99, "Hoodie"));
    order.set_flag(meta_keys::SYNCED, true);
    let before = order.clone();

    let snapshots = f.annotator.annotate_order(&mut order).await.unwrap();
    assert!(snapshots.is_empty());
    assert_eq!(order, before);
}

#[tokio::test]
async fn test_annotation_clears_synced_flag() {
    let f = fixture().await;
    let mut order = Order::new(4, billing()).with_item(LineItem::new(11, "FRCS"));
    order.set_flag(meta_keys::SYNCED, true);
    order.meta.insert(
        meta_keys::SYNCED_AT.to_string(),
        json!("2025-01-02T00:00:00Z"),
    );

    f.annotator.annotate_order(&mut order).await.unwrap();
    assert!(!order.flag(meta_keys::SYNCED));
    assert!(!order.meta.contains_key(meta_keys::SYNCED_AT));
    assert!(order.flag(meta_keys::NEEDS_SYNC));
}

#[tokio::test]
async fn test_refresh_is_idempotent_with_unchanged_settings() {
    let f = fixture().await;
    let mut order = Order::new(5, billing())
        .with_item(LineItem::new(10, "FRCS"))
        .with_item(LineItem::new(20, "MRCS"));
    f.annotator.annotate_order(&mut order).await.unwrap();
    f.orders.insert(order.clone()).await;

    let first = f.annotator.refresh_order(5).await.unwrap().unwrap();
    let after_first = f.orders.get(5).await.unwrap().unwrap();

    // Simulate a sync in between.
    let mut synced = after_first.clone();
    synced.set_flag(meta_keys::SYNCED, true);
    synced.set_flag(meta_keys::NEEDS_SYNC, false);
    f.orders.save(&synced).await.unwrap();

    let second = f.annotator.refresh_order(5).await.unwrap().unwrap();
    let after_second = f.orders.get(5).await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(after_first, after_second);
    assert_eq!(
        serde_json::to_string(&after_first.meta).unwrap(),
        serde_json::to_string(&after_second.meta).unwrap()
    );
}

#[tokio::test]
async fn test_refresh_picks_up_live_settings() {
    let f = fixture().await;
    let mut order = Order::new(6, billing()).with_item(LineItem::new(11, "FRCS"));
    f.annotator.annotate_order(&mut order).await.unwrap();
    f.orders.insert(order).await;

    f.settings
        .set("frcs_current_edition", json!(13))
        .await
        .unwrap();

    let snapshots = f.annotator.refresh_order(6).await.unwrap().unwrap();
    assert_eq!(snapshots[0].edition_name, "13th FRCS");
}

#[tokio::test]
async fn test_refresh_unknown_order() {
    let f = fixture().await;
    assert!(f.annotator.refresh_order(404).await.unwrap().is_none());
}

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use super::*;
use crate::interfaces::SettingsStore;
use crate::registry::Course;
use crate::storage::MemorySettingsStore;
use crate::validation::ValidationError;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn setup() -> (Arc<MemorySettingsStore>, EditionStore, Course) {
    let settings = Arc::new(MemorySettingsStore::new());
    let store = EditionStore::new(settings.clone());
    (settings, store, Course::new("frcs", "FRCS"))
}

#[tokio::test]
async fn test_fresh_course_defaults_to_edition_one() {
    let (_, store, course) = setup();
    let state = store.load(&course).await.unwrap();
    assert_eq!(state, EditionState::default());
    assert_eq!(state.current.number, 1);
    assert!(!state.current.has_dates());
    assert!(state.next.is_none());
}

#[tokio::test]
async fn test_reads_host_written_keys() {
    let (settings, store, course) = setup();
    settings.set("frcs_current_edition", json!("12")).await.unwrap();
    settings.set("frcs_edition_start", json!("2025-01-01")).await.unwrap();
    settings.set("frcs_edition_end", json!("2025-01-31")).await.unwrap();
    settings.set("frcs_early_bird_enabled", json!("yes")).await.unwrap();
    settings.set("frcs_early_bird_end", json!("2025-01-10")).await.unwrap();
    settings.set("frcs_next_enabled", json!("no")).await.unwrap();
    settings.set("frcs_next_edition", json!(13)).await.unwrap();

    let state = store.load(&course).await.unwrap();
    assert_eq!(state.current.number, 12);
    assert_eq!(state.current.start, Some(date("2025-01-01")));
    assert_eq!(state.current.end, Some(date("2025-01-31")));
    assert_eq!(
        state.current.early_bird,
        EarlyBird::window(None, Some(date("2025-01-10")))
    );
    assert!(state.next.is_none(), "disabled next slot is not loaded");
}

#[tokio::test]
async fn test_malformed_values_degrade() {
    let (settings, store, course) = setup();
    settings.set("frcs_current_edition", json!(-4)).await.unwrap();
    settings.set("frcs_edition_start", json!("01/01/2025")).await.unwrap();
    settings.set("frcs_edition_end", json!("2025-01-31")).await.unwrap();

    let state = store.load(&course).await.unwrap();
    assert_eq!(state.current.number, 1);
    assert_eq!(state.current.start, None);
    assert_eq!(state.current.end, Some(date("2025-01-31")));
}

#[tokio::test]
async fn test_non_numeric_edition_number_reads_as_default() {
    let (settings, store, course) = setup();
    settings.set("frcs_current_edition", json!("abc")).await.unwrap();
    settings.set("frcs_next_enabled", json!("yes")).await.unwrap();
    settings.set("frcs_next_edition", json!("thirteen")).await.unwrap();

    let state = store.load(&course).await.unwrap();
    assert_eq!(state.current.number, 1);
    assert_eq!(state.next.map(|next| next.number), Some(0));
}

#[tokio::test]
async fn test_save_and_load_with_next_slot() {
    let (settings, store, course) = setup();
    let state = EditionState::new(
        EditionSlot::new(7).with_dates(Some(date("2025-03-01")), Some(date("2025-03-31"))),
    )
    .with_next(
        EditionSlot::new(8)
            .with_dates(Some(date("2025-06-01")), Some(date("2025-06-30")))
            .with_early_bird(EarlyBird::window(
                Some(date("2025-05-01")),
                Some(date("2025-05-15")),
            )),
    );

    store.save(&course, &state).await.unwrap();
    assert_eq!(store.load(&course).await.unwrap(), state);

    assert_eq!(
        settings.get("frcs_next_enabled").await.unwrap(),
        Some(json!("yes"))
    );
    assert_eq!(
        settings.get("frcs_next_early_bird_start").await.unwrap(),
        Some(json!("2025-05-01"))
    );
}

#[tokio::test]
async fn test_save_without_next_blanks_next_keys() {
    let (settings, store, course) = setup();
    store
        .save(
            &course,
            &EditionState::default().with_next(
                EditionSlot::new(2).with_dates(Some(date("2025-06-01")), Some(date("2025-06-30"))),
            ),
        )
        .await
        .unwrap();

    store.save(&course, &EditionState::default()).await.unwrap();

    let dump = settings.dump().await;
    assert_eq!(dump["frcs_next_enabled"], json!("no"));
    assert_eq!(dump["frcs_next_edition"], json!(""));
    assert_eq!(dump["frcs_next_start"], json!(""));
    assert_eq!(dump["frcs_next_end"], json!(""));
    assert_eq!(dump["frcs_next_early_bird_enabled"], json!("no"));
    assert!(store.load(&course).await.unwrap().next.is_none());
}

#[tokio::test]
async fn test_update_current_rejects_inverted_range_without_writing() {
    let (settings, store, course) = setup();
    let slot = EditionSlot::new(5).with_dates(Some(date("2025-02-01")), Some(date("2025-01-01")));

    let result = store.update_current(&course, &slot).await;
    assert!(matches!(
        result,
        Err(EditionError::Validation(ValidationError::InvertedRange { .. }))
    ));
    assert!(settings.dump().await.is_empty());
}

#[tokio::test]
async fn test_update_current_returns_soft_warnings() {
    let (_, store, course) = setup();
    let slot = EditionSlot::new(5)
        .with_dates(Some(date("2025-01-01")), Some(date("2025-01-31")))
        .with_early_bird(EarlyBird::window(None, Some(date("2025-02-05"))));

    let warnings = store.update_current(&course, &slot).await.unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(store.load(&course).await.unwrap().current, slot);
}

#[tokio::test]
async fn test_update_and_disable_next() {
    let (_, store, course) = setup();
    let next = EditionSlot::new(2).with_dates(Some(date("2025-06-01")), Some(date("2025-06-30")));

    store.update_next(&course, &next).await.unwrap();
    assert_eq!(store.load(&course).await.unwrap().next, Some(next));

    store.disable_next(&course).await.unwrap();
    assert_eq!(store.load(&course).await.unwrap().next, None);
}

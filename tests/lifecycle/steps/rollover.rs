//! Rollover step definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use cucumber::{given, then, when, World};

use edition_sync::activity::ActivityLog;
use edition_sync::edition::{EditionSlot, EditionState, EditionStore};
use edition_sync::interfaces::{FixedClock, SettingsStore};
use edition_sync::lifecycle::{RolloverJob, RolloverReport};
use edition_sync::mail::RecordingMailer;
use edition_sync::registry::{Course, RegistryCache};
use edition_sync::storage::MemorySettingsStore;
use serde_json::json;

use super::date;

#[derive(World)]
#[world(init = Self::new)]
pub struct RolloverWorld {
    settings: Arc<MemorySettingsStore>,
    editions: EditionStore,
    mailer: Arc<RecordingMailer>,
    courses: BTreeMap<String, Course>,
    report: Option<RolloverReport>,
}

impl fmt::Debug for RolloverWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RolloverWorld")
            .field("courses", &self.courses.keys().collect::<Vec<_>>())
            .field("report", &self.report)
            .finish()
    }
}

impl RolloverWorld {
    fn new() -> Self {
        let settings = Arc::new(MemorySettingsStore::new());
        Self {
            editions: EditionStore::new(settings.clone()),
            settings,
            mailer: Arc::new(RecordingMailer::new()),
            courses: BTreeMap::new(),
            report: None,
        }
    }

    fn course(&self, slug: &str) -> &Course {
        self.courses.get(slug).expect("course not declared")
    }

    async fn state(&self, slug: &str) -> EditionState {
        self.editions
            .load(self.course(slug))
            .await
            .expect("edition state loads")
    }

    async fn add_course(&mut self, slug: &str, name: &str, state: EditionState) {
        let course = Course::new(slug, name);
        self.editions
            .save(&course, &state)
            .await
            .expect("edition state saves");
        self.courses.insert(slug.to_string(), course);
    }
}

#[given(expr = "course {string} named {string} at edition {int} from {string} to {string}")]
async fn given_course_with_dates(
    world: &mut RolloverWorld,
    slug: String,
    name: String,
    number: u32,
    start: String,
    end: String,
) {
    let slot = EditionSlot::new(number).with_dates(Some(date(&start)), Some(date(&end)));
    world.add_course(&slug, &name, EditionState::new(slot)).await;
}

#[given(expr = "course {string} named {string} at edition {int} with no dates")]
async fn given_course_without_dates(
    world: &mut RolloverWorld,
    slug: String,
    name: String,
    number: u32,
) {
    world
        .add_course(&slug, &name, EditionState::new(EditionSlot::new(number)))
        .await;
}

#[given(expr = "course {string} has next edition {int} from {string} to {string}")]
async fn given_next_edition(
    world: &mut RolloverWorld,
    slug: String,
    number: u32,
    start: String,
    end: String,
) {
    let next = EditionSlot::new(number).with_dates(Some(date(&start)), Some(date(&end)));
    let course = world.course(&slug).clone();
    world
        .editions
        .update_next(&course, &next)
        .await
        .expect("next edition is valid");
}

#[given(expr = "notifications go to {string}")]
async fn given_notification_address(world: &mut RolloverWorld, address: String) {
    world
        .settings
        .set("notification_email", json!(address))
        .await
        .expect("setting saves");
}

#[when(expr = "the rollover runs on {string}")]
async fn when_rollover_runs(world: &mut RolloverWorld, today: String) {
    let activity = ActivityLog::new(
        world.settings.clone(),
        Arc::new(FixedClock::new(date(&today))),
    );
    let registry = Arc::new(RegistryCache::with_courses(world.courses.values().cloned()));
    let job = RolloverJob::new(
        world.settings.clone(),
        registry,
        world.mailer.clone(),
        activity,
    );
    world.report = Some(job.run(date(&today)).await.expect("rollover runs"));
}

#[then(expr = "course {string} is at edition {int}")]
async fn then_edition(world: &mut RolloverWorld, slug: String, number: u32) {
    assert_eq!(world.state(&slug).await.current.number, number);
}

#[then(expr = "course {string} has no dates")]
async fn then_no_dates(world: &mut RolloverWorld, slug: String) {
    let current = world.state(&slug).await.current;
    assert_eq!(current.start, None);
    assert_eq!(current.end, None);
    assert!(!current.early_bird.enabled);
}

#[then(expr = "course {string} runs from {string} to {string}")]
async fn then_runs(world: &mut RolloverWorld, slug: String, start: String, end: String) {
    let current = world.state(&slug).await.current;
    assert_eq!(current.start, Some(date(&start)));
    assert_eq!(current.end, Some(date(&end)));
}

#[then(expr = "course {string} has no next edition")]
async fn then_no_next(world: &mut RolloverWorld, slug: String) {
    assert_eq!(world.state(&slug).await.next, None);
}

#[then(expr = "{int} summary email(s) is/are sent")]
async fn then_emails(world: &mut RolloverWorld, count: usize) {
    assert_eq!(world.mailer.sent().await.len(), count);
}

#[then(expr = "the summary mentions {string}")]
async fn then_summary_mentions(world: &mut RolloverWorld, text: String) {
    let sent = world.mailer.sent().await;
    let last = sent.last().expect("a summary was sent");
    assert!(last.body.contains(&text), "summary was:\n{}", last.body);
}

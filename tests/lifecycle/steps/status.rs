//! Registration status step definitions.

use chrono::NaiveDate;
use cucumber::{given, then, when, World};

use edition_sync::edition::{EarlyBird, EditionSlot};
use edition_sync::lifecycle::{registration_status, slot_status, SlotPhase};

use super::date;

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct StatusWorld {
    slot: EditionSlot,
    today: Option<NaiveDate>,
}

impl StatusWorld {
    fn new() -> Self {
        Self {
            slot: EditionSlot::new(1),
            today: None,
        }
    }

    fn today(&self) -> NaiveDate {
        self.today.expect("no date set; use 'When today is ...'")
    }
}

#[given(expr = "an edition from {string} to {string}")]
async fn given_edition(world: &mut StatusWorld, start: String, end: String) {
    world.slot = world
        .slot
        .clone()
        .with_dates(Some(date(&start)), Some(date(&end)));
}

#[given("an edition with no dates")]
async fn given_no_dates(world: &mut StatusWorld) {
    world.slot = world.slot.clone().with_dates(None, None);
}

#[given(expr = "an early-bird window from {string} to {string}")]
async fn given_early_bird(world: &mut StatusWorld, start: String, end: String) {
    world.slot.early_bird = EarlyBird::window(Some(date(&start)), Some(date(&end)));
}

#[given(expr = "an early-bird window ending {string}")]
async fn given_early_bird_open_start(world: &mut StatusWorld, end: String) {
    world.slot.early_bird = EarlyBird::window(None, Some(date(&end)));
}

#[when(expr = "today is {string}")]
async fn when_today(world: &mut StatusWorld, today: String) {
    world.today = Some(date(&today));
}

#[then(expr = "the registration status is {string}")]
async fn then_status(world: &mut StatusWorld, expected: String) {
    let status = registration_status(&world.slot, world.today());
    assert_eq!(status.as_str(), expected);
}

#[then(expr = "the slot phase is {string}")]
async fn then_phase(world: &mut StatusWorld, expected: String) {
    let phase = match slot_status(&world.slot, world.today()).phase {
        SlotPhase::NeedsDates => "needs_dates",
        SlotPhase::Active => "active",
        SlotPhase::EndingSoon => "ending_soon",
        SlotPhase::Expired => "expired",
    };
    assert_eq!(phase, expected);
}

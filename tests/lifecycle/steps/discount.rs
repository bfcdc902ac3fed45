//! Discount tier step definitions.

use chrono::NaiveDate;
use cucumber::{given, then, when, World};

use edition_sync::edition::{EarlyBird, EditionSlot, EditionState};
use edition_sync::lifecycle::{select_discount, DiscountRates, DiscountTier};
use edition_sync::registry::Course;

use super::date;

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct DiscountWorld {
    rates: DiscountRates,
    courses: Vec<(Course, EditionState)>,
    selected: Option<DiscountTier>,
}

impl DiscountWorld {
    fn new() -> Self {
        Self {
            rates: DiscountRates::default(),
            courses: Vec::new(),
            selected: None,
        }
    }

    fn add(&mut self, slug: &str, eligible: bool, start: Option<NaiveDate>, end: NaiveDate) {
        let slot = EditionSlot::new(1)
            .with_dates(Some(date("2025-01-01")), Some(date("2025-03-31")))
            .with_early_bird(EarlyBird::window(start, Some(end)));
        self.courses.push((
            Course::new(slug, slug.to_uppercase()).with_discount(eligible),
            EditionState::new(slot),
        ));
    }
}

#[given(expr = "discount rates of {int} for early bird and {int} otherwise")]
async fn given_rates(world: &mut DiscountWorld, early_bird: i64, normal: i64) {
    world.rates = DiscountRates::new(early_bird, normal);
}

#[given(expr = "discount-eligible course {string} with early bird ending {string}")]
async fn given_eligible(world: &mut DiscountWorld, slug: String, end: String) {
    world.add(&slug, true, None, date(&end));
}

#[given(expr = "discount-eligible course {string} with early bird from {string} to {string}")]
async fn given_eligible_window(world: &mut DiscountWorld, slug: String, start: String, end: String) {
    world.add(&slug, true, Some(date(&start)), date(&end));
}

#[given(expr = "ineligible course {string} with early bird ending {string}")]
async fn given_ineligible(world: &mut DiscountWorld, slug: String, end: String) {
    world.add(&slug, false, None, date(&end));
}

#[when(expr = "the discount is selected on {string}")]
async fn when_selected(world: &mut DiscountWorld, today: String) {
    world.selected = Some(select_discount(
        world.courses.iter().map(|(c, s)| (c, s)),
        date(&today),
        world.rates,
    ));
}

#[then(expr = "the discount is {int} percent")]
async fn then_percent(world: &mut DiscountWorld, percent: u8) {
    assert_eq!(world.selected.expect("no discount selected").percentage(), percent);
}

#[then(expr = "the early-bird rate applies")]
async fn then_early_bird(world: &mut DiscountWorld) {
    assert!(matches!(world.selected, Some(DiscountTier::EarlyBird(_))));
}

#[then(expr = "the normal rate applies")]
async fn then_normal(world: &mut DiscountWorld) {
    assert!(matches!(world.selected, Some(DiscountTier::Normal(_))));
}

//! Lifecycle acceptance tests using Cucumber.
//!
//! ```bash
//! cargo test --test lifecycle
//! ```

mod steps;

use cucumber::World;
use steps::discount::DiscountWorld;
use steps::rollover::RolloverWorld;
use steps::status::StatusWorld;

#[tokio::main]
async fn main() {
    println!("\n=== Running Registration Status Scenarios ===\n");
    StatusWorld::cucumber()
        .fail_on_skipped()
        .run("tests/lifecycle/features/registration_status.feature")
        .await;

    println!("\n=== Running Rollover Scenarios ===\n");
    RolloverWorld::cucumber()
        .fail_on_skipped()
        .run("tests/lifecycle/features/rollover.feature")
        .await;

    println!("\n=== Running Discount Scenarios ===\n");
    DiscountWorld::cucumber()
        .fail_on_skipped()
        .run("tests/lifecycle/features/discount.feature")
        .await;
}

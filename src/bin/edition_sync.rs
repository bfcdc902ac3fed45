//! edition-sync: daily edition rollover daemon
//!
//! Runs the rollover job once a day against a JSON settings document and
//! mails a summary of promoted and incremented courses.
//!
//! ## Usage
//! ```text
//! edition-sync                  # run the daily timer until Ctrl-C
//! edition-sync run-now          # run the rollover once and exit
//! edition-sync increment <slug> # bump one course's edition and exit
//! ```
//!
//! ## Configuration
//! - EDITION_SYNC_CONFIG: Path to a YAML config file (optional)
//! - EDITION_SYNC__<SECTION>__<KEY>: Overrides, e.g. EDITION_SYNC__SCHEDULE__DAILY_AT
//! - EDITION_SYNC_LOG: Log filter (default: info)

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use edition_sync::activity::ActivityLog;
use edition_sync::config::Config;
use edition_sync::interfaces::{Clock, SystemClock};
use edition_sync::lifecycle::RolloverJob;
use edition_sync::mail::create_mailer;
use edition_sync::registry::RegistryCache;
use edition_sync::scheduler::{DailyJob, DailyTimer};
use edition_sync::storage::init_settings;
use edition_sync::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None)?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let settings = init_settings(&config.settings).await?;
    let mailer = create_mailer(&config.mail)?;
    let activity = ActivityLog::new(Arc::clone(&settings), Arc::clone(&clock));
    let registry = Arc::new(RegistryCache::new());

    let job = RolloverJob::new(settings, registry, mailer, activity);

    match args.first().map(String::as_str) {
        Some("run-now") => {
            let report = job.run(clock.today()).await?;
            info!(
                changed = report.events.len(),
                failed = report.errors.len(),
                "Manual rollover finished"
            );
        }
        Some("increment") => {
            let Some(slug) = args.get(1) else {
                return Err("usage: edition-sync increment <course-slug>".into());
            };
            match job.manual_increment_course(slug).await? {
                Some(event) => info!(course = %slug, from = event.from, to = event.to, "Edition incremented"),
                None => warn!(course = %slug, "Nothing incremented"),
            }
        }
        Some(other) => {
            return Err(format!("unknown command '{}'", other).into());
        }
        None => {
            let timer = DailyTimer::new(config.schedule.name.clone(), config.schedule.fire_at()?);
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let job: Arc<dyn DailyJob> = Arc::new(job);

            info!(timer = %timer.name, at = %timer.at, "edition-sync started");
            let handle = tokio::spawn(async move { timer.run(job, clock, shutdown_rx).await });

            tokio::signal::ctrl_c().await?;
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
            handle.await?;
        }
    }

    Ok(())
}

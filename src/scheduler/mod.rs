//! Daily timer.
//!
//! Fires a named job once a day at a fixed local time. Runs triggered by
//! hand ("run now") are not serialized against scheduled ones.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::watch;
use tracing::{error, info};

use crate::interfaces::Clock;
use crate::lifecycle::RolloverJob;

/// Work fired by the timer.
#[async_trait]
pub trait DailyJob: Send + Sync {
    /// Run for the given local date. Errors are logged by the timer.
    async fn run_for(&self, today: NaiveDate) -> Result<(), String>;
}

#[async_trait]
impl DailyJob for RolloverJob {
    async fn run_for(&self, today: NaiveDate) -> Result<(), String> {
        let report = self.run(today).await.map_err(|e| e.to_string())?;
        if report.errors.is_empty() {
            Ok(())
        } else {
            Err(format!("{} course(s) failed to roll over", report.errors.len()))
        }
    }
}

/// First fire time strictly after `now`.
pub fn next_fire_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        return today;
    }
    now.date()
        .checked_add_days(Days::new(1))
        .map(|tomorrow| tomorrow.and_time(at))
        .unwrap_or(today)
}

/// A named daily callback.
#[derive(Debug, Clone)]
pub struct DailyTimer {
    pub name: String,
    pub at: NaiveTime,
}

impl DailyTimer {
    pub fn new(name: impl Into<String>, at: NaiveTime) -> Self {
        Self {
            name: name.into(),
            at,
        }
    }

    /// Run the job once for the clock's current date.
    pub async fn fire(&self, job: &dyn DailyJob, clock: &dyn Clock) {
        let today = clock.today();
        info!(timer = %self.name, %today, "Daily job started");
        match job.run_for(today).await {
            Ok(()) => info!(timer = %self.name, "Daily job finished"),
            Err(e) => error!(timer = %self.name, error = %e, "Daily job failed"),
        }
    }

    /// Sleep until each fire time and run the job, until `shutdown` turns
    /// true or its sender is dropped.
    pub async fn run(
        &self,
        job: Arc<dyn DailyJob>,
        clock: Arc<dyn Clock>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = clock.local_now();
            let next = next_fire_after(now, self.at);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(timer = %self.name, next = %next, "Daily job scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.fire(job.as_ref(), clock.as_ref()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(timer = %self.name, "Daily timer stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::interfaces::FixedClock;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn datetime(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn test_next_fire_later_today() {
        assert_eq!(
            next_fire_after(datetime("2025-01-31 00:01"), at(0, 5)),
            datetime("2025-01-31 00:05")
        );
    }

    #[test]
    fn test_next_fire_tomorrow_when_passed_or_equal() {
        assert_eq!(
            next_fire_after(datetime("2025-01-31 00:05"), at(0, 5)),
            datetime("2025-02-01 00:05")
        );
        assert_eq!(
            next_fire_after(datetime("2024-12-31 23:59"), at(0, 5)),
            datetime("2025-01-01 00:05")
        );
    }

    #[derive(Default)]
    struct CountingJob {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl DailyJob for CountingJob {
        async fn run_for(&self, _today: NaiveDate) -> Result<(), String> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Err("boom".to_string())
        }
    }

    #[tokio::test]
    async fn test_fire_runs_job_and_swallows_error() {
        let timer = DailyTimer::new("test", at(0, 5));
        let job = CountingJob::default();
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());

        timer.fire(&job, &clock).await;
        assert_eq!(job.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let timer = DailyTimer::new("test", at(0, 5));
        let job = Arc::new(CountingJob::default());
        let clock = Arc::new(FixedClock::new(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let job = job.clone();
            async move { timer.run(job, clock, rx).await }
        });
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
    }
}

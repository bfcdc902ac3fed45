//! Daily rollover job.
//!
//! Walks every edition-managed course, applies the planned rollover, and
//! mails one summary of everything that changed.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, error, info, warn};

use super::discount::DiscountService;
use super::{apply_rollover, edition_name, manual_increment, plan_rollover, Rollover};
use crate::activity::ActivityLog;
use crate::edition::EditionStore;
use crate::interfaces::settings_store::{get_string, Result};
use crate::interfaces::{EmailMessage, Mailer, SettingsStore};
use crate::registry::{Course, RegistryCache};

/// Settings key holding the summary recipient.
pub const NOTIFICATION_EMAIL_KEY: &str = "notification_email";

/// What happened to one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverKind {
    Promoted,
    Incremented,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloverEvent {
    pub course: String,
    pub name: String,
    pub kind: RolloverKind,
    pub from: u32,
    pub to: u32,
}

impl RolloverEvent {
    fn new(course: &Course, kind: RolloverKind, from: u32, to: u32) -> Self {
        Self {
            course: course.slug.clone(),
            name: course.name.clone(),
            kind,
            from,
            to,
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RolloverReport {
    pub events: Vec<RolloverEvent>,
    /// `(course slug, error)` for courses that could not be processed.
    pub errors: Vec<(String, String)>,
}

impl RolloverReport {
    pub fn promoted(&self) -> impl Iterator<Item = &RolloverEvent> {
        self.events
            .iter()
            .filter(|e| e.kind == RolloverKind::Promoted)
    }

    pub fn incremented(&self) -> impl Iterator<Item = &RolloverEvent> {
        self.events
            .iter()
            .filter(|e| e.kind == RolloverKind::Incremented)
    }
}

/// Promotes or increments expired editions.
#[derive(Clone)]
pub struct RolloverJob {
    settings: Arc<dyn SettingsStore>,
    editions: EditionStore,
    registry: Arc<RegistryCache>,
    mailer: Arc<dyn Mailer>,
    activity: ActivityLog,
    discount: Option<DiscountService>,
}

impl RolloverJob {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        registry: Arc<RegistryCache>,
        mailer: Arc<dyn Mailer>,
        activity: ActivityLog,
    ) -> Self {
        Self {
            editions: EditionStore::new(Arc::clone(&settings)),
            settings,
            registry,
            mailer,
            activity,
            discount: None,
        }
    }

    /// Also refresh the discount coupon after each run.
    pub fn with_discount(mut self, discount: DiscountService) -> Self {
        self.discount = Some(discount);
        self
    }

    /// Run the rollover for `today`.
    ///
    /// A failure on one course is recorded and the loop continues. Only a
    /// failure to load the registry fails the run.
    pub async fn run(&self, today: NaiveDate) -> Result<RolloverReport> {
        let registry = self.registry.load(self.settings.as_ref()).await?;
        let mut report = RolloverReport::default();

        info!(%today, "Edition rollover started");

        for course in registry.courses_with_edition_management() {
            match self.roll_course(course, today).await {
                Ok(Some(event)) => report.events.push(event),
                Ok(None) => {}
                Err(e) => {
                    error!(course = %course.slug, error = %e, "Edition rollover failed");
                    self.activity
                        .error(format!("{}: rollover failed: {}", course.name, e))
                        .await;
                    report.errors.push((course.slug.clone(), e.to_string()));
                }
            }
        }

        info!(
            %today,
            changed = report.events.len(),
            failed = report.errors.len(),
            "Edition rollover finished"
        );

        if !report.events.is_empty() {
            self.notify(today, &report).await;
        }

        if let Some(discount) = &self.discount {
            if let Err(e) = discount.refresh(today).await {
                error!(error = %e, "Discount refresh failed");
                self.activity
                    .error(format!("Discount refresh failed: {}", e))
                    .await;
            }
        }

        Ok(report)
    }

    /// Admin "increment now" for one course, regardless of dates.
    ///
    /// Unknown or unmanaged courses are a no-op.
    pub async fn manual_increment_course(&self, slug: &str) -> Result<Option<RolloverEvent>> {
        let registry = self.registry.load(self.settings.as_ref()).await?;
        let Some(course) = registry.get(slug).filter(|c| c.edition_management) else {
            warn!(course = %slug, "Manual increment for unknown or unmanaged course");
            return Ok(None);
        };

        let state = self.editions.load(course).await?;
        let after = manual_increment(&state);
        self.editions.save(course, &after).await?;

        let event = RolloverEvent::new(
            course,
            RolloverKind::Incremented,
            state.current.number,
            after.current.number,
        );
        info!(course = %slug, from = event.from, to = event.to, "Edition manually incremented");
        self.activity
            .success(format!(
                "{}: manually incremented to {}",
                course.name,
                edition_name(course, event.to)
            ))
            .await;
        Ok(Some(event))
    }

    async fn roll_course(&self, course: &Course, today: NaiveDate) -> Result<Option<RolloverEvent>> {
        let state = self.editions.load(course).await?;

        let Some(rollover) = plan_rollover(&state, today) else {
            debug!(
                course = %course.slug,
                edition = state.current.number,
                end = ?state.current.end,
                "No rollover due"
            );
            return Ok(None);
        };

        let after = apply_rollover(&state, &rollover);
        self.editions.save(course, &after).await?;

        let (kind, verb) = match rollover {
            Rollover::Promote { .. } => (RolloverKind::Promoted, "promoted next edition"),
            Rollover::Increment { .. } => (RolloverKind::Incremented, "incremented edition"),
        };
        let event = RolloverEvent::new(course, kind, rollover.old_number(), rollover.new_number());

        info!(course = %course.slug, from = event.from, to = event.to, ?kind, "Edition rolled over");
        self.activity
            .success(format!(
                "{}: {} ({} -> {})",
                course.name,
                verb,
                event.from,
                edition_name(course, event.to)
            ))
            .await;

        Ok(Some(event))
    }

    async fn notify(&self, today: NaiveDate, report: &RolloverReport) {
        let recipient = match get_string(self.settings.as_ref(), NOTIFICATION_EMAIL_KEY, "").await {
            Ok(to) => to.trim().to_string(),
            Err(e) => {
                error!(error = %e, "Failed to read notification address");
                return;
            }
        };
        if recipient.is_empty() {
            debug!("No notification address configured, skipping summary email");
            return;
        }

        let message = EmailMessage {
            to: recipient,
            subject: format!("Course editions updated ({})", today),
            body: summary_body(today, report),
        };

        match self.mailer.send(message).await {
            Ok(()) => info!("Rollover summary sent"),
            Err(e) => {
                error!(error = %e, "Failed to send rollover summary");
                self.activity
                    .error(format!("Rollover summary email failed: {}", e))
                    .await;
            }
        }
    }
}

fn summary_body(today: NaiveDate, report: &RolloverReport) -> String {
    let mut body = format!("Edition rollover for {}.\n", today);

    for (heading, events) in [
        ("Promoted to the staged next edition", report.promoted().collect::<Vec<_>>()),
        ("Incremented", report.incremented().collect::<Vec<_>>()),
    ] {
        if events.is_empty() {
            continue;
        }
        let _ = write!(body, "\n{}:\n", heading);
        for event in events {
            let _ = writeln!(
                body,
                "- {}: edition {} -> {}",
                event.name, event.from, event.to
            );
        }
    }

    if report.incremented().next().is_some() {
        body.push_str("\nIncremented editions have no dates yet. Set them in the course settings.\n");
    }
    body
}

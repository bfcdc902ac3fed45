//! Global membership discount tier.
//!
//! One coupon carries the discount for every course. While any
//! discount-eligible course is in its early-bird window the coupon uses the
//! early-bird rate, otherwise the normal rate.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::activity::ActivityLog;
use crate::edition::{EditionState, EditionStore};
use crate::interfaces::settings_store::{get_int, get_string, Result};
use crate::interfaces::{SettingsStore, Storefront};
use crate::registry::{Course, RegistryCache};

/// Settings key holding the storefront coupon code.
pub const COUPON_CODE_KEY: &str = "discount_coupon_code";
/// Settings key holding the early-bird percentage.
pub const EARLY_BIRD_RATE_KEY: &str = "discount_early_bird";
/// Settings key holding the normal percentage.
pub const NORMAL_RATE_KEY: &str = "discount_normal";

pub const DEFAULT_EARLY_BIRD_RATE: u8 = 20;
pub const DEFAULT_NORMAL_RATE: u8 = 10;

/// Selected discount with its percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountTier {
    EarlyBird(u8),
    Normal(u8),
}

impl DiscountTier {
    pub fn percentage(self) -> u8 {
        match self {
            Self::EarlyBird(p) | Self::Normal(p) => p,
        }
    }
}

impl fmt::Display for DiscountTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EarlyBird(p) => write!(f, "{}% (early bird)", p),
            Self::Normal(p) => write!(f, "{}% (normal)", p),
        }
    }
}

/// Configured percentages, each within 1..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscountRates {
    pub early_bird: u8,
    pub normal: u8,
}

impl Default for DiscountRates {
    fn default() -> Self {
        Self {
            early_bird: DEFAULT_EARLY_BIRD_RATE,
            normal: DEFAULT_NORMAL_RATE,
        }
    }
}

impl DiscountRates {
    pub fn new(early_bird: i64, normal: i64) -> Self {
        Self {
            early_bird: clamp_rate(early_bird),
            normal: clamp_rate(normal),
        }
    }

    /// Read rates from settings, falling back to defaults.
    pub async fn load(settings: &dyn SettingsStore) -> Result<Self> {
        let early_bird = get_int(
            settings,
            EARLY_BIRD_RATE_KEY,
            i64::from(DEFAULT_EARLY_BIRD_RATE),
        )
        .await?;
        let normal = get_int(settings, NORMAL_RATE_KEY, i64::from(DEFAULT_NORMAL_RATE)).await?;
        Ok(Self::new(early_bird, normal))
    }
}

fn clamp_rate(rate: i64) -> u8 {
    // Always within u8 after the clamp.
    u8::try_from(rate.clamp(1, 100)).unwrap_or(100)
}

/// Pick the tier for `today`.
///
/// The early-bird window here includes its end date, unlike
/// [`super::registration_status`]. Courses not flagged as discount
/// eligible are ignored.
pub fn select_discount<'a, I>(courses: I, today: NaiveDate, rates: DiscountRates) -> DiscountTier
where
    I: IntoIterator<Item = (&'a Course, &'a EditionState)>,
{
    let early_bird_open = courses.into_iter().any(|(course, state)| {
        let eb = &state.current.early_bird;
        course.discount_eligible
            && eb.enabled
            && eb.start.map_or(true, |start| today >= start)
            && eb.end.is_some_and(|end| today <= end)
    });

    if early_bird_open {
        DiscountTier::EarlyBird(rates.early_bird)
    } else {
        DiscountTier::Normal(rates.normal)
    }
}

/// Coupon code and the tier it should carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountQuote {
    /// Empty when no coupon is configured.
    pub coupon_code: String,
    pub tier: DiscountTier,
}

/// Computes the tier from live settings and pushes it to the storefront.
#[derive(Clone)]
pub struct DiscountService {
    settings: Arc<dyn SettingsStore>,
    editions: EditionStore,
    registry: Arc<RegistryCache>,
    storefront: Arc<dyn Storefront>,
    activity: ActivityLog,
}

impl DiscountService {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        registry: Arc<RegistryCache>,
        storefront: Arc<dyn Storefront>,
        activity: ActivityLog,
    ) -> Self {
        Self {
            editions: EditionStore::new(Arc::clone(&settings)),
            settings,
            registry,
            storefront,
            activity,
        }
    }

    /// Tier for `today` from the eligible courses' current slots.
    pub async fn current_quote(&self, today: NaiveDate) -> Result<DiscountQuote> {
        let settings = self.settings.as_ref();
        let registry = self.registry.load(settings).await?;
        let rates = DiscountRates::load(settings).await?;

        let mut states = Vec::new();
        for course in registry.courses_eligible_for_discount() {
            states.push((course, self.editions.load(course).await?));
        }

        let tier = select_discount(states.iter().map(|(c, s)| (*c, s)), today, rates);
        let coupon_code = get_string(settings, COUPON_CODE_KEY, "").await?.trim().to_string();
        debug!(%today, %tier, eligible = states.len(), "Discount tier selected");

        Ok(DiscountQuote { coupon_code, tier })
    }

    /// Apply the current tier to the coupon.
    ///
    /// Returns `None` when no coupon code is configured or the storefront
    /// does not know the coupon.
    pub async fn refresh(&self, today: NaiveDate) -> Result<Option<DiscountQuote>> {
        let quote = self.current_quote(today).await?;
        if quote.coupon_code.is_empty() {
            debug!("No discount coupon configured, skipping refresh");
            return Ok(None);
        }

        let updated = self
            .storefront
            .set_coupon_percentage(&quote.coupon_code, quote.tier.percentage())
            .await?;

        if !updated {
            warn!(coupon = %quote.coupon_code, "Discount coupon not found in storefront");
            self.activity
                .error(format!("Discount coupon '{}' not found", quote.coupon_code))
                .await;
            return Ok(None);
        }

        info!(coupon = %quote.coupon_code, tier = %quote.tier, "Discount coupon updated");
        self.activity
            .info(format!(
                "Discount coupon '{}' set to {}",
                quote.coupon_code, quote.tier
            ))
            .await;
        Ok(Some(quote))
    }
}

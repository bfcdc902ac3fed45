//! Cached registry loading from the settings store.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{Course, CourseRegistry};
use crate::interfaces::settings_store::{Result, SettingsStore};

/// Settings key holding the course map (`{slug: course}`).
pub const REGISTRY_KEY: &str = "course_registry";

/// Lazily built registry, shared for the lifetime of one process.
///
/// Saving through the cache invalidates it so the next load rebuilds the
/// child→parent map.
#[derive(Default)]
pub struct RegistryCache {
    cached: RwLock<Option<Arc<CourseRegistry>>>,
}

impl RegistryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-built from a known course list (tests, embedding).
    pub fn with_courses(courses: impl IntoIterator<Item = Course>) -> Self {
        Self {
            cached: RwLock::new(Some(Arc::new(CourseRegistry::new(courses)))),
        }
    }

    /// Return the cached registry, loading it from `settings` on first use.
    ///
    /// A malformed registry document degrades to an empty registry.
    pub async fn load(&self, settings: &dyn SettingsStore) -> Result<Arc<CourseRegistry>> {
        if let Some(registry) = self.cached.read().await.as_ref() {
            return Ok(Arc::clone(registry));
        }

        let mut cached = self.cached.write().await;
        if let Some(registry) = cached.as_ref() {
            return Ok(Arc::clone(registry));
        }

        let courses = match settings.get(REGISTRY_KEY).await? {
            Some(value) => parse_courses(value),
            None => Vec::new(),
        };
        debug!(courses = courses.len(), "Loaded course registry");

        let registry = Arc::new(CourseRegistry::new(courses));
        *cached = Some(Arc::clone(&registry));
        Ok(registry)
    }

    /// Persist a new course list and drop the cached registry.
    pub async fn save(
        &self,
        settings: &dyn SettingsStore,
        courses: Vec<Course>,
    ) -> Result<Arc<CourseRegistry>> {
        let map: BTreeMap<String, Course> =
            courses.into_iter().map(|c| (c.slug.clone(), c)).collect();
        settings.set(REGISTRY_KEY, serde_json::to_value(&map)?).await?;
        info!(courses = map.len(), "Saved course registry");

        self.invalidate().await;
        self.load(settings).await
    }

    /// Forget the cached registry.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}

fn parse_courses(value: Value) -> Vec<Course> {
    let Value::Object(map) = value else {
        warn!("Course registry is not a JSON object, treating as empty");
        return Vec::new();
    };

    map.into_iter()
        .filter_map(|(slug, raw)| match serde_json::from_value::<Course>(raw) {
            Ok(mut course) => {
                course.slug = slug;
                Some(course)
            }
            Err(e) => {
                warn!(course = %slug, error = %e, "Skipping malformed course entry");
                None
            }
        })
        .collect()
}

//! Course registry.
//!
//! Maps course slugs to their settings namespace, CRM names, and child
//! categories. A storefront category resolves to a course either directly
//! (its slug is a course slug) or through the child→parent map built from
//! every course's child list.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

mod cache;

pub use cache::{RegistryCache, REGISTRY_KEY};

/// A course product line with its own edition sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Identity. Filled from the registry map key when loading.
    #[serde(default)]
    pub slug: String,
    /// Display name, used in edition names ("12th FRCS").
    pub name: String,
    /// Prefix for this course's edition keys in the settings store.
    pub settings_prefix: String,
    /// CRM tag attached to buyers.
    pub crm_tag: String,
    /// CRM custom field receiving the edition name.
    pub crm_field: String,
    /// Whether editions are numbered and rolled over for this course.
    #[serde(default)]
    pub edition_management: bool,
    /// Whether this course's early-bird window drives the membership discount.
    #[serde(default)]
    pub discount_eligible: bool,
    /// Storefront categories that belong to this course.
    #[serde(default)]
    pub child_categories: Vec<String>,
}

impl Course {
    /// Create a course with derived defaults: prefix `{slug}_`, tag = name,
    /// field `{slug}_edition`, edition management on.
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        let slug = slug.into();
        let name = name.into();
        Self {
            settings_prefix: format!("{}_", slug),
            crm_tag: name.clone(),
            crm_field: format!("{}_edition", slug),
            slug,
            name,
            edition_management: true,
            discount_eligible: false,
            child_categories: Vec::new(),
        }
    }

    pub fn with_edition_management(mut self, enabled: bool) -> Self {
        self.edition_management = enabled;
        self
    }

    pub fn with_discount(mut self, eligible: bool) -> Self {
        self.discount_eligible = eligible;
        self
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.child_categories = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_crm(mut self, tag: impl Into<String>, field: impl Into<String>) -> Self {
        self.crm_tag = tag.into();
        self.crm_field = field.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.settings_prefix = prefix.into();
        self
    }
}

/// Immutable view of the configured courses.
///
/// Rebuild (or invalidate via [`RegistryCache`]) whenever course
/// configuration changes.
#[derive(Debug, Clone, Default)]
pub struct CourseRegistry {
    courses: BTreeMap<String, Course>,
    child_to_parent: HashMap<String, String>,
}

impl CourseRegistry {
    /// Build a registry and its child→parent map.
    ///
    /// Courses are visited in slug order. A child listed under two parents
    /// is a configuration error; the later parent wins and a warning is
    /// logged.
    pub fn new(courses: impl IntoIterator<Item = Course>) -> Self {
        let courses: BTreeMap<String, Course> =
            courses.into_iter().map(|c| (c.slug.clone(), c)).collect();

        let mut child_to_parent = HashMap::new();
        for course in courses.values() {
            for child in &course.child_categories {
                if let Some(previous) = child_to_parent.insert(child.clone(), course.slug.clone())
                {
                    if previous != course.slug {
                        warn!(
                            child = %child,
                            previous = %previous,
                            parent = %course.slug,
                            "Child category listed under two courses, last one wins"
                        );
                    }
                }
            }
        }

        Self {
            courses,
            child_to_parent,
        }
    }

    /// All courses keyed by slug.
    pub fn list_courses(&self) -> &BTreeMap<String, Course> {
        &self.courses
    }

    pub fn get(&self, slug: &str) -> Option<&Course> {
        self.courses.get(slug)
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// Resolve a storefront category to its parent course slug.
    pub fn resolve_category(&self, category: &str) -> Option<&str> {
        if let Some(course) = self.courses.get(category) {
            return Some(course.slug.as_str());
        }
        self.child_to_parent.get(category).map(String::as_str)
    }

    /// Whether `category` reached its course through the child map.
    pub fn is_child_category(&self, category: &str) -> bool {
        !self.courses.contains_key(category) && self.child_to_parent.contains_key(category)
    }

    /// Resolve the first category in `categories` that belongs to a course.
    ///
    /// Order is the catalog's listing order; later matches are ignored, so a
    /// product maps to at most one course.
    pub fn resolve_first<'a, I>(&self, categories: I) -> Option<(&Course, &'a str)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        categories.into_iter().find_map(|category| {
            self.resolve_category(category)
                .and_then(|slug| self.courses.get(slug))
                .map(|course| (course, category))
        })
    }

    pub fn courses_with_edition_management(&self) -> impl Iterator<Item = &Course> {
        self.courses.values().filter(|c| c.edition_management)
    }

    pub fn courses_eligible_for_discount(&self) -> impl Iterator<Item = &Course> {
        self.courses.values().filter(|c| c.discount_eligible)
    }
}

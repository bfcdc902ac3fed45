//! Mock CRM client for testing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::interfaces::crm::{ContactDraft, ContactId, CrmClient, CrmError, Result, TagId};
use crate::utils::slug::{same_tag, slugify};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockContact {
    pub id: ContactId,
    pub draft: ContactDraft,
    pub tags: BTreeSet<TagId>,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockTag {
    pub id: TagId,
    pub title: String,
    pub slug: String,
}

#[derive(Default)]
struct State {
    contacts: Vec<MockContact>,
    tags: Vec<MockTag>,
}

/// In-memory CRM.
///
/// Counts every call, and separately the calls that changed state, so tests
/// can assert both "no calls" and "no effect".
pub struct MockCrmClient {
    state: RwLock<State>,
    available: AtomicBool,
    calls: AtomicUsize,
    mutations: AtomicUsize,
    fail_tag: RwLock<Option<String>>,
    fail_contacts: AtomicBool,
}

impl Default for MockCrmClient {
    fn default() -> Self {
        Self {
            state: RwLock::new(State::default()),
            available: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            mutations: AtomicUsize::new(0),
            fail_tag: RwLock::new(None),
            fail_contacts: AtomicBool::new(false),
        }
    }
}

impl MockCrmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Make `ensure_tag` fail for this title (`None` clears).
    pub async fn fail_tag(&self, title: Option<&str>) {
        *self.fail_tag.write().await = title.map(str::to_string);
    }

    pub fn fail_contacts(&self, fail: bool) {
        self.fail_contacts.store(fail, Ordering::SeqCst);
    }

    /// Every trait call made, including lookups.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that created or changed something.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub async fn contacts(&self) -> Vec<MockContact> {
        self.state.read().await.contacts.clone()
    }

    pub async fn contact_by_email(&self, email: &str) -> Option<MockContact> {
        self.state
            .read()
            .await
            .contacts
            .iter()
            .find(|c| c.draft.email == email)
            .cloned()
    }

    pub async fn tags(&self) -> Vec<MockTag> {
        self.state.read().await.tags.clone()
    }

    /// Titles of the tags attached to a contact.
    pub async fn contact_tags(&self, email: &str) -> Vec<String> {
        let state = self.state.read().await;
        let Some(contact) = state.contacts.iter().find(|c| c.draft.email == email) else {
            return Vec::new();
        };
        state
            .tags
            .iter()
            .filter(|t| contact.tags.contains(&t.id))
            .map(|t| t.title.clone())
            .collect()
    }

    /// Seed an existing tag.
    pub async fn add_tag(&self, title: &str) -> TagId {
        let mut state = self.state.write().await;
        let id = TagId(state.tags.len() as u64 + 1);
        state.tags.push(MockTag {
            id,
            title: title.to_string(),
            slug: slugify(title),
        });
        id
    }

    fn called(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CrmClient for MockCrmClient {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn find_or_create_contact(&self, draft: &ContactDraft) -> Result<ContactId> {
        self.called();
        if self.fail_contacts.load(Ordering::SeqCst) {
            return Err(CrmError::Request("Mock contact failure".to_string()));
        }

        let mut state = self.state.write().await;
        if let Some(contact) = state.contacts.iter().find(|c| c.draft.email == draft.email) {
            return Ok(contact.id);
        }

        let id = ContactId(state.contacts.len() as u64 + 1);
        state.contacts.push(MockContact {
            id,
            draft: draft.clone(),
            tags: BTreeSet::new(),
            fields: BTreeMap::new(),
        });
        self.mutated();
        Ok(id)
    }

    async fn ensure_tag(&self, title: &str) -> Result<TagId> {
        self.called();
        if self.fail_tag.read().await.as_deref() == Some(title) {
            return Err(CrmError::Rejected {
                operation: "ensure_tag".to_string(),
                message: format!("Mock failure for tag '{}'", title),
            });
        }

        let mut state = self.state.write().await;
        if let Some(tag) = state
            .tags
            .iter()
            .find(|t| same_tag(&t.title, title))
        {
            return Ok(tag.id);
        }

        let id = TagId(state.tags.len() as u64 + 1);
        state.tags.push(MockTag {
            id,
            title: title.to_string(),
            slug: slugify(title),
        });
        self.mutated();
        Ok(id)
    }

    async fn attach_tag(&self, contact: ContactId, tag: TagId) -> Result<()> {
        self.called();
        let mut state = self.state.write().await;
        let contact = state
            .contacts
            .iter_mut()
            .find(|c| c.id == contact)
            .ok_or_else(|| CrmError::Rejected {
                operation: "attach_tag".to_string(),
                message: format!("Unknown contact {}", contact),
            })?;
        if contact.tags.insert(tag) {
            self.mutated();
        }
        Ok(())
    }

    async fn upsert_field(&self, contact: ContactId, field_slug: &str, value: &str) -> Result<()> {
        self.called();
        let mut state = self.state.write().await;
        let contact = state
            .contacts
            .iter_mut()
            .find(|c| c.id == contact)
            .ok_or_else(|| CrmError::Rejected {
                operation: "upsert_field".to_string(),
                message: format!("Unknown contact {}", contact),
            })?;
        let previous = contact
            .fields
            .insert(field_slug.to_string(), value.to_string());
        if previous.as_deref() != Some(value) {
            self.mutated();
        }
        Ok(())
    }
}

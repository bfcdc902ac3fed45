//! REST CRM client.
//!
//! Talks to a contacts/tags/custom-fields REST API with basic auth:
//!
//! | Capability | Request |
//! |------------|---------|
//! | find contact | `GET {base}/subscribers?search={email}` |
//! | create contact | `POST {base}/subscribers` |
//! | find tag | `GET {base}/tags?search={title}` |
//! | create tag | `POST {base}/tags` |
//! | attach tag | `POST {base}/subscribers/sync-segments` |
//! | set field | see [`FieldRoute`] |
//!
//! Transient failures (timeouts, connection errors, 429, 5xx other than 501) are retried
//! with exponential backoff.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backon::Retryable;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::CrmConfig;
use crate::interfaces::crm::{ContactDraft, ContactId, CrmClient, CrmError, Result, TagId};
use crate::utils::retry::{crm_backoff, is_retryable_error, is_retryable_status, is_unsupported_status};
use crate::utils::slug::{same_tag, slugify};

/// The ways a custom field can be written, in preference order.
///
/// Older CRM installs lack the bulk endpoint, and some lack per-field meta
/// records; a 404/405/501 moves on to the next route. All routes leave the
/// contact with `field = value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRoute {
    /// `POST {base}/subscribers/sync-custom-fields`
    Bulk,
    /// `PUT {base}/subscribers/{id}/meta/{field}`
    Meta,
    /// `PUT {base}/subscribers/{id}` with `custom_values`
    Raw,
}

impl FieldRoute {
    pub const ALL: [FieldRoute; 3] = [FieldRoute::Bulk, FieldRoute::Meta, FieldRoute::Raw];

    fn index(self) -> usize {
        match self {
            Self::Bulk => 0,
            Self::Meta => 1,
            Self::Raw => 2,
        }
    }

    fn request(self, contact: ContactId, field: &str, value: &str) -> (Method, String, Value) {
        match self {
            Self::Bulk => (
                Method::POST,
                "subscribers/sync-custom-fields".to_string(),
                json!({ "subscribers": [contact.0], "custom_values": { field: value } }),
            ),
            Self::Meta => (
                Method::PUT,
                format!("subscribers/{}/meta/{}", contact, field),
                json!({ "value": value }),
            ),
            Self::Raw => (
                Method::PUT,
                format!("subscribers/{}", contact),
                json!({ "custom_values": { field: value } }),
            ),
        }
    }
}

#[derive(Debug)]
enum RequestError {
    Transport(reqwest::Error),
    Status { status: StatusCode, body: String },
}

impl RequestError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => is_retryable_error(e),
            Self::Status { status, .. } => is_retryable_status(*status),
        }
    }

    fn is_unsupported(&self) -> bool {
        matches!(self, Self::Status { status, .. } if is_unsupported_status(*status))
    }
}

impl From<RequestError> for CrmError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Transport(e) => CrmError::Request(e.to_string()),
            RequestError::Status { status, body } => CrmError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Subscriber {
    id: u64,
    email: String,
}

#[derive(Debug, Deserialize)]
struct SubscriberPage {
    subscribers: Page<Subscriber>,
}

#[derive(Debug, Deserialize)]
struct SubscriberCreated {
    #[serde(alias = "contact")]
    subscriber: Subscriber,
}

#[derive(Debug, Deserialize)]
struct Tag {
    id: u64,
    title: String,
    #[serde(default)]
    slug: String,
}

#[derive(Debug, Deserialize)]
struct TagPage {
    tags: Page<Tag>,
}

#[derive(Debug, Deserialize)]
struct TagCreated {
    #[serde(alias = "lists")]
    tag: Tag,
}

/// CRM client over the REST API.
pub struct HttpCrmClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    /// Index of the first [`FieldRoute`] not known to be unsupported.
    field_route: AtomicUsize,
}

impl HttpCrmClient {
    pub fn new(config: &CrmConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(CrmError::Unavailable(
                "CRM base URL not configured".to_string(),
            ));
        }

        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| CrmError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            field_route: AtomicUsize::new(0),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Route the next field write starts from.
    pub fn field_route(&self) -> FieldRoute {
        FieldRoute::ALL[self.field_route.load(Ordering::Relaxed).min(FieldRoute::ALL.len() - 1)]
    }

    async fn send_once(
        &self,
        method: &Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&Value>,
    ) -> std::result::Result<Value, RequestError> {
        let mut request = self
            .client
            .request(method.clone(), self.url(path))
            .basic_auth(&self.username, Some(&self.password))
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(RequestError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_retryable_status(status) {
                warn!(path = %path, status = %status, "CRM returned retryable status");
            }
            return Err(RequestError::Status { status, body });
        }

        let text = response.text().await.map_err(RequestError::Transport)?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| RequestError::Status {
            status,
            body: format!("unparseable response: {}", e),
        })
    }

    /// Send with retry on transient failures.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> std::result::Result<Value, RequestError> {
        (|| async { self.send_once(&method, path, query, body.as_ref()).await })
            .retry(crm_backoff())
            .when(RequestError::is_retryable)
            .await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<T> {
        let value = self.send(method, path, query, body).await?;
        serde_json::from_value(value).map_err(|e| CrmError::Malformed(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl CrmClient for HttpCrmClient {
    fn is_available(&self) -> bool {
        true
    }

    async fn find_or_create_contact(&self, draft: &ContactDraft) -> Result<ContactId> {
        let page: SubscriberPage = self
            .call(Method::GET, "subscribers", &[("search", &draft.email)], None)
            .await?;
        // Search is fuzzy; identity is the exact email.
        if let Some(found) = page.subscribers.data.iter().find(|s| s.email == draft.email) {
            return Ok(ContactId(found.id));
        }

        let created: SubscriberCreated = self
            .call(
                Method::POST,
                "subscribers",
                &[],
                Some(json!({
                    "email": draft.email,
                    "first_name": draft.first_name,
                    "last_name": draft.last_name,
                    "status": draft.status,
                    "source": draft.source,
                })),
            )
            .await?;
        info!(contact = created.subscriber.id, "CRM contact created");
        Ok(ContactId(created.subscriber.id))
    }

    async fn ensure_tag(&self, title: &str) -> Result<TagId> {
        let page: TagPage = self
            .call(Method::GET, "tags", &[("search", title)], None)
            .await?;
        let slug = slugify(title);
        if let Some(tag) = page
            .tags
            .data
            .iter()
            .find(|t| same_tag(&t.title, title) || t.slug == slug)
        {
            return Ok(TagId(tag.id));
        }

        let created: TagCreated = self
            .call(
                Method::POST,
                "tags",
                &[],
                Some(json!({ "title": title, "slug": slug })),
            )
            .await?;
        info!(tag = created.tag.id, title = %title, "CRM tag created");
        Ok(TagId(created.tag.id))
    }

    async fn attach_tag(&self, contact: ContactId, tag: TagId) -> Result<()> {
        self.send(
            Method::POST,
            "subscribers/sync-segments",
            &[],
            Some(json!({
                "subscribers": [contact.0],
                "type": "tags",
                "attach": [tag.0],
                "detach": [],
            })),
        )
        .await?;
        Ok(())
    }

    async fn upsert_field(&self, contact: ContactId, field_slug: &str, value: &str) -> Result<()> {
        let start = self.field_route.load(Ordering::Relaxed);
        let mut last_err = None;

        for route in FieldRoute::ALL.iter().skip(start) {
            let (method, path, body) = route.request(contact, field_slug, value);
            match self.send(method, &path, &[], Some(body)).await {
                Ok(_) => {
                    debug!(contact = %contact, field = %field_slug, ?route, "CRM field set");
                    return Ok(());
                }
                Err(e) if e.is_unsupported() => {
                    debug!(?route, "CRM field route unsupported, falling back");
                    self.field_route
                        .fetch_max(route.index() + 1, Ordering::Relaxed);
                    last_err = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(match last_err {
            Some(e) => CrmError::Rejected {
                operation: "upsert_field".to_string(),
                message: format!("no supported field route: {}", CrmError::from(e)),
            },
            None => CrmError::Rejected {
                operation: "upsert_field".to_string(),
                message: "no supported field route".to_string(),
            },
        })
    }
}

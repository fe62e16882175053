use super::model::{Notification, NotificationFilter, NotificationId};
use crate::error::ClientResult;
use crate::gateway::{ApiRequest, Gateway};
use async_trait::async_trait;
use serde::Deserialize;

/// Backend operations the reconciler depends on.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn list(&self, filter: &NotificationFilter) -> ClientResult<Vec<Notification>>;

    async fn mark_read(&self, id: &NotificationId) -> ClientResult<()>;

    async fn mark_all_read(&self) -> ClientResult<()>;

    async fn unread_count(&self) -> ClientResult<u32>;

    async fn delete(&self, id: &NotificationId) -> ClientResult<()>;

    async fn delete_all(&self) -> ClientResult<()>;
}

/// The unread-count endpoint answers either `{count: n}` or a bare number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UnreadCount {
    Wrapped {
        #[serde(alias = "unread_count", alias = "unreadCount")]
        count: u32,
    },
    Bare(u32),
}

impl From<UnreadCount> for u32 {
    fn from(count: UnreadCount) -> Self {
        match count {
            UnreadCount::Wrapped { count } | UnreadCount::Bare(count) => count,
        }
    }
}

/// [`NotificationApi`] over the REST backend, authenticated with the
/// gateway's current credential.
#[derive(Clone)]
pub struct RestNotificationApi {
    gateway: Gateway,
    base_path: String,
}

impl RestNotificationApi {
    pub fn new(gateway: Gateway) -> Self {
        Self::with_base_path(gateway, "/notifications")
    }

    pub fn with_base_path(gateway: Gateway, base_path: &str) -> Self {
        Self {
            gateway,
            base_path: base_path.trim_end_matches('/').to_string(),
        }
    }

    fn path(&self, suffix: &str) -> String {
        format!("{}{}", self.base_path, suffix)
    }
}

#[async_trait]
impl NotificationApi for RestNotificationApi {
    async fn list(&self, filter: &NotificationFilter) -> ClientResult<Vec<Notification>> {
        let request = ApiRequest::get(&self.base_path).query_pairs(filter.to_query());
        self.gateway.send_authenticated(request).await?.into_data()
    }

    async fn mark_read(&self, id: &NotificationId) -> ClientResult<()> {
        let request = ApiRequest::patch(&self.path(&format!("/{}/read", id)));
        self.gateway.send_authenticated(request).await?.into_ack()
    }

    async fn mark_all_read(&self) -> ClientResult<()> {
        let request = ApiRequest::patch(&self.path("/read-all"));
        self.gateway.send_authenticated(request).await?.into_ack()
    }

    async fn unread_count(&self) -> ClientResult<u32> {
        let request = ApiRequest::get(&self.path("/unread-count"));
        let count: UnreadCount = self.gateway.send_authenticated(request).await?.into_data()?;
        Ok(count.into())
    }

    async fn delete(&self, id: &NotificationId) -> ClientResult<()> {
        let request = ApiRequest::delete(&self.path(&format!("/{}", id)));
        self.gateway.send_authenticated(request).await?.into_ack()
    }

    async fn delete_all(&self) -> ClientResult<()> {
        let request = ApiRequest::delete(&self.base_path);
        self.gateway.send_authenticated(request).await?.into_ack()
    }
}

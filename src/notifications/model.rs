use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Stable notification identifier.
///
/// The backend sends ids as either JSON strings or integers; both normalise
/// to the same textual id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for NotificationId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => NotificationId(s),
            RawId::Signed(n) => NotificationId(n.to_string()),
            RawId::Unsigned(n) => NotificationId(n.to_string()),
        })
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        NotificationId(s.to_string())
    }
}

impl From<String> for NotificationId {
    fn from(s: String) -> Self {
        NotificationId(s)
    }
}

impl From<i64> for NotificationId {
    fn from(n: i64) -> Self {
        NotificationId(n.to_string())
    }
}

/// A notification as delivered by the backend.
///
/// Identity is `id`; every other field is replaced on re-fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", alias = "category", default)]
    pub category: String,
    #[serde(alias = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub data: Value,
    #[serde(alias = "is_read", alias = "isRead", default)]
    pub read: bool,
}

/// Per-id read state as seen by the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// Server data says unread and nothing local overrides it
    Unread,
    /// Marked read locally, server call not yet confirmed
    OptimisticRead,
    /// Server confirmed the read; never reported unread again this session
    ConfirmedRead,
}

impl ReadState {
    pub fn is_read(&self) -> bool {
        !matches!(self, ReadState::Unread)
    }
}

/// List filter sent as query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFilter {
    pub category: Option<String>,
    pub unread_only: bool,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl NotificationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn unread_only(mut self) -> Self {
        self.unread_only = true;
        self
    }

    pub fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(category) = &self.category {
            query.push(("type".to_string(), category.clone()));
        }
        if self.unread_only {
            query.push(("unread_only".to_string(), "true".to_string()));
        }
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        query
    }
}

/// Immutable view handed to observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationSnapshot {
    pub entities: Vec<Notification>,
    pub unread_count: u32,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

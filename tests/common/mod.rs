//! Common test utilities
//!
//! Provides shared helpers for:
//! - A scripted transport that records every request it receives
//! - An in-memory notification backend with failure injection
//! - Notification fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use libris_client::gateway::{ApiRequest, ApiResponse, Transport};
use libris_client::notifications::{Notification, NotificationApi, NotificationFilter, NotificationId};
use libris_client::{ClientError, ClientResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Transport
// ============================================================================

/// Answers requests from a fixed script, in order.
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<ClientResult<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<ClientResult<ApiResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn statuses(statuses: &[u16]) -> Arc<Self> {
        Self::new(
            statuses
                .iter()
                .map(|s| Ok(ApiResponse::new(*s, format!("{{\"status\":{}}}", s))))
                .collect(),
        )
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &ApiRequest) -> ClientResult<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Transport("no scripted response left".to_string())))
    }
}

// ============================================================================
// Notification backend
// ============================================================================

pub fn notification(id: &str, read: bool) -> Notification {
    Notification {
        id: NotificationId::from(id),
        title: format!("Notification {}", id),
        message: format!("Body of {}", id),
        category: "loan".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        data: serde_json::json!({"book_id": id}),
        read,
    }
}

pub fn id(s: &str) -> NotificationId {
    NotificationId::from(s)
}

pub fn network_error() -> ClientError {
    ClientError::Transport("connection reset".to_string())
}

/// In-memory backend. `list` returns whatever `server` currently holds, so
/// tests control exactly what each fetch sees (including stale data).
#[derive(Default)]
pub struct FakeNotificationApi {
    pub server: Mutex<Vec<Notification>>,
    pub unread: Mutex<u32>,
    pub fail_list: Mutex<Option<ClientError>>,
    pub fail_mark_read: Mutex<Option<ClientError>>,
    pub fail_mark_all: Mutex<Option<ClientError>>,
    pub fail_count: Mutex<Option<ClientError>>,
    pub fail_delete: Mutex<Option<ClientError>>,
    /// When set, `mark_read` waits for one notification before answering
    pub mark_read_gate: Mutex<Option<Arc<Notify>>>,
    pub list_calls: AtomicUsize,
    pub mark_read_calls: Mutex<Vec<NotificationId>>,
    pub mark_all_calls: AtomicUsize,
    pub delete_calls: Mutex<Vec<NotificationId>>,
    pub delete_all_calls: AtomicUsize,
    pub last_filter: Mutex<Option<NotificationFilter>>,
}

impl FakeNotificationApi {
    pub fn with_server(items: Vec<Notification>, unread: u32) -> Arc<Self> {
        let api = Self::default();
        *api.server.lock().unwrap() = items;
        *api.unread.lock().unwrap() = unread;
        Arc::new(api)
    }

    pub fn set_server(&self, items: Vec<Notification>) {
        *self.server.lock().unwrap() = items;
    }

    pub fn set_unread(&self, unread: u32) {
        *self.unread.lock().unwrap() = unread;
    }

    pub fn fail_next_mark_read(&self, err: ClientError) {
        *self.fail_mark_read.lock().unwrap() = Some(err);
    }

    pub fn gate_mark_read(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.mark_read_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn mark_read_count(&self) -> usize {
        self.mark_read_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationApi for FakeNotificationApi {
    async fn list(&self, filter: &NotificationFilter) -> ClientResult<Vec<Notification>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().unwrap() = Some(filter.clone());
        if let Some(err) = self.fail_list.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.server.lock().unwrap().clone())
    }

    async fn mark_read(&self, id: &NotificationId) -> ClientResult<()> {
        self.mark_read_calls.lock().unwrap().push(id.clone());
        let gate = self.mark_read_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.fail_mark_read.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn mark_all_read(&self) -> ClientResult<()> {
        self.mark_all_calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_mark_all.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn unread_count(&self) -> ClientResult<u32> {
        if let Some(err) = self.fail_count.lock().unwrap().take() {
            return Err(err);
        }
        Ok(*self.unread.lock().unwrap())
    }

    async fn delete(&self, id: &NotificationId) -> ClientResult<()> {
        self.delete_calls.lock().unwrap().push(id.clone());
        match self.fail_delete.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn delete_all(&self) -> ClientResult<()> {
        self.delete_all_calls.fetch_add(1, Ordering::SeqCst);
        match self.fail_delete.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

//! Read-state reconciler
//!
//! Keeps the locally cached notifications consistent with server fetches
//! while local mark-as-read calls are optimistic and their confirmations
//! arrive asynchronously. A confirmed read is sticky for the session, so a
//! lagging server replica can never flip a notification back to unread.
//!
//! The state lock is never held across an await; every network call is
//! bracketed by a short critical section before and after it. Results of
//! calls started before [`ReadStateReconciler::reset`] are returned to their
//! callers but not applied.

use super::api::NotificationApi;
use super::model::{Notification, NotificationFilter, NotificationId, NotificationSnapshot, ReadState};
use super::tracking::ReadTracking;
use crate::error::{ClientError, ClientResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct ReconcilerState {
    entities: Vec<Notification>,
    tracking: ReadTracking,
    unread_count: u32,
    /// Bumped whenever the counter is overwritten rather than adjusted
    counter_generation: u64,
    /// Optimistic decrements still pending, keyed by id, with the counter
    /// generation they were applied to
    decrements: HashMap<NotificationId, u64>,
    /// Number of fetches in flight
    loading: usize,
    last_error: Option<String>,
    last_filter: NotificationFilter,
    /// Bumped on reset; stale completions compare against it
    epoch: u64,
}

impl ReconcilerState {
    fn entity_mut(&mut self, id: &NotificationId) -> Option<&mut Notification> {
        self.entities.iter_mut().find(|n| &n.id == id)
    }

    fn snapshot(&self) -> NotificationSnapshot {
        NotificationSnapshot {
            entities: self.entities.clone(),
            unread_count: self.unread_count,
            is_loading: self.loading > 0,
            last_error: self.last_error.clone(),
        }
    }

    fn record_error(&mut self, err: &ClientError) {
        self.last_error = Some(err.user_message());
    }

    fn overwrite_count(&mut self, count: u32) {
        self.unread_count = count;
        self.counter_generation = self.counter_generation.wrapping_add(1);
    }

    /// Undo the optimistic decrement for `id` if the counter it was applied
    /// to has not been overwritten since.
    fn restore_decrement(&mut self, id: &NotificationId) {
        if self.decrements.remove(id) == Some(self.counter_generation) {
            self.unread_count = self.unread_count.saturating_add(1);
        }
    }
}

/// Cache of notifications with optimistic, self-correcting read state.
///
/// Cheap to clone; clones share the same cache.
#[derive(Clone)]
pub struct ReadStateReconciler {
    api: Arc<dyn NotificationApi>,
    state: Arc<Mutex<ReconcilerState>>,
    snapshots: Arc<watch::Sender<NotificationSnapshot>>,
}

impl ReadStateReconciler {
    pub fn new<A: NotificationApi + 'static>(api: A) -> Self {
        Self::with_shared_api(Arc::new(api))
    }

    pub fn with_shared_api(api: Arc<dyn NotificationApi>) -> Self {
        let (tx, _rx) = watch::channel(NotificationSnapshot::default());
        Self {
            api,
            state: Arc::new(Mutex::new(ReconcilerState::default())),
            snapshots: Arc::new(tx),
        }
    }

    fn publish(&self, state: &ReconcilerState) {
        self.snapshots.send_replace(state.snapshot());
    }

    /// Fetch notifications and merge them with local read tracking.
    ///
    /// Replaces the cached list on success. On failure the cache and counter
    /// are left untouched and the error is returned.
    pub async fn fetch(&self, filter: NotificationFilter) -> ClientResult<Vec<Notification>> {
        let epoch = {
            let mut state = self.state.lock();
            state.loading += 1;
            state.last_filter = filter.clone();
            self.publish(&state);
            state.epoch
        };

        let result = self.api.list(&filter).await;

        let mut state = self.state.lock();
        if state.epoch != epoch {
            debug!("Discarding fetch result from a previous session");
            return result;
        }
        state.loading = state.loading.saturating_sub(1);

        let outcome = match result {
            Ok(snapshot) => {
                let state = &mut *state;
                let merged = state.tracking.merge(snapshot);
                let tracking = &state.tracking;
                state.decrements.retain(|id, _| tracking.is_optimistic(id));
                debug!("Fetched {} notifications", merged.len());
                state.entities = merged.clone();
                state.last_error = None;
                Ok(merged)
            }
            Err(e) => {
                warn!("Failed to fetch notifications: {}", e);
                state.record_error(&e);
                Err(e)
            }
        };
        self.publish(&state);
        outcome
    }

    /// Fetch again with the filter of the most recent fetch.
    pub async fn refetch(&self) -> ClientResult<Vec<Notification>> {
        let filter = self.state.lock().last_filter.clone();
        self.fetch(filter).await
    }

    /// Mark one notification read.
    ///
    /// The cached entity flips to read and the counter drops before the
    /// network call. On success the id becomes confirmed; on failure the
    /// entity and counter are restored (unless a fetch already showed the
    /// server has the read) and the error is returned. Unknown ids skip the
    /// local step but are still sent to the server.
    ///
    /// Overlapping calls for the same id share one local read, which is only
    /// undone when every one of them has failed. The counter is restored only
    /// if it has not been re-derived from the server in the meantime.
    pub async fn mark_as_read(&self, id: &NotificationId) -> ClientResult<()> {
        let (epoch, tracked) = {
            let mut state = self.state.lock();
            if state.tracking.is_confirmed(id) {
                return Ok(());
            }

            let pending = state.tracking.is_optimistic(id);
            let applied = match state.entity_mut(id) {
                Some(n) if !n.read => {
                    n.read = true;
                    true
                }
                _ => false,
            };
            // The counter floors at 0; only a real decrement is recorded
            if applied && state.unread_count > 0 {
                state.unread_count -= 1;
                let generation = state.counter_generation;
                state.decrements.insert(id.clone(), generation);
            }
            let tracked = applied || pending;
            if tracked {
                state.tracking.begin(id);
            }
            if applied {
                self.publish(&state);
            }
            (state.epoch, tracked)
        };

        let result = self.api.mark_read(id).await;

        let mut state = self.state.lock();
        if state.epoch != epoch {
            return result;
        }

        match &result {
            Ok(()) => {
                state.tracking.confirm(id);
                state.decrements.remove(id);
                if let Some(n) = state.entity_mut(id) {
                    n.read = true;
                }
                state.last_error = None;
                debug!("Notification {} confirmed read", id);
            }
            Err(e) => {
                if tracked && state.tracking.rollback(id) {
                    if let Some(n) = state.entity_mut(id) {
                        n.read = false;
                    }
                    state.restore_decrement(id);
                }
                state.record_error(e);
                warn!("Failed to mark notification {} as read: {}", id, e);
            }
        }
        self.publish(&state);
        result
    }

    /// Mark every cached notification read and tell the server in one call.
    ///
    /// The local change is not rolled back if the call fails. On success the
    /// ids cached at call time become confirmed and the list is re-fetched.
    pub async fn mark_all_as_read(&self) -> ClientResult<()> {
        let (epoch, ids) = {
            let mut state = self.state.lock();
            let ids: Vec<NotificationId> = state
                .entities
                .iter_mut()
                .map(|n| {
                    n.read = true;
                    n.id.clone()
                })
                .collect();
            state.overwrite_count(0);
            self.publish(&state);
            (state.epoch, ids)
        };

        let result = self.api.mark_all_read().await;

        {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return result;
            }
            match &result {
                Ok(()) => {
                    for id in &ids {
                        state.tracking.confirm(id);
                    }
                    state.last_error = None;
                    info!("Marked {} notifications as read", ids.len());
                }
                Err(e) => {
                    state.record_error(e);
                    warn!("Failed to mark all notifications as read: {}", e);
                }
            }
            self.publish(&state);
        }

        result?;
        self.refetch().await?;
        Ok(())
    }

    /// Re-derive the unread counter from the server.
    pub async fn refresh_unread_count(&self) -> ClientResult<u32> {
        let epoch = self.state.lock().epoch;
        let result = self.api.unread_count().await;

        let mut state = self.state.lock();
        if state.epoch != epoch {
            return result;
        }
        match &result {
            Ok(count) => {
                state.overwrite_count(*count);
                state.last_error = None;
                debug!("Unread count is {}", count);
            }
            Err(e) => {
                state.record_error(e);
                warn!("Failed to refresh unread count: {}", e);
            }
        }
        self.publish(&state);
        result
    }

    /// Remove one notification locally and on the server.
    ///
    /// The local removal is not undone if the server call fails.
    pub async fn delete(&self, id: &NotificationId) -> ClientResult<()> {
        let epoch = {
            let mut state = self.state.lock();
            if let Some(pos) = state.entities.iter().position(|n| &n.id == id) {
                let removed = state.entities.remove(pos);
                if !removed.read {
                    state.unread_count = state.unread_count.saturating_sub(1);
                }
            }
            state.tracking.remove(id);
            state.decrements.remove(id);
            self.publish(&state);
            state.epoch
        };

        let result = self.api.delete(id).await;
        self.finish_bulk(epoch, &result, "delete notification");
        result
    }

    /// Remove every notification locally and on the server.
    pub async fn delete_all(&self) -> ClientResult<()> {
        let epoch = {
            let mut state = self.state.lock();
            state.entities.clear();
            state.tracking.clear();
            state.decrements.clear();
            state.overwrite_count(0);
            self.publish(&state);
            state.epoch
        };

        let result = self.api.delete_all().await;
        self.finish_bulk(epoch, &result, "delete all notifications");
        result
    }

    fn finish_bulk(&self, epoch: u64, result: &ClientResult<()>, action: &str) {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            return;
        }
        match result {
            Ok(()) => state.last_error = None,
            Err(e) => {
                warn!("Failed to {}: {}", action, e);
                state.record_error(e);
            }
        }
        self.publish(&state);
    }

    /// Forget everything cached for the current session.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let epoch = state.epoch.wrapping_add(1);
        *state = ReconcilerState {
            epoch,
            ..ReconcilerState::default()
        };
        self.publish(&state);
        debug!("Notification state reset");
    }

    pub fn entities(&self) -> Vec<Notification> {
        self.state.lock().entities.clone()
    }

    pub fn get(&self, id: &NotificationId) -> Option<Notification> {
        self.state.lock().entities.iter().find(|n| &n.id == id).cloned()
    }

    pub fn unread_count(&self) -> u32 {
        self.state.lock().unread_count
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading > 0
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }

    pub fn last_filter(&self) -> NotificationFilter {
        self.state.lock().last_filter.clone()
    }

    pub fn read_state(&self, id: &NotificationId) -> ReadState {
        self.state.lock().tracking.state_of(id, false)
    }

    pub fn is_confirmed(&self, id: &NotificationId) -> bool {
        self.state.lock().tracking.is_confirmed(id)
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        self.state.lock().snapshot()
    }

    /// Receive a new [`NotificationSnapshot`] after every state change.
    pub fn subscribe(&self) -> watch::Receiver<NotificationSnapshot> {
        self.snapshots.subscribe()
    }
}

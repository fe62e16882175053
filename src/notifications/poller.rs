//! Background notification sync
//!
//! Periodically re-fetches the notification list and the unread counter so
//! the reconciler converges on server state without user interaction. Syncs
//! run inside the poller loop, so two never overlap; ticks missed while a
//! sync is running are skipped.

use super::model::NotificationFilter;
use super::reconciler::ReadStateReconciler;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Configuration for the background poller
#[derive(Clone, Debug)]
pub struct PollerConfig {
    /// Time between periodic syncs
    pub interval: Duration,
    /// Enable periodic sync; `SyncNow` works either way
    pub auto_sync: bool,
    /// Filter used for the periodic fetch
    pub filter: NotificationFilter,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            auto_sync: true,
            filter: NotificationFilter::default(),
        }
    }
}

/// Commands that can be sent to the poller
#[derive(Debug)]
pub enum PollerCommand {
    /// Sync immediately
    SyncNow,
    /// Use a different filter from the next sync on
    SetFilter(NotificationFilter),
    /// Stop periodic syncs until resumed
    Pause,
    Resume,
    Stop,
}

/// Outcome of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: usize,
    pub unread_count: Option<u32>,
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Handle to a running background poller.
pub struct NotificationPoller {
    command_tx: mpsc::Sender<PollerCommand>,
    handle: JoinHandle<()>,
}

impl NotificationPoller {
    /// Spawn the poller task on the current tokio runtime.
    pub fn start(reconciler: ReadStateReconciler, config: PollerConfig) -> Self {
        let (tx, mut rx) = mpsc::channel(32);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut filter = config.filter;
            let mut paused = !config.auto_sync;

            loop {
                tokio::select! {
                    _ = ticker.tick(), if !paused => {
                        debug!("Starting periodic notification sync");
                        let report = sync_once(&reconciler, &filter).await;
                        log_report(&report);
                    }

                    cmd = rx.recv() => {
                        match cmd {
                            Some(PollerCommand::SyncNow) => {
                                info!("Manual notification sync triggered");
                                let report = sync_once(&reconciler, &filter).await;
                                log_report(&report);
                            }
                            Some(PollerCommand::SetFilter(new_filter)) => {
                                debug!("Poller filter updated: {:?}", new_filter);
                                filter = new_filter;
                            }
                            Some(PollerCommand::Pause) => {
                                info!("Notification sync paused");
                                paused = true;
                            }
                            Some(PollerCommand::Resume) => {
                                info!("Notification sync resumed");
                                paused = false;
                                ticker.reset();
                            }
                            Some(PollerCommand::Stop) | None => {
                                info!("Notification poller stopping");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Self {
            command_tx: tx,
            handle,
        }
    }

    pub fn sender(&self) -> mpsc::Sender<PollerCommand> {
        self.command_tx.clone()
    }

    pub async fn sync_now(&self) {
        let _ = self.command_tx.send(PollerCommand::SyncNow).await;
    }

    pub async fn set_filter(&self, filter: NotificationFilter) {
        let _ = self.command_tx.send(PollerCommand::SetFilter(filter)).await;
    }

    pub async fn pause(&self) {
        let _ = self.command_tx.send(PollerCommand::Pause).await;
    }

    pub async fn resume(&self) {
        let _ = self.command_tx.send(PollerCommand::Resume).await;
    }

    /// Stop the poller and wait for the task to exit.
    pub async fn stop(self) {
        let _ = self.command_tx.send(PollerCommand::Stop).await;
        if let Err(e) = self.handle.await {
            warn!("Notification poller task failed: {}", e);
        }
    }
}

/// Fetch the list and refresh the unread counter once.
///
/// Errors are collected rather than returned; the reconciler has already
/// recorded them as its last error.
pub async fn sync_once(reconciler: &ReadStateReconciler, filter: &NotificationFilter) -> SyncReport {
    let mut report = SyncReport::default();

    match reconciler.fetch(filter.clone()).await {
        Ok(list) => report.fetched = list.len(),
        Err(e) => report.errors.push(e.to_string()),
    }
    match reconciler.refresh_unread_count().await {
        Ok(count) => report.unread_count = Some(count),
        Err(e) => report.errors.push(e.to_string()),
    }

    report
}

fn log_report(report: &SyncReport) {
    if report.success() {
        debug!(
            "Notification sync complete: {} fetched, unread {:?}",
            report.fetched, report.unread_count
        );
    } else {
        warn!("Notification sync finished with errors: {:?}", report.errors);
    }
}

//! Notification read-state reconciliation
//!
//! Provides a locally cached notification list whose read flags are updated
//! optimistically and reconciled against periodic server fetches.
//!
//! # Features
//! - Optimistic mark-as-read with rollback on failure
//! - Sticky confirmation: a confirmed read never flips back to unread
//! - Idempotent merge of server snapshots
//! - Background polling with manual sync
//!
//! # Example
//!
//! ```rust,ignore
//! use libris_client::notifications::{NotificationFilter, ReadStateReconciler, RestNotificationApi};
//!
//! let reconciler = ReadStateReconciler::new(RestNotificationApi::new(gateway));
//! reconciler.fetch(NotificationFilter::default()).await?;
//! reconciler.mark_as_read(&"42".into()).await?;
//! println!("Unread: {}", reconciler.unread_count());
//! ```

pub mod api;
pub mod model;
pub mod poller;
pub mod reconciler;
pub mod tracking;

pub use api::{NotificationApi, RestNotificationApi};
pub use model::{Notification, NotificationFilter, NotificationId, NotificationSnapshot, ReadState};
pub use poller::{NotificationPoller, PollerCommand, PollerConfig, SyncReport};
pub use reconciler::ReadStateReconciler;
pub use tracking::ReadTracking;

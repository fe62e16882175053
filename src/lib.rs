//! Libris client core
//!
//! Client-side state reconciliation for the Libris library/bookstore app:
//! an authenticated request gateway that recovers once from expired
//! credentials, and a notification cache whose read flags are updated
//! optimistically and reconciled against server fetches.
//!
//! # Example
//!
//! ```rust,no_run
//! use libris_client::{ClientConfig, NotificationFilter, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), libris_client::ClientError> {
//!     let session = Session::new(ClientConfig::new("http://localhost:3000/api"), None)?;
//!     session.sign_in("my-token");
//!
//!     let notifications = session.notifications();
//!     let list = notifications.fetch(NotificationFilter::default()).await?;
//!     if let Some(first) = list.first() {
//!         notifications.mark_as_read(&first.id).await?;
//!     }
//!     println!("Unread: {}", notifications.unread_count());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod notifications;
pub mod session;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use gateway::{refresh_fn, ApiRequest, ApiResponse, CredentialStore, Gateway, Method, RefreshFn, Transport};
pub use notifications::{
    Notification, NotificationApi, NotificationFilter, NotificationId, NotificationPoller,
    NotificationSnapshot, ReadState, ReadStateReconciler, RestNotificationApi,
};
pub use session::Session;

//! Signed-in session
//!
//! Owns the credential store, gateway and notification reconciler for one
//! user. Changing the credential resets every piece of session-scoped state
//! so nothing leaks from one account into the next.

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::gateway::{auth, CredentialStore, Gateway, RefreshFn, ReqwestTransport, Transport};
use crate::notifications::{
    NotificationFilter, NotificationPoller, PollerConfig, ReadStateReconciler, RestNotificationApi,
};
use std::sync::Arc;
use tracing::info;

pub struct Session {
    gateway: Gateway,
    notifications: ReadStateReconciler,
    config: ClientConfig,
}

impl Session {
    /// Build a session over HTTP using `config`.
    pub fn new(config: ClientConfig, refresh: Option<RefreshFn>) -> ClientResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport), refresh))
    }

    /// Build a session over an arbitrary transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        refresh: Option<RefreshFn>,
    ) -> Self {
        let mut builder = Gateway::builder_with_shared(transport).credentials(CredentialStore::new());
        if let Some(refresh) = refresh {
            builder = builder.refresh(refresh);
        }
        let gateway = builder.build();
        let notifications = ReadStateReconciler::new(RestNotificationApi::new(gateway.clone()));

        Self {
            gateway,
            notifications,
            config,
        }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn credentials(&self) -> &CredentialStore {
        self.gateway.credentials()
    }

    pub fn notifications(&self) -> &ReadStateReconciler {
        &self.notifications
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_signed_in(&self) -> bool {
        self.credentials().is_present()
    }

    /// Install `token` as the session credential.
    ///
    /// Session state is reset when the token differs from the current one.
    pub fn sign_in(&self, token: &str) {
        let previous = self.credentials().replace(Some(token.to_string()));
        if previous.as_deref() != Some(token) {
            self.notifications.reset();
            info!("Session credential changed, notification state reset");
        }
    }

    /// Sign in with username and password.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<auth::AuthTokens> {
        let previous = self.credentials().get();
        let tokens = auth::login(&self.gateway, username, password).await?;
        if previous.as_deref() != Some(tokens.token.as_str()) {
            self.notifications.reset();
        }
        Ok(tokens)
    }

    /// Drop the credential and every piece of session state.
    pub fn sign_out(&self) {
        self.credentials().clear();
        self.notifications.reset();
        info!("Signed out");
    }

    /// Start background notification sync using the configured interval.
    pub fn start_polling(&self) -> NotificationPoller {
        let config = PollerConfig {
            interval: self.config.poll_interval(),
            auto_sync: true,
            filter: NotificationFilter::new().page(1, self.config.page_size),
        };
        NotificationPoller::start(self.notifications.clone(), config)
    }
}

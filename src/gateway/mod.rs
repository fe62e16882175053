//! Authenticated Request Gateway
//!
//! Wraps every outbound call with the standard JSON headers and a bearer
//! token, and recovers from one expired-credential failure per call by
//! invoking an injected refresh capability and reissuing the request.
//!
//! # Example
//!
//! ```rust,ignore
//! use libris_client::gateway::{refresh_fn, Gateway, ReqwestTransport};
//! use libris_client::ClientConfig;
//!
//! let transport = ReqwestTransport::new(&ClientConfig::default())?;
//! let gateway = Gateway::builder(transport)
//!     .refresh(refresh_fn(|| async { Some("new-token".to_string()) }))
//!     .build();
//!
//! let response = gateway.get("/notifications", vec![], Some("old-token")).await?;
//! ```

pub mod auth;
pub mod credentials;
pub mod request;
pub mod transport;

pub use credentials::{refresh_fn, CredentialStore, RefreshFn};
pub use request::{ApiRequest, ApiResponse, Envelope, Method};
pub use transport::{ReqwestTransport, Transport};

use crate::error::ClientResult;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Issues requests with standard headers and at most one refresh-and-retry.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    refresh: Option<RefreshFn>,
    credentials: CredentialStore,
}

pub struct GatewayBuilder {
    transport: Arc<dyn Transport>,
    refresh: Option<RefreshFn>,
    credentials: Option<CredentialStore>,
}

impl GatewayBuilder {
    /// Register the token refresh capability.
    pub fn refresh(mut self, refresh: RefreshFn) -> Self {
        self.refresh = Some(refresh);
        self
    }

    /// Share an existing credential store instead of creating an empty one.
    pub fn credentials(mut self, credentials: CredentialStore) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn build(self) -> Gateway {
        Gateway {
            transport: self.transport,
            refresh: self.refresh,
            credentials: self.credentials.unwrap_or_default(),
        }
    }
}

impl Gateway {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self::builder(transport).build()
    }

    pub fn builder<T: Transport + 'static>(transport: T) -> GatewayBuilder {
        Self::builder_with_shared(Arc::new(transport))
    }

    pub fn builder_with_shared(transport: Arc<dyn Transport>) -> GatewayBuilder {
        GatewayBuilder {
            transport,
            refresh: None,
            credentials: None,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn has_refresh(&self) -> bool {
        self.refresh.is_some()
    }

    /// Send `request` with `token` as the credential for the original leg.
    ///
    /// A 401 answer triggers one refresh when a token was supplied and a
    /// refresh capability is registered. The refreshed token is used for a
    /// single retry and written to the credential store only while the store
    /// still holds `token`. The retry response is returned whatever its
    /// status. Transport failures are errors; HTTP
    /// error statuses are not.
    pub async fn send(&self, request: ApiRequest, token: Option<&str>) -> ClientResult<ApiResponse> {
        let request = request.with_standard_headers(token);
        debug!("{} {}", request.method, request.path);

        let response = self.transport.execute(&request).await?;

        if !response.is_unauthorized() {
            return Ok(response);
        }
        let Some(original) = token else {
            return Ok(response);
        };
        let Some(refresh) = &self.refresh else {
            return Ok(response);
        };

        debug!("{} {} unauthorized, refreshing token", request.method, request.path);
        let Some(new_token) = refresh().await else {
            warn!("Token refresh failed for {} {}", request.method, request.path);
            return Ok(response);
        };

        if !self.credentials.replace_if(original, &new_token) {
            debug!("Credential changed during refresh, not storing refreshed token");
        }
        let retry = request.with_standard_headers(Some(&new_token));
        self.transport.execute(&retry).await
    }

    /// Send `request` using the credential store's current token.
    pub async fn send_authenticated(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let token = self.credentials.get();
        self.send(request, token.as_deref()).await
    }

    pub async fn get(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        token: Option<&str>,
    ) -> ClientResult<ApiResponse> {
        self.send(ApiRequest::get(path).query_pairs(query), token)
            .await
    }

    pub async fn post(
        &self,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> ClientResult<ApiResponse> {
        self.send(with_body(ApiRequest::post(path), body), token)
            .await
    }

    pub async fn put(
        &self,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> ClientResult<ApiResponse> {
        self.send(with_body(ApiRequest::put(path), body), token)
            .await
    }

    pub async fn patch(
        &self,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> ClientResult<ApiResponse> {
        self.send(with_body(ApiRequest::patch(path), body), token)
            .await
    }

    pub async fn delete(
        &self,
        path: &str,
        query: Vec<(String, String)>,
        token: Option<&str>,
    ) -> ClientResult<ApiResponse> {
        self.send(ApiRequest::delete(path).query_pairs(query), token)
            .await
    }
}

fn with_body(request: ApiRequest, body: Option<Value>) -> ApiRequest {
    match body {
        Some(b) => request.body(b),
        None => request,
    }
}

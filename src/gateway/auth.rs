//! Login and token exchange against the backend's auth endpoints.

use super::{refresh_fn, ApiRequest, Gateway, RefreshFn};
use crate::error::{ClientError, ClientResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokens {
    #[serde(alias = "access_token", alias = "accessToken")]
    pub token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
}

/// Exchange username and password for tokens and store the access token.
pub async fn login(gateway: &Gateway, username: &str, password: &str) -> ClientResult<AuthTokens> {
    let request = ApiRequest::post(LOGIN_PATH).body(serde_json::json!({
        "username": username,
        "password": password
    }));

    let tokens: AuthTokens = gateway.send(request, None).await?.into_data()?;
    if tokens.token.is_empty() {
        return Err(ClientError::Unauthorized("No token in response".to_string()));
    }

    gateway.credentials().set(&tokens.token);
    info!("Signed in as {}", username);
    Ok(tokens)
}

/// Build a [`RefreshFn`] that trades `refresh_token` for a new access token.
///
/// The exchange goes through `gateway` without a bearer token, so it can
/// never recurse into another refresh.
pub fn refresh_with_token(gateway: Gateway, refresh_token: String) -> RefreshFn {
    let gateway = Arc::new(gateway);
    let refresh_token = Arc::new(refresh_token);
    refresh_fn(move || {
        let gateway = gateway.clone();
        let refresh_token = refresh_token.clone();
        async move {
            let request = ApiRequest::post(REFRESH_PATH).body(serde_json::json!({
                "refresh_token": refresh_token.as_str()
            }));
            let result = match gateway.send(request, None).await {
                Ok(response) => response.into_data::<AuthTokens>(),
                Err(e) => Err(e),
            };
            match result {
                Ok(tokens) if !tokens.token.is_empty() => Some(tokens.token),
                Ok(_) => {
                    warn!("Refresh endpoint returned an empty token");
                    None
                }
                Err(e) => {
                    warn!("Token refresh failed: {}", e);
                    None
                }
            }
        }
    })
}

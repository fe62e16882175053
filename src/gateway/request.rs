use crate::error::{ClientError, ClientResult, GENERIC_FAILURE_MESSAGE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_ACCEPT: &str = "Accept";
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const JSON_MIME: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully described outbound request.
///
/// The gateway reissues the same value on a retry, only swapping the
/// authorization header.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: &str) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn query_pairs(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Bearer token carried by this request, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header(HEADER_AUTHORIZATION)
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    /// Replace the standard headers, attaching `token` as a bearer credential.
    pub(crate) fn with_standard_headers(mut self, token: Option<&str>) -> Self {
        self.headers.retain(|(k, _)| {
            !k.eq_ignore_ascii_case(HEADER_CONTENT_TYPE)
                && !k.eq_ignore_ascii_case(HEADER_ACCEPT)
                && !k.eq_ignore_ascii_case(HEADER_AUTHORIZATION)
        });
        self.headers
            .push((HEADER_CONTENT_TYPE.to_string(), JSON_MIME.to_string()));
        self.headers
            .push((HEADER_ACCEPT.to_string(), JSON_MIME.to_string()));
        if let Some(token) = token {
            self.headers
                .push((HEADER_AUTHORIZATION.to_string(), format!("Bearer {}", token)));
        }
        self
    }
}

/// Raw response as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Standard `{ success, data, message }` envelope used by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_success() -> bool {
    true
}

impl<T> Envelope<T> {
    fn failure_message(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string())
    }
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Decode the whole body as `T`.
    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            ClientError::Decode(format!("failed to parse response: {} - Text: {}", e, self.body))
        })
    }

    /// Unwrap the envelope's `data`, mapping every failure shape to a
    /// [`ClientError`].
    pub fn into_data<T: DeserializeOwned>(self) -> ClientResult<T> {
        let envelope: Envelope<T> = self.into_envelope()?;
        envelope
            .data
            .ok_or_else(|| ClientError::Decode("response envelope has no data".to_string()))
    }

    /// Check the envelope reports success, ignoring any data.
    pub fn into_ack(self) -> ClientResult<()> {
        if self.body.trim().is_empty() && self.is_success() {
            return Ok(());
        }
        self.into_envelope::<Value>().map(|_| ())
    }

    fn into_envelope<T: DeserializeOwned>(self) -> ClientResult<Envelope<T>> {
        if !self.is_success() {
            let message = serde_json::from_str::<Envelope<Value>>(&self.body)
                .map(|env| env.failure_message())
                .unwrap_or_else(|_| GENERIC_FAILURE_MESSAGE.to_string());
            if self.is_unauthorized() {
                return Err(ClientError::Unauthorized(message));
            }
            return Err(ClientError::Server {
                status: self.status,
                message,
            });
        }

        let envelope: Envelope<T> = self.json()?;
        if !envelope.success {
            return Err(ClientError::Rejected(envelope.failure_message()));
        }
        Ok(envelope)
    }
}

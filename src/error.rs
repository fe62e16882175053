use thiserror::Error;

/// Fallback text used when the server gives no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// The request never produced a response.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    /// A response arrived but its body could not be understood.
    pub fn is_decode(&self) -> bool {
        matches!(self, ClientError::Decode(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
            || matches!(self, ClientError::Server { status: 401, .. })
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Rejected(msg) | ClientError::Server { message: msg, .. }
                if !msg.trim().is_empty() =>
            {
                msg.clone()
            }
            ClientError::Transport(_) => {
                "Unable to reach the server. Check your connection.".to_string()
            }
            ClientError::Unauthorized(_) => "Your session has expired. Please sign in again.".to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl serde::Serialize for ClientError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Config(format!("invalid URL: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ClientError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Transport error: connection refused");

        let err = ClientError::Decode("expected array".to_string());
        assert_eq!(err.to_string(), "Decode error: expected array");

        let err = ClientError::Server {
            status: 503,
            message: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "Server error (503): maintenance");

        let err = ClientError::Rejected("already read".to_string());
        assert_eq!(err.to_string(), "Request rejected: already read");
    }

    #[test]
    fn test_error_kinds() {
        assert!(ClientError::Transport("x".into()).is_transport());
        assert!(!ClientError::Transport("x".into()).is_decode());
        assert!(ClientError::Decode("x".into()).is_decode());
        assert!(ClientError::Unauthorized("x".into()).is_unauthorized());
        assert!(ClientError::Server {
            status: 401,
            message: String::new()
        }
        .is_unauthorized());
    }

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ClientError::Rejected("Notification not found".to_string());
        assert_eq!(err.user_message(), "Notification not found");

        let err = ClientError::Rejected("  ".to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);

        let err = ClientError::Decode("bad json".to_string());
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_error_serializes_as_string() {
        let err = ClientError::Unauthorized("token expired".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, serde_json::json!("Unauthorized: token expired"));
    }
}

use thiserror::Error;

/// Errors produced by the client-side synchronization layer.
///
/// `Validation` is raised locally before any network traffic; the remaining
/// variants normalize transport-level failures from the gateway.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// The structured message the server attached to a failed response,
    /// suitable for verbatim display. `None` for every other failure kind.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// True for failures raised locally, before any request was attempted.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

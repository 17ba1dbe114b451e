use thiserror::Error;

/// Failure of a single backend call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Connection refused, timeout, TLS, etc.
    #[error("network error: {0}")]
    Transport(String),

    /// Non-success HTTP status whose body was not a response envelope.
    #[error("backend returned HTTP {0}")]
    Status(u16),

    /// The body could not be decoded into the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// `success: false`, with the server's message when it sent one.
    #[error("{}", .0.as_deref().unwrap_or("request failed"))]
    Application(Option<String>),
}

/// The two failure classes callers react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Application,
}

impl ApiError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Application(_) => FailureKind::Application,
            _ => FailureKind::Transport,
        }
    }

    /// The server-provided message, if this is an application failure that
    /// carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Application(Some(msg)) => Some(msg.as_str()),
            _ => None,
        }
    }

    /// Text for a notification: the server's message for application
    /// failures, `fallback` otherwise.
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

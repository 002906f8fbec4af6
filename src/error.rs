use std::fmt;
use std::time::Duration;

use openrouter_api::TransportError;
use serde::Serialize;
use thiserror::Error;

use crate::buffer::BufferId;

#[derive(Debug, Error)]
pub enum AssistError {
    /// Rejected before any transport call.
    #[error("{0}")]
    Validation(String),

    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error("rate limited; server asked to wait {}ms", .retry_after.as_millis())]
    RateLimited { retry_after: Duration },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Transport(TransportError),

    #[error("{0} buffer is busy with another operation")]
    Busy(BufferId),
}

impl AssistError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Api { .. } => ErrorKind::Api,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Busy(_) => ErrorKind::Busy,
        }
    }

    /// Structured report handed back to the UI layer.
    pub fn failure(&self) -> Failure {
        Failure {
            kind: self.kind(),
            message: self.to_string(),
        }
    }

    /// Whether the exchange reached the remote endpoint at all.
    pub fn reached_transport(&self) -> bool {
        !matches!(self, Self::Validation(_) | Self::Busy(_))
    }
}

impl From<TransportError> for AssistError {
    fn from(error: TransportError) -> Self {
        match error.root_cause() {
            TransportError::MissingCredential => {
                return Self::Validation("API credential is required".to_owned())
            }
            TransportError::Auth { message } => {
                return Self::Auth {
                    message: message.clone(),
                }
            }
            TransportError::RateLimited { retry_after } => {
                return Self::RateLimited {
                    retry_after: *retry_after,
                }
            }
            TransportError::Api { status, message } => {
                return Self::Api {
                    status: status.as_u16(),
                    message: message.clone(),
                }
            }
            _ => {}
        }
        Self::Transport(error)
    }
}

/// Stable discriminant for surfaced failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Auth,
    RateLimited,
    Api,
    Transport,
    Busy,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::RateLimited => "rate_limited",
            Self::Api => "api",
            Self::Transport => "transport",
            Self::Busy => "busy",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Error as JsonError, Value};

#[derive(Debug)]
pub enum TransportError {
    MissingCredential,
    InvalidHeader(String),
    /// 401: the credential was rejected.
    Auth {
        message: String,
    },
    /// 429 observed; only surfaced wrapped in [`TransportError::RetryExhausted`].
    RateLimited {
        retry_after: Duration,
    },
    /// Any other non-success status.
    Api {
        status: StatusCode,
        message: String,
    },
    /// The exchange never completed.
    Network(reqwest::Error),
    RetryExhausted {
        attempts: u32,
        last: Box<TransportError>,
    },
    MalformedResponse(String),
    StreamFailed {
        code: Option<String>,
        message: String,
    },
    Serde(JsonError),
}

impl TransportError {
    /// The error that actually ended the exchange, looking through retry exhaustion.
    pub fn root_cause(&self) -> &TransportError {
        match self {
            Self::RetryExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }

    /// HTTP status carried by the root cause, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self.root_cause() {
            Self::Auth { .. } => Some(StatusCode::UNAUTHORIZED),
            Self::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "API credential is required"),
            Self::InvalidHeader(message) => write!(f, "invalid header: {message}"),
            Self::Auth { message } => write!(f, "authentication failed (401): {message}"),
            Self::RateLimited { retry_after } => {
                write!(f, "rate limited (429), retry after {}ms", retry_after.as_millis())
            }
            Self::Api { status, message } => write!(f, "API error ({}): {message}", status.as_u16()),
            Self::Network(error) => write!(f, "network error: {error}"),
            Self::RetryExhausted { attempts, last } => {
                write!(f, "retry exhausted after {attempts} attempts: {last}")
            }
            Self::MalformedResponse(message) => write!(f, "malformed response: {message}"),
            Self::StreamFailed { code, message } => match code {
                Some(code) if !code.trim().is_empty() => {
                    write!(f, "stream failed ({code}): {message}")
                }
                _ => write!(f, "stream failed: {message}"),
            },
            Self::Serde(error) => write!(f, "serialization error: {error}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Network(error) => Some(error),
            Self::Serde(error) => Some(error),
            Self::RetryExhausted { last, .. } => Some(last.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error)
    }
}

impl From<JsonError> for TransportError {
    fn from(error: JsonError) -> Self {
        Self::Serde(error)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: Option<ErrorPayloadFields>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayloadFields {
    message: Option<String>,
}

/// Reduce an upstream error body to its diagnostic message.
///
/// `{"error":{"message":..}}` bodies yield the message; anything else is kept
/// verbatim, and an empty body falls back to the status reason.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .and_then(|payload| payload.error)
        .and_then(|error| error.message)
        .filter(|message| !message.trim().is_empty());
    if let Some(message) = message {
        return message;
    }

    if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

/// Render an upstream `code` field, which may be numeric or textual.
pub(crate) fn code_to_string(code: &Value) -> Option<String> {
    match code {
        Value::String(value) if !value.is_empty() => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

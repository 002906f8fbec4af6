//! Transport-only OpenRouter chat-completion client primitives.
//!
//! This crate owns request building, retry classification, and response
//! decoding for the chat-completions endpoint only. It holds no credential
//! storage, does no logging, and knows nothing about editor buffers.
//!
//! Retries are reported to the caller through [`RetryNotice`] callbacks so the
//! host decides how (and whether) to log them. Streaming responses are exposed
//! as a [`DeltaStream`] that is consumed exactly once.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod headers;
pub mod payload;
pub mod retry;
pub mod sse;
pub mod stream;
pub mod url;

pub use client::{credential_looks_valid, OpenRouterClient};
pub use config::OpenRouterConfig;
pub use error::TransportError;
pub use events::{ChatCompletionChunk, ChatCompletionResponse};
pub use payload::{ChatMessage, ChatRole, CompletionPayload};
pub use retry::{RetryDecision, RetryNotice, RetryPolicy};
pub use sse::{DecodedFrame, SseDeltaDecoder};
pub use stream::DeltaStream;
pub use url::normalize_completions_url;

pub use reqwest::StatusCode;

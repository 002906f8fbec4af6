use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use openrouter_api::CompletionPayload;

use crate::error::AssistError;

/// Lazily produced text deltas for one streaming exchange. Consumed once.
pub type TextDeltaStream = Pin<Box<dyn Stream<Item = Result<String, AssistError>> + Send>>;

/// Seam between the controller and a completion backend.
#[async_trait]
pub trait CompletionProvider: Send + Sync + 'static {
    fn provider_id(&self) -> &str;

    /// Single-shot exchange returning the reply text.
    async fn complete(
        &self,
        payload: CompletionPayload,
        credential: &str,
    ) -> Result<String, AssistError>;

    /// Streaming exchange. Errors before the first byte are returned directly;
    /// later failures arrive through the stream.
    async fn stream(
        &self,
        payload: CompletionPayload,
        credential: &str,
    ) -> Result<TextDeltaStream, AssistError>;
}

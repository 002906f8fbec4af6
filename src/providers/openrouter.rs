use async_trait::async_trait;
use futures_util::StreamExt;
use openrouter_api::{CompletionPayload, OpenRouterClient, OpenRouterConfig, RetryNotice};
use tracing::{debug, warn};

use crate::error::AssistError;
use crate::provider::{CompletionProvider, TextDeltaStream};

pub const PROVIDER_ID: &str = "openrouter";

/// Live provider backed by the OpenRouter chat-completions endpoint.
#[derive(Debug)]
pub struct OpenRouterProvider {
    client: OpenRouterClient,
}

impl OpenRouterProvider {
    pub fn new(config: OpenRouterConfig) -> Result<Self, AssistError> {
        Ok(Self {
            client: OpenRouterClient::new(config)?,
        })
    }

    pub fn client(&self) -> &OpenRouterClient {
        &self.client
    }
}

fn log_retry(notice: &RetryNotice<'_>) {
    warn!(
        attempt = notice.attempt,
        max_attempts = notice.max_attempts,
        delay_ms = u64::try_from(notice.delay.as_millis()).unwrap_or(u64::MAX),
        error = %notice.error,
        "retrying completion request"
    );
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    async fn complete(
        &self,
        payload: CompletionPayload,
        credential: &str,
    ) -> Result<String, AssistError> {
        debug!(model = %payload.model, messages = payload.messages.len(), "sending completion");
        let text = self.client.complete(&payload, credential, log_retry).await?;
        Ok(text)
    }

    async fn stream(
        &self,
        payload: CompletionPayload,
        credential: &str,
    ) -> Result<TextDeltaStream, AssistError> {
        debug!(model = %payload.model, messages = payload.messages.len(), "opening completion stream");
        let deltas = self.client.stream(&payload, credential, log_retry).await?;
        Ok(Box::pin(deltas.map(|delta| delta.map_err(AssistError::from))))
    }
}

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};

use crate::config::OpenRouterConfig;
use crate::error::{parse_error_message, TransportError};
use crate::events::ChatCompletionResponse;
use crate::headers::build_headers;
use crate::payload::CompletionPayload;
use crate::retry::{RetryDecision, RetryNotice};
use crate::stream::DeltaStream;
use crate::url::normalize_completions_url;

/// Prefix OpenRouter keys conventionally carry.
pub const CREDENTIAL_PREFIX: &str = "sk-";

/// Advisory format check for a credential. Never enforced by the client.
pub fn credential_looks_valid(token: &str) -> bool {
    let token = token.trim();
    token.starts_with(CREDENTIAL_PREFIX) && token.len() > 10
}

#[derive(Debug)]
pub struct OpenRouterClient {
    http: Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(TransportError::from)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OpenRouterConfig {
        &self.config
    }

    pub fn endpoint(&self) -> String {
        normalize_completions_url(&self.config.base_url)
    }

    pub fn build_headers(
        &self,
        credential: &str,
        streaming: bool,
    ) -> Result<HeaderMap, TransportError> {
        let headers = build_headers(&self.config, credential, streaming)?;
        let mut out = HeaderMap::new();
        for (key, value) in headers {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| TransportError::InvalidHeader(format!("invalid header key: {key}")))?,
                HeaderValue::from_str(&value).map_err(|_| {
                    TransportError::InvalidHeader(format!("invalid header value for {key}"))
                })?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        payload: &CompletionPayload,
        credential: &str,
    ) -> Result<reqwest::RequestBuilder, TransportError> {
        let headers = self.build_headers(credential, payload.is_streaming())?;
        Ok(self.http.post(self.endpoint()).headers(headers).json(payload))
    }

    /// Perform one exchange under the configured retry policy.
    ///
    /// `on_retry` is invoked before every backoff sleep; nothing is logged here.
    pub async fn send_with_retry<F>(
        &self,
        payload: &CompletionPayload,
        credential: &str,
        mut on_retry: F,
    ) -> Result<Response, TransportError>
    where
        F: FnMut(&RetryNotice<'_>),
    {
        let policy = self.config.retry;
        let max_attempts = policy.attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let request = self.build_request(payload, credential)?;

            let (error, delay) = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_owned);

                    match policy.classify_status(status.as_u16(), retry_after.as_deref()) {
                        RetryDecision::Success => return Ok(response),
                        RetryDecision::Fail => {
                            let body = read_error_body(response).await;
                            return Err(TransportError::Auth {
                                message: parse_error_message(status, &body),
                            });
                        }
                        RetryDecision::RetryAfter(delay) if status == StatusCode::TOO_MANY_REQUESTS => {
                            (TransportError::RateLimited { retry_after: delay }, delay)
                        }
                        RetryDecision::RetryAfter(delay) => {
                            let body = read_error_body(response).await;
                            let error = TransportError::Api {
                                status,
                                message: parse_error_message(status, &body),
                            };
                            (error, delay)
                        }
                    }
                }
                Err(error) => (TransportError::Network(error), policy.network_backoff()),
            };

            if attempt >= max_attempts {
                return Err(TransportError::RetryExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            on_retry(&RetryNotice {
                attempt,
                max_attempts,
                delay,
                error: &error,
            });
            tokio::time::sleep(delay).await;
        }
    }

    /// Single-shot exchange returning `choices[0].message.content`.
    pub async fn complete<F>(
        &self,
        payload: &CompletionPayload,
        credential: &str,
        on_retry: F,
    ) -> Result<String, TransportError>
    where
        F: FnMut(&RetryNotice<'_>),
    {
        let mut payload = payload.clone();
        payload.stream = None;

        let response = self.send_with_retry(&payload, credential, on_retry).await?;
        let body = response.text().await?;
        let parsed = serde_json::from_str::<ChatCompletionResponse>(&body)?;
        parsed
            .first_content()
            .map(str::to_owned)
            .ok_or_else(|| {
                TransportError::MalformedResponse(
                    "response has no choices[0].message.content".to_owned(),
                )
            })
    }

    /// Streaming exchange; the returned deltas must be consumed exactly once.
    pub async fn stream<F>(
        &self,
        payload: &CompletionPayload,
        credential: &str,
        on_retry: F,
    ) -> Result<DeltaStream, TransportError>
    where
        F: FnMut(&RetryNotice<'_>),
    {
        let payload = payload.clone().streaming();
        let response = self.send_with_retry(&payload, credential, on_retry).await?;
        Ok(DeltaStream::from_response(response))
    }
}

async fn read_error_body(response: Response) -> String {
    let status = response.status();
    response.text().await.unwrap_or_else(|_| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    })
}

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use openrouter_api::{CompletionPayload, TransportError};
use tokio::sync::Notify;

use crate::error::AssistError;
use crate::lock_unpoisoned;
use crate::provider::{CompletionProvider, TextDeltaStream};

pub const PROVIDER_ID: &str = "scripted";

/// One canned exchange outcome.
#[derive(Debug)]
pub enum ScriptedReply {
    Complete(String),
    Stream(Vec<String>),
    /// Yields `chunks`, then fails mid-stream.
    StreamThenFail {
        chunks: Vec<String>,
        error: AssistError,
    },
    Fail(AssistError),
}

impl ScriptedReply {
    pub fn stream<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stream(chunks.into_iter().map(Into::into).collect())
    }
}

/// Deterministic provider that replays queued replies in order and records
/// every payload it receives.
///
/// With a gate installed, each exchange waits for one `notify_one` before
/// answering, which lets tests hold an operation in flight.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<CompletionPayload>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn push(&self, reply: ScriptedReply) {
        lock_unpoisoned(&self.replies).push_back(reply);
    }

    pub fn calls(&self) -> Vec<CompletionPayload> {
        lock_unpoisoned(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock_unpoisoned(&self.calls).len()
    }

    async fn next_reply(&self, payload: CompletionPayload) -> Result<ScriptedReply, AssistError> {
        lock_unpoisoned(&self.calls).push(payload);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        lock_unpoisoned(&self.replies).pop_front().ok_or_else(|| {
            AssistError::Transport(TransportError::MalformedResponse(
                "no scripted reply queued".to_owned(),
            ))
        })
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    async fn complete(
        &self,
        payload: CompletionPayload,
        _credential: &str,
    ) -> Result<String, AssistError> {
        match self.next_reply(payload).await? {
            ScriptedReply::Complete(text) => Ok(text),
            ScriptedReply::Stream(chunks) => Ok(chunks.concat()),
            ScriptedReply::StreamThenFail { error, .. } | ScriptedReply::Fail(error) => Err(error),
        }
    }

    async fn stream(
        &self,
        payload: CompletionPayload,
        _credential: &str,
    ) -> Result<TextDeltaStream, AssistError> {
        let items: Vec<Result<String, AssistError>> = match self.next_reply(payload).await? {
            ScriptedReply::Complete(text) => vec![Ok(text)],
            ScriptedReply::Stream(chunks) => chunks.into_iter().map(Ok).collect(),
            ScriptedReply::StreamThenFail { chunks, error } => chunks
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(error)))
                .collect(),
            ScriptedReply::Fail(error) => return Err(error),
        };
        Ok(Box::pin(stream::iter(items)))
    }
}

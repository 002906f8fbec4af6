//! AI interaction core for a three-buffer web editor.
//!
//! Invariant: every buffer write goes through [`SyncEngine`] under a
//! [`sync::BufferLease`], so at most one operation writes a buffer at a time.
//!
//! # Public API Overview
//! - Drive the chat, agent, and enhance workflows through [`AssistController`].
//! - Plug in a backend with [`CompletionProvider`]; [`providers::OpenRouterProvider`]
//!   talks to the real endpoint, [`providers::ScriptedProvider`] replays canned replies.
//! - Reach the editor through [`EditorBuffers`] and the conversation view through
//!   [`Transcript`].
//! - Parse model replies with [`fence::extract`].

use std::sync::{Mutex, MutexGuard};

pub mod buffer;
pub mod config;
pub mod controller;
pub mod error;
pub mod fence;
pub mod logging;
pub mod models;
pub mod prompts;
pub mod provider;
pub mod providers;
pub mod session;
pub mod stats;
pub mod sync;
pub mod transcript;

pub use crate::buffer::{ActionScope, BufferId, CodeSnapshot, EditorBuffers, InMemoryBuffers};
pub use crate::config::{AssistConfig, ConfigError};
pub use crate::controller::{AssistController, Completed, Phase};
pub use crate::error::{AssistError, ErrorKind, Failure};
pub use crate::fence::ParsedFence;
pub use crate::models::{ModelDescriptor, ModelRegistry};
pub use crate::provider::{CompletionProvider, TextDeltaStream};
pub use crate::session::Session;
pub use crate::stats::{ApiStats, RecordOutcome, RequestRecord, Workflow};
pub use crate::sync::SyncEngine;
pub use crate::transcript::{NullTranscript, RecordingTranscript, Transcript, TranscriptEntry};

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

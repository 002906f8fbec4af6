//! Per-session state: credential, model selection, statistics, active buffer.
//!
//! Created when the editor session starts and dropped when it ends. The
//! controller owns it and is the only thing that mutates it.

use openrouter_api::credential_looks_valid;

use crate::buffer::BufferId;
use crate::models::{ModelDescriptor, ModelRegistry};
use crate::stats::{ApiStats, RequestRecord};

#[derive(Debug, Clone, Default)]
pub struct Session {
    credential: Option<String>,
    models: ModelRegistry,
    stats: ApiStats,
    active_buffer: ActiveBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveBuffer(BufferId);

impl Default for ActiveBuffer {
    fn default() -> Self {
        Self(BufferId::Markup)
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.set_credential(credential);
        self
    }

    pub fn with_models(mut self, models: ModelRegistry) -> Self {
        self.models = models;
        self
    }

    /// Stores the credential; a blank value clears it.
    pub fn set_credential(&mut self, credential: impl Into<String>) {
        let credential = credential.into();
        let trimmed = credential.trim();
        self.credential = (!trimmed.is_empty()).then(|| trimmed.to_owned());
    }

    pub fn clear_credential(&mut self) {
        self.credential = None;
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    /// Advisory only: the endpoint stays the authority on validity.
    pub fn credential_looks_valid(&self) -> bool {
        self.credential.as_deref().is_some_and(credential_looks_valid)
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn models_mut(&mut self) -> &mut ModelRegistry {
        &mut self.models
    }

    pub fn current_model(&self) -> &ModelDescriptor {
        self.models.selected()
    }

    pub fn stats(&self) -> &ApiStats {
        &self.stats
    }

    pub(crate) fn record(&mut self, record: RequestRecord) {
        self.stats.record(record);
    }

    pub fn active_buffer(&self) -> BufferId {
        self.active_buffer.0
    }

    pub fn set_active_buffer(&mut self, buffer: BufferId) {
        self.active_buffer = ActiveBuffer(buffer);
    }
}

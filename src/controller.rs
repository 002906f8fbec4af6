//! Chat, agent, and enhance workflows.
//!
//! Each workflow validates its input and credential first, then claims the
//! buffers it may write, and only then talks to the provider. A rejected
//! request never reaches the network and leaves no record.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use openrouter_api::CompletionPayload;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::buffer::{ActionScope, BufferId, CodeSnapshot, EditorBuffers};
use crate::error::AssistError;
use crate::fence;
use crate::lock_unpoisoned;
use crate::models::ModelDescriptor;
use crate::prompts;
use crate::provider::CompletionProvider;
use crate::session::Session;
use crate::stats::{ApiStats, RecordOutcome, RequestRecord, Workflow};
use crate::sync::SyncEngine;
use crate::transcript::{NullTranscript, Transcript, TranscriptEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Sending,
    AwaitingResponse,
    Streaming,
    Applying,
    Error,
}

/// Successful workflow result plus the record it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed<T> {
    pub value: T,
    pub record: RequestRecord,
}

#[derive(Debug, Default)]
struct PhaseLog {
    current: Option<Phase>,
    history: Vec<Phase>,
}

/// Phase transitions for one in-flight operation.
struct Operation<'a> {
    log: &'a Mutex<PhaseLog>,
    workflow: Workflow,
    model: ModelDescriptor,
    started: Instant,
}

impl Operation<'_> {
    fn enter(&self, phase: Phase) {
        let mut log = lock_unpoisoned(self.log);
        log.current = Some(phase);
        log.history.push(phase);
    }
}

pub struct AssistController {
    provider: Arc<dyn CompletionProvider>,
    sync: SyncEngine,
    transcript: Arc<dyn Transcript>,
    session: Mutex<Session>,
    phases: Mutex<PhaseLog>,
}

impl AssistController {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        buffers: Arc<dyn EditorBuffers>,
        session: Session,
    ) -> Self {
        Self {
            provider,
            sync: SyncEngine::new(buffers),
            transcript: Arc::new(NullTranscript),
            session: Mutex::new(session),
            phases: Mutex::new(PhaseLog::default()),
        }
    }

    pub fn with_transcript(mut self, transcript: Arc<dyn Transcript>) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn phase(&self) -> Phase {
        lock_unpoisoned(&self.phases).current.unwrap_or(Phase::Idle)
    }

    /// Transitions of the most recently started operation, ending in `Idle`
    /// once it has finished.
    pub fn phase_history(&self) -> Vec<Phase> {
        lock_unpoisoned(&self.phases).history.clone()
    }

    pub fn session(&self) -> Session {
        lock_unpoisoned(&self.session).clone()
    }

    pub fn stats(&self) -> ApiStats {
        lock_unpoisoned(&self.session).stats().clone()
    }

    pub fn buffers(&self) -> &Arc<dyn EditorBuffers> {
        self.sync.buffers()
    }

    pub fn is_busy(&self, buffer: BufferId) -> bool {
        self.sync.is_busy(buffer)
    }

    pub fn set_credential(&self, credential: &str) {
        lock_unpoisoned(&self.session).set_credential(credential);
    }

    pub fn select_model(&self, id: &str) -> Result<ModelDescriptor, AssistError> {
        lock_unpoisoned(&self.session)
            .models_mut()
            .select(id)
            .cloned()
    }

    pub fn add_model(&self, id: &str, display_name: &str) -> Result<ModelDescriptor, AssistError> {
        let mut session = lock_unpoisoned(&self.session);
        let added = session.models_mut().add(id, display_name)?.clone();
        info!(model = %added.id, name = %added.display_name, "added custom model");
        Ok(added)
    }

    pub fn set_active_buffer(&self, buffer: BufferId) {
        lock_unpoisoned(&self.session).set_active_buffer(buffer);
    }

    /// Advisory chat. Posts the exchange to the transcript; never touches buffers.
    pub async fn run_chat(&self, message: &str) -> Result<Completed<String>, AssistError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AssistError::validation("message must not be empty"));
        }
        let (credential, model) = self.request_context()?;

        self.transcript.post(TranscriptEntry::User(message.to_owned()));
        let snapshot = CodeSnapshot::capture(self.buffers().as_ref());
        let payload = CompletionPayload::new(
            model.id.clone(),
            prompts::chat_messages(message, &snapshot),
        );

        let operation = self.begin(Workflow::Chat, model);
        operation.enter(Phase::AwaitingResponse);
        match self.provider.complete(payload, &credential).await {
            Ok(reply) => {
                operation.enter(Phase::Applying);
                self.transcript.post(TranscriptEntry::Assistant(reply.clone()));
                let record = self.finish(&operation);
                Ok(Completed { value: reply, record })
            }
            Err(error) => {
                self.transcript
                    .post(TranscriptEntry::System(format!("Error: {error}")));
                Err(self.fail(&operation, error))
            }
        }
    }

    /// Directive edit: fences in the reply replace in-scope buffers wholesale.
    pub async fn run_agent(
        &self,
        instruction: &str,
        scope: ActionScope,
    ) -> Result<Completed<BTreeSet<BufferId>>, AssistError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(AssistError::validation("instruction must not be empty"));
        }
        let (credential, model) = self.request_context()?;
        let lease = self.sync.acquire(&scope.buffers())?;

        let snapshot = CodeSnapshot::capture(self.buffers().as_ref());
        let payload = CompletionPayload::new(
            model.id.clone(),
            prompts::agent_messages(instruction, scope, &snapshot),
        );

        let operation = self.begin(Workflow::Agent, model);
        operation.enter(Phase::AwaitingResponse);
        let reply = match self.provider.complete(payload, &credential).await {
            Ok(reply) => reply,
            Err(error) => return Err(self.fail(&operation, error)),
        };

        operation.enter(Phase::Applying);
        let fences = fence::extract(&reply);
        let applied = self.sync.apply_fences(&lease, &fences, scope);
        drop(lease);

        let record = self.finish(&operation);
        info!(modified = ?applied, "agent changes applied");
        Ok(Completed {
            value: applied,
            record,
        })
    }

    /// Streams an improved version of `buffer` straight into it.
    ///
    /// A failure mid-stream leaves whatever was already written.
    pub async fn run_enhance(&self, buffer: BufferId) -> Result<Completed<String>, AssistError> {
        let (credential, model) = self.request_context()?;
        let lease = self.sync.acquire(&[buffer])?;

        let code = self.buffers().read_all(buffer);
        if code.trim().is_empty() {
            return Err(AssistError::validation(format!(
                "{buffer} buffer is empty; nothing to enhance"
            )));
        }
        let payload = CompletionPayload::new(
            model.id.clone(),
            prompts::enhance_messages(buffer, &code),
        );

        let operation = self.begin(Workflow::Enhance, model);
        let deltas = match self.provider.stream(payload, &credential).await {
            Ok(deltas) => deltas,
            Err(error) => return Err(self.fail(&operation, error)),
        };

        operation.enter(Phase::Streaming);
        let written = match self.sync.apply_stream(&lease, buffer, deltas).await {
            Ok(written) => written,
            Err(error) => return Err(self.fail(&operation, error)),
        };
        drop(lease);

        operation.enter(Phase::Applying);
        let record = self.finish(&operation);
        Ok(Completed {
            value: written,
            record,
        })
    }

    pub async fn run_enhance_active(&self) -> Result<Completed<String>, AssistError> {
        let buffer = lock_unpoisoned(&self.session).active_buffer();
        self.run_enhance(buffer).await
    }

    fn request_context(&self) -> Result<(String, ModelDescriptor), AssistError> {
        let session = lock_unpoisoned(&self.session);
        let Some(credential) = session.credential() else {
            return Err(AssistError::validation(
                "API credential is not configured; set an OpenRouter key first",
            ));
        };
        Ok((credential.to_owned(), session.current_model().clone()))
    }

    fn begin(&self, workflow: Workflow, model: ModelDescriptor) -> Operation<'_> {
        {
            let mut log = lock_unpoisoned(&self.phases);
            log.current = Some(Phase::Sending);
            log.history = vec![Phase::Sending];
        }
        debug!(workflow = workflow.as_str(), model = %model.id, "request started");
        Operation {
            log: &self.phases,
            workflow,
            model,
            started: Instant::now(),
        }
    }

    fn finish(&self, operation: &Operation<'_>) -> RequestRecord {
        let record = self.record(operation, RecordOutcome::Completed);
        operation.enter(Phase::Idle);
        info!(
            workflow = operation.workflow.as_str(),
            model = %record.model_id,
            latency_ms = record.latency_ms,
            "request completed"
        );
        record
    }

    fn fail(&self, operation: &Operation<'_>, error: AssistError) -> AssistError {
        operation.enter(Phase::Error);
        if error.reached_transport() {
            self.record(operation, RecordOutcome::Failed { kind: error.kind() });
        }
        warn!(
            workflow = operation.workflow.as_str(),
            kind = %error.kind(),
            error = %error,
            "request failed"
        );
        operation.enter(Phase::Idle);
        error
    }

    fn record(&self, operation: &Operation<'_>, outcome: RecordOutcome) -> RequestRecord {
        let record = RequestRecord::new(
            &operation.model.id,
            &operation.model.display_name,
            operation.started.elapsed(),
            operation.workflow,
            outcome,
        );
        lock_unpoisoned(&self.session).record(record.clone());
        record
    }
}

//! Request statistics and the append-only exchange log.

use std::time::Duration;

use serde::{Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Workflow {
    Chat,
    Agent,
    Enhance,
}

impl Workflow {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Agent => "agent",
            Self::Enhance => "enhance",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Completed,
    Failed { kind: ErrorKind },
}

/// One exchange that reached the transport. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestRecord {
    pub model_id: String,
    pub display_name: String,
    pub latency_ms: u64,
    #[serde(serialize_with = "serialize_rfc3339")]
    pub timestamp: OffsetDateTime,
    pub workflow: Workflow,
    pub outcome: RecordOutcome,
}

impl RequestRecord {
    pub fn new(
        model_id: &str,
        display_name: &str,
        latency: Duration,
        workflow: Workflow,
        outcome: RecordOutcome,
    ) -> Self {
        Self {
            model_id: model_id.to_owned(),
            display_name: display_name.to_owned(),
            latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            timestamp: OffsetDateTime::now_utc(),
            workflow,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == RecordOutcome::Completed
    }

    pub fn timestamp_rfc3339(&self) -> Result<String, time::error::Format> {
        self.timestamp.format(&Rfc3339)
    }
}

fn serialize_rfc3339<S: Serializer>(
    timestamp: &OffsetDateTime,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let formatted = timestamp
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiStats {
    request_count: u64,
    last_model: Option<String>,
    last_latency_ms: Option<u64>,
    records: Vec<RequestRecord>,
}

impl ApiStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `record`; only completed exchanges advance the counters.
    pub fn record(&mut self, record: RequestRecord) {
        if record.is_success() {
            self.request_count += 1;
            self.last_model = Some(record.display_name.clone());
            self.last_latency_ms = Some(record.latency_ms);
        }
        self.records.push(record);
    }

    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    pub fn last_model(&self) -> Option<&str> {
        self.last_model.as_deref()
    }

    pub fn last_latency_ms(&self) -> Option<u64> {
        self.last_latency_ms
    }

    pub fn records(&self) -> &[RequestRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ApiStats, RecordOutcome, RequestRecord, Workflow};
    use crate::error::ErrorKind;

    #[test]
    fn only_completed_exchanges_advance_counters() {
        let mut stats = ApiStats::new();
        stats.record(RequestRecord::new(
            "mistralai/mixtral-8x7b-instruct",
            "Mixtral 8x7B",
            Duration::from_millis(420),
            Workflow::Chat,
            RecordOutcome::Completed,
        ));
        stats.record(RequestRecord::new(
            "anthropic/claude-3-opus:beta",
            "Claude 3 Opus",
            Duration::from_millis(90),
            Workflow::Agent,
            RecordOutcome::Failed {
                kind: ErrorKind::Api,
            },
        ));

        assert_eq!(stats.request_count(), 1);
        assert_eq!(stats.last_model(), Some("Mixtral 8x7B"));
        assert_eq!(stats.last_latency_ms(), Some(420));
        assert_eq!(stats.records().len(), 2);
        assert!(!stats.records()[1].is_success());
    }

    #[test]
    fn records_serialize_with_rfc3339_timestamps() {
        let record = RequestRecord::new(
            "m",
            "M",
            Duration::from_millis(5),
            Workflow::Enhance,
            RecordOutcome::Failed {
                kind: ErrorKind::Transport,
            },
        );
        let value = serde_json::to_value(&record).expect("serializes");

        assert_eq!(value["workflow"], "enhance");
        assert_eq!(value["outcome"]["status"], "failed");
        assert_eq!(value["outcome"]["kind"], "transport");
        assert!(value["timestamp"].as_str().is_some_and(|ts| ts.contains('T')));
    }
}

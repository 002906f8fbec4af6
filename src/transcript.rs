//! Chat transcript seam. Rendering lives outside the core.

use std::sync::Mutex;

use crate::lock_unpoisoned;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    User(String),
    Assistant(String),
    /// Error or status note shown inline in the conversation.
    System(String),
}

pub trait Transcript: Send + Sync + 'static {
    fn post(&self, entry: TranscriptEntry);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullTranscript;

impl Transcript for NullTranscript {
    fn post(&self, _entry: TranscriptEntry) {}
}

#[derive(Debug, Default)]
pub struct RecordingTranscript {
    entries: Mutex<Vec<TranscriptEntry>>,
}

impl RecordingTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<TranscriptEntry> {
        lock_unpoisoned(&self.entries).clone()
    }
}

impl Transcript for RecordingTranscript {
    fn post(&self, entry: TranscriptEntry) {
        lock_unpoisoned(&self.entries).push(entry);
    }
}

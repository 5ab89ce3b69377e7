//! Append-only prompt transcript.
//!
//! The running prompt is modeled as an ordered list of `{role, content}`
//! entries rather than one growing string, so the wire format stays
//! swappable and is never re-parsed. `render()` produces the exact
//! concatenated prompt the model sees.

use serde::{Deserialize, Serialize};

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRole {
    /// The initial prompt: timestamp, prior conversation, capability
    /// listing, rulebook, question.
    System,
    /// Raw model output from one iteration.
    Assistant,
    /// A capability result fed back to the model.
    Observation,
    /// A corrective or continuation instruction from the loop.
    Instruction,
}

/// One entry in the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: EntryRole,
    pub content: String,
}

/// The ordered, append-only transcript of one run.
///
/// Created fresh per `run()`; there is no API for removing or editing
/// entries.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.push(EntryRole::System, content);
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(EntryRole::Assistant, content);
    }

    pub fn push_observation(&mut self, content: impl Into<String>) {
        self.push(EntryRole::Observation, content);
    }

    pub fn push_instruction(&mut self, content: impl Into<String>) {
        self.push(EntryRole::Instruction, content);
    }

    fn push(&mut self, role: EntryRole, content: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            role,
            content: content.into(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the transcript to the prompt string sent to the model:
    /// entry contents in order, separated by blank lines.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

//! Intent classifier — a cheap pre-pass over the question.
//!
//! One low-temperature model call categorizes the question so the router
//! can skip the full reasoning loop for simple cases (a greeting, a
//! follow-up about the prior conversation, a plain knowledge-base lookup).
//! Classification is advisory and must never block a query: any model or
//! parse failure falls back to a conservative `MultiStep` analysis.

use chrono::{DateTime, Utc};
use ragmind_core::ModelClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::parser::extract_json_object;

/// Question categories the router dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// Needs a local knowledge-base lookup.
    KnowledgeBase,
    /// Needs fresh data from the web.
    WebSearch,
    /// Answerable directly (common knowledge, small calculations, code).
    DirectAnswer,
    /// Refers to the prior conversation.
    Conversation,
    /// Reads or writes files.
    FileOperation,
    /// Hot topics / trend queries.
    Trending,
    /// Anything needing several capabilities; also the catch-all for
    /// unrecognized categories.
    #[serde(other)]
    MultiStep,
}

/// The classifier's verdict on one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentAnalysis {
    #[serde(default = "default_intent")]
    pub intent: IntentKind,

    /// Confidence in `[0, 1]`, clamped after parsing.
    #[serde(default = "default_confidence")]
    pub confidence: f32,

    #[serde(default)]
    pub reasoning: String,

    /// Capability names the classifier suggests.
    #[serde(default)]
    pub suggested_capabilities: Vec<String>,

    /// Decomposed sub-questions for complex queries.
    #[serde(default)]
    pub sub_questions: Vec<String>,

    /// Whether the question needs real-time data.
    #[serde(default)]
    pub needs_realtime: bool,

    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_intent() -> IntentKind {
    IntentKind::MultiStep
}

fn default_confidence() -> f32 {
    0.5
}

impl IntentAnalysis {
    /// The conservative fallback used whenever classification fails.
    fn fallback(question: &str, reason: impl Into<String>) -> Self {
        Self {
            intent: IntentKind::MultiStep,
            confidence: 0.5,
            reasoning: reason.into(),
            suggested_capabilities: Vec::new(),
            sub_questions: vec![question.to_string()],
            needs_realtime: false,
            keywords: Vec::new(),
        }
    }
}

/// Classifies questions ahead of the reasoning loop.
pub struct IntentClassifier {
    model: Arc<dyn ModelClient>,
    capability_names: Vec<String>,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn ModelClient>, capability_names: Vec<String>) -> Self {
        Self {
            model,
            capability_names,
        }
    }

    /// Analyze the question. Never fails.
    pub async fn classify(
        &self,
        question: &str,
        prior_conversation: &str,
        now: DateTime<Utc>,
    ) -> IntentAnalysis {
        let prompt = self.build_prompt(question, prior_conversation, now);

        match self.model.complete(&prompt).await {
            Ok(text) => match parse_analysis(&text) {
                Some(mut analysis) => {
                    analysis.confidence = analysis.confidence.clamp(0.0, 1.0);
                    debug!(
                        intent = ?analysis.intent,
                        confidence = analysis.confidence,
                        "intent classified"
                    );
                    analysis
                }
                None => {
                    warn!("could not parse intent analysis; using fallback");
                    IntentAnalysis::fallback(question, "could not parse intent analysis")
                }
            },
            Err(e) => {
                warn!(error = %e, "intent classification call failed; using fallback");
                IntentAnalysis::fallback(question, format!("classification call failed: {e}"))
            }
        }
    }

    fn build_prompt(
        &self,
        question: &str,
        prior_conversation: &str,
        now: DateTime<Utc>,
    ) -> String {
        let capabilities = if self.capability_names.is_empty() {
            "none".to_string()
        } else {
            self.capability_names.join(", ")
        };
        let history = if prior_conversation.trim().is_empty() {
            "none"
        } else {
            prior_conversation
        };

        format!(
            "You are a question analyst. Decide how the question below should be handled. \
            Do not answer it.\n\n\
            Current date: {}\n\
            Available capabilities: {}\n\n\
            Prior conversation:\n{}\n\n\
            Question: {}\n\n\
            Reply with a single JSON object:\n\
            ```json\n\
            {{\n\
              \"intent\": \"multi_step\",\n\
              \"confidence\": 0.0,\n\
              \"reasoning\": \"\",\n\
              \"suggested_capabilities\": [],\n\
              \"sub_questions\": [],\n\
              \"needs_realtime\": false,\n\
              \"keywords\": []\n\
            }}\n\
            ```\n\n\
            Intent values: knowledge_base (local knowledge-base lookup), web_search \
            (real-time or fresh data), direct_answer (common knowledge, small \
            calculations, code), conversation (refers to the prior conversation), \
            file_operation (reads or writes files), trending (hot topics), multi_step \
            (anything needing several capabilities).\n\n\
            Confidence must reflect how certain you are. Output only the JSON.",
            now.format("%Y-%m-%d"),
            capabilities,
            history,
            question
        )
    }
}

/// Pull the JSON object out of the model's reply: a fenced ```json block
/// first, then any bare `{...}` object.
fn parse_analysis(text: &str) -> Option<IntentAnalysis> {
    let candidate = extract_fenced_json(text)
        .or_else(|| text.find('{').and_then(|pos| extract_json_object(&text[pos..])))?;
    serde_json::from_str(candidate).ok()
}

fn extract_fenced_json(text: &str) -> Option<&str> {
    let start = text.find("```json")? + "```json".len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

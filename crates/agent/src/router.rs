//! Query router — the front door over classifier and orchestrator.
//!
//! Classifies the question first, then picks the cheapest path that can
//! answer it: a history lookup, a direct model call, a single
//! knowledge-base invocation, or the full reasoning loop. Every
//! short-circuit miss falls through to the full loop, so routing can only
//! save work, never lose an answer.

use chrono::Utc;
use ragmind_core::{CapabilityRegistry, Conversation, ModelClient};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::RunConfig;
use crate::intent::{IntentClassifier, IntentKind};
use crate::orchestrator::{Orchestrator, RunResult};

/// Capability name the router uses for direct knowledge lookups.
pub const DEFAULT_KNOWLEDGE_CAPABILITY: &str = "knowledge_search";

/// Minimum classifier confidence for bypassing the loop on a
/// knowledge-base question.
pub const KNOWLEDGE_CONFIDENCE_THRESHOLD: f32 = 0.8;

/// How many prior turns are rendered into prompts.
const HISTORY_TURNS: usize = 5;

/// Routes questions to the cheapest capable handler.
pub struct QueryRouter {
    model: Arc<dyn ModelClient>,
    capabilities: Arc<CapabilityRegistry>,
    orchestrator: Orchestrator,
    classifier: IntentClassifier,
    knowledge_capability: String,
}

impl QueryRouter {
    pub fn new(
        model: Arc<dyn ModelClient>,
        capabilities: Arc<CapabilityRegistry>,
        config: RunConfig,
    ) -> Self {
        let capability_names = capabilities
            .names()
            .into_iter()
            .map(str::to_string)
            .collect();
        Self {
            orchestrator: Orchestrator::new(model.clone(), capabilities.clone())
                .with_config(config),
            classifier: IntentClassifier::new(model.clone(), capability_names),
            model,
            capabilities,
            knowledge_capability: DEFAULT_KNOWLEDGE_CAPABILITY.to_string(),
        }
    }

    /// Override the capability name used for direct knowledge lookups.
    pub fn with_knowledge_capability(mut self, name: impl Into<String>) -> Self {
        self.knowledge_capability = name.into();
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Answer a question, consulting the classifier for a short-circuit
    /// path first. Never fails; the worst case is a failed [`RunResult`].
    pub async fn respond(&self, question: &str, conversation: &Conversation) -> RunResult {
        let history = conversation.render_recent(HISTORY_TURNS);
        let analysis = self.classifier.classify(question, &history, Utc::now()).await;

        info!(
            intent = ?analysis.intent,
            confidence = analysis.confidence,
            "routing question"
        );

        match analysis.intent {
            IntentKind::Conversation => self.answer_from_history(question, &history).await,
            IntentKind::DirectAnswer => self.answer_directly(question).await,
            IntentKind::KnowledgeBase
                if analysis.confidence >= KNOWLEDGE_CONFIDENCE_THRESHOLD =>
            {
                match self.knowledge_lookup(question).await {
                    Some(result) => result,
                    None => self.orchestrator.run(question, &history).await,
                }
            }
            _ => self.orchestrator.run(question, &history).await,
        }
    }

    /// Answer straight from the prior conversation, no tools.
    async fn answer_from_history(&self, question: &str, history: &str) -> RunResult {
        debug!("answering from conversation history");
        let prompt = format!(
            "Answer the question below using only the prior conversation. \
            If the conversation does not contain the answer, say so honestly.\n\n\
            Prior conversation:\n{history}\n\n\
            Question: {question}\n\n\
            Give the answer directly."
        );

        match self.model.complete(&prompt).await {
            Ok(answer) => short_circuit_result(
                format!("{answer}\n\nSource: conversation history"),
                Vec::new(),
            ),
            Err(e) => failed_short_circuit(format!("model call failed: {e}")),
        }
    }

    /// Answer a common-knowledge question with one model call.
    async fn answer_directly(&self, question: &str) -> RunResult {
        debug!("answering directly");
        let prompt = format!(
            "Answer the question below. It is directly answerable (common \
            knowledge, a small calculation, or code).\n\n\
            Question: {question}\n\n\
            Give an accurate, concise answer."
        );

        match self.model.complete(&prompt).await {
            Ok(answer) => short_circuit_result(answer, Vec::new()),
            Err(e) => failed_short_circuit(format!("model call failed: {e}")),
        }
    }

    /// One direct knowledge-base invocation, bypassing the loop. Returns
    /// `None` when the capability is missing or comes back empty so the
    /// caller can fall through to the full run.
    async fn knowledge_lookup(&self, question: &str) -> Option<RunResult> {
        self.capabilities.get(&self.knowledge_capability)?;

        let mut params = Map::new();
        params.insert("query".into(), Value::String(question.to_string()));
        params.insert("top_k".into(), Value::Number(3.into()));

        match self.capabilities.invoke(&self.knowledge_capability, params).await {
            Ok(result) if result.success && !result.output.is_empty() => {
                debug!("knowledge lookup short-circuit hit");
                Some(short_circuit_result(
                    result.output,
                    vec![self.knowledge_capability.clone()],
                ))
            }
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "knowledge lookup failed; falling through to full run");
                None
            }
        }
    }
}

/// A successful result produced without entering the loop: no steps, no
/// iterations.
fn short_circuit_result(answer: String, tools_used: Vec<String>) -> RunResult {
    RunResult {
        success: true,
        answer,
        steps: Vec::new(),
        tools_used,
        iterations: 0,
        reflection: None,
    }
}

fn failed_short_circuit(message: String) -> RunResult {
    RunResult {
        success: false,
        answer: message,
        steps: Vec::new(),
        tools_used: Vec::new(),
        iterations: 0,
        reflection: None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

//! Reflection critic — an advisory grounding check on the final answer.
//!
//! One extra model call asks whether the answer is strictly grounded in
//! observations or the prior conversation and cites only sources that
//! literally appeared there. A rejection is attached to the result as
//! guidance; the loop never retries on its own. A critic outage must not
//! block delivery, so every failure path is fail-open.

use ragmind_core::ModelClient;
use std::sync::Arc;
use tracing::{debug, warn};

const APPROVAL_TOKEN: &str = "APPROVED";
const REJECTION_TOKEN: &str = "RETRY:";

/// The critic's verdict on a final answer.
#[derive(Debug, Clone, PartialEq)]
pub enum CriticVerdict {
    /// The answer is grounded; nothing to report.
    Approved,
    /// The answer was rejected, with free-text guidance.
    Rejected(String),
}

/// Post-hoc grounding reviewer.
pub struct Critic {
    model: Arc<dyn ModelClient>,
}

impl Critic {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Review a final answer for grounding. Never fails: a model error is
    /// treated as approval.
    pub async fn review(
        &self,
        question: &str,
        answer: &str,
        capabilities_used: &[String],
    ) -> CriticVerdict {
        let used = if capabilities_used.is_empty() {
            "none".to_string()
        } else {
            capabilities_used.join(", ")
        };

        let prompt = format!(
            "Review the answer below for grounding.\n\n\
            Question: {question}\n\
            Answer: {answer}\n\
            Capabilities used: {used}\n\n\
            Strictly assess:\n\
            1. Is the answer based only on capability observations or the prior conversation?\n\
            2. Are all cited sources real URLs or file names that appeared in an observation?\n\
            3. Is there any invented, guessed, or outside-knowledge content?\n\n\
            If the answer is fully grounded and its sources are real, output: {APPROVAL_TOKEN}\n\
            Otherwise output: {REJECTION_TOKEN} <specific guidance>"
        );

        match self.model.complete(&prompt).await {
            Ok(text) => Self::interpret(&text),
            Err(e) => {
                warn!(error = %e, "reflection check failed; treating answer as approved");
                CriticVerdict::Approved
            }
        }
    }

    fn interpret(text: &str) -> CriticVerdict {
        if text.to_uppercase().contains(APPROVAL_TOKEN) {
            return CriticVerdict::Approved;
        }
        if let Some(pos) = text.find(REJECTION_TOKEN) {
            let suggestion = text[pos + REJECTION_TOKEN.len()..].trim();
            if !suggestion.is_empty() {
                debug!("reflection rejected the answer");
                return CriticVerdict::Rejected(suggestion.to_string());
            }
        }
        // Unrecognized critic output defaults to approval.
        CriticVerdict::Approved
    }
}

//! Planner — an advisory, upfront task plan.
//!
//! One model call asks for a numbered plan given the question and the
//! available capability names. The plan is a standalone, inspectable
//! artifact: the reasoning loop does not consume it. Failure yields an
//! empty plan, never an error.

use ragmind_core::ModelClient;
use regex_lite::Regex;
use std::sync::Arc;
use std::sync::LazyLock;
use tracing::warn;

static STEP_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Step\s+\d+:\s*(.*)$").unwrap());

/// Produces execution plans for complex tasks.
pub struct Planner {
    model: Arc<dyn ModelClient>,
}

impl Planner {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Ask the model for a numbered plan. Returns the ordered step texts;
    /// any failure returns an empty plan.
    pub async fn plan(&self, task: &str, capability_names: &[String]) -> Vec<String> {
        let capabilities = if capability_names.is_empty() {
            "none".to_string()
        } else {
            capability_names.join(", ")
        };

        let prompt = format!(
            "Analyze the task below and produce an execution plan.\n\n\
            Task: {task}\n\n\
            Available capabilities: {capabilities}\n\n\
            Output a numbered plan, one step per line:\n\
            Step 1: <concrete action>\n\
            Step 2: <concrete action>\n\n\
            Each step must be a concrete, executable action. Mind the\n\
            dependencies between steps and prefer the most direct approach."
        );

        match self.model.complete(&prompt).await {
            Ok(text) => parse_steps(&text),
            Err(e) => {
                warn!(error = %e, "planning call failed; returning empty plan");
                Vec::new()
            }
        }
    }
}

/// Parse consecutive `Step N:` lines into an ordered list. A step's text
/// continues over following lines until the next `Step` header.
fn parse_steps(text: &str) -> Vec<String> {
    let mut steps: Vec<String> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if let Some(caps) = STEP_LINE_RE.captures(line) {
            steps.push(caps[1].trim().to_string());
        } else if !line.is_empty() {
            if let Some(last) = steps.last_mut() {
                if !last.is_empty() {
                    last.push(' ');
                }
                last.push_str(line);
            }
        }
    }
    steps.retain(|s| !s.is_empty());
    steps
}

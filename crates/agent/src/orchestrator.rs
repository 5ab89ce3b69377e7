//! Reasoning orchestrator — the Thought → Action → Observation loop.
//!
//! `run()` drives up to `max_iterations` rounds of: call the model with
//! the accumulated transcript, parse the output, and either invoke the
//! requested capability (feeding the observation back) or terminate on a
//! final answer. Every fallible step is handled at its boundary, so the
//! caller always receives a [`RunResult`] — a model-call failure produces
//! a failed result with the partial transcript, never a panic or an `Err`.
//!
//! The orchestrator holds no cross-run mutable state: it takes `&self`,
//! and every run owns its own transcript and step list, so independent
//! runs may execute concurrently over the same registry and model.

use chrono::Utc;
use ragmind_core::{CapabilityRegistry, ModelClient};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::critic::{Critic, CriticVerdict};
use crate::parser::{self, ParsedAction};
use crate::prompt::build_initial_prompt;
use crate::transcript::Transcript;

/// Fixed answer text when the iteration budget runs out.
pub const EXHAUSTION_MESSAGE: &str =
    "No final answer was produced within the iteration limit.";

pub(crate) const CONTINUE_INSTRUCTION: &str = "Please continue reasoning:";
pub(crate) const REFORMAT_INSTRUCTION: &str =
    "Respond in the expected format, with either an Action or a Final Answer:";
pub(crate) const NO_ACTION_NOTE: &str =
    "No valid action detected; asked the model to follow the output format.";

/// The orchestrator's state within one run. Transient; surfaced only
/// through tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Thinking,
    Acting,
    Reflecting,
    Completed,
    Failed,
}

/// One recorded iteration of the loop. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// 1-based step number.
    pub step: usize,

    /// The reasoning text (between `Thought:` and the next marker, or the
    /// whole model output).
    pub thought: String,

    /// Invoked capability name, if this step acted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Parameters passed to the capability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_input: Option<Map<String, Value>>,

    /// Observation text fed back to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,

    /// Structured payload from the capability, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_data: Option<Value>,

    /// Reflection guidance attached to the terminal step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
}

/// The terminal result of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Whether a final answer was produced.
    pub success: bool,

    /// The final answer, the exhaustion message, or the failure text.
    pub answer: String,

    /// Ordered reasoning steps.
    pub steps: Vec<ReasoningStep>,

    /// Capability names invoked, insertion-ordered and deduplicated.
    pub tools_used: Vec<String>,

    /// Iterations consumed; equals `steps.len()`.
    pub iterations: usize,

    /// Advisory reflection guidance, if the critic rejected the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
}

impl RunResult {
    fn failed(message: String, steps: Vec<ReasoningStep>, tools_used: Vec<String>) -> Self {
        let iterations = steps.len();
        Self {
            success: false,
            answer: message,
            steps,
            tools_used,
            iterations,
            reflection: None,
        }
    }
}

/// The core state machine driving iterations.
pub struct Orchestrator {
    pub(crate) model: Arc<dyn ModelClient>,
    pub(crate) capabilities: Arc<CapabilityRegistry>,
    pub(crate) config: RunConfig,
}

impl Orchestrator {
    /// Create an orchestrator over a model and a capability set. Both are
    /// fixed for the orchestrator's lifetime.
    pub fn new(model: Arc<dyn ModelClient>, capabilities: Arc<CapabilityRegistry>) -> Self {
        Self {
            model,
            capabilities,
            config: RunConfig::default(),
        }
    }

    /// Set the run configuration.
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    /// Execute the reasoning loop to completion.
    ///
    /// `prior_conversation` is the rendered recent-dialogue block (empty
    /// string when there is none). Never returns an error: model failure,
    /// unknown capabilities, capability failure, and budget exhaustion are
    /// all folded into the result.
    pub async fn run(&self, question: &str, prior_conversation: &str) -> RunResult {
        let started = Instant::now();
        let mut state = RunState::Idle;
        set_state(&mut state, RunState::Thinking);

        let mut transcript = Transcript::new();
        transcript.push_system(build_initial_prompt(
            Utc::now(),
            prior_conversation,
            &self.capabilities.describe(),
            question,
        ));

        let mut steps: Vec<ReasoningStep> = Vec::new();
        let mut tools_used: Vec<String> = Vec::new();
        let mut iterations = 0usize;
        let mut final_answer: Option<String> = None;

        info!(
            max_iterations = self.config.max_iterations,
            capabilities = self.capabilities.len(),
            "reasoning run starting"
        );

        while iterations < self.config.max_iterations {
            iterations += 1;
            debug!(iteration = iterations, "reasoning iteration");

            let output = match self.model.complete(&transcript.render()).await {
                Ok(output) => output,
                Err(e) => {
                    set_state(&mut state, RunState::Failed);
                    warn!(error = %e, iteration = iterations, "model call failed; aborting run");
                    // The failed call produced no step; iterations tracks
                    // the recorded steps.
                    return RunResult::failed(format!("model call failed: {e}"), steps, tools_used);
                }
            };

            if self.config.verbose {
                debug!(output_len = output.len(), "model output received");
            }

            let mut step = ReasoningStep {
                step: iterations,
                thought: parser::extract_thought(&output),
                action: None,
                action_input: None,
                observation: None,
                observation_data: None,
                reflection: None,
            };

            match parser::parse_output(&output) {
                ParsedAction::FinalAnswer(answer) => {
                    final_answer = Some(answer);
                    steps.push(step);
                    break;
                }
                ParsedAction::Action { name, input } => {
                    set_state(&mut state, RunState::Acting);
                    step.action = Some(name.clone());
                    step.action_input = Some(input.clone());

                    let outcome = invoke_capability(&self.capabilities, &name, input).await;
                    step.observation = Some(outcome.text.clone());
                    step.observation_data = outcome.data;
                    if outcome.known && !tools_used.contains(&name) {
                        tools_used.push(name);
                    }

                    transcript.push_assistant(output);
                    transcript.push_observation(format!("Observation: {}", outcome.text));
                    transcript.push_instruction(CONTINUE_INSTRUCTION);
                    set_state(&mut state, RunState::Thinking);
                }
                ParsedAction::NoAction => {
                    step.observation = Some(NO_ACTION_NOTE.to_string());
                    transcript.push_assistant(output);
                    transcript.push_instruction(REFORMAT_INSTRUCTION);
                }
            }

            steps.push(step);
        }

        let mut reflection = None;
        if let Some(answer) = &final_answer {
            if self.config.enable_reflection {
                set_state(&mut state, RunState::Reflecting);
                let critic = Critic::new(self.model.clone());
                if let CriticVerdict::Rejected(suggestion) =
                    critic.review(question, answer, &tools_used).await
                {
                    if let Some(last) = steps.last_mut() {
                        last.reflection = Some(suggestion.clone());
                    }
                    reflection = Some(suggestion);
                }
            }
        }

        set_state(&mut state, RunState::Completed);
        info!(
            iterations,
            tools = tools_used.len(),
            success = final_answer.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reasoning run completed"
        );

        RunResult {
            success: final_answer.is_some(),
            answer: final_answer.unwrap_or_else(|| EXHAUSTION_MESSAGE.to_string()),
            steps,
            tools_used,
            iterations,
            reflection,
        }
    }
}

fn set_state(state: &mut RunState, next: RunState) {
    debug!(from = ?*state, to = ?next, "run state");
    *state = next;
}

pub(crate) struct InvocationOutcome {
    /// Observation text fed back to the model.
    pub text: String,
    /// Structured payload, if the capability returned one.
    pub data: Option<Value>,
    /// Whether the name resolved to a registered capability.
    pub known: bool,
}

/// Invoke a capability by name, folding every failure mode into an
/// observation. An unknown name synthesizes a failing observation listing
/// the registered names; a capability error becomes a
/// "tool execution failed" observation. Never panics, never raises.
pub(crate) async fn invoke_capability(
    capabilities: &CapabilityRegistry,
    name: &str,
    input: Map<String, Value>,
) -> InvocationOutcome {
    let Some(capability) = capabilities.get(name) else {
        warn!(capability = name, "unknown capability requested");
        return InvocationOutcome {
            text: format!(
                "unknown capability '{}'; available: {}",
                name,
                capabilities.names().join(", ")
            ),
            data: None,
            known: false,
        };
    };

    match capability.invoke(input).await {
        Ok(result) if result.success => InvocationOutcome {
            text: result.output,
            data: result.data,
            known: true,
        },
        Ok(result) => InvocationOutcome {
            text: format!(
                "tool execution failed: {}",
                result.error.unwrap_or_else(|| "unspecified error".into())
            ),
            data: result.data,
            known: true,
        },
        Err(e) => {
            warn!(capability = name, error = %e, "capability invocation failed");
            InvocationOutcome {
                text: format!("tool execution failed: {e}"),
                data: None,
                known: true,
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────

//! Streaming adapter — the reasoning loop as an incremental event stream.
//!
//! `run_stream` drives the same algorithm as [`Orchestrator::run`] in a
//! spawned task that pushes [`StreamEvent`]s into a bounded channel, and
//! returns the receiver. One task owns the state machine; the consumer
//! just pulls. Dropping the receiver abandons the run — no cancellation
//! token is threaded into in-flight capability calls.
//!
//! While the model emits fragments, a prefix scan watches for the
//! `Final Answer:` marker: fragments are buffered silently until it
//! appears, then everything after the marker streams out as
//! `answer_token` events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;

use chrono::Utc;
use ragmind_core::{CapabilityRegistry, ModelClient};

use crate::config::RunConfig;
use crate::critic::{Critic, CriticVerdict};
use crate::orchestrator::{
    CONTINUE_INSTRUCTION, Orchestrator, REFORMAT_INSTRUCTION, invoke_capability,
};
use crate::parser::{self, FINAL_ANSWER_MARKER, ParsedAction};
use crate::prompt::build_initial_prompt;
use crate::transcript::Transcript;

/// Observation text is truncated to this many characters in events; the
/// full text still goes into the transcript.
const OBSERVATION_PREVIEW_CHARS: usize = 500;

/// Events emitted during a streaming run, in the order defined by the
/// loop: `start`; per iteration `iteration`, `thinking_start`, optional
/// `answer_start`/`answer_token`s, `thinking_end`, then `action` +
/// `observation` or `answer`; after the loop optional `reflecting` /
/// `reflection_note`, then `meta` and `done`. A model failure emits
/// `error` and terminates the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// The run has started.
    Start { data: String },

    /// A new iteration is beginning.
    Iteration {
        iteration: usize,
        max: usize,
        step: usize,
    },

    /// The model call for this step is in flight.
    ThinkingStart { step: usize },

    /// The `Final Answer:` marker appeared in the output.
    AnswerStart { step: usize },

    /// A fragment of the final answer.
    AnswerToken { data: String, step: usize },

    /// The model call completed; carries the full raw output.
    ThinkingEnd { data: String, step: usize },

    /// A capability is being invoked.
    Action {
        tool: String,
        input: Map<String, Value>,
        step: usize,
    },

    /// A capability returned; text is truncated for display.
    Observation {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        step: usize,
    },

    /// The complete final answer.
    Answer { data: String, step: usize },

    /// The reflection critic is reviewing the answer.
    Reflecting { step: usize },

    /// The critic rejected the answer; carries its guidance.
    ReflectionNote { data: String, step: usize },

    /// Run summary before `done`.
    Meta {
        tools_used: Vec<String>,
        iterations: usize,
        elapsed_ms: u64,
    },

    /// A fatal error; the stream ends after this event.
    Error { message: String },

    /// The stream is complete.
    Done,
}

impl StreamEvent {
    /// Wire-level tag for this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Iteration { .. } => "iteration",
            Self::ThinkingStart { .. } => "thinking_start",
            Self::AnswerStart { .. } => "answer_start",
            Self::AnswerToken { .. } => "answer_token",
            Self::ThinkingEnd { .. } => "thinking_end",
            Self::Action { .. } => "action",
            Self::Observation { .. } => "observation",
            Self::Answer { .. } => "answer",
            Self::Reflecting { .. } => "reflecting",
            Self::ReflectionNote { .. } => "reflection_note",
            Self::Meta { .. } => "meta",
            Self::Error { .. } => "error",
            Self::Done => "done",
        }
    }
}

impl Orchestrator {
    /// Streaming variant of [`Orchestrator::run`].
    ///
    /// Spawns the loop onto the current Tokio runtime and returns the
    /// event receiver. Sends are fire-and-forget: a consumer that drops
    /// the receiver before `done` simply abandons the run.
    pub fn run_stream(&self, question: &str, prior_conversation: &str) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel::<StreamEvent>(64);

        let model = self.model.clone();
        let capabilities = self.capabilities.clone();
        let config = self.config.clone();
        let question = question.to_string();
        let prior = prior_conversation.to_string();

        tokio::spawn(async move {
            stream_task(model, capabilities, config, question, prior, tx).await;
        });

        rx
    }
}

/// Adapt the event receiver into a `futures::Stream` for SSE/WebSocket
/// style consumers.
pub fn into_stream(rx: mpsc::Receiver<StreamEvent>) -> ReceiverStream<StreamEvent> {
    ReceiverStream::new(rx)
}

async fn stream_task(
    model: Arc<dyn ModelClient>,
    capabilities: Arc<CapabilityRegistry>,
    config: RunConfig,
    question: String,
    prior_conversation: String,
    tx: mpsc::Sender<StreamEvent>,
) {
    let started = Instant::now();

    let mut transcript = Transcript::new();
    transcript.push_system(build_initial_prompt(
        Utc::now(),
        &prior_conversation,
        &capabilities.describe(),
        &question,
    ));

    let _ = tx
        .send(StreamEvent::Start {
            data: "reasoning started".into(),
        })
        .await;

    let mut tools_used: Vec<String> = Vec::new();
    let mut iterations = 0usize;
    let mut final_answer: Option<String> = None;

    while iterations < config.max_iterations {
        iterations += 1;

        let _ = tx
            .send(StreamEvent::Iteration {
                iteration: iterations,
                max: config.max_iterations,
                step: iterations,
            })
            .await;
        let _ = tx.send(StreamEvent::ThinkingStart { step: iterations }).await;

        let mut fragments = match model.stream_completion(&transcript.render()).await {
            Ok(rx) => rx,
            Err(e) => {
                warn!(error = %e, "model call failed; aborting stream");
                let _ = tx
                    .send(StreamEvent::Error {
                        message: format!("model call failed: {e}"),
                    })
                    .await;
                return;
            }
        };

        // Accumulate fragments, watching for the Final Answer marker.
        let mut raw = String::new();
        let mut in_answer = false;

        while let Some(fragment) = fragments.recv().await {
            match fragment {
                Ok(token) => {
                    raw.push_str(&token);
                    if in_answer {
                        let _ = tx
                            .send(StreamEvent::AnswerToken {
                                data: token,
                                step: iterations,
                            })
                            .await;
                    } else if let Some(pos) = raw.find(FINAL_ANSWER_MARKER) {
                        // The marker just completed, possibly mid-fragment:
                        // flush the buffered tail, then stream the rest.
                        in_answer = true;
                        let _ = tx.send(StreamEvent::AnswerStart { step: iterations }).await;
                        let tail = raw[pos + FINAL_ANSWER_MARKER.len()..].trim_start();
                        if !tail.is_empty() {
                            let _ = tx
                                .send(StreamEvent::AnswerToken {
                                    data: tail.to_string(),
                                    step: iterations,
                                })
                                .await;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "model stream interrupted; aborting");
                    let _ = tx
                        .send(StreamEvent::Error {
                            message: format!("model call failed: {e}"),
                        })
                        .await;
                    return;
                }
            }
        }

        let _ = tx
            .send(StreamEvent::ThinkingEnd {
                data: raw.clone(),
                step: iterations,
            })
            .await;

        match parser::parse_output(&raw) {
            ParsedAction::FinalAnswer(answer) => {
                let _ = tx
                    .send(StreamEvent::Answer {
                        data: answer.clone(),
                        step: iterations,
                    })
                    .await;
                final_answer = Some(answer);
                break;
            }
            ParsedAction::Action { name, input } => {
                let _ = tx
                    .send(StreamEvent::Action {
                        tool: name.clone(),
                        input: input.clone(),
                        step: iterations,
                    })
                    .await;

                let outcome = invoke_capability(&capabilities, &name, input).await;

                let mut preview: String =
                    outcome.text.chars().take(OBSERVATION_PREVIEW_CHARS).collect();
                if preview.len() < outcome.text.len() {
                    preview.push_str("...");
                }
                let _ = tx
                    .send(StreamEvent::Observation {
                        text: preview,
                        data: outcome.data.clone(),
                        step: iterations,
                    })
                    .await;

                if outcome.known && !tools_used.contains(&name) {
                    tools_used.push(name);
                }

                transcript.push_assistant(raw);
                transcript.push_observation(format!("Observation: {}", outcome.text));
                transcript.push_instruction(CONTINUE_INSTRUCTION);
            }
            ParsedAction::NoAction => {
                transcript.push_assistant(raw);
                transcript.push_instruction(REFORMAT_INSTRUCTION);
            }
        }
    }

    if let Some(answer) = &final_answer {
        if config.enable_reflection {
            let _ = tx.send(StreamEvent::Reflecting { step: iterations }).await;
            let critic = Critic::new(model.clone());
            if let CriticVerdict::Rejected(suggestion) =
                critic.review(&question, answer, &tools_used).await
            {
                let _ = tx
                    .send(StreamEvent::ReflectionNote {
                        data: suggestion,
                        step: iterations,
                    })
                    .await;
            }
        }
    }

    let _ = tx
        .send(StreamEvent::Meta {
            tools_used,
            iterations,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
        .await;
    let _ = tx.send(StreamEvent::Done).await;
}

// ── Tests ─────────────────────────────────────────────────────────────────

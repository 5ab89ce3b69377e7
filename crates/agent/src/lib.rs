//! The Ragmind reasoning orchestrator — the heart of the agent.
//!
//! A question becomes an interleaved sequence of model thoughts,
//! capability invocations, and observations, governed by a textual
//! protocol:
//!
//! 1. **Build the prompt** (timestamp + prior conversation + capability
//!    listing + rulebook + question)
//! 2. **Call the model** and parse the output into
//!    `FinalAnswer | Action | NoAction`
//! 3. **If Action**: invoke the capability, feed the observation back,
//!    loop
//! 4. **If FinalAnswer**: optionally run the reflection critic, return
//!
//! The same algorithm is exposed as a blocking [`Orchestrator::run`] and
//! as an incremental event stream (`run_stream`). An intent-classifying
//! [`QueryRouter`] sits in front and can short-circuit the loop for
//! simple questions.

pub mod config;
pub mod critic;
pub mod intent;
pub mod orchestrator;
pub mod parser;
pub mod planner;
pub mod prompt;
pub mod router;
pub mod stream;
pub mod transcript;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::RunConfig;
pub use critic::{Critic, CriticVerdict};
pub use intent::{IntentAnalysis, IntentClassifier, IntentKind};
pub use orchestrator::{
    EXHAUSTION_MESSAGE, Orchestrator, ReasoningStep, RunResult, RunState,
};
pub use parser::{ParsedAction, extract_thought, parse_output};
pub use planner::Planner;
pub use router::{DEFAULT_KNOWLEDGE_CAPABILITY, QueryRouter};
pub use stream::{StreamEvent, into_stream};
pub use transcript::{EntryRole, Transcript, TranscriptEntry};

//! Initial prompt assembly.
//!
//! The first transcript entry carries everything the model needs for the
//! whole run: the current time, the prior conversation, the capability
//! listing, the grounding/citation rulebook, and the question. Observations
//! and corrective instructions are appended by the loop afterwards.

use chrono::{DateTime, Utc};

/// Sentinel used when there is no prior conversation.
pub const NO_HISTORY_SENTINEL: &str = "none";

/// The fixed grounding and citation rulebook. The output-format section is
/// what the action parser expects back.
const RULEBOOK: &str = "\
Core rules:
1. Check the prior conversation first: if the question refers to it (\"what did I just ask\"), answer from that context without invoking any capability.
2. Real-time information (weather, news, prices) must be re-queried with a search capability even if the prior conversation already contains an answer.
3. Prefer the knowledge-base capability for knowledge questions.
4. Answers must be based only on capability observations or the prior conversation. Never invent content, sources, or URLs.
5. If the observations contain nothing relevant, say so explicitly instead of guessing.

Citation rules:
1. An answer drawn from the prior conversation cites \"Source: conversation history\".
2. Only URLs or file names that literally appear in an Observation may be cited.

Output format (follow it exactly):
Thought: <your reasoning>
Action: <capability name>
Action Input: {\"param\": \"value\"}

After an Observation is provided, continue with another Thought. When the
observations contain the answer, finish with:
Thought: <your reasoning>
Final Answer: <the answer>
<citation line>

Exactly one Action per response.";

/// Build the initial prompt for a run.
pub fn build_initial_prompt(
    now: DateTime<Utc>,
    prior_conversation: &str,
    capability_listing: &str,
    question: &str,
) -> String {
    let history = if prior_conversation.trim().is_empty() {
        NO_HISTORY_SENTINEL
    } else {
        prior_conversation
    };
    let listing = if capability_listing.is_empty() {
        "none"
    } else {
        capability_listing
    };

    format!(
        "You are a knowledge-base assistant with access to the capabilities listed below.\n\n\
        Current date and time: {}\n\n\
        Prior conversation:\n{}\n\n\
        Available capabilities:\n{}\n\n\
        {}\n\n\
        User question: {}\n\n\
        Begin your reasoning:",
        now.format("%Y-%m-%d %H:%M:%S UTC"),
        history,
        listing,
        RULEBOOK,
        question
    )
}

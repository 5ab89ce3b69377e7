//! Action parser — best-effort deserialization of raw model output.
//!
//! Model output for one iteration is an untyped message following a loose
//! textual protocol:
//!
//! ```text
//! Thought: <reasoning>
//! Action: <capability-name>
//! Action Input: {"param": "value"}
//! ```
//!
//! or, to terminate:
//!
//! ```text
//! Thought: <reasoning>
//! Final Answer: <answer>
//! ```
//!
//! This module maps that text into a tagged [`ParsedAction`] without ever
//! failing: unparseable output becomes [`ParsedAction::NoAction`] so the
//! loop can re-prompt instead of aborting. It is pure and unit-tested
//! independently of any model.

use regex_lite::Regex;
use serde_json::{Map, Number, Value};
use std::sync::LazyLock;

/// Marker that terminates a run. Checked before action detection.
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";
/// Marker naming the capability to invoke.
pub const ACTION_MARKER: &str = "Action:";
/// Marker introducing the parameter object.
pub const ACTION_INPUT_MARKER: &str = "Action Input:";
/// Marker introducing the reasoning text.
pub const THOUGHT_MARKER: &str = "Thought:";

static ACTION_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Action:\s*([A-Za-z_][A-Za-z0-9_]*)").unwrap());
static STRING_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(\w+)"\s*:\s*"([^"]*)""#).unwrap());
static NUMBER_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(\w+)"\s*:\s*(-?\d+(?:\.\d+)?)"#).unwrap());
static BOOL_PAIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(\w+)"\s*:\s*((?i:true|false))"#).unwrap());

/// The outcome of parsing one iteration of model output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedAction {
    /// The model terminated with a final answer.
    FinalAnswer(String),

    /// The model requested a capability invocation.
    Action {
        name: String,
        input: Map<String, Value>,
    },

    /// Neither marker was found — the loop should re-prompt.
    NoAction,
}

/// Parse raw model output into a [`ParsedAction`].
///
/// `Final Answer:` has priority over action detection, and its capture is
/// greedy to end-of-text: any trailing boilerplate becomes part of the
/// answer. An `Action:` without an `Action Input:` block yields an empty
/// parameter map.
pub fn parse_output(text: &str) -> ParsedAction {
    if let Some(pos) = text.find(FINAL_ANSWER_MARKER) {
        let answer = text[pos + FINAL_ANSWER_MARKER.len()..].trim();
        return ParsedAction::FinalAnswer(answer.to_string());
    }

    let Some(caps) = ACTION_NAME_RE.captures(text) else {
        return ParsedAction::NoAction;
    };
    let name = caps[1].to_string();

    let input = match text.find(ACTION_INPUT_MARKER) {
        Some(pos) => parse_action_input(text[pos + ACTION_INPUT_MARKER.len()..].trim_start()),
        None => Map::new(),
    };

    ParsedAction::Action { name, input }
}

/// Extract the reasoning text: everything between `Thought:` and the next
/// `Action:` / `Final Answer:` marker. Falls back to the whole (trimmed)
/// output when no `Thought:` marker is present.
pub fn extract_thought(text: &str) -> String {
    let Some(pos) = text.find(THOUGHT_MARKER) else {
        return text.trim().to_string();
    };
    let after = &text[pos + THOUGHT_MARKER.len()..];

    let end = [ACTION_MARKER, FINAL_ANSWER_MARKER]
        .iter()
        .filter_map(|marker| after.find(marker))
        .min()
        .unwrap_or(after.len());

    after[..end].trim().to_string()
}

/// Locate a balanced `{...}` object at the start of `text` (after leading
/// whitespace) by counting brace depth. Handles arbitrary nesting; brace
/// characters inside string literals are not special-cased. Returns `None`
/// when the text does not start with `{` or the braces never balance.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    for (i, ch) in trimmed.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&trimmed[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the content following `Action Input:`.
///
/// Strict JSON first; on failure, independently scan for quoted string
/// pairs, then numeric pairs, then boolean pairs, merging into one map
/// where the first writer wins a key.
fn parse_action_input(remaining: &str) -> Map<String, Value> {
    let Some(candidate) = extract_json_object(remaining) else {
        return Map::new();
    };

    match serde_json::from_str::<Map<String, Value>>(candidate) {
        Ok(map) => map,
        Err(_) => lenient_pairs(candidate),
    }
}

fn lenient_pairs(text: &str) -> Map<String, Value> {
    let mut map = Map::new();

    for caps in STRING_PAIR_RE.captures_iter(text) {
        let key = caps[1].to_string();
        map.entry(key)
            .or_insert_with(|| Value::String(caps[2].to_string()));
    }

    for caps in NUMBER_PAIR_RE.captures_iter(text) {
        let key = caps[1].to_string();
        if map.contains_key(&key) {
            continue;
        }
        let raw = &caps[2];
        let value = if raw.contains('.') {
            raw.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
        } else {
            raw.parse::<i64>().ok().map(|n| Value::Number(n.into()))
        };
        if let Some(value) = value {
            map.insert(key, value);
        }
    }

    for caps in BOOL_PAIR_RE.captures_iter(text) {
        let key = caps[1].to_string();
        map.entry(key)
            .or_insert_with(|| Value::Bool(caps[2].eq_ignore_ascii_case("true")));
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_answer_extracted() {
        let output = "Thought: I know this now.\nFinal Answer: 42\nSource: notes.md";
        match parse_output(output) {
            ParsedAction::FinalAnswer(answer) => {
                assert!(answer.starts_with("42"));
                // Greedy to end-of-text: the citation line is part of the answer.
                assert!(answer.contains("Source: notes.md"));
            }
            other => panic!("expected FinalAnswer, got {other:?}"),
        }
    }

    #[test]
    fn final_answer_wins_over_action() {
        let output = "Thought: done\nAction: web_search\nFinal Answer: the sky is blue";
        assert_eq!(
            parse_output(output),
            ParsedAction::FinalAnswer("the sky is blue".into())
        );
    }

    #[test]
    fn action_with_json_input() {
        let output = "Thought: search first\nAction: rag_search\nAction Input: {\"query\": \"what is RAG\"}";
        match parse_output(output) {
            ParsedAction::Action { name, input } => {
                assert_eq!(name, "rag_search");
                assert_eq!(input["query"], "what is RAG");
            }
            other => panic!("expected Action, got {other:?}"),
        }
    }

    #[test]
    fn nested_json_recovered_by_brace_counting() {
        let output = r#"Action: analyze
Action Input: {"filters": {"dates": {"from": "2024-01-01"}}, "limit": 3}
trailing commentary that is not JSON"#;
        match parse_output(output) {
            ParsedAction::Action { name, input } => {
                assert_eq!(name, "analyze");
                assert_eq!(input["filters"]["dates"]["from"], "2024-01-01");
                assert_eq!(input["limit"], 3);
            }
            other => panic!("expected Action, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_falls_back_to_pair_scanning() {
        // Trailing comma makes this invalid JSON; the lenient pass recovers
        // the string, numeric, and boolean pairs independently.
        let output = r#"Action: search
Action Input: {"query": "weather", "top_k": 5, "fresh": true,}"#;
        match parse_output(output) {
            ParsedAction::Action { input, .. } => {
                assert_eq!(input["query"], "weather");
                assert_eq!(input["top_k"], 5);
                assert_eq!(input["fresh"], true);
            }
            other => panic!("expected Action, got {other:?}"),
        }
    }

    #[test]
    fn lenient_first_match_wins_a_key() {
        let map = lenient_pairs(r#"{"q": "first", "q": "second", "q": 7}"#);
        assert_eq!(map["q"], "first");
    }

    #[test]
    fn lenient_parses_floats() {
        let map = lenient_pairs(r#"{"threshold": 0.75,}"#);
        assert_eq!(map["threshold"], 0.75);
    }

    #[test]
    fn action_without_input_gets_empty_map() {
        let output = "Thought: just list them\nAction: document_list";
        match parse_output(output) {
            ParsedAction::Action { name, input } => {
                assert_eq!(name, "document_list");
                assert!(input.is_empty());
            }
            other => panic!("expected Action, got {other:?}"),
        }
    }

    #[test]
    fn no_markers_is_no_action() {
        assert_eq!(
            parse_output("I am not sure how to proceed here."),
            ParsedAction::NoAction
        );
    }

    #[test]
    fn action_input_without_object_is_empty() {
        let output = "Action: search\nAction Input: just some words";
        match parse_output(output) {
            ParsedAction::Action { input, .. } => assert!(input.is_empty()),
            other => panic!("expected Action, got {other:?}"),
        }
    }

    #[test]
    fn unbalanced_braces_yield_none() {
        assert!(extract_json_object("{\"a\": {\"b\": 1}").is_none());
        assert!(extract_json_object("no braces here").is_none());
    }

    #[test]
    fn balanced_object_sliced_exactly() {
        let text = "  {\"a\": {\"b\": 1}} and more";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn thought_extracted_before_action() {
        let output = "Thought: I should search.\nAction: web_search\nAction Input: {}";
        assert_eq!(extract_thought(output), "I should search.");
    }

    #[test]
    fn thought_extracted_before_final_answer() {
        let output = "Thought: I have it.\nFinal Answer: 42";
        assert_eq!(extract_thought(output), "I have it.");
    }

    #[test]
    fn missing_thought_marker_uses_whole_output() {
        let output = "  some freeform rambling  ";
        assert_eq!(extract_thought(output), "some freeform rambling");
    }
}

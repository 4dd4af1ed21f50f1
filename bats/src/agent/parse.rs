//! Strict decoding of free-text model replies into tagged outcomes.
//!
//! Anything that does not decode is reported as such; callers pick the safe
//! fallback (planner: stop, verifier: CONTINUE, finalizer: sentinel).

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::state::{ConstraintCheck, ConstraintStatus, ToolCallRecord, VerificationDecision};

/// Tags with a body the decoders read.
const REGION_TAGS: [&str; 5] = ["think", "plan", "tool_code", "answer", "confidence"];
/// Body-less markers.
const MARKER_TAGS: [&str; 2] = ["continue", "stop"];

fn region_pattern(tag: &str) -> Regex {
    Regex::new(&format!(r"(?is)<{0}\s*>(.*?)</{0}\s*>", regex::escape(tag)))
        .expect("escaped tag name forms a valid pattern")
}

fn marker_pattern(tag: &str) -> Regex {
    Regex::new(&format!(r"(?i)<{}\s*/?>", regex::escape(tag)))
        .expect("escaped tag name forms a valid pattern")
}

static REGIONS: LazyLock<HashMap<&'static str, Regex>> =
    LazyLock::new(|| REGION_TAGS.iter().map(|t| (*t, region_pattern(t))).collect());

static MARKERS: LazyLock<HashMap<&'static str, Regex>> =
    LazyLock::new(|| MARKER_TAGS.iter().map(|t| (*t, marker_pattern(t))).collect());

/// Precompiled pattern for a known tag, compiled on demand otherwise.
fn cached<'a>(
    table: &'a HashMap<&'static str, Regex>,
    tag: &str,
    build: fn(&str) -> Regex,
) -> Cow<'a, Regex> {
    match table.get(tag) {
        Some(re) => Cow::Borrowed(re),
        None => Cow::Owned(build(tag)),
    }
}

/// Contents of every `<tag>…</tag>` region, trimmed, in order.
pub fn extract_all_tags(text: &str, tag: &str) -> Vec<String> {
    cached(&REGIONS, tag, region_pattern)
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Contents of the first `<tag>…</tag>` region, trimmed.
pub fn extract_tag(text: &str, tag: &str) -> Option<String> {
    extract_all_tags(text, tag).into_iter().next()
}

/// True when `text` contains `<tag/>`, `<tag />` or a bare `<tag>`.
pub fn has_marker(text: &str, tag: &str) -> bool {
    cached(&MARKERS, tag, marker_pattern).is_match(text)
}

/// Removes a surrounding markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let t = text.trim();
    match t.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.split_once('\n').map_or("", |(_, body)| body);
            rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
        }
        None => t,
    }
}

/// True for the textual "no answer" sentinel in any casing.
pub fn is_sentinel(answer: &str) -> bool {
    let a = answer.trim().trim_end_matches('.');
    a.eq_ignore_ascii_case("none") || a.is_empty()
}

/// Planner outcome after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerDecision {
    Tool(Vec<ToolCallRecord>),
    Answer(String),
    Continue,
    Stop,
}

/// Decoded planner reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerReply {
    /// Checklist update from `<plan>`.
    pub plan: Option<String>,
    /// `<think>` text, or the prose before the first tag.
    pub thought: String,
    /// `None` when no recognised outcome was found.
    pub decision: Option<PlannerDecision>,
    /// `<tool_code>` blocks that could not be decoded.
    pub rejected_calls: Vec<String>,
}

#[derive(Deserialize)]
struct RawToolCall {
    name: String,
    #[serde(default, alias = "args")]
    arguments: serde_json::Map<String, Value>,
}

/// Decodes one `<tool_code>` body. Non-string argument values are stringified.
pub fn decode_tool_call(body: &str) -> Result<ToolCallRecord, DecodeError> {
    let raw: RawToolCall = serde_json::from_str(strip_code_fence(body))
        .map_err(|e| DecodeError::Json(e.to_string()))?;
    let name = raw.name.trim();
    if name.is_empty() {
        return Err(DecodeError::Json("tool call without a name".to_string()));
    }
    Ok(ToolCallRecord::new(
        name,
        raw.arguments.into_iter().map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        }),
    ))
}

fn leading_prose(text: &str) -> &str {
    text.split('<').next().unwrap_or("").trim()
}

/// Decodes a planner reply.
///
/// Precedence: valid tool calls, then a non-empty answer, then `<continue/>`,
/// then `<stop/>`.
pub fn decode_planner(text: &str) -> PlannerReply {
    let plan = extract_tag(text, "plan").filter(|p| !p.is_empty());
    let thought = extract_tag(text, "think")
        .unwrap_or_else(|| leading_prose(text).to_string());

    let mut calls = Vec::new();
    let mut rejected_calls = Vec::new();
    for body in extract_all_tags(text, "tool_code") {
        match decode_tool_call(&body) {
            Ok(call) => calls.push(call),
            Err(e) => rejected_calls.push(format!("{} ({})", body, e)),
        }
    }

    let decision = if !calls.is_empty() {
        Some(PlannerDecision::Tool(calls))
    } else if let Some(answer) = extract_tag(text, "answer").filter(|a| !a.is_empty()) {
        Some(PlannerDecision::Answer(answer))
    } else if has_marker(text, "continue") {
        Some(PlannerDecision::Continue)
    } else if has_marker(text, "stop") {
        Some(PlannerDecision::Stop)
    } else {
        None
    };

    PlannerReply {
        plan,
        thought,
        decision,
        rejected_calls,
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("no JSON object in reply")]
    MissingJson,
    #[error("malformed JSON: {0}")]
    Json(String),
    #[error("unknown decision: {0:?}")]
    UnknownDecision(String),
}

#[derive(Deserialize)]
struct RawConstraint {
    #[serde(default, alias = "name")]
    constraint: String,
    #[serde(default)]
    status: String,
}

#[derive(Deserialize)]
struct RawVerdict {
    #[serde(default)]
    constraints: Vec<RawConstraint>,
    decision: String,
    #[serde(default)]
    justification: String,
    #[serde(default)]
    trajectory_summary: String,
}

/// Verifier reply as decoded, before the decision rule is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifierReply {
    pub decision: VerificationDecision,
    pub constraints: Vec<ConstraintCheck>,
    pub justification: String,
    pub trajectory_summary: String,
}

fn constraint_status(s: &str) -> ConstraintStatus {
    match s.trim().to_ascii_lowercase().as_str() {
        "satisfied" => ConstraintStatus::Satisfied,
        "contradicted" => ConstraintStatus::Contradicted,
        _ => ConstraintStatus::Unverifiable,
    }
}

/// Slice from the first `{` to the last `}`.
fn json_object(text: &str) -> Option<&str> {
    let text = strip_code_fence(text);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Decodes the verifier's JSON object. Fences and surrounding prose are tolerated;
/// a status other than satisfied/contradicted counts as unverifiable.
pub fn decode_verdict(text: &str) -> Result<VerifierReply, DecodeError> {
    let json = json_object(text).ok_or(DecodeError::MissingJson)?;
    let raw: RawVerdict =
        serde_json::from_str(json).map_err(|e| DecodeError::Json(e.to_string()))?;
    let decision = match raw.decision.trim().to_ascii_uppercase().as_str() {
        "SUCCESS" => VerificationDecision::Success,
        "CONTINUE" => VerificationDecision::Continue,
        "PIVOT" => VerificationDecision::Pivot,
        _ => return Err(DecodeError::UnknownDecision(raw.decision)),
    };
    Ok(VerifierReply {
        decision,
        constraints: raw
            .constraints
            .into_iter()
            .filter(|c| !c.constraint.trim().is_empty())
            .map(|c| ConstraintCheck {
                constraint: c.constraint.trim().to_string(),
                status: constraint_status(&c.status),
            })
            .collect(),
        justification: raw.justification.trim().to_string(),
        trajectory_summary: raw.trajectory_summary.trim().to_string(),
    })
}

/// Finalizer answer and optional confidence. `None` when no `<answer>` tag is present.
pub fn decode_final(text: &str) -> Option<(String, Option<f64>)> {
    let answer = extract_tag(text, "answer")?;
    let confidence = extract_tag(text, "confidence")
        .and_then(|c| c.trim().trim_end_matches('%').parse::<f64>().ok())
        .map(|c| if c > 1.0 { c / 100.0 } else { c })
        .map(|c| c.clamp(0.0, 1.0));
    Some((answer, confidence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tags_case_insensitively_across_lines() {
        let text = "x <ANSWER>\n42\n</answer> <answer>second</answer>";
        assert_eq!(extract_tag(text, "answer").as_deref(), Some("42"));
        assert_eq!(extract_all_tags(text, "answer").len(), 2);
        assert!(extract_tag(text, "plan").is_none());
    }

    #[test]
    fn markers_accept_self_closing_forms() {
        assert!(has_marker("ok <stop/>", "stop"));
        assert!(has_marker("ok <stop />", "stop"));
        assert!(has_marker("ok <Stop>", "stop"));
        assert!(!has_marker("stop", "stop"));
    }

    #[test]
    fn tags_outside_the_known_set_still_decode() {
        assert_eq!(extract_tag("<note>kept</note>", "note").as_deref(), Some("kept"));
        assert!(has_marker("<done/>", "done"));
        assert!(extract_tag("<a.b>x</a.b>", "a.b").is_some());
    }

    #[test]
    fn planner_tool_calls_stringify_arguments() {
        let reply = decode_planner(
            "<think>need data</think><plan>[ ] 1 Search</plan>\
             <tool_code>{\"name\":\"search\",\"arguments\":{\"query\":\"LangGraph workflow\",\"num_results\":3}}</tool_code>\
             <tool_code>```json\n{\"name\":\"browse\",\"args\":{\"url\":\"https://x\"}}\n```</tool_code>\
             <tool_code>{not json}</tool_code>",
        );
        assert_eq!(reply.thought, "need data");
        assert_eq!(reply.plan.as_deref(), Some("[ ] 1 Search"));
        let Some(PlannerDecision::Tool(calls)) = reply.decision else {
            panic!("expected tool decision");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments["num_results"], "3");
        assert_eq!(calls[1].arguments["url"], "https://x");
        assert_eq!(reply.rejected_calls.len(), 1);
    }

    #[test]
    fn planner_precedence_and_fallback() {
        let d = |t: &str| decode_planner(t).decision;
        assert_eq!(
            d("<answer>Paris</answer><stop/>"),
            Some(PlannerDecision::Answer("Paris".into()))
        );
        assert_eq!(d("<answer> </answer><stop/>"), Some(PlannerDecision::Stop));
        assert_eq!(d("thinking... <continue/>"), Some(PlannerDecision::Continue));
        assert_eq!(d("I am not sure what to do"), None);
        assert_eq!(d("<tool_code>[1,2]</tool_code>"), None);
        assert_eq!(decode_planner("plain prose <stop/>").thought, "plain prose");
    }

    #[test]
    fn verdict_tolerates_fences_and_prose() {
        let text = "Here you go:\n```json\n{\"constraints\":[{\"constraint\":\"is a library\",\"status\":\"Satisfied\"},\
                    {\"constraint\":\"has docs\",\"status\":\"unknown\"}],\
                    \"decision\":\"success\",\"justification\":\"ok\",\"trajectory_summary\":\"s\"}\n```";
        let v = decode_verdict(text).unwrap();
        assert_eq!(v.decision, VerificationDecision::Success);
        assert_eq!(v.constraints[0].status, ConstraintStatus::Satisfied);
        assert_eq!(v.constraints[1].status, ConstraintStatus::Unverifiable);
        assert_eq!(v.trajectory_summary, "s");
    }

    #[test]
    fn verdict_decode_errors() {
        assert_eq!(decode_verdict("no json here"), Err(DecodeError::MissingJson));
        assert!(matches!(
            decode_verdict("{\"decision\": 3}"),
            Err(DecodeError::Json(_))
        ));
        assert_eq!(
            decode_verdict("{\"decision\":\"MAYBE\"}"),
            Err(DecodeError::UnknownDecision("MAYBE".into()))
        );
    }

    #[test]
    fn final_answer_and_confidence() {
        assert_eq!(
            decode_final("<answer>42</answer><confidence>0.8</confidence>"),
            Some(("42".to_string(), Some(0.8)))
        );
        assert_eq!(
            decode_final("<answer>42</answer><confidence>90%</confidence>"),
            Some(("42".to_string(), Some(0.9)))
        );
        assert_eq!(decode_final("<answer>x</answer>"), Some(("x".into(), None)));
        assert_eq!(decode_final("just 42"), None);
    }

    #[test]
    fn sentinel_detection() {
        assert!(is_sentinel("NONE"));
        assert!(is_sentinel(" None. "));
        assert!(is_sentinel(""));
        assert!(!is_sentinel("Nonetheless"));
    }
}

//! Records exchanged between the loop components and returned to callers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sentinel answer when no confident answer could be produced.
pub const NO_ANSWER: &str = "NONE";

/// Routing tag written by the planner and consumed by `route_after_think`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    Tool,
    Answer,
    Continue,
    Stop,
}

impl fmt::Display for NextAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NextAction::Tool => "tool",
            NextAction::Answer => "answer",
            NextAction::Continue => "continue",
            NextAction::Stop => "stop",
        };
        f.write_str(s)
    }
}

/// Verifier decision; `None` until the verifier has run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationDecision {
    Success,
    Continue,
    Pivot,
    #[default]
    None,
}

impl fmt::Display for VerificationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerificationDecision::Success => "SUCCESS",
            VerificationDecision::Continue => "CONTINUE",
            VerificationDecision::Pivot => "PIVOT",
            VerificationDecision::None => "NONE",
        };
        f.write_str(s)
    }
}

/// Planner → invoker request. Argument values are strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, String>,
}

impl ToolCallRecord {
    pub fn new<I, K, V>(name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            arguments: arguments
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Arguments as a JSON object for `ToolSource::call_tool`.
    pub fn arguments_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.arguments
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

impl fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, (k, v)) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={:?}", k, v)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Ok,
    Refused,
    Failed,
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolStatus::Ok => "ok",
            ToolStatus::Refused => "refused",
            ToolStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Invoker → trajectory / tool_results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResultRecord {
    pub tool: String,
    pub status: ToolStatus,
    pub output: String,
}

impl ToolResultRecord {
    pub fn ok(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            status: ToolStatus::Ok,
            output: output.into(),
        }
    }

    pub fn refused(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            status: ToolStatus::Refused,
            output: output.into(),
        }
    }

    pub fn failed(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            status: ToolStatus::Failed,
            output: output.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolStatus::Ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintStatus {
    Satisfied,
    Contradicted,
    Unverifiable,
}

/// One independently checkable part of the question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintCheck {
    pub constraint: String,
    pub status: ConstraintStatus,
}

/// Verifier output after the decision rule has been applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub decision: VerificationDecision,
    pub trajectory_summary: String,
    pub justification: String,
    #[serde(default)]
    pub constraints: Vec<ConstraintCheck>,
}

/// Terminal output of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalOutput {
    /// The answer, or `"NONE"`.
    pub answer: String,
    pub attempts_used: u32,
    pub cost_used: f64,
}

impl FinalOutput {
    pub fn is_none(&self) -> bool {
        self.answer == NO_ANSWER
    }
}

//! Append-only research plan: steps are added or re-marked, never removed.
//!
//! The planner emits plan updates as checklist lines:
//!
//! ```text
//! [ ] 1 Find the official documentation
//! [x] 1.1 Search "LangGraph workflow" (Query=1)
//! [!] 2 Browse the tutorial page
//! ```
//!
//! Markers: `[ ]` pending, `[x]` done, `[!]` failed, `[~]` partial, `[-]` abandoned.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Done,
    Failed,
    Partial,
    Abandoned,
}

impl StepStatus {
    pub fn marker(self) -> &'static str {
        match self {
            StepStatus::Pending => "[ ]",
            StepStatus::Done => "[x]",
            StepStatus::Failed => "[!]",
            StepStatus::Partial => "[~]",
            StepStatus::Abandoned => "[-]",
        }
    }

    fn from_marker(c: char) -> Option<Self> {
        match c {
            ' ' => Some(StepStatus::Pending),
            'x' | 'X' => Some(StepStatus::Done),
            '!' => Some(StepStatus::Failed),
            '~' => Some(StepStatus::Partial),
            '-' => Some(StepStatus::Abandoned),
            _ => None,
        }
    }

    /// Pending and partial steps still need work.
    pub fn is_open(self) -> bool {
        matches!(self, StepStatus::Pending | StepStatus::Partial)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub text: String,
    pub status: StepStatus,
}

/// Ordered plan steps. Section headers (e.g. `Attempt 2`) are steps with an empty id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

/// Parses one checklist line into (status, optional id, text).
fn parse_line(line: &str) -> Option<(StepStatus, Option<String>, String)> {
    let line = line.trim();
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line)
        .trim_start();
    let mut chars = line.chars();
    if chars.next()? != '[' {
        return None;
    }
    let status = StepStatus::from_marker(chars.next()?)?;
    if chars.next()? != ']' {
        return None;
    }
    let rest = chars.as_str().trim();
    if rest.is_empty() {
        return None;
    }
    let (first, tail) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let candidate = first.trim_end_matches(['.', ')']);
    let is_id = !candidate.is_empty()
        && candidate.split('.').all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if is_id && !tail.trim().is_empty() {
        Some((status, Some(candidate.to_string()), tail.trim().to_string()))
    } else {
        Some((status, None, rest.to_string()))
    }
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps that are pending or partial.
    pub fn open_steps(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps
            .iter()
            .filter(|s| !s.id.is_empty() && s.status.is_open())
    }

    pub fn has_open_steps(&self) -> bool {
        self.open_steps().next().is_some()
    }

    fn next_top_level_id(&self) -> String {
        let max = self
            .steps
            .iter()
            .filter_map(|s| s.id.split('.').next()?.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }

    /// Appends a new pending step and returns its id.
    pub fn add_step(&mut self, text: impl Into<String>) -> String {
        let id = self.next_top_level_id();
        self.steps.push(PlanStep {
            id: id.clone(),
            text: text.into(),
            status: StepStatus::Pending,
        });
        id
    }

    /// Appends a section header line such as `Attempt 2`.
    pub fn add_section(&mut self, title: impl Into<String>) {
        self.steps.push(PlanStep {
            id: String::new(),
            text: title.into(),
            status: StepStatus::Pending,
        });
    }

    /// Merges a checklist from the planner.
    ///
    /// Steps matched by id (or, without id, by case-insensitive text) take the new
    /// status and text; unmatched steps are appended. Existing steps missing from the
    /// update are kept. Returns the number of steps added or changed.
    pub fn merge_update(&mut self, text: &str) -> usize {
        let mut changed = 0;
        for (status, id, step_text) in text.lines().filter_map(parse_line) {
            let existing = match &id {
                Some(id) => self.steps.iter_mut().find(|s| &s.id == id),
                None => self
                    .steps
                    .iter_mut()
                    .find(|s| !s.id.is_empty() && s.text.eq_ignore_ascii_case(&step_text)),
            };
            match existing {
                Some(step) => {
                    if step.status != status || step.text != step_text {
                        step.status = status;
                        step.text = step_text;
                        changed += 1;
                    }
                }
                None => {
                    let id = id.unwrap_or_else(|| self.next_top_level_id());
                    self.steps.push(PlanStep {
                        id,
                        text: step_text,
                        status,
                    });
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Re-marks every open step with `status`. Returns how many changed.
    pub fn mark_open_steps(&mut self, status: StepStatus) -> usize {
        let mut n = 0;
        for step in self.steps.iter_mut().filter(|s| !s.id.is_empty() && s.status.is_open()) {
            if step.status != status {
                step.status = status;
                n += 1;
            }
        }
        n
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("(no plan yet)");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            if step.id.is_empty() {
                write!(f, "## {}", step.text)?;
            } else {
                write!(f, "{} {} {}", step.status.marker(), step.id, step.text)?;
            }
        }
        Ok(())
    }
}

//! Session state and the records exchanged by the research loop.

mod plan;
mod records;
mod session;

pub use plan::{Plan, PlanStep, StepStatus};
pub use records::{
    ConstraintCheck, ConstraintStatus, FinalOutput, NextAction, ToolCallRecord, ToolResultRecord,
    ToolStatus, VerificationDecision, Verdict, NO_ANSWER,
};
pub use session::{ResearchRequest, ResourceTotal, SessionState};

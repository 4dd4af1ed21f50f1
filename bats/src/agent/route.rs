//! Pure routing functions for the conditional edges of the research graph.
//!
//! | from    | condition                                   | to       |
//! |---------|---------------------------------------------|----------|
//! | think   | `tool`                                      | act      |
//! | think   | `answer`                                    | finalize |
//! | think   | `continue`                                  | verify   |
//! | think   | `stop` (or nothing decided)                 | END      |
//! | verify  | SUCCESS, or PIVOT with attempts ≥ max        | finalize |
//! | verify  | CONTINUE, or PIVOT with attempts < max       | think    |

use crate::graph::END;
use crate::state::{NextAction, SessionState, VerificationDecision};

pub const NODE_THINK: &str = "think";
pub const NODE_ACT: &str = "act";
pub const NODE_VERIFY: &str = "verify";
pub const NODE_FINALIZE: &str = "finalize";

pub fn route_after_think(state: &SessionState) -> &'static str {
    match state.next_action {
        Some(NextAction::Tool) => NODE_ACT,
        Some(NextAction::Answer) => NODE_FINALIZE,
        Some(NextAction::Continue) => NODE_VERIFY,
        Some(NextAction::Stop) | None => END,
    }
}

pub fn route_after_verify(state: &SessionState) -> &'static str {
    match state.verification_decision {
        VerificationDecision::Success => NODE_FINALIZE,
        VerificationDecision::Pivot if state.attempts >= state.max_attempts => NODE_FINALIZE,
        VerificationDecision::Pivot
        | VerificationDecision::Continue
        | VerificationDecision::None => NODE_THINK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetTracker;

    fn state() -> SessionState {
        SessionState::new("q", BudgetTracker::default(), 2)
    }

    #[test]
    fn think_routes_by_next_action() {
        let mut s = state();
        assert_eq!(route_after_think(&s), END);
        for (action, to) in [
            (NextAction::Tool, NODE_ACT),
            (NextAction::Answer, NODE_FINALIZE),
            (NextAction::Continue, NODE_VERIFY),
            (NextAction::Stop, END),
        ] {
            s.next_action = Some(action);
            assert_eq!(route_after_think(&s), to, "{}", action);
        }
    }

    #[test]
    fn verify_routes_by_decision_and_attempts() {
        let mut s = state();
        s.verification_decision = VerificationDecision::Success;
        assert_eq!(route_after_verify(&s), NODE_FINALIZE);
        s.verification_decision = VerificationDecision::Continue;
        assert_eq!(route_after_verify(&s), NODE_THINK);
        s.verification_decision = VerificationDecision::Pivot;
        s.attempts = 1;
        assert_eq!(route_after_verify(&s), NODE_THINK);
        s.attempts = 2;
        assert_eq!(route_after_verify(&s), NODE_FINALIZE);
    }
}

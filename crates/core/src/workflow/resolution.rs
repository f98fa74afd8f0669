//! Step-satisfaction resolution.
//!
//! Given a step execution's snapshotted actor set, its approval mode, and
//! the decisions recorded so far, decide whether the step has concluded and
//! with which outcome. Kept pure so the transactional decision path in the
//! engine crate stays unit-testable without a database.

use crate::error::CoreError;
use crate::types::ActorId;

use super::template::{ApprovalMode, Outcome};

/// An individual approver's verdict on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    /// Database/wire string for this decision.
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
        }
    }

    /// Parse a database/wire string.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "approved" => Ok(Decision::Approved),
            "rejected" => Ok(Decision::Rejected),
            other => Err(CoreError::Validation(format!(
                "Invalid decision '{other}'. Must be one of: approved, rejected"
            ))),
        }
    }
}

/// Resolve a step, or return `None` while it is still waiting on decisions.
///
/// Rules, in order:
/// - any rejection resolves the step `Rejected` immediately, regardless of
///   mode;
/// - `Any` mode resolves with the first decision's outcome;
/// - `All` mode resolves `Approved` only once every required actor has
///   approved.
///
/// Callers guarantee `decisions` only contains actors from `required` (the
/// runtime rejects outsiders before recording).
pub fn resolve_step(
    mode: ApprovalMode,
    required: &[ActorId],
    decisions: &[(ActorId, Decision)],
) -> Option<Outcome> {
    if decisions
        .iter()
        .any(|(_, decision)| *decision == Decision::Rejected)
    {
        return Some(Outcome::Rejected);
    }

    match mode {
        ApprovalMode::Any => decisions.first().map(|_| Outcome::Approved),
        ApprovalMode::All => {
            let all_approved = required.iter().all(|actor| {
                decisions
                    .iter()
                    .any(|(decided_by, d)| decided_by == actor && *d == Decision::Approved)
            });
            all_approved.then_some(Outcome::Approved)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const ALICE: ActorId = 1;
    const BOB: ActorId = 2;
    const CAROL: ActorId = 3;

    #[test]
    fn all_mode_waits_for_every_actor() {
        let required = [ALICE, BOB];
        assert_eq!(resolve_step(ApprovalMode::All, &required, &[]), None);
        assert_eq!(
            resolve_step(ApprovalMode::All, &required, &[(ALICE, Decision::Approved)]),
            None
        );
        assert_eq!(
            resolve_step(
                ApprovalMode::All,
                &required,
                &[(ALICE, Decision::Approved), (BOB, Decision::Approved)]
            ),
            Some(Outcome::Approved)
        );
    }

    #[test]
    fn single_rejection_short_circuits_all_mode() {
        let required = [ALICE, BOB, CAROL];
        assert_eq!(
            resolve_step(
                ApprovalMode::All,
                &required,
                &[(ALICE, Decision::Approved), (BOB, Decision::Rejected)]
            ),
            Some(Outcome::Rejected)
        );
    }

    #[test]
    fn any_mode_first_decision_wins() {
        let required = [ALICE, BOB];
        assert_eq!(
            resolve_step(ApprovalMode::Any, &required, &[(BOB, Decision::Approved)]),
            Some(Outcome::Approved)
        );
        assert_eq!(
            resolve_step(ApprovalMode::Any, &required, &[(BOB, Decision::Rejected)]),
            Some(Outcome::Rejected)
        );
        assert_eq!(resolve_step(ApprovalMode::Any, &required, &[]), None);
    }

    #[test]
    fn decision_string_round_trip() {
        assert_eq!(Decision::parse("approved").unwrap(), Decision::Approved);
        assert_eq!(Decision::parse("rejected").unwrap(), Decision::Rejected);
        assert_eq!(Decision::Approved.as_str(), "approved");
        assert_matches!(Decision::parse("flagged"), Err(CoreError::Validation(_)));
    }
}

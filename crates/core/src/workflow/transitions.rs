//! Transition lookup.
//!
//! A pure lookup against a step's declared transition list. Template
//! validation guarantees every validated step covers `Approved` and
//! `Rejected` (and `Skipped` where the step is skippable), so over valid
//! templates the runtime can treat a `None` here as a fatal consistency
//! defect rather than a user error.

use super::template::{Outcome, StepDefinition, TransitionTarget};

/// Find the transition target for the given outcome, if declared.
pub fn next<'a>(step: &'a StepDefinition, outcome: Outcome) -> Option<&'a TransitionTarget> {
    step.transitions
        .iter()
        .find(|rule| rule.on == outcome)
        .map(|rule| &rule.target)
}

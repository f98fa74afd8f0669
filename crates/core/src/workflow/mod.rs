//! Approval workflow domain model.
//!
//! A workflow template is a graph of named steps. Each step is gated by
//! conditions, resolved to a set of required approvers via its actions, and
//! exited through outcome-keyed transitions that either name the next step
//! or finish the instance. Templates are validated structurally on write
//! ([`validation`]) so the runtime can treat transition lookup as total.

pub mod conditions;
pub mod resolution;
pub mod template;
pub mod transitions;
pub mod validation;

pub use conditions::{step_matches, AttributeValue, Attributes};
pub use resolution::{resolve_step, Decision};
pub use template::{
    ActionDefinition, ApprovalMode, Condition, Outcome, StepDefinition, TemplateDefinition,
    TerminalStatus, TransitionRule, TransitionTarget, TriggerType,
};

//! Structural template validation.
//!
//! Run before any template row is written; a failed validation rejects the
//! whole definition, so partial templates never persist. All problems are
//! collected into a single `Validation` error message rather than stopping
//! at the first.
//!
//! Graph rules:
//! - every step must be reachable from `initial_step`;
//! - from every reachable step some path must reach a terminal transition
//!   (cycles are allowed, but a step trapped in a cycle with no exit makes
//!   the workflow non-terminating);
//! - the subgraph of `skipped` edges must be acyclic, since a skip chain
//!   consumes no decisions and would loop at runtime without progress.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::error::CoreError;

use super::template::{
    ActionDefinition, Condition, Outcome, StepDefinition, TemplateDefinition, TransitionTarget,
};

/// Validate a template definition, collecting every structural problem.
pub fn validate_template(def: &TemplateDefinition) -> Result<(), CoreError> {
    let mut problems: Vec<String> = Vec::new();

    if def.name.trim().is_empty() {
        problems.push("template name must not be empty".into());
    }
    if def.steps.is_empty() {
        problems.push("template must contain at least one step".into());
    }

    let mut names: BTreeSet<&str> = BTreeSet::new();
    for step in &def.steps {
        if step.step_name.trim().is_empty() {
            problems.push("step names must not be empty".into());
        } else if !names.insert(step.step_name.as_str()) {
            problems.push(format!("duplicate step name '{}'", step.step_name));
        }
    }

    if !def.steps.is_empty() && !names.contains(def.initial_step.as_str()) {
        problems.push(format!(
            "initial step '{}' does not name a step in this template",
            def.initial_step
        ));
    }

    for step in &def.steps {
        check_step(step, &names, &mut problems);
    }

    // Graph checks only make sense once the local structure is sound.
    if problems.is_empty() {
        check_reachability(def, &mut problems);
        check_termination(def, &mut problems);
        check_skip_cycles(def, &mut problems);
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(CoreError::Validation(problems.join("; ")))
    }
}

fn check_step(step: &StepDefinition, names: &BTreeSet<&str>, problems: &mut Vec<String>) {
    let name = &step.step_name;

    if step.actions.is_empty() {
        problems.push(format!("step '{name}' declares no actions"));
    }

    for action in &step.actions {
        if let ActionDefinition::Role { approver_role, .. } = action {
            if approver_role.trim().is_empty() {
                problems.push(format!("step '{name}' has a role action with an empty role"));
            }
        }
    }

    for condition in &step.conditions {
        match condition {
            Condition::AmountRange {
                min_amount: None,
                max_amount: None,
            } => problems.push(format!(
                "step '{name}' has an amount_range condition with neither bound set"
            )),
            Condition::AmountRange {
                min_amount: Some(min),
                max_amount: Some(max),
            } if min > max => problems.push(format!(
                "step '{name}' has an amount_range condition with min_amount > max_amount"
            )),
            Condition::AmountRange { .. } => {}
            Condition::Category { values } => {
                if values.is_empty() {
                    problems.push(format!(
                        "step '{name}' has a category condition with no values"
                    ));
                }
            }
        }
    }

    let mut covered: BTreeSet<Outcome> = BTreeSet::new();
    for rule in &step.transitions {
        if !covered.insert(rule.on) {
            problems.push(format!(
                "step '{name}' declares more than one transition for outcome {:?}",
                rule.on
            ));
        }
        if let TransitionTarget::Step(target) = &rule.target {
            if !names.contains(target.as_str()) {
                problems.push(format!(
                    "step '{name}' transitions to unknown step '{target}'"
                ));
            }
        }
    }
    if !covered.contains(&Outcome::Approved) {
        problems.push(format!("step '{name}' has no transition for the approved outcome"));
    }
    if !covered.contains(&Outcome::Rejected) {
        problems.push(format!("step '{name}' has no transition for the rejected outcome"));
    }
    // Steps gated by conditions can be passed over at entry, so they must
    // say where a skip goes. Condition-free steps always match.
    if !step.conditions.is_empty() && !covered.contains(&Outcome::Skipped) {
        problems.push(format!(
            "step '{name}' has conditions but no transition for the skipped outcome"
        ));
    }
}

/// Outgoing step-to-step edges, all outcomes.
fn adjacency(def: &TemplateDefinition) -> BTreeMap<&str, Vec<&str>> {
    let mut edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for step in &def.steps {
        let out = edges.entry(step.step_name.as_str()).or_default();
        for rule in &step.transitions {
            if let TransitionTarget::Step(target) = &rule.target {
                out.push(target.as_str());
            }
        }
    }
    edges
}

fn check_reachability(def: &TemplateDefinition, problems: &mut Vec<String>) {
    let edges = adjacency(def);
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    seen.insert(def.initial_step.as_str());
    queue.push_back(def.initial_step.as_str());

    while let Some(current) = queue.pop_front() {
        for next in edges.get(current).into_iter().flatten() {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }

    for step in &def.steps {
        if !seen.contains(step.step_name.as_str()) {
            problems.push(format!(
                "step '{}' is unreachable from the initial step",
                step.step_name
            ));
        }
    }
}

fn check_termination(def: &TemplateDefinition, problems: &mut Vec<String>) {
    // Fixed point: a step can terminate if it has a terminal transition, or
    // any transition into a step that can terminate.
    let mut can_terminate: BTreeSet<&str> = def
        .steps
        .iter()
        .filter(|step| {
            step.transitions
                .iter()
                .any(|rule| matches!(rule.target, TransitionTarget::Terminal(_)))
        })
        .map(|step| step.step_name.as_str())
        .collect();

    let edges = adjacency(def);
    loop {
        let mut changed = false;
        for step in &def.steps {
            let name = step.step_name.as_str();
            if can_terminate.contains(name) {
                continue;
            }
            let reaches = edges
                .get(name)
                .into_iter()
                .flatten()
                .any(|next| can_terminate.contains(next));
            if reaches {
                can_terminate.insert(name);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    for step in &def.steps {
        if !can_terminate.contains(step.step_name.as_str()) {
            problems.push(format!(
                "non-terminating workflow: step '{}' has no path to a terminal outcome",
                step.step_name
            ));
        }
    }
}

fn check_skip_cycles(def: &TemplateDefinition, problems: &mut Vec<String>) {
    let mut skip_edges: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for step in &def.steps {
        for rule in &step.transitions {
            if rule.on == Outcome::Skipped {
                if let TransitionTarget::Step(target) = &rule.target {
                    skip_edges
                        .entry(step.step_name.as_str())
                        .or_default()
                        .push(target.as_str());
                }
            }
        }
    }

    // DFS with three colors over the skip subgraph.
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Open,
        Done,
    }
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();

    fn visit<'a>(
        node: &'a str,
        skip_edges: &BTreeMap<&'a str, Vec<&'a str>>,
        marks: &mut BTreeMap<&'a str, Mark>,
    ) -> bool {
        match marks.get(node) {
            Some(Mark::Open) => return true,
            Some(Mark::Done) => return false,
            None => {}
        }
        marks.insert(node, Mark::Open);
        for next in skip_edges.get(node).into_iter().flatten() {
            if visit(next, skip_edges, marks) {
                return true;
            }
        }
        marks.insert(node, Mark::Done);
        false
    }

    for step in &def.steps {
        if visit(step.step_name.as_str(), &skip_edges, &mut marks) {
            problems.push(format!(
                "skip transitions form a cycle through step '{}'",
                step.step_name
            ));
            return;
        }
    }
}

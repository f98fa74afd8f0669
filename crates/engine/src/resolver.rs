//! Actor resolution.
//!
//! Turns a step's action definitions into the concrete set of members whose
//! approval is required, using membership data behind the
//! [`MembershipDirectory`] seam. The resolved set is snapshotted into the
//! step execution at entry time; membership changes after entry never alter
//! who may decide an already-open step.

use async_trait::async_trait;
use tally_core::error::CoreError;
use tally_core::types::{ActorId, DbId};
use tally_core::workflow::template::{ActionDefinition, ApprovalMode, StepDefinition};

/// Membership/role lookup consumed from the surrounding application.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// Active members holding `role` within the organization (and
    /// department, when scoped).
    async fn list_members_with_role(
        &self,
        organization_id: DbId,
        department_id: Option<DbId>,
        role: &str,
    ) -> Result<Vec<ActorId>, CoreError>;

    /// Whether `member_id` is an active member of the organization.
    async fn is_active_member(
        &self,
        organization_id: DbId,
        member_id: ActorId,
    ) -> Result<bool, CoreError>;
}

/// A step's resolved approver snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StepActors {
    pub actor_ids: Vec<ActorId>,
    pub approval_mode: ApprovalMode,
}

/// Resolves step actions against a [`MembershipDirectory`].
pub struct ActorResolver;

impl ActorResolver {
    /// Resolve the required approver set for a step.
    ///
    /// Multi-action steps union their actor sets; the effective approval
    /// mode is `All` if any action declares it, otherwise `Any`. An empty
    /// union is a [`CoreError::NoEligibleApprover`] -- surfacing it instead
    /// of skipping keeps a missing approver from becoming a policy bypass.
    pub async fn resolve(
        directory: &dyn MembershipDirectory,
        organization_id: DbId,
        department_id: Option<DbId>,
        step: &StepDefinition,
    ) -> Result<StepActors, CoreError> {
        let mut actor_ids: Vec<ActorId> = Vec::new();
        let mut approval_mode = ApprovalMode::Any;

        for action in &step.actions {
            if action.approval_mode() == ApprovalMode::All {
                approval_mode = ApprovalMode::All;
            }
            match action {
                ActionDefinition::Role { approver_role, .. } => {
                    let members = directory
                        .list_members_with_role(organization_id, department_id, approver_role)
                        .await?;
                    for member in members {
                        if !actor_ids.contains(&member) {
                            actor_ids.push(member);
                        }
                    }
                }
                ActionDefinition::SpecificMember { member_id, .. } => {
                    if directory.is_active_member(organization_id, *member_id).await?
                        && !actor_ids.contains(member_id)
                    {
                        actor_ids.push(*member_id);
                    }
                }
            }
        }

        if actor_ids.is_empty() {
            return Err(CoreError::NoEligibleApprover {
                step: step.step_name.clone(),
            });
        }

        Ok(StepActors {
            actor_ids,
            approval_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    /// In-memory directory: (role -> members), plus an active-member set.
    struct StubDirectory {
        by_role: HashMap<String, Vec<ActorId>>,
        active: Vec<ActorId>,
    }

    #[async_trait]
    impl MembershipDirectory for StubDirectory {
        async fn list_members_with_role(
            &self,
            _organization_id: DbId,
            _department_id: Option<DbId>,
            role: &str,
        ) -> Result<Vec<ActorId>, CoreError> {
            Ok(self.by_role.get(role).cloned().unwrap_or_default())
        }

        async fn is_active_member(
            &self,
            _organization_id: DbId,
            member_id: ActorId,
        ) -> Result<bool, CoreError> {
            Ok(self.active.contains(&member_id))
        }
    }

    fn step(actions: Vec<ActionDefinition>) -> StepDefinition {
        StepDefinition {
            step_name: "review".into(),
            display_order: 0,
            description: None,
            all_conditions_must_match: true,
            conditions: vec![],
            actions,
            transitions: vec![],
        }
    }

    #[tokio::test]
    async fn resolves_role_members() {
        let directory = StubDirectory {
            by_role: HashMap::from([("admin".to_string(), vec![1, 2])]),
            active: vec![1, 2],
        };
        let resolved = ActorResolver::resolve(
            &directory,
            10,
            None,
            &step(vec![ActionDefinition::Role {
                approver_role: "admin".into(),
                approval_mode: ApprovalMode::All,
            }]),
        )
        .await
        .unwrap();
        assert_eq!(resolved.actor_ids, vec![1, 2]);
        assert_eq!(resolved.approval_mode, ApprovalMode::All);
    }

    #[tokio::test]
    async fn empty_resolution_is_an_error_not_a_skip() {
        let directory = StubDirectory {
            by_role: HashMap::new(),
            active: vec![],
        };
        let err = ActorResolver::resolve(
            &directory,
            10,
            None,
            &step(vec![ActionDefinition::Role {
                approver_role: "admin".into(),
                approval_mode: ApprovalMode::Any,
            }]),
        )
        .await
        .unwrap_err();
        assert_matches!(err, CoreError::NoEligibleApprover { step } if step == "review");
    }

    #[tokio::test]
    async fn unions_actions_and_dedupes() {
        let directory = StubDirectory {
            by_role: HashMap::from([
                ("admin".to_string(), vec![1, 2]),
                ("manager".to_string(), vec![2, 3]),
            ]),
            active: vec![1, 2, 3],
        };
        let resolved = ActorResolver::resolve(
            &directory,
            10,
            None,
            &step(vec![
                ActionDefinition::Role {
                    approver_role: "admin".into(),
                    approval_mode: ApprovalMode::Any,
                },
                ActionDefinition::Role {
                    approver_role: "manager".into(),
                    approval_mode: ApprovalMode::All,
                },
            ]),
        )
        .await
        .unwrap();
        assert_eq!(resolved.actor_ids, vec![1, 2, 3]);
        // One All action makes the whole step All.
        assert_eq!(resolved.approval_mode, ApprovalMode::All);
    }

    #[tokio::test]
    async fn inactive_specific_member_does_not_resolve() {
        let directory = StubDirectory {
            by_role: HashMap::new(),
            active: vec![],
        };
        let err = ActorResolver::resolve(
            &directory,
            10,
            None,
            &step(vec![ActionDefinition::SpecificMember {
                member_id: 42,
                approval_mode: ApprovalMode::Any,
            }]),
        )
        .await
        .unwrap_err();
        assert_matches!(err, CoreError::NoEligibleApprover { .. });
    }
}

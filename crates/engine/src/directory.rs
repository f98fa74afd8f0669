//! Postgres-backed membership directory.

use async_trait::async_trait;
use tally_core::error::CoreError;
use tally_core::types::{ActorId, DbId};
use tally_db::repositories::MemberRepo;
use tally_db::DbPool;

use crate::resolver::MembershipDirectory;

/// [`MembershipDirectory`] implementation over the `org_members` table.
#[derive(Clone)]
pub struct PgMembershipDirectory {
    pool: DbPool,
}

impl PgMembershipDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipDirectory for PgMembershipDirectory {
    async fn list_members_with_role(
        &self,
        organization_id: DbId,
        department_id: Option<DbId>,
        role: &str,
    ) -> Result<Vec<ActorId>, CoreError> {
        let members = MemberRepo::list_with_role(&self.pool, organization_id, department_id, role)
            .await
            .map_err(|e| CoreError::Internal(format!("membership lookup failed: {e}")))?;
        Ok(members.into_iter().map(|m| m.id).collect())
    }

    async fn is_active_member(
        &self,
        organization_id: DbId,
        member_id: ActorId,
    ) -> Result<bool, CoreError> {
        let member = MemberRepo::find_by_id(&self.pool, member_id)
            .await
            .map_err(|e| CoreError::Internal(format!("membership lookup failed: {e}")))?;
        Ok(member.is_some_and(|m| m.organization_id == organization_id && m.active))
    }
}

//! Repository for the `org_members` table.

use sqlx::PgPool;
use tally_core::types::{ActorId, DbId};

use crate::models::organization::{CreateOrgMember, MemberListQuery, OrgMember};

/// Column list for org_members queries.
const COLUMNS: &str =
    "id, organization_id, department_id, display_name, role, active, created_at, updated_at";

/// Provides CRUD operations for organization members.
pub struct MemberRepo;

impl MemberRepo {
    /// Insert a new member, returning the created row.
    pub async fn create(
        pool: &PgPool,
        organization_id: DbId,
        input: &CreateOrgMember,
    ) -> Result<OrgMember, sqlx::Error> {
        let query = format!(
            "INSERT INTO org_members (organization_id, department_id, display_name, role)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OrgMember>(&query)
            .bind(organization_id)
            .bind(input.department_id)
            .bind(&input.display_name)
            .bind(&input.role)
            .fetch_one(pool)
            .await
    }

    /// Find a member by its ID.
    pub async fn find_by_id(pool: &PgPool, id: ActorId) -> Result<Option<OrgMember>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM org_members WHERE id = $1");
        sqlx::query_as::<_, OrgMember>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List members of an organization, optionally filtered by role.
    pub async fn list_by_org(
        pool: &PgPool,
        organization_id: DbId,
        params: &MemberListQuery,
    ) -> Result<Vec<OrgMember>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM org_members
             WHERE organization_id = $1
               AND ($2::TEXT IS NULL OR role = $2)
             ORDER BY display_name ASC"
        );
        sqlx::query_as::<_, OrgMember>(&query)
            .bind(organization_id)
            .bind(&params.role)
            .fetch_all(pool)
            .await
    }

    /// List active members holding `role` in the given scope.
    ///
    /// Members without a department are org-wide and match any scope; when a
    /// department is given, its members match alongside the org-wide ones.
    pub async fn list_with_role(
        pool: &PgPool,
        organization_id: DbId,
        department_id: Option<DbId>,
        role: &str,
    ) -> Result<Vec<OrgMember>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM org_members
             WHERE organization_id = $1
               AND role = $2
               AND active
               AND ($3::BIGINT IS NULL OR department_id IS NULL OR department_id = $3)
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, OrgMember>(&query)
            .bind(organization_id)
            .bind(role)
            .bind(department_id)
            .fetch_all(pool)
            .await
    }

    /// Deactivate a member. Open step executions keep their snapshot; the
    /// member simply stops resolving for newly entered steps.
    pub async fn deactivate(pool: &PgPool, id: ActorId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE org_members SET active = FALSE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

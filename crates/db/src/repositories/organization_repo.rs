//! Repositories for the `organizations` and `departments` tables.

use sqlx::PgPool;
use tally_core::types::DbId;

use crate::models::organization::{CreateOrganization, Department, Organization};

/// Column list for organizations queries.
const ORG_COLUMNS: &str = "id, name, created_at, updated_at";

/// Column list for departments queries.
const DEPT_COLUMNS: &str = "id, organization_id, name, created_at";

/// Provides CRUD operations for organizations.
pub struct OrganizationRepo;

impl OrganizationRepo {
    /// Insert a new organization, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateOrganization,
    ) -> Result<Organization, sqlx::Error> {
        let query = format!(
            "INSERT INTO organizations (name) VALUES ($1) RETURNING {ORG_COLUMNS}"
        );
        sqlx::query_as::<_, Organization>(&query)
            .bind(&input.name)
            .fetch_one(pool)
            .await
    }

    /// Find an organization by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Organization>, sqlx::Error> {
        let query = format!("SELECT {ORG_COLUMNS} FROM organizations WHERE id = $1");
        sqlx::query_as::<_, Organization>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

/// Provides CRUD operations for departments.
pub struct DepartmentRepo;

impl DepartmentRepo {
    /// Insert a new department, returning the created row.
    pub async fn create(
        pool: &PgPool,
        organization_id: DbId,
        name: &str,
    ) -> Result<Department, sqlx::Error> {
        let query = format!(
            "INSERT INTO departments (organization_id, name) VALUES ($1, $2)
             RETURNING {DEPT_COLUMNS}"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(organization_id)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    /// List departments for an organization, ordered by name.
    pub async fn list_by_org(
        pool: &PgPool,
        organization_id: DbId,
    ) -> Result<Vec<Department>, sqlx::Error> {
        let query = format!(
            "SELECT {DEPT_COLUMNS} FROM departments
             WHERE organization_id = $1
             ORDER BY name ASC"
        );
        sqlx::query_as::<_, Department>(&query)
            .bind(organization_id)
            .fetch_all(pool)
            .await
    }
}

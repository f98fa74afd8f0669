//! Tenancy models: organizations, departments, and members.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tally_core::types::{DbId, Timestamp};

/// A row from the `organizations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Organization {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `departments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Department {
    pub id: DbId,
    pub organization_id: DbId,
    pub name: String,
    pub created_at: Timestamp,
}

/// A row from the `org_members` table.
///
/// `role` is free-form; templates reference roles by name in their actions.
/// A member with no `department_id` is org-wide and matches any department
/// scope during actor resolution.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrgMember {
    pub id: DbId,
    pub organization_id: DbId,
    pub department_id: Option<DbId>,
    pub display_name: String,
    pub role: String,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an organization.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
}

/// DTO for creating a department.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDepartment {
    pub name: String,
}

/// DTO for adding a member to an organization.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrgMember {
    pub display_name: String,
    pub role: String,
    pub department_id: Option<DbId>,
}

/// Query parameters for member listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberListQuery {
    pub role: Option<String>,
}

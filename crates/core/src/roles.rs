//! Well-known organization role names.
//!
//! Roles are free-form strings on membership rows; templates reference them
//! by name in `role` actions. These constants cover the roles the seed data
//! and tests use -- organizations may define additional ones.

/// Organization administrator.
pub const ROLE_ADMIN: &str = "admin";

/// Department or finance manager.
pub const ROLE_MANAGER: &str = "manager";

/// Regular member with no approval authority.
pub const ROLE_MEMBER: &str = "member";

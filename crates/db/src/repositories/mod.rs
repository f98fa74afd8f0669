//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods that
//! accept `&PgPool` (or, for methods composed into engine transactions, a
//! `&mut PgConnection`) as the first argument.

pub mod member_repo;
pub mod organization_repo;
pub mod workflow_instance_repo;
pub mod workflow_template_repo;

pub use member_repo::MemberRepo;
pub use organization_repo::{DepartmentRepo, OrganizationRepo};
pub use workflow_instance_repo::WorkflowInstanceRepo;
pub use workflow_template_repo::WorkflowTemplateRepo;

//! Row models and request DTOs, one module per table group.

pub mod organization;
pub mod status;
pub mod workflow_instance;
pub mod workflow_template;

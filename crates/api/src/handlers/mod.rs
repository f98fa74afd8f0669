//! HTTP request handlers, one module per resource.

pub mod organization;
pub mod workflow_instance;
pub mod workflow_template;

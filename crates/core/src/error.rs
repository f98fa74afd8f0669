use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An action resolved to an empty approver set (step named for context).
    /// Surfaced to the caller; never silently skipped.
    #[error("No eligible approver for step '{step}'")]
    NoEligibleApprover { step: String },

    /// A state the template validator should have made impossible.
    /// Fatal for the affected instance; requires operator attention.
    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

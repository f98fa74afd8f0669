//! Tally core domain library.
//!
//! Pure domain logic shared by the persistence, engine, and API crates:
//! workflow template definitions and validation, condition evaluation,
//! transition lookup, step-satisfaction resolution, and the common error
//! taxonomy. Nothing in this crate performs I/O.

pub mod error;
pub mod roles;
pub mod types;
pub mod workflow;

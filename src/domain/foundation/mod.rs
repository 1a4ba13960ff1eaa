//! Foundation module - Shared domain primitives.
//!
//! Contains the value objects, identifiers, and error types that form
//! the vocabulary of the AEOBRO domain.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode};
pub use ids::{ProfileId, UserId};
pub use timestamp::Timestamp;

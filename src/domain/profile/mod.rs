//! Profile domain module.
//!
//! # Module Structure
//!
//! - `profile` - Profile aggregate with visibility lifecycle

mod profile;

pub use profile::{Profile, UnpublishReason, Visibility, LAPSE_RETENTION_DAYS};

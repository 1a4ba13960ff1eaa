//! Account domain module.
//!
//! # Module Structure
//!
//! - `user` - User aggregate with billing entitlement state

mod user;

pub use user::User;

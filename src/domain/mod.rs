//! Domain layer - pure business logic with no infrastructure dependencies.
//!
//! # Modules
//!
//! - `foundation` - Shared value objects (ids, timestamps, errors)
//! - `billing` - Plans, entitlement rules, webhook verification and decoding
//! - `account` - User aggregate
//! - `profile` - Profile aggregate and visibility lifecycle

pub mod account;
pub mod billing;
pub mod foundation;
pub mod profile;

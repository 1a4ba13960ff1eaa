//! Entitlement repository port (write side).
//!
//! Defines the contract reconciliation uses to read and persist User and
//! Profile aggregates. Implementations handle the actual database
//! operations.
//!
//! # Design
//!
//! - **Two lookup keys**: billing customer id first, unique email as fallback
//! - **Atomic effects**: user and profile updates from one event commit in a
//!   single transaction, or not at all

use crate::domain::account::User;
use crate::domain::foundation::{DomainError, UserId};
use crate::domain::profile::Profile;
use async_trait::async_trait;

/// Repository port for entitlement state persistence.
#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    /// Find the user who owns a billing customer id.
    ///
    /// Returns `None` if no user has this customer id attached.
    async fn find_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<User>, DomainError>;

    /// Find a user by email (unique).
    ///
    /// Fallback join key for events arriving before the customer id
    /// was attached to the account.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Attach a billing customer id to a user.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the customer id is already attached to another user
    /// - `NotFound` if the user doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn attach_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError>;

    /// Update an existing user.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_user(&self, user: &User) -> Result<(), DomainError>;

    /// Find the profile owned by a user.
    ///
    /// Returns `None` if the user has no profile yet.
    async fn find_profile_by_user(&self, user_id: &UserId)
        -> Result<Option<Profile>, DomainError>;

    /// Persist a user and their profile in a single transaction.
    ///
    /// Either both rows commit or neither does; a failure must not leave
    /// the entitlement state half applied.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either row doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_user_and_profile(
        &self,
        user: &User,
        profile: &Profile,
    ) -> Result<(), DomainError>;
}

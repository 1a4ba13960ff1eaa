//! PostgreSQL implementation of EntitlementRepository.
//!
//! Provides persistent storage for the User and Profile aggregates using
//! PostgreSQL. Lifecycle effect writes touch both tables in one
//! transaction so entitlement state is never half applied.

use crate::domain::account::User;
use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, ErrorCode, ProfileId, Timestamp, UserId};
use crate::domain::profile::{Profile, UnpublishReason, Visibility};
use crate::ports::EntitlementRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of the EntitlementRepository port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
pub struct PostgresEntitlementRepository {
    pool: PgPool,
}

impl PostgresEntitlementRepository {
    /// Creates a new PostgresEntitlementRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a user.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    billing_customer_id: Option<String>,
    billing_subscription_id: Option<String>,
    plan: String,
    plan_status: Option<String>,
    current_period_end: Option<DateTime<Utc>>,
    subscription_lapsed_at: Option<DateTime<Utc>>,
    subscription_reactivated_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let plan = parse_plan(&row.plan)?;

        Ok(User {
            id: UserId::from_uuid(row.id),
            email: row.email,
            billing_customer_id: row.billing_customer_id,
            billing_subscription_id: row.billing_subscription_id,
            plan,
            plan_status: row.plan_status,
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            subscription_lapsed_at: row.subscription_lapsed_at.map(Timestamp::from_datetime),
            subscription_reactivated_at: row
                .subscription_reactivated_at
                .map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Database row representation of a profile.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    user_id: Uuid,
    visibility: String,
    unpublished_at: Option<DateTime<Utc>>,
    unpublish_reason: String,
    retention_until: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    deletion_job_locked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let visibility = parse_visibility(&row.visibility)?;
        let unpublish_reason = parse_unpublish_reason(&row.unpublish_reason)?;

        Ok(Profile {
            id: ProfileId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            visibility,
            unpublished_at: row.unpublished_at.map(Timestamp::from_datetime),
            unpublish_reason,
            retention_until: row.retention_until.map(Timestamp::from_datetime),
            deleted_at: row.deleted_at.map(Timestamp::from_datetime),
            deletion_job_locked_at: row.deletion_job_locked_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_plan(s: &str) -> Result<Plan, DomainError> {
    Plan::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid plan value: {}", s),
        )
    })
}

fn parse_visibility(s: &str) -> Result<Visibility, DomainError> {
    Visibility::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid visibility value: {}", s),
        )
    })
}

fn parse_unpublish_reason(s: &str) -> Result<UnpublishReason, DomainError> {
    UnpublishReason::parse(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid unpublish_reason value: {}", s),
        )
    })
}

#[async_trait]
impl EntitlementRepository for PostgresEntitlementRepository {
    async fn find_user_by_customer_id(
        &self,
        customer_id: &str,
    ) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, billing_customer_id, billing_subscription_id, plan, plan_status,
                   current_period_end, subscription_lapsed_at, subscription_reactivated_at,
                   created_at, updated_at
            FROM users
            WHERE billing_customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find user: {}", e))
        })?;

        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, email, billing_customer_id, billing_subscription_id, plan, plan_status,
                   current_period_end, subscription_lapsed_at, subscription_reactivated_at,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to find user: {}", e))
        })?;

        row.map(User::try_from).transpose()
    }

    async fn attach_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                billing_customer_id = $2,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(customer_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("users_billing_customer_id_key") {
                    return DomainError::new(
                        ErrorCode::Conflict,
                        "Customer id already attached to another user",
                    );
                }
            }
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to attach customer id: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("User", user_id));
        }

        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), DomainError> {
        let result = user_update_query(user).execute(&self.pool).await.map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update user: {}", e))
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("User", &user.id));
        }

        Ok(())
    }

    async fn find_profile_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Profile>, DomainError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, visibility, unpublished_at, unpublish_reason, retention_until,
                   deleted_at, deletion_job_locked_at, created_at, updated_at
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find profile: {}", e),
            )
        })?;

        row.map(Profile::try_from).transpose()
    }

    async fn update_user_and_profile(
        &self,
        user: &User,
        profile: &Profile,
    ) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to begin transaction: {}", e),
            )
        })?;

        let user_result = user_update_query(user).execute(&mut *tx).await.map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Failed to update user: {}", e))
        })?;

        if user_result.rows_affected() == 0 {
            return Err(DomainError::not_found("User", &user.id));
        }

        let profile_result = sqlx::query(
            r#"
            UPDATE profiles SET
                visibility = $2,
                unpublished_at = $3,
                unpublish_reason = $4,
                retention_until = $5,
                deleted_at = $6,
                deletion_job_locked_at = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(profile.id.as_uuid())
        .bind(profile.visibility.as_str())
        .bind(profile.unpublished_at.as_ref().map(Timestamp::as_datetime))
        .bind(profile.unpublish_reason.as_str())
        .bind(profile.retention_until.as_ref().map(Timestamp::as_datetime))
        .bind(profile.deleted_at.as_ref().map(Timestamp::as_datetime))
        .bind(
            profile
                .deletion_job_locked_at
                .as_ref()
                .map(Timestamp::as_datetime),
        )
        .bind(profile.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update profile: {}", e),
            )
        })?;

        if profile_result.rows_affected() == 0 {
            return Err(DomainError::not_found("Profile", &profile.id));
        }

        tx.commit().await.map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to commit transaction: {}", e),
            )
        })?;

        Ok(())
    }
}

/// Shared UPDATE statement for the user row.
///
/// Used both standalone and inside the user+profile transaction so the
/// two paths cannot drift.
fn user_update_query(
    user: &User,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(
        r#"
        UPDATE users SET
            billing_customer_id = $2,
            billing_subscription_id = $3,
            plan = $4,
            plan_status = $5,
            current_period_end = $6,
            subscription_lapsed_at = $7,
            subscription_reactivated_at = $8,
            updated_at = $9
        WHERE id = $1
        "#,
    )
    .bind(user.id.as_uuid())
    .bind(&user.billing_customer_id)
    .bind(&user.billing_subscription_id)
    .bind(user.plan.as_str())
    .bind(&user.plan_status)
    .bind(user.current_period_end.as_ref().map(Timestamp::as_datetime))
    .bind(
        user.subscription_lapsed_at
            .as_ref()
            .map(Timestamp::as_datetime),
    )
    .bind(
        user.subscription_reactivated_at
            .as_ref()
            .map(Timestamp::as_datetime),
    )
    .bind(user.updated_at.as_datetime())
}

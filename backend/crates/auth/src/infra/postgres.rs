//! PostgreSQL User Repository Implementation

use chrono::{DateTime, Utc};
use platform::password::HashedPassword;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::User;
use crate::domain::repository::{FailureState, UserRepository};
use crate::domain::value_object::{Email, StoreId, UserId, UserRole};
use crate::error::{AuthError, AuthResult};

/// PostgreSQL-backed user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = r#"
    user_id,
    email,
    password_hash,
    user_role,
    is_active,
    failed_login_count,
    locked_until,
    last_login_at,
    last_login_ip,
    store_id,
    created_at,
    updated_at
"#;

impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user()).transpose()
    }

    async fn find_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
        ))
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_user()).transpose()
    }

    async fn record_login_failure(
        &self,
        user_id: &UserId,
        threshold: i16,
        lock_until: DateTime<Utc>,
    ) -> AuthResult<FailureState> {
        // One statement: concurrent failures serialize on the row, so no
        // increment is ever lost and the lock is set exactly when the
        // counter crosses the threshold.
        let row = sqlx::query_as::<_, FailureRow>(
            r#"
            UPDATE users SET
                failed_login_count = failed_login_count + 1,
                locked_until = CASE
                    WHEN failed_login_count + 1 >= $2 THEN $3
                    ELSE locked_until
                END,
                updated_at = now()
            WHERE user_id = $1
            RETURNING failed_login_count, locked_until
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(threshold)
        .bind(lock_until)
        .fetch_one(&self.pool)
        .await?;

        Ok(FailureState {
            failed_login_count: row.failed_login_count,
            locked_until: row.locked_until,
        })
    }

    async fn reset_failure_state(&self, user_id: &UserId) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                failed_login_count = 0,
                locked_until = NULL,
                updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_login(&self, user_id: &UserId, address: Option<&str>) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                last_login_at = now(),
                last_login_ip = $2,
                updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(address)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_password(
        &self,
        user_id: &UserId,
        password_hash: &HashedPassword,
    ) -> AuthResult<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                password_hash = $2,
                updated_at = now()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(password_hash.as_phc_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    email: String,
    password_hash: String,
    user_role: i16,
    is_active: bool,
    failed_login_count: i16,
    locked_until: Option<DateTime<Utc>>,
    last_login_at: Option<DateTime<Utc>>,
    last_login_ip: Option<String>,
    store_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        let role = UserRole::from_id(self.user_role)
            .ok_or_else(|| AuthError::Internal(format!("Invalid user_role: {}", self.user_role)))?;

        Ok(User {
            user_id: UserId::from_uuid(self.user_id),
            email: Email::from_db(self.email),
            password_hash: HashedPassword::from_db(self.password_hash),
            role,
            is_active: self.is_active,
            failed_login_count: self.failed_login_count,
            locked_until: self.locked_until,
            last_login_at: self.last_login_at,
            last_login_ip: self.last_login_ip,
            store_id: self.store_id.map(StoreId::from_uuid),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct FailureRow {
    failed_login_count: i16,
    locked_until: Option<DateTime<Utc>>,
}

//! User model and database operations
//!
//! Users are the identity store for TaskDesk. Rows are never deleted: tasks and
//! comments reference users with `ON DELETE RESTRICT`, so an account is retired
//! by clearing `is_active` instead.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE user_role AS ENUM ('Admin', 'User');
//!
//! CREATE TABLE users (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     email VARCHAR(254) NOT NULL,
//!     full_name VARCHAR(150) NOT NULL,
//!     role user_role NOT NULL DEFAULT 'User',
//!     password_hash VARCHAR(255) NOT NULL,
//!     is_active BOOLEAN NOT NULL DEFAULT TRUE,
//!     date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE UNIQUE INDEX users_email_key ON users (LOWER(email));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::auth::authorization::{self, Actor, SoftDeleteDenial};

/// Account role
///
/// Closed set; there is no way to grant a role other than these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role")]
pub enum Role {
    /// May manage every task, list users, and retire accounts
    Admin,

    /// May only see and progress tasks assigned to them
    User,
}

impl Role {
    /// Wire and storage spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Login email, stored lowercased and unique case-insensitively
    pub email: String,

    /// Display name
    pub full_name: String,

    /// Account role
    pub role: Role,

    /// Argon2id hash; never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// False once the account has been soft-deleted
    pub is_active: bool,

    /// When the account was created
    pub date_joined: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Email address (normalized before insert)
    pub email: String,

    /// Display name
    pub full_name: String,

    /// Argon2id hash, not the plaintext password
    pub password_hash: String,

    /// Account role
    pub role: Role,
}

/// Failure modes of [`User::soft_delete`]
#[derive(Debug, thiserror::Error)]
pub enum SoftDeleteError {
    /// No user with the given ID
    #[error("User not found")]
    NotFound,

    /// The authorization evaluator refused the change
    #[error(transparent)]
    Denied(#[from] SoftDeleteDenial),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Lowercases and trims an email so lookups and uniqueness agree
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

const USER_COLUMNS: &str = "id, email, full_name, role, password_hash, is_active, date_joined";

impl User {
    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Returns a database error on duplicate email (constraint
    /// `users_email_key`) or connection failure.
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, full_name, role, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(normalize_email(&data.email))
        .bind(data.full_name)
        .bind(data.role)
        .bind(data.password_hash)
        .fetch_one(executor)
        .await?;

        info!(user_id = %user.id, role = user.role.as_str(), "User created");
        Ok(user)
    }

    /// Finds a user by ID, active or not
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a user by email, case-insensitively
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = $1"
        ))
        .bind(normalize_email(email))
        .fetch_optional(executor)
        .await
    }

    /// Lists every user, inactive ones included, oldest first
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY date_joined ASC, id ASC"
        ))
        .fetch_all(pool)
        .await
    }

    /// Soft-deletes `target_id` on behalf of `actor`
    ///
    /// The target row is locked with `FOR UPDATE` before the evaluator runs, so
    /// two concurrent requests cannot both observe the account as active.
    /// A denial rolls the transaction back untouched.
    pub async fn soft_delete(
        pool: &PgPool,
        actor: &Actor,
        target_id: Uuid,
    ) -> Result<Self, SoftDeleteError> {
        let mut tx = pool.begin().await?;

        let target = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 FOR UPDATE"
        ))
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(SoftDeleteError::NotFound)?;

        authorization::can_soft_delete_user(actor, &Actor::from(&target))?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = FALSE WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(target_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user_id = %user.id, actor_id = %actor.id, "User soft-deleted");
        Ok(user)
    }
}

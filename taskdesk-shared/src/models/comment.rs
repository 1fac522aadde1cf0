//! Comment model and database operations
//!
//! Comments are immutable notes attached to a task. They are deleted together
//! with their task and keep their author row alive.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE comments (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
//!     author_id UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
//!     text TEXT NOT NULL CHECK (text <> ''),
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Comment row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,

    /// Task this comment belongs to
    pub task_id: Uuid,

    /// User who wrote it
    pub author_id: Uuid,

    pub text: String,

    pub created_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone)]
pub struct CreateComment {
    pub task_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

impl Comment {
    /// Inserts a comment
    pub async fn create<'e, E>(executor: E, data: CreateComment) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, author_id, text, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.author_id)
        .bind(data.text)
        .fetch_one(executor)
        .await
    }

    /// Lists a task's comments in the order they were written
    pub async fn list_by_task<'e, E>(executor: E, task_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, author_id, text, created_at
            FROM comments
            WHERE task_id = $1
            ORDER BY created_at ASC, id
            "#,
        )
        .bind(task_id)
        .fetch_all(executor)
        .await
    }
}

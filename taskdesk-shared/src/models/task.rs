//! Task model and database operations
//!
//! A task is a unit of work created by an admin and assigned to exactly one
//! user. The assignee may progress its status; everything else is admin-only.
//!
//! # Status Values
//!
//! ```text
//! To-Do → In-Progress → Done
//! ```
//!
//! Any status may be set from any other; there is no enforced ordering.
//!
//! # Schema
//!
//! ```sql
//! CREATE TYPE task_status AS ENUM ('To-Do', 'In-Progress', 'Done');
//!
//! CREATE TABLE tasks (
//!     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     title VARCHAR(255) NOT NULL CHECK (title <> ''),
//!     description TEXT,
//!     status task_status NOT NULL DEFAULT 'To-Do',
//!     assigned_to UUID NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Task progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status")]
pub enum TaskStatus {
    /// Not started
    #[default]
    #[sqlx(rename = "To-Do")]
    #[serde(rename = "To-Do")]
    ToDo,

    /// Being worked on
    #[sqlx(rename = "In-Progress")]
    #[serde(rename = "In-Progress")]
    InProgress,

    /// Finished
    Done,
}

impl TaskStatus {
    /// Wire and storage spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::ToDo => "To-Do",
            TaskStatus::InProgress => "In-Progress",
            TaskStatus::Done => "Done",
        }
    }
}

/// Task row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Short title, never empty
    pub title: String,

    /// Optional long-form description
    pub description: Option<String>,

    /// Current status
    pub status: TaskStatus,

    /// The single user responsible for this task
    pub assigned_to: Uuid,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When any field last changed
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assigned_to: Uuid,
}

/// Partial update
///
/// Only `Some` fields are written. `description: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<Uuid>,
}

impl UpdateTask {
    /// True when no column would change
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.assigned_to.is_none()
    }
}

const TASK_COLUMNS: &str = "id, title, description, status, assigned_to, created_at, updated_at";

impl Task {
    /// Inserts a new task
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation if `assigned_to` is not a user.
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, status, assigned_to)
            VALUES ($1, $2, $3, $4)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.status)
        .bind(data.assigned_to)
        .fetch_one(executor)
        .await
    }

    /// Finds a task by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a task and locks its row until the surrounding transaction ends
    ///
    /// Used so a permission decision and the write it guards see the same
    /// assignee.
    pub async fn find_by_id_for_update<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Lists every task, newest first
    pub async fn list_all<'e, E>(executor: E) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC, id"
        ))
        .fetch_all(executor)
        .await
    }

    /// Lists tasks assigned to one user, newest first
    pub async fn list_assigned_to<'e, E>(executor: E, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE assigned_to = $1 ORDER BY created_at DESC, id"
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Applies a partial update in a single statement
    ///
    /// Either every requested column changes or none does. `updated_at` is
    /// always bumped. Returns `None` if the task does not exist.
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.assigned_to.is_some() {
            bind_count += 1;
            query.push_str(&format!(", assigned_to = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(assigned_to) = data.assigned_to {
            q = q.bind(assigned_to);
        }

        q.fetch_optional(executor).await
    }

    /// Deletes a task and, by cascade, its comments
    ///
    /// Returns false if the task did not exist.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

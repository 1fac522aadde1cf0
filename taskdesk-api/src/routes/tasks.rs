//! Task endpoints
//!
//! - `GET /tasks/` - List tasks visible to the caller
//! - `POST /tasks/` - Create a task (admin)
//! - `GET /tasks/:id/` - Read a task (admin or assignee)
//! - `PATCH /tasks/:id/` - Update a task (admin: any field; assignee: status)
//! - `DELETE /tasks/:id/` - Delete a task (admin)

use std::collections::BTreeSet;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use sqlx::PgExecutor;
use taskdesk_shared::{
    auth::{
        authorization::{self, TaskScope},
        middleware::AuthContext,
    },
    models::{
        task::{CreateTask, Task, TaskStatus, UpdateTask},
        user::User,
    },
};
use uuid::Uuid;
use validator::Validate;

const MAX_TITLE_LENGTH: usize = 255;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters."))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    pub assigned_to: Uuid,
}

/// Update task request
///
/// Only keys present in the body are applied. `description: null` clears the
/// description; the other fields are not nullable.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    pub status: Option<TaskStatus>,

    pub assigned_to: Option<Uuid>,
}

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`)
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Lists every task for admins, only assigned tasks for everyone else
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = match authorization::can_list_tasks(&auth.actor) {
        Some(TaskScope::All) => Task::list_all(&state.db).await?,
        Some(TaskScope::AssignedTo(user_id)) => Task::list_assigned_to(&state.db, user_id).await?,
        None => return Err(ApiError::Forbidden("User account is inactive".to_string())),
    };

    Ok(Json(tasks))
}

/// Creates a task
///
/// # Errors
///
/// - `403 Forbidden`: caller is not an admin
/// - `400 Bad Request`: invalid fields, or the assignee is unknown or inactive
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    authorization::require_admin(&auth.actor, "Only admins can create tasks.")?;

    let Json(req) = payload?;
    req.validate()?;

    let title = validate_title(&req.title)?;
    ensure_assignable(&state.db, req.assigned_to).await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            title,
            description: req.description,
            status: req.status,
            assigned_to: req.assigned_to,
        },
    )
    .await?;

    tracing::info!(task_id = %task.id, assigned_to = %task.assigned_to, actor_id = %auth.user_id(), "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

/// Reads a single task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Task>> {
    let Path(task_id) = path?;
    let task = load_task(&state.db, task_id).await?;

    if !authorization::can_read_task(&auth.actor, &task) {
        return Err(ApiError::Forbidden(
            "You do not have permission to view this task.".to_string(),
        ));
    }

    Ok(Json(task))
}

/// Partially updates a task
///
/// The task row is locked for the whole request. The set of top-level body
/// keys is checked against the caller's access before anything is parsed,
/// and all accepted changes land in one `UPDATE`.
///
/// # Errors
///
/// - `403 Forbidden`: caller is unrelated, or an assignee touched a field
///   other than `status`
/// - `400 Bad Request`: invalid field values
/// - `404 Not Found`: no such task
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<Json<Task>> {
    let Path(task_id) = path?;
    let Json(body) = payload?;

    let changed_fields: BTreeSet<String> = body.keys().cloned().collect();

    let mut tx = state.db.begin().await?;

    let task = Task::find_by_id_for_update(&mut *tx, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))?;

    authorization::require_task_update(&auth.actor, &task, &changed_fields)?;

    let update = parse_update(body)?;

    if let Some(assignee) = update.assigned_to {
        ensure_assignable(&mut *tx, assignee).await?;
    }

    if update.is_empty() {
        tx.commit().await?;
        return Ok(Json(task));
    }

    let task = Task::update(&mut *tx, task_id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))?;

    tx.commit().await?;

    tracing::info!(
        task_id = %task.id,
        actor_id = %auth.user_id(),
        fields = ?changed_fields,
        "Task updated"
    );

    Ok(Json(task))
}

/// Deletes a task and its comments
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(task_id) = path?;
    let task = load_task(&state.db, task_id).await?;

    if !authorization::can_delete_task(&auth.actor, &task) {
        return Err(ApiError::Forbidden("Only admins can delete tasks.".to_string()));
    }

    if !Task::delete(&state.db, task.id).await? {
        return Err(ApiError::NotFound("Not found.".to_string()));
    }

    tracing::info!(task_id = %task.id, actor_id = %auth.user_id(), "Task deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Loads a task or answers 404
pub(crate) async fn load_task<'e, E>(executor: E, task_id: Uuid) -> ApiResult<Task>
where
    E: PgExecutor<'e>,
{
    Task::find_by_id(executor, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Not found.".to_string()))
}

fn validate_title(title: &str) -> ApiResult<String> {
    let title = title.trim();

    if title.is_empty() {
        return Err(ApiError::invalid_field("title", "This field may not be blank."));
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::invalid_field(
            "title",
            format!("Ensure this field has no more than {} characters.", MAX_TITLE_LENGTH),
        ));
    }

    Ok(title.to_string())
}

/// Tasks may only be assigned to existing, active users
async fn ensure_assignable<'e, E>(executor: E, user_id: Uuid) -> ApiResult<()>
where
    E: PgExecutor<'e>,
{
    match User::find_by_id(executor, user_id).await? {
        Some(user) if user.is_active => Ok(()),
        Some(_) => Err(ApiError::invalid_field(
            "assigned_to",
            "Tasks cannot be assigned to an inactive user.",
        )),
        None => Err(ApiError::invalid_field(
            "assigned_to",
            format!("Invalid pk \"{}\" - object does not exist.", user_id),
        )),
    }
}

/// Turns an already-authorized body into an `UpdateTask`
fn parse_update(body: Map<String, Value>) -> ApiResult<UpdateTask> {
    for field in ["title", "status", "assigned_to"] {
        if matches!(body.get(field), Some(Value::Null)) {
            return Err(ApiError::invalid_field(field, "This field may not be null."));
        }
    }

    let req: UpdateTaskRequest = serde_json::from_value(Value::Object(body))
        .map_err(|e| ApiError::BadRequest(format!("Invalid task update: {}", e)))?;

    let title = req.title.as_deref().map(validate_title).transpose()?;

    Ok(UpdateTask {
        title,
        description: req.description,
        status: req.status,
        assigned_to: req.assigned_to,
    })
}

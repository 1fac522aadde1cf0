//! Comment endpoints
//!
//! - `GET /tasks/:id/comments/` - List a task's comments
//! - `POST /tasks/:id/comments/` - Comment on a task (admin or assignee)
//!
//! Listing never answers 403: callers who may not see a task's comments get
//! an empty list.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::tasks::load_task,
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskdesk_shared::{
    auth::{
        authorization::{self, CommentScope},
        middleware::AuthContext,
    },
    models::comment::{Comment, CreateComment},
};
use uuid::Uuid;
use validator::Validate;

/// Create comment request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub text: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Vec<Comment>>> {
    let Path(task_id) = path?;
    let task = load_task(&state.db, task_id).await?;

    let comments = match authorization::can_list_comments(&auth.actor, &task) {
        CommentScope::All => Comment::list_by_task(&state.db, task.id).await?,
        CommentScope::Hidden => Vec::new(),
    };

    Ok(Json(comments))
}

/// Adds a comment authored by the caller
///
/// # Errors
///
/// - `403 Forbidden`: caller is neither admin nor the assignee
/// - `400 Bad Request`: blank text
/// - `404 Not Found`: no such task
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let Path(task_id) = path?;
    let task = load_task(&state.db, task_id).await?;

    if !authorization::can_create_comment(&auth.actor, &task) {
        return Err(ApiError::Forbidden(
            "Only admin or assigned user can comment on this task.".to_string(),
        ));
    }

    let Json(req) = payload?;
    req.validate()?;

    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::invalid_field("text", "This field may not be blank."));
    }

    let comment = Comment::create(
        &state.db,
        CreateComment {
            task_id: task.id,
            author_id: auth.user_id(),
            text: text.to_string(),
        },
    )
    .await?;

    tracing::info!(comment_id = %comment.id, task_id = %task.id, author_id = %comment.author_id, "Comment created");

    Ok((StatusCode::CREATED, Json(comment)))
}

//! User administration endpoints
//!
//! - `GET /users/` - List all users (admin)
//! - `PATCH /users/:id/soft-delete/` - Deactivate an account (admin, not self)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::PathRejection, Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskdesk_shared::{
    auth::{authorization, middleware::AuthContext},
    models::user::User,
};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct SoftDeleteResponse {
    pub message: String,
    pub user: User,
}

/// Lists every account, inactive ones included
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<User>>> {
    if !authorization::can_list_users(&auth.actor) {
        return Err(ApiError::Forbidden("Only admins can list users.".to_string()));
    }

    Ok(Json(User::list(&state.db).await?))
}

/// Marks an account inactive
///
/// Its outstanding tokens stop working on the next request.
///
/// # Errors
///
/// - `404 Not Found`: no such user
/// - `400 Bad Request`: already inactive, or the caller targeted themselves
/// - `403 Forbidden`: caller is not an admin
pub async fn soft_delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<SoftDeleteResponse>> {
    let Path(user_id) = path?;

    let user = User::soft_delete(&state.db, &auth.actor, user_id).await?;

    Ok(Json(SoftDeleteResponse {
        message: format!("User {} has been soft-deleted.", user.email),
        user,
    }))
}

//! Authentication endpoints
//!
//! - `POST /auth/register/` - Register new user
//! - `POST /auth/login/` - Exchange credentials for an access/refresh pair
//! - `POST /auth/refresh/` - Exchange a refresh token for a new access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use taskdesk_shared::{
    auth::{
        jwt::{self, Claims, TokenPair, TokenType},
        middleware::load_active_user,
        password,
    },
    models::user::{normalize_email, CreateUser, Role, User},
};
use validator::Validate;

/// Shared by bad passwords, unknown emails, and inactive accounts
const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

/// Register request
///
/// A `role` key in the body is ignored; self-registered accounts are always
/// plain users.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(length(min = 1, max = 150, message = "Full name must be 1 to 150 characters."))]
    pub full_name: String,

    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub email: String,

    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Registers a new user
///
/// # Errors
///
/// - `400 Bad Request`: validation failed, weak password, or email taken
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let Json(req) = payload?;
    req.validate()?;

    let full_name = req.full_name.trim();
    if full_name.is_empty() {
        return Err(ApiError::invalid_field("full_name", "This field may not be blank."));
    }

    password::validate_password(&req.password, &req.email)
        .map_err(|message| ApiError::invalid_field("password", message))?;

    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::Conflict(
            "A user with that email already exists.".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    // Unique index still guards the race between lookup and insert
    let user = User::create(
        &state.db,
        CreateUser {
            email: normalize_email(&req.email),
            full_name: full_name.to_string(),
            password_hash,
            role: Role::User,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully.".to_string(),
        }),
    ))
}

/// Authenticates a user and returns JWT tokens
///
/// # Errors
///
/// - `400 Bad Request`: missing fields
/// - `401 Unauthorized`: unknown email, wrong password, or inactive account
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<TokenPair>> {
    let Json(req) = payload?;
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid || !user.is_active {
        tracing::info!(user_id = %user.id, active = user.is_active, "Login refused");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret(), &state.token_lifetimes())?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(tokens))
}

/// Exchanges a refresh token for a new access token
///
/// The account must still exist and be active.
///
/// # Errors
///
/// - `401 Unauthorized`: invalid, expired, or wrong-type token, or the
///   account is gone or inactive
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let Json(req) = payload?;

    let claims = jwt::validate_refresh_token(&req.refresh, state.jwt_secret())?;
    let user = load_active_user(&state.db, claims.sub).await?;

    let access_claims = Claims::with_expiration(
        user.id,
        TokenType::Access,
        state.token_lifetimes().access,
    );
    let access = jwt::create_token(&access_claims, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access }))
}

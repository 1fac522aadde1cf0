//! Authentication middleware for Axum
//!
//! Validates the `Authorization: Bearer <access token>` header, re-loads the
//! user the token names, and adds an [`AuthContext`] to the request
//! extensions. The user row is read on every request so role changes and soft
//! deletes take effect immediately, whatever the token says.
//!
//! # Example
//!
//! ```no_run
//! use axum::{middleware, routing::get, Extension, Router};
//! use taskdesk_shared::auth::middleware::{create_jwt_middleware, AuthContext};
//! use sqlx::PgPool;
//!
//! async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
//!     auth.user_id().to_string()
//! }
//!
//! fn router(pool: PgPool) -> Router {
//!     Router::new()
//!         .route("/whoami/", get(whoami))
//!         .layer(middleware::from_fn(create_jwt_middleware(pool, "secret")))
//! }
//! ```

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use super::authorization::Actor;
use super::jwt::{validate_access_token, JwtError};
use crate::models::user::{Role, User};

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub actor: Actor,
}

impl AuthContext {
    pub fn user_id(&self) -> Uuid {
        self.actor.id
    }

    pub fn role(&self) -> Role {
        self.actor.role
    }
}

impl From<&User> for AuthContext {
    fn from(user: &User) -> Self {
        Self {
            actor: Actor::from(user),
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    #[error("{0}")]
    InvalidFormat(String),

    /// Token validation failed
    #[error("{0}")]
    InvalidToken(String),

    /// Token names a user that does not exist or is inactive
    #[error("User not found or inactive.")]
    InactiveUser,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            AuthError::DatabaseError(e) => {
                tracing::error!(error = %e, "Database error during authentication");
                json!({
                    "error": "internal_error",
                    "message": "Internal server error",
                })
            }
            _ => json!({
                "error": "unauthorized",
                "message": self.to_string(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
            JwtError::WrongTokenType { .. } => {
                AuthError::InvalidToken("Token is not an access token".to_string())
            }
            _ => AuthError::InvalidToken("Given token not valid".to_string()),
        }
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Invalid Authorization header".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    if token.is_empty() {
        return Err(AuthError::InvalidFormat("Expected Bearer token".to_string()));
    }

    Ok(token)
}

/// Loads the active user a token's subject names
pub async fn load_active_user(pool: &PgPool, user_id: Uuid) -> Result<User, AuthError> {
    let user = User::find_by_id(pool, user_id)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or(AuthError::InactiveUser)?;

    if !user.is_active {
        return Err(AuthError::InactiveUser);
    }

    Ok(user)
}

/// Authenticates a request from its headers
pub async fn authenticate(
    pool: &PgPool,
    secret: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_access_token(token, secret)?;
    let user = load_active_user(pool, claims.sub).await?;

    Ok(AuthContext::from(&user))
}

/// JWT authentication middleware
///
/// Responds 401 when the header is missing or malformed, the token fails
/// validation, or the user is gone or inactive.
pub async fn jwt_auth_middleware(
    pool: PgPool,
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_context = authenticate(&pool, &secret, req.headers()).await?;

    tracing::debug!(user_id = %auth_context.user_id(), role = %auth_context.role().as_str(), "Authenticated request");

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Creates a JWT authentication middleware closure
pub fn create_jwt_middleware(
    pool: PgPool,
    secret: impl Into<String>,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>> + Clone {
    let secret = secret.into();
    move |req, next| {
        let pool = pool.clone();
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(pool, secret, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers_with("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");

        assert!(matches!(
            bearer_token(&HeaderMap::new()),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&headers_with("Basic dXNlcjpwYXNz")),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            bearer_token(&headers_with("Bearer ")),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_jwt_errors_map_to_invalid_token() {
        assert!(matches!(AuthError::from(JwtError::Expired), AuthError::InvalidToken(_)));
        assert!(matches!(
            AuthError::from(JwtError::WrongTokenType {
                expected: "access",
                actual: "refresh"
            }),
            AuthError::InvalidToken(_)
        ));
    }

    #[test]
    fn test_auth_error_into_response() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidFormat("test".to_string()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::InactiveUser.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::DatabaseError("test".to_string()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_context_from_user() {
        let user = User {
            id: Uuid::new_v4(),
            email: "bob@example.com".to_string(),
            full_name: "Bob".to_string(),
            role: Role::User,
            password_hash: String::new(),
            is_active: true,
            date_joined: chrono::Utc::now(),
        };

        let context = AuthContext::from(&user);
        assert_eq!(context.user_id(), user.id);
        assert_eq!(context.role(), Role::User);
        assert!(context.actor.is_active);
    }
}

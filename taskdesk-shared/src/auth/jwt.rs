//! JWT issuance and validation
//!
//! Access and refresh tokens are HS256-signed JWTs. A token only names its
//! subject; role and active status are always re-read from the database, so a
//! token never outlives a soft delete.
//!
//! # Token Types
//!
//! - **Access Token**: short-lived, sent as `Authorization: Bearer <token>`
//! - **Refresh Token**: longer-lived, exchanged at `/auth/refresh/` for a new
//!   access token
//!
//! # Example
//!
//! ```
//! use taskdesk_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let user_id = Uuid::new_v4();
//! let claims = Claims::new(user_id, TokenType::Access);
//! let token = create_token(&claims, "your-secret-key")?;
//!
//! let validated = validate_access_token(&token, "your-secret-key")?;
//! assert_eq!(validated.sub, user_id);
//! # Ok(())
//! # }
//! ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value of the `iss` claim on every token
pub const ISSUER: &str = "taskdesk";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature, format, or claim check failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued by someone else
    #[error("Invalid token issuer")]
    InvalidIssuer,

    /// Access token presented where a refresh token was expected, or vice versa
    #[error("Expected {expected} token, got {actual} token")]
    WrongTokenType {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token
    Access,

    /// Refresh token
    Refresh,
}

impl TokenType {
    /// Lifetime used when the caller does not configure one
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::minutes(60),
            TokenType::Refresh => Duration::days(7),
        }
    }

    /// Gets token type as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Configured lifetimes for issued tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: TokenType::Access.default_expiration(),
            refresh: TokenType::Refresh.default_expiration(),
        }
    }
}

impl TokenLifetimes {
    /// Lifetime for the given token type
    pub fn for_type(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access,
            TokenType::Refresh => self.refresh,
        }
    }
}

/// JWT claims
///
/// Deliberately carries no role or active flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer - always [`ISSUER`]
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Token type (custom claim)
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims with the default lifetime for `token_type`
    pub fn new(user_id: Uuid, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, token_type, token_type.default_expiration())
    }

    /// Creates claims expiring `expires_in` from now
    pub fn with_expiration(user_id: Uuid, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// An access/refresh pair as returned by login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Issues a fresh access/refresh pair for a user
pub fn issue_token_pair(
    user_id: Uuid,
    secret: &str,
    lifetimes: &TokenLifetimes,
) -> Result<TokenPair, JwtError> {
    let access = Claims::with_expiration(user_id, TokenType::Access, lifetimes.access);
    let refresh = Claims::with_expiration(user_id, TokenType::Refresh, lifetimes.refresh);

    Ok(TokenPair {
        access: create_token(&access, secret)?,
        refresh: create_token(&refresh, secret)?,
    })
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates signature, expiry, not-before, and issuer
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

fn validate_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongTokenType {
            expected: expected.as_str(),
            actual: claims.token_type.as_str(),
        });
    }

    Ok(claims)
}

/// Validates a token and requires it to be an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Access)
}

/// Validates a token and requires it to be a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Refresh)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_token_type_expiration() {
        assert_eq!(TokenType::Access.default_expiration(), Duration::minutes(60));
        assert_eq!(TokenType::Refresh.default_expiration(), Duration::days(7));
    }

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, TokenType::Access);

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_create_and_validate_token() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, TokenType::Access), SECRET).unwrap();

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated.sub, user_id);
        assert_eq!(validated.token_type, TokenType::Access);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), SECRET).unwrap();
        assert!(matches!(
            validate_token(&token, "another-secret-key-at-least-32-bytes"),
            Err(JwtError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_expired_token() {
        let claims =
            Claims::with_expiration(Uuid::new_v4(), TokenType::Access, Duration::seconds(-3600));
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_validate_foreign_issuer() {
        let mut claims = Claims::new(Uuid::new_v4(), TokenType::Access);
        claims.iss = "someone-else".to_string();

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::InvalidIssuer)));
    }

    #[test]
    fn test_validate_garbage() {
        assert!(validate_token("badtoken", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn test_token_type_enforced() {
        let pair = issue_token_pair(Uuid::new_v4(), SECRET, &TokenLifetimes::default()).unwrap();

        assert!(validate_access_token(&pair.access, SECRET).is_ok());
        assert!(validate_refresh_token(&pair.refresh, SECRET).is_ok());

        assert!(matches!(
            validate_access_token(&pair.refresh, SECRET),
            Err(JwtError::WrongTokenType { expected: "access", actual: "refresh" })
        ));
        assert!(matches!(
            validate_refresh_token(&pair.access, SECRET),
            Err(JwtError::WrongTokenType { expected: "refresh", actual: "access" })
        ));
    }

    #[test]
    fn test_issue_token_pair_uses_lifetimes() {
        let user_id = Uuid::new_v4();
        let lifetimes = TokenLifetimes {
            access: Duration::minutes(5),
            refresh: Duration::days(1),
        };

        let pair = issue_token_pair(user_id, SECRET, &lifetimes).unwrap();
        let access = validate_access_token(&pair.access, SECRET).unwrap();
        let refresh = validate_refresh_token(&pair.refresh, SECRET).unwrap();

        assert_eq!(access.sub, user_id);
        assert_eq!(refresh.sub, user_id);
        assert_eq!(access.exp - access.iat, 5 * 60);
        assert_eq!(refresh.exp - refresh.iat, 24 * 60 * 60);
        assert_eq!(lifetimes.for_type(TokenType::Refresh), Duration::days(1));
    }
}

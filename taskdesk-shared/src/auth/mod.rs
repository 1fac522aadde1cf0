//! Authentication and authorization
//!
//! # Modules
//!
//! - [`password`]: Argon2id password hashing and the password policy
//! - [`jwt`]: Access/refresh token issuance and validation
//! - [`middleware`]: Bearer-token authentication for Axum routes
//! - [`authorization`]: Pure role/ownership rules for every action
//!
//! # Example
//!
//! ```
//! use taskdesk_shared::auth::jwt::{issue_token_pair, validate_access_token, TokenLifetimes};
//! use taskdesk_shared::auth::password::{hash_password, verify_password};
//! use uuid::Uuid;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("user_password")?;
//! assert!(verify_password("user_password", &hash)?);
//!
//! let user_id = Uuid::new_v4();
//! let pair = issue_token_pair(user_id, "secret-key", &TokenLifetimes::default())?;
//! assert_eq!(validate_access_token(&pair.access, "secret-key")?.sub, user_id);
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;

//! Configuration management for the API server
//!
//! Sources are layered with the `config` crate: built-in defaults, then an
//! optional `taskdesk.toml` in the working directory, then the process
//! environment (after `.env` has been loaded by `dotenvy`). Keys are flat and
//! match the environment variable names, lowercased.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `API_PORT`: Port to bind to (default: 8080)
//! - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
//! - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 chars)
//! - `JWT_ACCESS_TTL_MINUTES`: Access token lifetime (default: 60, max: one week)
//! - `JWT_REFRESH_TTL_DAYS`: Refresh token lifetime (default: 7, max: 3650)
//! - `ADMIN_EMAIL`, `ADMIN_PASSWORD`, `ADMIN_FULL_NAME`: Admin account
//!   provisioned at startup when email and password are both set
//! - `RUST_LOG`: Log filter (default: `taskdesk_api=debug,taskdesk_shared=info,tower_http=debug`)
//!
//! # Example
//!
//! ```no_run
//! use taskdesk_api::config::Config;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Server will listen on {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use anyhow::Context;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use taskdesk_shared::auth::jwt::TokenLifetimes;

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Longest accepted access token lifetime
pub const MAX_ACCESS_TTL_MINUTES: i64 = 7 * 24 * 60;

/// Longest accepted refresh token lifetime
pub const MAX_REFRESH_TTL_DAYS: i64 = 3650;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Admin account to provision on startup
    pub admin: Option<AdminConfig>,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,

    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub access_ttl_minutes: i64,

    pub refresh_ttl_days: i64,
}

/// Bootstrap admin credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .finish()
    }
}

/// Flat view of every source, keyed like the environment
#[derive(Debug, Deserialize)]
struct RawSettings {
    api_host: String,
    api_port: u16,
    cors_origins: String,
    database_url: String,
    database_max_connections: u32,
    jwt_secret: String,
    jwt_access_ttl_minutes: i64,
    jwt_refresh_ttl_days: i64,
    #[serde(default)]
    admin_email: Option<String>,
    #[serde(default)]
    admin_password: Option<String>,
    #[serde(default)]
    admin_full_name: Option<String>,
}

impl Config {
    /// Loads configuration from `.env`, `taskdesk.toml`, and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` or `JWT_SECRET` is missing, or a
    /// value does not parse or fails validation.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let settings = Self::builder()?
            .add_source(config::File::with_name("taskdesk").required(false))
            .add_source(config::Environment::default())
            .build()
            .context("Failed to read configuration sources")?;

        Self::from_settings(settings)
    }

    /// Builder pre-loaded with the defaults
    pub fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("api_host", "0.0.0.0")?
            .set_default("api_port", 8080)?
            .set_default("cors_origins", "*")?
            .set_default("database_max_connections", 10)?
            .set_default("jwt_access_ttl_minutes", 60)?
            .set_default("jwt_refresh_ttl_days", 7)?)
    }

    /// Builds and validates a `Config` from already-layered settings
    pub fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
        let raw: RawSettings = settings
            .try_deserialize()
            .context("Invalid configuration (DATABASE_URL and JWT_SECRET are required)")?;

        if raw.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        if raw.jwt_access_ttl_minutes <= 0 || raw.jwt_refresh_ttl_days <= 0 {
            anyhow::bail!("JWT token lifetimes must be positive");
        }

        if raw.jwt_access_ttl_minutes > MAX_ACCESS_TTL_MINUTES {
            anyhow::bail!(
                "JWT_ACCESS_TTL_MINUTES must be at most {} (one week)",
                MAX_ACCESS_TTL_MINUTES
            );
        }

        if raw.jwt_refresh_ttl_days > MAX_REFRESH_TTL_DAYS {
            anyhow::bail!(
                "JWT_REFRESH_TTL_DAYS must be at most {} (ten years)",
                MAX_REFRESH_TTL_DAYS
            );
        }

        let cors_origins = raw
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        let admin = match (raw.admin_email, raw.admin_password) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some(AdminConfig {
                    email,
                    password,
                    full_name: raw
                        .admin_full_name
                        .filter(|name| !name.trim().is_empty())
                        .unwrap_or_else(|| "Administrator".to_string()),
                })
            }
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host: raw.api_host,
                port: raw.api_port,
                cors_origins,
            },
            database: DatabaseConfig {
                url: raw.database_url,
                max_connections: raw.database_max_connections,
            },
            jwt: JwtConfig {
                secret: raw.jwt_secret,
                access_ttl_minutes: raw.jwt_access_ttl_minutes,
                refresh_ttl_days: raw.jwt_refresh_ttl_days,
            },
            admin,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Configured token lifetimes
    pub fn token_lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            access: Duration::minutes(self.jwt.access_ttl_minutes),
            refresh: Duration::days(self.jwt.refresh_ttl_days),
        }
    }

    /// Whether CORS should allow any origin
    pub fn cors_permissive(&self) -> bool {
        self.api.cors_origins.is_empty() || self.api.cors_origins.iter().any(|o| o == "*")
    }
}

//! Admin provisioning at startup
//!
//! Registration only ever creates plain users, so the first admin comes from
//! configuration. An existing account with the configured email is left
//! untouched, whatever its role or status.

use crate::config::AdminConfig;
use anyhow::Context;
use sqlx::PgPool;
use taskdesk_shared::{
    auth::password,
    models::user::{CreateUser, Role, User},
};

/// Outcome of [`ensure_admin`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created,
    AlreadyExists,
}

/// Creates the configured admin account if no user holds its email yet
pub async fn ensure_admin(pool: &PgPool, admin: &AdminConfig) -> anyhow::Result<BootstrapOutcome> {
    if let Some(existing) = User::find_by_email(pool, &admin.email).await? {
        if existing.role != Role::Admin || !existing.is_active {
            tracing::warn!(
                user_id = %existing.id,
                role = existing.role.as_str(),
                active = existing.is_active,
                "Configured admin email belongs to an account that is not an active admin; leaving it unchanged"
            );
        }
        return Ok(BootstrapOutcome::AlreadyExists);
    }

    password::validate_password(&admin.password, &admin.email)
        .map_err(|reason| anyhow::anyhow!("ADMIN_PASSWORD rejected: {}", reason))?;

    let password_hash = password::hash_password(&admin.password)?;

    let user = User::create(
        pool,
        CreateUser {
            email: admin.email.clone(),
            full_name: admin.full_name.clone(),
            password_hash,
            role: Role::Admin,
        },
    )
    .await
    .context("Failed to create admin account")?;

    tracing::info!(user_id = %user.id, email = %user.email, "Admin account provisioned");
    Ok(BootstrapOutcome::Created)
}

//! API route handlers, one module per resource
//!
//! - `health`: Health check endpoint
//! - `auth`: Registration, login, token refresh
//! - `tasks`: Task CRUD
//! - `comments`: Task comments
//! - `users`: User listing and soft delete

pub mod auth;
pub mod comments;
pub mod health;
pub mod tasks;
pub mod users;

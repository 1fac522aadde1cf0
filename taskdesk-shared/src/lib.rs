//! # TaskDesk Shared Library
//!
//! This crate contains the domain types, persistence layer, and authorization
//! rules used by the TaskDesk API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures (users, tasks, comments)
//! - `auth`: Password hashing, JWT tokens, request authentication, and the
//!   authorization evaluator
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the TaskDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

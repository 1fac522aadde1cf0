//! Database models for TaskDesk
//!
//! Each model owns its SQL. Query methods take any `PgExecutor`, so they run
//! equally against the pool or inside a transaction.
//!
//! # Models
//!
//! - `user`: Accounts, roles, and soft delete
//! - `task`: Tasks and their status
//! - `comment`: Comments on tasks

pub mod comment;
pub mod task;
pub mod user;

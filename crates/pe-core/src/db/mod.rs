//! Database layer for password policies.
//!
//! This module provides persistence for policies, their constraints and the
//! user password state using SQLx with support for both SQLite (development)
//! and PostgreSQL (production).

mod error;
pub mod mocks;
mod pool;
mod schema;

#[cfg(feature = "database")]
mod cascade;
pub mod constraint_repo;
pub mod policy_repo;
pub mod user_repo;

pub use error::DbError;
pub use pool::{create_pool, create_pool_with_options, DbPool, PoolOptions};
pub use schema::run_migrations;

#[cfg(feature = "database")]
pub use cascade::SqlCascadeBoundary;

// Re-export repository traits
pub use constraint_repo::ConstraintRepository;
pub use policy_repo::PolicyRepository;
pub use user_repo::UserRepository;

// Re-export factory functions
#[cfg(feature = "database")]
pub use constraint_repo::create_constraint_repository;
#[cfg(feature = "database")]
pub use policy_repo::create_policy_repository;
#[cfg(feature = "database")]
pub use user_repo::create_user_repository;

//! # pe-core
//!
//! Password policy data models, persistence and resolution.
//!
//! This crate provides the policy store with its constraint cascade, the
//! priority-ranked policy resolver, and the user password state consulted by
//! the navigation lock.

pub mod auth;
pub mod db;
pub mod error;
pub mod policy;
pub mod resolver;
pub mod store;

pub use auth::{SessionData, User, ADMIN_ROLE};
pub use error::{CascadeStep, PolicyError};
pub use policy::{
    Constraint, NewConstraint, NewPolicy, Policy, PolicyQuery, PolicyUpdate, QueryOrder,
};
pub use resolver::PolicyResolver;
pub use store::{CascadeBoundary, CascadeOutcome, DeleteReport, PolicyStore};

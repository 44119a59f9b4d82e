//! # pe-api
//!
//! HTTP surface for Password Enhancements.
//!
//! This crate provides the navigation lock that keeps users with an expired
//! password on the password-change page, the session-scoped reset token
//! slot, flash messaging, and the administrative policy API.

pub mod auth;
pub mod dto;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod routing;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use middleware::navigation_lock::{NavigationLock, NavigationLockConfig};
pub use routing::RouteTable;
pub use server::{ApiServer, ApiServerConfig};
pub use state::AppState;

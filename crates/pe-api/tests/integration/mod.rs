//! Integration test modules.

pub mod common;
pub mod health_tests;
pub mod navigation_lock_tests;
pub mod policy_routes_tests;

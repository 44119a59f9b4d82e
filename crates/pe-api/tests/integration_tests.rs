//! Integration tests for the Password Enhancements API.
//!
//! Requests run through the full middleware stack, including sessions and
//! the navigation lock. A test-only login route stands in for the identity
//! provider.

mod integration;

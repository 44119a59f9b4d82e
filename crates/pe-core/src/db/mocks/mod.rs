//! Mock implementations of repository traits for testing.
//!
//! These mocks use in-memory storage and do not require a database connection.
//! They back the policy store and guard tests, and the CLI when no database
//! URL is configured.

mod constraint_repo;
mod policy_repo;
mod user_repo;

pub use constraint_repo::MockConstraintRepository;
pub use policy_repo::MockPolicyRepository;
pub use user_repo::MockUserRepository;

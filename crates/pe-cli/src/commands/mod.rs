//! CLI command implementations.

pub mod policies;
pub mod serve;

pub use policies::{run_policy_command, PolicyCommand};
pub use serve::run_server;

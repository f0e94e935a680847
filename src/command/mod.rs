//! Shell command execution with bounded, blind retries.

mod retry;
mod runner;

pub use retry::{RetryPolicy, retry};
pub use runner::{CommandError, CommandRunner};

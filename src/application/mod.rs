mod application;
pub mod data;
mod remediation;
mod runtime_config;
mod summary;

pub use application::{Application, ApplicationError};
pub use remediation::{Remediation, RemediationError, RemediationOutcome};
pub use runtime_config::RuntimeConfig;

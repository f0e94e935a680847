use snafu::Snafu;
use snafu::prelude::*;
use tracing::debug;

use crate::application::summary::print_summary;
use crate::application::{Remediation, RemediationError, RuntimeConfig};
use crate::command::CommandRunner;
use crate::config::ConfigError;
use crate::control::ControlBackend;

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        let config = app_config.load_config().await.context(ConfigSnafu)?;
        debug!("Loaded config: {:?}", config);

        let runner = CommandRunner::new(config.command_timeout);
        let backend = ControlBackend::new(config.backend, runner.clone());
        debug!("Using the {} backend", config.backend);

        let outcome = Remediation::new(&backend, &runner, &config)
            .force(app_config.force)
            .execute()
            .await
            .context(RemediationSnafu)?;
        print_summary(&outcome);

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: ConfigError },
    #[snafu(display("Critical failure encountered during remediation"))]
    RemediationError { source: RemediationError },
}

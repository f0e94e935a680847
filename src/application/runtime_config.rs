use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::config::{Config, ConfigError, DEFAULT_CONFIG_PATH};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Explicitly requested config file. Without one the default location is
    /// tried and may be absent.
    pub config_path: Option<PathBuf>,
    pub force: bool,
}

impl RuntimeConfig {
    pub async fn load_config(&self) -> Result<Config, ConfigError> {
        match &self.config_path {
            Some(path) => Config::read(path).await,
            None => Config::read_or_default(Path::new(DEFAULT_CONFIG_PATH)).await,
        }
    }
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            config_path: cli.config,
            force: cli.force,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[compio::test]
    async fn explicit_config_must_exist() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let runtime = RuntimeConfig {
            config_path: Some(temp.path().join("missing.yaml")),
            force: false,
        };

        let result = runtime.load_config().await;

        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[compio::test]
    async fn explicit_config_is_loaded() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("remedy.yaml");
        std::fs::write(&path, "mirror: kubepods-tmp\n").expect("write");
        let runtime = RuntimeConfig {
            config_path: Some(path),
            force: true,
        };

        let config = runtime.load_config().await.expect("config");

        assert_eq!(config.mirror_root(), PathBuf::from("/sys/fs/cgroup/memory/kubepods-tmp"));
    }
}

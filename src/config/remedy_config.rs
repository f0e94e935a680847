use std::borrow::Cow;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::{debug, info};

use crate::command::RetryPolicy;
use crate::control::{BackendKind, UnknownBackendError};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/memcg-remedy.yaml";

const DEFAULT_CGROUP_ROOT: &str = "/sys/fs/cgroup/memory";
const DEFAULT_SOURCE: &str = "kubepods";
const DEFAULT_MIRROR: &str = "kubepods2";
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_COPY_ATTEMPTS: u32 = 3;

/// Shell commands run around the migration. `None` skips the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookCommands {
    pub stop_agent: Option<String>,
    pub start_agent: Option<String>,
    pub restart_monitor: Option<String>,
    /// Each hook is attempted once unless configured otherwise.
    pub retry: RetryPolicy,
}

impl Default for HookCommands {
    fn default() -> Self {
        Self {
            stop_agent: Some("systemctl stop kubelet".to_string()),
            start_agent: Some("systemctl start kubelet".to_string()),
            restart_monitor: Some("supervisorctl restart cadvisor".to_string()),
            retry: RetryPolicy::once(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub cgroup_root: PathBuf,
    /// Source group, relative to `cgroup_root`.
    pub source: PathBuf,
    /// Mirror group, relative to `cgroup_root`.
    pub mirror: PathBuf,
    pub backend: BackendKind,
    pub command_timeout: Option<Duration>,
    /// Bounds draining and removing a group.
    pub settle_retry: RetryPolicy,
    /// Attempts per replayed control file.
    pub copy_attempts: u32,
    pub hooks: HookCommands,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cgroup_root: PathBuf::from(DEFAULT_CGROUP_ROOT),
            source: PathBuf::from(DEFAULT_SOURCE),
            mirror: PathBuf::from(DEFAULT_MIRROR),
            backend: BackendKind::default(),
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
            settle_retry: RetryPolicy::default(),
            copy_attempts: DEFAULT_COPY_ATTEMPTS,
            hooks: HookCommands::default(),
        }
    }
}

impl Config {
    pub fn source_root(&self) -> PathBuf {
        self.cgroup_root.join(&self.source)
    }

    pub fn mirror_root(&self) -> PathBuf {
        self.cgroup_root.join(&self.mirror)
    }

    pub async fn read(path: &Path) -> Result<Self, ConfigError> {
        debug!("Opening config file: {}", path.display());
        let bytes = compio::fs::read(path).await.context(ReadSnafu {
            file_path: path.display().to_string(),
        })?;
        debug!("Successfully read config file: {} bytes", bytes.len());
        let contents = String::from_utf8_lossy(&bytes);
        Self::try_from(&*contents)
    }

    /// Like [`Config::read`], but a missing file yields the defaults.
    pub async fn read_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::read(path).await {
            Err(ConfigError::ReadError { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    fn apply(&mut self, top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<(), ConfigError> {
        if let Some(root) = string_field(top_level, "cgroup_root")? {
            self.cgroup_root = PathBuf::from(root);
        }
        if let Some(source) = string_field(top_level, "source")? {
            self.source = PathBuf::from(source);
        }
        if let Some(mirror) = string_field(top_level, "mirror")? {
            self.mirror = PathBuf::from(mirror);
        }
        if let Some(backend) = string_field(top_level, "backend")? {
            self.backend = backend.parse().context(BackendSnafu)?;
        }
        if let Some(timeout_ms) = integer_field(top_level, "command_timeout_ms")? {
            self.command_timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));
        }
        if let Some(copy_attempts) = integer_field(top_level, "copy_attempts")? {
            self.copy_attempts = attempts("copy_attempts", copy_attempts)?;
        }
        if let Some(retry) = mapping_field(top_level, "retry")? {
            let attempts = match integer_field(retry, "attempts")? {
                Some(value) => attempts("retry.attempts", value)?,
                None => self.settle_retry.attempts(),
            };
            let delay = integer_field(retry, "delay_ms")?
                .map(Duration::from_millis)
                .unwrap_or(self.settle_retry.delay());
            self.settle_retry = RetryPolicy::new(attempts, delay);
        }
        if let Some(hooks) = mapping_field(top_level, "hooks")? {
            if let Some(command) = hook_field(hooks, "stop_agent")? {
                self.hooks.stop_agent = command;
            }
            if let Some(command) = hook_field(hooks, "start_agent")? {
                self.hooks.start_agent = command;
            }
            if let Some(command) = hook_field(hooks, "restart_monitor")? {
                self.hooks.restart_monitor = command;
            }
            let attempts = match integer_field(hooks, "attempts")? {
                Some(value) => attempts("hooks.attempts", value)?,
                None => self.hooks.retry.attempts(),
            };
            let delay = integer_field(hooks, "delay_ms")?
                .map(Duration::from_millis)
                .unwrap_or(self.hooks.retry.delay());
            self.hooks.retry = RetryPolicy::new(attempts, delay);
        }
        Ok(())
    }
}

impl TryFrom<&str> for Config {
    type Error = ConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let document = documents.first().ok_or(ConfigError::MalformedConfig)?;
        let top_level = document.as_mapping().ok_or(ConfigError::TopLevelNotMap)?;

        let mut config = Config::default();
        config.apply(top_level)?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Source and mirror must be two distinct sibling groups directly under
    /// `cgroup_root`.
    fn validate(&self) -> Result<(), ConfigError> {
        group_name("source", &self.source)?;
        group_name("mirror", &self.mirror)?;
        ensure!(
            self.source != self.mirror,
            InvalidValueSnafu {
                key: "mirror",
                expected: "a group other than source",
            }
        );
        Ok(())
    }
}

fn group_name(key: &'static str, path: &Path) -> Result<(), ConfigError> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => InvalidValueSnafu {
            key,
            expected: "a single group name",
        }
        .fail(),
    }
}

fn lookup<'a, 'y>(
    map: &'a LinkedHashMap<Yaml<'y>, Yaml<'y>>,
    key: &'static str,
) -> Option<&'a Yaml<'y>> {
    map.get(&Yaml::Value(Scalar::String(Cow::Borrowed(key))))
}

fn string_field(
    map: &LinkedHashMap<Yaml, Yaml>,
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    match lookup(map, key) {
        None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
        Some(Yaml::Value(Scalar::String(value))) => Ok(Some(value.to_string())),
        Some(_) => InvalidValueSnafu {
            key,
            expected: "a string",
        }
        .fail(),
    }
}

fn integer_field(
    map: &LinkedHashMap<Yaml, Yaml>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match lookup(map, key) {
        None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
        Some(Yaml::Value(Scalar::Integer(value))) if *value >= 0 => Ok(Some(*value as u64)),
        Some(_) => InvalidValueSnafu {
            key,
            expected: "a non-negative integer",
        }
        .fail(),
    }
}

fn mapping_field<'a, 'y>(
    map: &'a LinkedHashMap<Yaml<'y>, Yaml<'y>>,
    key: &'static str,
) -> Result<Option<&'a LinkedHashMap<Yaml<'y>, Yaml<'y>>>, ConfigError> {
    match lookup(map, key) {
        None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
        Some(Yaml::Mapping(mapping)) => Ok(Some(mapping)),
        Some(_) => InvalidValueSnafu {
            key,
            expected: "a map",
        }
        .fail(),
    }
}

/// `Some(None)` disables the hook, `None` keeps the default.
fn hook_field(
    map: &LinkedHashMap<Yaml, Yaml>,
    key: &'static str,
) -> Result<Option<Option<String>>, ConfigError> {
    match lookup(map, key) {
        None => Ok(None),
        Some(Yaml::Value(Scalar::Null)) => Ok(Some(None)),
        Some(Yaml::Value(Scalar::String(command))) if command.trim().is_empty() => Ok(Some(None)),
        Some(Yaml::Value(Scalar::String(command))) => Ok(Some(Some(command.to_string()))),
        Some(_) => InvalidValueSnafu {
            key,
            expected: "a shell command",
        }
        .fail(),
    }
}

fn attempts(key: &'static str, value: u64) -> Result<u32, ConfigError> {
    match u32::try_from(value) {
        Ok(0) | Err(_) => InvalidValueSnafu {
            key,
            expected: "a positive number of attempts",
        }
        .fail(),
        Ok(attempts) => Ok(attempts),
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted config file"))]
    MalformedConfig,
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Config key '{}' should be {}", key, expected))]
    InvalidValue { key: String, expected: String },
    #[snafu(display("Invalid backend in config"))]
    BackendError { source: UnknownBackendError },
}

mod remedy_config;

pub use remedy_config::{Config, ConfigError, DEFAULT_CONFIG_PATH, HookCommands};

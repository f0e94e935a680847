use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// Recreates a leaking memory cgroup hierarchy by migrating it to a mirror
/// and back.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    #[clap(long, short, default_value = "info", value_enum)]
    pub log_level: LogLevel,

    /// YAML file overriding the built-in defaults [default: /etc/memcg-remedy.yaml]
    #[clap(long, short)]
    pub config: Option<PathBuf>,

    /// Migrate even when the leak probe reports a healthy hierarchy
    #[clap(long)]
    pub force: bool,
}

use std::io;
use std::path::Path;
use std::str::FromStr;

use derive_more::Display;
use snafu::Snafu;

use super::{ControlFs, DirListing, HostControlFs, ShellControlFs};
use crate::command::CommandRunner;

/// Which [`ControlFs`] implementation performs the mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum BackendKind {
    #[default]
    #[display("direct")]
    Direct,
    #[display("shell")]
    Shell,
}

impl FromStr for BackendKind {
    type Err = UnknownBackendError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "direct" => Ok(BackendKind::Direct),
            "shell" => Ok(BackendKind::Shell),
            _ => UnknownBackendSnafu { name: value }.fail(),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("Unknown backend '{}', expected 'direct' or 'shell'", name))]
pub struct UnknownBackendError {
    name: String,
}

/// Runtime-selected backend.
#[derive(Debug, Clone)]
pub enum ControlBackend {
    Direct(HostControlFs),
    Shell(ShellControlFs),
}

impl ControlBackend {
    pub fn new(kind: BackendKind, runner: CommandRunner) -> Self {
        match kind {
            BackendKind::Direct => ControlBackend::Direct(HostControlFs),
            BackendKind::Shell => ControlBackend::Shell(ShellControlFs::new(runner)),
        }
    }
}

impl ControlFs for ControlBackend {
    async fn list_dir(&self, dir: &Path) -> io::Result<DirListing> {
        match self {
            ControlBackend::Direct(fs) => fs.list_dir(dir).await,
            ControlBackend::Shell(fs) => fs.list_dir(dir).await,
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        match self {
            ControlBackend::Direct(fs) => fs.exists(path).await,
            ControlBackend::Shell(fs) => fs.exists(path).await,
        }
    }

    async fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        match self {
            ControlBackend::Direct(fs) => fs.create_dir_all(dir).await,
            ControlBackend::Shell(fs) => fs.create_dir_all(dir).await,
        }
    }

    async fn read_to_string(&self, file: &Path) -> io::Result<String> {
        match self {
            ControlBackend::Direct(fs) => fs.read_to_string(file).await,
            ControlBackend::Shell(fs) => fs.read_to_string(file).await,
        }
    }

    async fn write_value(&self, file: &Path, value: &str) -> io::Result<()> {
        match self {
            ControlBackend::Direct(fs) => fs.write_value(file, value).await,
            ControlBackend::Shell(fs) => fs.write_value(file, value).await,
        }
    }

    async fn append_line(&self, file: &Path, line: &str) -> io::Result<()> {
        match self {
            ControlBackend::Direct(fs) => fs.append_line(file, line).await,
            ControlBackend::Shell(fs) => fs.append_line(file, line).await,
        }
    }

    async fn remove_dir(&self, dir: &Path) -> io::Result<()> {
        match self {
            ControlBackend::Direct(fs) => fs.remove_dir(dir).await,
            ControlBackend::Shell(fs) => fs.remove_dir(dir).await,
        }
    }
}

use std::io;
use std::path::Path;

use tracing::debug;

use super::control_fs::errno;
use super::{ControlFs, DirListing, HostControlFs};
use crate::command::{CommandError, CommandRunner};

/// Messages printed by the shell for the errors callers tell apart.
const KNOWN_ERRORS: [(&str, i32); 7] = [
    ("No such process", errno::ESRCH),
    ("Input/output error", errno::EIO),
    ("Device or resource busy", errno::EBUSY),
    ("Directory not empty", errno::ENOTEMPTY),
    ("No such file or directory", errno::ENOENT),
    ("Permission denied", errno::EACCES),
    ("Invalid argument", errno::EINVAL),
];

/// Performs mutations as shell commands, reads directly.
///
/// Failures are turned back into OS errors by matching the command output,
/// so callers classify them the same way as with [`HostControlFs`].
#[derive(Debug, Clone)]
pub struct ShellControlFs {
    runner: CommandRunner,
    reader: HostControlFs,
}

impl ShellControlFs {
    pub fn new(runner: CommandRunner) -> Self {
        Self {
            runner,
            reader: HostControlFs,
        }
    }

    async fn mutate(&self, command_line: String) -> io::Result<()> {
        self.runner
            .run(&command_line)
            .await
            .map_err(into_io_error)
    }
}

impl ControlFs for ShellControlFs {
    async fn list_dir(&self, dir: &Path) -> io::Result<DirListing> {
        self.reader.list_dir(dir).await
    }

    async fn exists(&self, path: &Path) -> bool {
        self.reader.exists(path).await
    }

    async fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        self.mutate(format!("mkdir -p {}", quote_path(dir))).await
    }

    async fn read_to_string(&self, file: &Path) -> io::Result<String> {
        self.reader.read_to_string(file).await
    }

    async fn write_value(&self, file: &Path, value: &str) -> io::Result<()> {
        self.mutate(format!(
            "printf '%s\\n' {} > {}",
            shell_quote(value),
            quote_path(file)
        ))
        .await
    }

    async fn append_line(&self, file: &Path, line: &str) -> io::Result<()> {
        self.mutate(format!(
            "printf '%s\\n' {} >> {}",
            shell_quote(line),
            quote_path(file)
        ))
        .await
    }

    async fn remove_dir(&self, dir: &Path) -> io::Result<()> {
        self.mutate(format!("rmdir {}", quote_path(dir))).await
    }
}

/// Wraps `value` in single quotes so the shell takes it literally.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

fn quote_path(path: &Path) -> String {
    shell_quote(&path.to_string_lossy())
}

fn into_io_error(err: CommandError) -> io::Error {
    let known = KNOWN_ERRORS
        .iter()
        .find(|(message, _)| err.output().contains(message));
    match known {
        Some((_, code)) => {
            debug!("{}", err);
            io::Error::from_raw_os_error(*code)
        }
        None => io::Error::other(err),
    }
}

use std::io;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use super::{MigrationReport, NodeOutcome, NodeState, Stage};
use crate::command::{RetryPolicy, retry};
use crate::control::{ControlFs, files, is_vanished_process};
use crate::ext::RebasePathExt;
use crate::hierarchy::Hierarchy;

/// Lines replayed from one control file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CopyTally {
    copied: usize,
    skipped: usize,
}

/// Walks a snapshot bottom-up and moves every group to its mirror.
///
/// Per group: create the mirror directory, enable charge migration on it,
/// replay `memory.limit_in_bytes` and `cgroup.procs` into it, and once the
/// group has no child groups left, drain and remove it. Failures are
/// recorded per group and never stop the walk.
pub struct Migrator<'a, F> {
    fs: &'a F,
    settle_retry: RetryPolicy,
    copy_retry: RetryPolicy,
}

impl<'a, F: ControlFs> Migrator<'a, F> {
    /// `settle_retry` bounds draining and removal, `copy_attempts` bounds
    /// the replay of each control file.
    pub fn new(fs: &'a F, settle_retry: RetryPolicy, copy_attempts: u32) -> Self {
        Self {
            fs,
            settle_retry,
            copy_retry: RetryPolicy::new(copy_attempts, std::time::Duration::ZERO),
        }
    }

    /// Migrates every group of `snapshot` from under `source` to the same
    /// relative place under `destination`.
    ///
    /// The snapshot only decides the visiting order. Whether a group is a
    /// leaf is decided from the live directory when the group is visited,
    /// since its children may have been removed earlier in the same pass.
    pub async fn migrate(
        &self,
        snapshot: &Hierarchy<PathBuf>,
        source: &Path,
        destination: &Path,
    ) -> MigrationReport {
        info!(
            "Migrating {} groups from {} to {}",
            snapshot.node_count(),
            source.display(),
            destination.display()
        );
        let mut report = MigrationReport::new(source, destination);

        for id in snapshot.post_order() {
            let dir = snapshot.value(id);
            let state = self
                .migrate_group(dir, source, destination, &mut report)
                .await;
            debug!("{} ended as {}", dir.display(), state);
            report.outcomes.push(NodeOutcome {
                path: dir.clone(),
                state,
            });
        }

        info!("{}", report);
        report
    }

    async fn migrate_group(
        &self,
        dir: &Path,
        source: &Path,
        destination: &Path,
        report: &mut MigrationReport,
    ) -> NodeState {
        report.visited += 1;
        info!("Current group: {}", dir.display());

        let Some(mirror) = dir.rebase(source, destination) else {
            report.record_failure(
                dir,
                Stage::Rebase,
                format!("not under {}", source.display()),
            );
            return NodeState::Pending;
        };

        if !self.fs.exists(&mirror).await {
            info!("mkdir {}", mirror.display());
            if let Err(err) = self.fs.create_dir_all(&mirror).await {
                report.record_failure(dir, Stage::CreateMirror, err);
                return NodeState::Pending;
            }
            report.mirrors_created += 1;
        }
        let mut state = NodeState::MirrorCreated;

        let flag = mirror.join(files::MOVE_CHARGE_AT_IMMIGRATE);
        match self.fs.write_value(&flag, files::MIGRATION_ENABLED).await {
            Ok(()) => {
                report.flags_enabled += 1;
                state = NodeState::FlagEnabled;
            }
            Err(err) => report.record_failure(dir, Stage::EnableFlag, err),
        }

        let listing = match self.fs.list_dir(dir).await {
            Ok(listing) => listing,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("{} is already gone", dir.display());
                report.already_removed += 1;
                return NodeState::AlreadyRemoved;
            }
            Err(err) => {
                report.record_failure(dir, Stage::List, err);
                return state;
            }
        };

        let mut copied_all = true;
        for file in &listing.files {
            let Some(name) = file.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !files::is_replayed(name) {
                continue;
            }
            match self.copy_config(file, &mirror.join(name)).await {
                Ok(tally) => {
                    report.lines_copied += tally.copied;
                    report.lines_skipped += tally.skipped;
                }
                Err(err) => {
                    copied_all = false;
                    report.record_failure(dir, Stage::CopyConfig, err);
                }
            }
        }
        if copied_all && state == NodeState::FlagEnabled {
            state = NodeState::ConfigCopied;
        }

        if !listing.dirs.is_empty() {
            debug!(
                "{} still has {} child groups, keeping it",
                dir.display(),
                listing.dirs.len()
            );
            return state;
        }

        let fs = self.fs;
        let force_empty = dir.join(files::FORCE_EMPTY);
        let force_empty = force_empty.as_path();
        let drained = retry(self.settle_retry, move |_| {
            fs.write_value(force_empty, files::DRAIN)
        })
        .await;
        match drained {
            Ok(()) => {
                report.drained += 1;
                if state == NodeState::ConfigCopied {
                    state = NodeState::Drained;
                }
            }
            Err(err) => report.record_failure(dir, Stage::Drain, err),
        }

        info!("rmdir {}", dir.display());
        match retry(self.settle_retry, move |_| fs.remove_dir(dir)).await {
            Ok(()) => {
                report.removed += 1;
                NodeState::Removed
            }
            Err(err) => {
                report.record_failure(dir, Stage::Remove, err);
                state
            }
        }
    }

    /// Replays `source` into `target` line by line, retrying the whole file.
    async fn copy_config(&self, source: &Path, target: &Path) -> Result<CopyTally, CopyError> {
        retry(self.copy_retry, move |_| self.replay_lines(source, target)).await
    }

    async fn replay_lines(&self, source: &Path, target: &Path) -> Result<CopyTally, CopyError> {
        let content = self
            .fs
            .read_to_string(source)
            .await
            .context(ReadConfigSnafu { path: source })?;

        let mut tally = CopyTally::default();
        for line in content.lines().map(str::trim_end).filter(|line| !line.is_empty()) {
            match self.fs.append_line(target, line).await {
                Ok(()) => tally.copied += 1,
                Err(err) if is_vanished_process(&err) => {
                    debug!("Process {} exited before it could be moved", line);
                    tally.skipped += 1;
                }
                Err(err) => {
                    return Err(err).context(AppendLineSnafu { line, path: target });
                }
            }
        }
        Ok(tally)
    }
}

#[derive(Debug, Snafu)]
pub enum CopyError {
    #[snafu(display("Failed to read {}: {}", path.display(), source))]
    ReadConfigError { path: PathBuf, source: io::Error },
    #[snafu(display("Failed to append '{}' to {}: {}", line, path.display(), source))]
    AppendLineError {
        line: String,
        path: PathBuf,
        source: io::Error,
    },
}

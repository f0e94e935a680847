use std::fmt;
use std::path::{Path, PathBuf};

use derive_more::Display;
use tracing::warn;

/// How far a group got through its migration, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum NodeState {
    #[display("pending")]
    Pending,
    #[display("mirror created")]
    MirrorCreated,
    #[display("flag enabled")]
    FlagEnabled,
    #[display("config copied")]
    ConfigCopied,
    #[display("drained")]
    Drained,
    #[display("removed")]
    Removed,
    /// The directory was gone before it could be re-listed.
    #[display("already removed")]
    AlreadyRemoved,
}

impl NodeState {
    pub fn is_gone(&self) -> bool {
        matches!(self, NodeState::Removed | NodeState::AlreadyRemoved)
    }
}

/// The step of the per-group sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    #[display("rebase")]
    Rebase,
    #[display("create mirror")]
    CreateMirror,
    #[display("enable flag")]
    EnableFlag,
    #[display("list")]
    List,
    #[display("copy config")]
    CopyConfig,
    #[display("drain")]
    Drain,
    #[display("remove")]
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{stage} failed for {}: {message}", path.display())]
pub struct NodeFailure {
    pub path: PathBuf,
    pub stage: Stage,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOutcome {
    pub path: PathBuf,
    pub state: NodeState,
}

/// Aggregated result of one migration pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub visited: usize,
    pub mirrors_created: usize,
    pub flags_enabled: usize,
    pub lines_copied: usize,
    /// Lines naming processes that exited before they could be moved.
    pub lines_skipped: usize,
    pub drained: usize,
    pub removed: usize,
    pub already_removed: usize,
    pub failures: Vec<NodeFailure>,
    /// One entry per visited group, in visiting order.
    pub outcomes: Vec<NodeOutcome>,
}

impl MigrationReport {
    pub fn new(source: &Path, destination: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn state_of(&self, path: impl AsRef<Path>) -> Option<NodeState> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.path == path.as_ref())
            .map(|outcome| outcome.state)
    }

    /// Source groups that still exist after the pass.
    pub fn left_behind(&self) -> impl Iterator<Item = &Path> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.state.is_gone())
            .map(|outcome| outcome.path.as_path())
    }

    pub(crate) fn record_failure(&mut self, path: &Path, stage: Stage, message: impl fmt::Display) {
        let failure = NodeFailure {
            path: path.to_path_buf(),
            stage,
            message: message.to_string(),
        };
        warn!("{}", failure);
        self.failures.push(failure);
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: {} groups visited, {} mirrors created, {} flags enabled, \
             {} lines copied, {} lines skipped, {} drained, {} removed, \
             {} already gone, {} failures",
            self.source.display(),
            self.destination.display(),
            self.visited,
            self.mirrors_created,
            self.flags_enabled,
            self.lines_copied,
            self.lines_skipped,
            self.drained,
            self.removed,
            self.already_removed,
            self.failures.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_ordered_along_the_migration() {
        assert!(NodeState::Pending < NodeState::MirrorCreated);
        assert!(NodeState::FlagEnabled < NodeState::ConfigCopied);
        assert!(NodeState::Drained < NodeState::Removed);
        assert!(NodeState::Removed.is_gone());
        assert!(NodeState::AlreadyRemoved.is_gone());
        assert!(!NodeState::Drained.is_gone());
    }

    #[test]
    fn failures_are_collected_and_displayed() {
        let mut report = MigrationReport::new(Path::new("/cg/a"), Path::new("/cg/b"));
        assert!(report.is_clean());

        report.record_failure(Path::new("/cg/a/x"), Stage::Remove, "Device or resource busy");

        assert!(!report.is_clean());
        assert_eq!(
            report.failures[0].to_string(),
            "remove failed for /cg/a/x: Device or resource busy"
        );
        assert!(report.to_string().ends_with("1 failures"));
    }

    #[test]
    fn left_behind_lists_groups_that_still_exist() {
        let mut report = MigrationReport::new(Path::new("/cg/a"), Path::new("/cg/b"));
        report.outcomes = vec![
            NodeOutcome {
                path: PathBuf::from("/cg/a/x"),
                state: NodeState::Removed,
            },
            NodeOutcome {
                path: PathBuf::from("/cg/a"),
                state: NodeState::ConfigCopied,
            },
        ];

        assert_eq!(report.left_behind().collect::<Vec<_>>(), [Path::new("/cg/a")]);
        assert_eq!(report.state_of("/cg/a/x"), Some(NodeState::Removed));
        assert_eq!(report.state_of("/cg/a/y"), None);
    }
}

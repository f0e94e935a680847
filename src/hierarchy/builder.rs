use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu};
use tracing::debug;

use super::{Hierarchy, NodeId};
use crate::collections::Stack;
use crate::control::ControlFs;

/// Reads a directory subtree into a [`Hierarchy`] of absolute paths.
///
/// Only directories become nodes; files are left to whoever walks the
/// snapshot. Expansion is iterative, so memory grows with the frontier of
/// unexpanded directories and not with the call depth of the real tree.
pub struct HierarchyBuilder<'a, F> {
    fs: &'a F,
}

impl<'a, F: ControlFs> HierarchyBuilder<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self { fs }
    }

    /// Snapshots the tree rooted at `root`. Any directory that cannot be
    /// listed fails the whole build; no partial tree is returned.
    pub async fn build(&self, root: &Path) -> Result<Hierarchy<PathBuf>, BuildError> {
        let mut hierarchy = Hierarchy::with_root(root.to_path_buf());
        let pending: Stack<NodeId> = Stack::new();
        pending.push(hierarchy.root());

        while let Some(current) = pending.pop() {
            let dir = hierarchy.value(current).clone();
            let listing = self.fs.list_dir(&dir).await.context(ListSnafu { path: &dir })?;

            for child in hierarchy.attach_children(current, listing.dirs) {
                pending.push(child);
            }
        }

        debug!(
            "Built snapshot of {} with {} groups",
            root.display(),
            hierarchy.node_count()
        );
        Ok(hierarchy)
    }
}

#[derive(Debug, Snafu)]
pub enum BuildError {
    #[snafu(display("Failed to list directory {}", path.display()))]
    ListError {
        path: PathBuf,
        source: std::io::Error,
    },
}

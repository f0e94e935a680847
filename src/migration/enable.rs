use std::path::PathBuf;

use snafu::{ResultExt, Snafu};
use tracing::{debug, info};

use crate::control::{ControlFs, files};
use crate::hierarchy::Hierarchy;

/// Turns on charge migration for every group of `snapshot` that exposes the
/// flag, so charges follow the processes moved by the traversal.
///
/// Returns how many groups were switched. The first failure aborts: moving
/// processes without their charges would leave the leak in place.
pub async fn enable_charge_migration<F: ControlFs>(
    fs: &F,
    snapshot: &Hierarchy<PathBuf>,
) -> Result<usize, EnableError> {
    let mut enabled = 0;
    for id in snapshot.pre_order() {
        let flag = snapshot.value(id).join(files::MOVE_CHARGE_AT_IMMIGRATE);
        if !fs.exists(&flag).await {
            debug!("{} has no migration flag", snapshot.value(id).display());
            continue;
        }
        fs.write_value(&flag, files::MIGRATION_ENABLED)
            .await
            .context(WriteFlagSnafu { path: &flag })?;
        enabled += 1;
    }

    info!(
        "Enabled charge migration on {} groups under {}",
        enabled,
        snapshot.value(snapshot.root()).display()
    );
    Ok(enabled)
}

#[derive(Debug, Snafu)]
pub enum EnableError {
    #[snafu(display("Failed to enable charge migration in {}", path.display()))]
    WriteFlagError {
        path: PathBuf,
        source: std::io::Error,
    },
}

use std::path::PathBuf;

use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::command::{CommandError, CommandRunner};
use crate::config::Config;
use crate::control::ControlFs;
use crate::hierarchy::{BuildError, HierarchyBuilder};
use crate::migration::{
    EnableError, LeakProbe, LeakStatus, MigrationReport, Migrator, ProbeError,
    enable_charge_migration,
};

#[derive(Debug)]
pub enum RemediationOutcome {
    /// The probe found nothing to fix and no group was touched.
    NotLeaking,
    Migrated {
        outbound: MigrationReport,
        inbound: MigrationReport,
    },
}

/// One full remediation: move every group under the source root into the
/// mirror, then move them back so each group is recreated fresh.
pub struct Remediation<'a, F> {
    fs: &'a F,
    runner: &'a CommandRunner,
    config: &'a Config,
    force: bool,
}

impl<'a, F: ControlFs> Remediation<'a, F> {
    pub fn new(fs: &'a F, runner: &'a CommandRunner, config: &'a Config) -> Self {
        Self {
            fs,
            runner,
            config,
            force: false,
        }
    }

    /// Skips the leak probe and migrates unconditionally.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub async fn execute(&self) -> Result<RemediationOutcome, RemediationError> {
        let source = self.config.source_root();
        let mirror = self.config.mirror_root();
        ensure!(
            !source.starts_with(&mirror) && !mirror.starts_with(&source),
            OverlappingGroupsSnafu {
                source_root: source.clone(),
                mirror_root: mirror.clone(),
            }
        );

        if self.force {
            info!("Skipping the leak probe");
        } else {
            match LeakProbe::new(self.fs).check(&source).await.context(ProbeSnafu)? {
                LeakStatus::NotLeaking => {
                    info!("{} is not leaking, nothing to do", source.display());
                    return Ok(RemediationOutcome::NotLeaking);
                }
                LeakStatus::Leaking => info!("{} is leaking, migrating", source.display()),
            }
        }

        let builder = HierarchyBuilder::new(self.fs);
        let snapshot = builder.build(&source).await.context(SnapshotSnafu)?;
        info!("Captured {} groups under {}", snapshot.node_count(), source.display());

        self.run_hook("stop_agent", self.config.hooks.stop_agent.as_deref())
            .await?;

        let migrator = Migrator::new(self.fs, self.config.settle_retry, self.config.copy_attempts);

        let enabled = enable_charge_migration(self.fs, &snapshot)
            .await
            .context(EnableSnafu)?;
        debug!("Enabled charge migration on {} groups", enabled);
        let outbound = migrator.migrate(&snapshot, &source, &mirror).await;
        info!("{}", outbound);

        let mirrored = builder.build(&mirror).await.context(SnapshotSnafu)?;
        let enabled = enable_charge_migration(self.fs, &mirrored)
            .await
            .context(EnableSnafu)?;
        debug!("Enabled charge migration on {} groups", enabled);
        let inbound = migrator.migrate(&mirrored, &mirror, &source).await;
        info!("{}", inbound);

        self.run_hook("start_agent", self.config.hooks.start_agent.as_deref())
            .await?;
        self.run_hook("restart_monitor", self.config.hooks.restart_monitor.as_deref())
            .await?;

        if !(outbound.is_clean() && inbound.is_clean()) {
            warn!("Migration finished with failures, a rerun may be needed");
        }
        Ok(RemediationOutcome::Migrated { outbound, inbound })
    }

    async fn run_hook(&self, hook: &'static str, command: Option<&str>) -> Result<(), RemediationError> {
        let Some(command) = command else {
            debug!("No {} hook configured", hook);
            return Ok(());
        };
        info!("Running {} hook: {}", hook, command);
        self.runner
            .run_with_retry(command, self.config.hooks.retry)
            .await
            .context(HookSnafu { hook })
    }
}

#[derive(Debug, Snafu)]
pub enum RemediationError {
    #[snafu(display(
        "Refusing to migrate between overlapping groups {} and {}",
        source_root.display(),
        mirror_root.display()
    ))]
    OverlappingGroups {
        source_root: PathBuf,
        mirror_root: PathBuf,
    },
    #[snafu(display("Failed to probe for a leak"))]
    ProbeError { source: ProbeError },
    #[snafu(display("Failed to capture the group hierarchy"))]
    SnapshotError { source: BuildError },
    #[snafu(display("Failed to enable charge migration"))]
    EnableError { source: EnableError },
    #[snafu(display("The {} hook failed", hook))]
    HookError { hook: String, source: CommandError },
}

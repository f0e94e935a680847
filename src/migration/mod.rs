//! Moving a group hierarchy to a mirror location, bottom-up.

mod enable;
mod probe;
mod report;
mod traversal;

pub use enable::{EnableError, enable_charge_migration};
pub use probe::{LeakProbe, LeakStatus, ProbeError};
pub use report::{MigrationReport, NodeFailure, NodeOutcome, NodeState, Stage};
pub use traversal::Migrator;

//! Narrow capability interface over the cgroup filesystem.
//!
//! Every mutation the migration performs is one named operation on
//! [`ControlFs`]: create a directory, write a value into a control file,
//! append a line to a control file, remove an empty group. Backends decide
//! how the operation reaches the kernel.

mod backend;
mod control_fs;
pub mod files;
mod host;
#[cfg(test)]
mod memory;
mod shell;

pub use backend::{BackendKind, ControlBackend, UnknownBackendError};
pub use control_fs::{ControlFs, DirListing, errno, is_vanished_process};
pub use host::HostControlFs;
#[cfg(test)]
pub use memory::{MemoryControlFs, Op};
pub use shell::ShellControlFs;

use std::path::{Path, PathBuf};

use derive_more::Display;
use snafu::{ResultExt, Snafu};
use tracing::debug;

use crate::control::{ControlFs, errno, files};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LeakStatus {
    #[display("leaking")]
    Leaking,
    #[display("not leaking")]
    NotLeaking,
}

/// Decides whether a group hierarchy suffers from the kmem accounting leak.
///
/// Kernel memory accounting is what pins the leaked groups, and its slab
/// statistics are only readable while it is active. A readable
/// `memory.kmem.slabinfo` means leaking, `EIO` means accounting is off, and
/// anything else means the probe could not tell.
pub struct LeakProbe<'a, F> {
    fs: &'a F,
}

impl<'a, F: ControlFs> LeakProbe<'a, F> {
    pub fn new(fs: &'a F) -> Self {
        Self { fs }
    }

    pub async fn check(&self, root: &Path) -> Result<LeakStatus, ProbeError> {
        let slabinfo = root.join(files::KMEM_SLABINFO);
        match self.fs.read_to_string(&slabinfo).await {
            Ok(_) => Ok(LeakStatus::Leaking),
            Err(err) if err.raw_os_error() == Some(errno::EIO) => {
                debug!("{} is not readable: {}", slabinfo.display(), err);
                Ok(LeakStatus::NotLeaking)
            }
            Err(err) => Err(err).context(ReadSlabinfoSnafu { path: slabinfo }),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ProbeError {
    #[snafu(display("Failed to probe {}", path.display()))]
    ReadSlabinfoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

use std::fs;
use std::io;
use std::path::Path;

use compio::fs::{File, OpenOptions};
use compio::io::AsyncWriteAtExt;
use tracing::debug;

use super::{ControlFs, DirListing};

/// Talks to the filesystem directly, one syscall per operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostControlFs;

impl HostControlFs {
    async fn write_line_at(mut handle: File, line: &str, pos: u64) -> io::Result<()> {
        // One write call per value, the kernel parses each write separately.
        handle.write_all_at(format!("{line}\n"), pos).await.0?;
        handle.close().await
    }
}

impl ControlFs for HostControlFs {
    // compio has no directory iteration, listing goes through std.
    async fn list_dir(&self, dir: &Path) -> io::Result<DirListing> {
        let mut listing = DirListing::default();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                listing.dirs.push(entry.path());
            } else {
                listing.files.push(entry.path());
            }
        }
        listing.dirs.sort();
        listing.files.sort();
        Ok(listing)
    }

    async fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    async fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        compio::fs::create_dir_all(dir).await
    }

    async fn read_to_string(&self, file: &Path) -> io::Result<String> {
        let bytes = compio::fs::read(file).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn write_value(&self, file: &Path, value: &str) -> io::Result<()> {
        debug!("write {} > {}", value, file.display());
        let handle = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(file)
            .await?;
        Self::write_line_at(handle, value, 0).await
    }

    async fn append_line(&self, file: &Path, line: &str) -> io::Result<()> {
        debug!("append {} >> {}", line, file.display());
        let handle = OpenOptions::new().write(true).create(true).open(file).await?;
        // Control files report a zero length, so this is 0 on cgroupfs.
        let end = handle.metadata().await?.len();
        Self::write_line_at(handle, line, end).await
    }

    async fn remove_dir(&self, dir: &Path) -> io::Result<()> {
        compio::fs::remove_dir(dir).await
    }
}

use std::io;
use std::path::{Path, PathBuf};

/// Linux error numbers the migration reacts to.
pub mod errno {
    pub const ENOENT: i32 = 2;
    pub const ESRCH: i32 = 3;
    pub const EIO: i32 = 5;
    pub const EACCES: i32 = 13;
    pub const EBUSY: i32 = 16;
    pub const EINVAL: i32 = 22;
    pub const ENOTEMPTY: i32 = 39;
}

/// Immediate entries of one directory, each list sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    pub dirs: Vec<PathBuf>,
    pub files: Vec<PathBuf>,
}

/// The operations the migration engine needs from a cgroup filesystem.
pub trait ControlFs {
    /// Lists subdirectories and files of `dir`.
    async fn list_dir(&self, dir: &Path) -> io::Result<DirListing>;

    async fn exists(&self, path: &Path) -> bool;

    /// Creates `dir` together with any missing ancestors.
    async fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    async fn read_to_string(&self, file: &Path) -> io::Result<String>;

    /// Replaces the content of a control file with `value`.
    async fn write_value(&self, file: &Path, value: &str) -> io::Result<()>;

    /// Appends `line` to a control file as a single write.
    async fn append_line(&self, file: &Path, line: &str) -> io::Result<()>;

    /// Removes a group directory. Fails while subdirectories remain.
    async fn remove_dir(&self, dir: &Path) -> io::Result<()>;
}

/// The write named a process that exited in the meantime.
pub fn is_vanished_process(err: &io::Error) -> bool {
    err.raw_os_error() == Some(errno::ESRCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_esrch_counts_as_vanished_process() {
        assert!(is_vanished_process(&io::Error::from_raw_os_error(errno::ESRCH)));
        assert!(!is_vanished_process(&io::Error::from_raw_os_error(errno::EINVAL)));
        assert!(!is_vanished_process(&io::Error::other("No such process")));
    }
}

//! In-memory cgroupfs used by tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use super::control_fs::errno;
use super::{ControlFs, DirListing, files};

/// Control files every group gets when its directory is created.
const CONTROL_FILES: [&str; 5] = [
    files::MOVE_CHARGE_AT_IMMIGRATE,
    files::LIMIT_IN_BYTES,
    files::CGROUP_PROCS,
    files::FORCE_EMPTY,
    files::KMEM_SLABINFO,
];

/// A mutation recorded by [`MemoryControlFs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    CreateDir(PathBuf),
    Write(PathBuf, String),
    Append(PathBuf, String),
    RemoveDir(PathBuf),
}

#[derive(Debug)]
enum Entry {
    Dir,
    File(String),
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<PathBuf, Entry>,
    ops: Vec<Op>,
    failing_lines: HashMap<(PathBuf, String), i32>,
    failing_reads: HashMap<PathBuf, i32>,
    failing_writes: HashMap<PathBuf, i32>,
    failing_creates: HashMap<PathBuf, i32>,
    // Remaining EBUSY failures per directory, `None` for every attempt.
    busy_dirs: HashMap<PathBuf, Option<u32>>,
}

impl State {
    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entries.get(path), Some(Entry::Dir))
    }

    fn children(&self, dir: &Path) -> impl Iterator<Item = (&PathBuf, &Entry)> {
        self.entries
            .iter()
            .filter(move |(path, _)| path.parent() == Some(dir))
    }

    fn make_dir(&mut self, dir: &Path) {
        if self.entries.contains_key(dir) {
            return;
        }
        self.entries.insert(dir.to_path_buf(), Entry::Dir);
        for name in CONTROL_FILES {
            self.entries
                .insert(dir.join(name), Entry::File(String::new()));
        }
    }

    fn file_mut(&mut self, file: &Path) -> io::Result<&mut String> {
        let parent_is_dir = file.parent().is_some_and(|parent| self.is_dir(parent));
        if !parent_is_dir {
            return Err(io::Error::from_raw_os_error(errno::ENOENT));
        }
        match self
            .entries
            .entry(file.to_path_buf())
            .or_insert_with(|| Entry::File(String::new()))
        {
            Entry::File(content) => Ok(content),
            Entry::Dir => Err(io::Error::from_raw_os_error(errno::EINVAL)),
        }
    }
}

/// Models the parts of cgroupfs semantics the migration relies on: creating a
/// group populates its control files, and a group can be removed while it
/// still holds control files but not while it has child groups.
#[derive(Debug, Default)]
pub struct MemoryControlFs {
    state: RefCell<State>,
}

impl MemoryControlFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the group `dir` and every missing ancestor.
    pub fn add_group(&self, dir: impl AsRef<Path>) -> &Self {
        let mut state = self.state.borrow_mut();
        for ancestor in dir.as_ref().ancestors().collect::<Vec<_>>().into_iter().rev() {
            state.make_dir(ancestor);
        }
        self
    }

    pub fn set_file(&self, file: impl AsRef<Path>, content: &str) -> &Self {
        self.state
            .borrow_mut()
            .entries
            .insert(file.as_ref().to_path_buf(), Entry::File(content.to_string()));
        self
    }

    /// Appending exactly `line` to `file` fails with `code`.
    pub fn fail_line(&self, file: impl AsRef<Path>, line: &str, code: i32) -> &Self {
        self.state
            .borrow_mut()
            .failing_lines
            .insert((file.as_ref().to_path_buf(), line.to_string()), code);
        self
    }

    /// Reading `path`, or listing it when it is a directory, fails with `code`.
    pub fn fail_read(&self, file: impl AsRef<Path>, code: i32) -> &Self {
        self.state
            .borrow_mut()
            .failing_reads
            .insert(file.as_ref().to_path_buf(), code);
        self
    }

    pub fn fail_write(&self, file: impl AsRef<Path>, code: i32) -> &Self {
        self.state
            .borrow_mut()
            .failing_writes
            .insert(file.as_ref().to_path_buf(), code);
        self
    }

    pub fn fail_create(&self, dir: impl AsRef<Path>, code: i32) -> &Self {
        self.state
            .borrow_mut()
            .failing_creates
            .insert(dir.as_ref().to_path_buf(), code);
        self
    }

    /// Removing `dir` fails with `EBUSY` `times` times, or always for `None`.
    pub fn busy(&self, dir: impl AsRef<Path>, times: Option<u32>) -> &Self {
        self.state
            .borrow_mut()
            .busy_dirs
            .insert(dir.as_ref().to_path_buf(), times);
        self
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state.borrow().ops.clone()
    }

    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        self.state.borrow().is_dir(path.as_ref())
    }

    /// Every directory under (and including) `root`, sorted.
    pub fn dirs_under(&self, root: impl AsRef<Path>) -> Vec<PathBuf> {
        self.state
            .borrow()
            .entries
            .iter()
            .filter(|(path, entry)| matches!(entry, Entry::Dir) && path.starts_with(root.as_ref()))
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn lines(&self, file: impl AsRef<Path>) -> Vec<String> {
        match self.state.borrow().entries.get(file.as_ref()) {
            Some(Entry::File(content)) => content.lines().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }
}

impl ControlFs for MemoryControlFs {
    async fn list_dir(&self, dir: &Path) -> io::Result<DirListing> {
        let state = self.state.borrow();
        if let Some(code) = state.failing_reads.get(dir) {
            return Err(io::Error::from_raw_os_error(*code));
        }
        if !state.is_dir(dir) {
            return Err(io::Error::from_raw_os_error(errno::ENOENT));
        }
        let mut listing = DirListing::default();
        for (path, entry) in state.children(dir) {
            match entry {
                Entry::Dir => listing.dirs.push(path.clone()),
                Entry::File(_) => listing.files.push(path.clone()),
            }
        }
        Ok(listing)
    }

    async fn exists(&self, path: &Path) -> bool {
        self.state.borrow().entries.contains_key(path)
    }

    async fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(code) = state.failing_creates.get(dir) {
            return Err(io::Error::from_raw_os_error(*code));
        }
        for ancestor in dir.ancestors().collect::<Vec<_>>().into_iter().rev() {
            if matches!(state.entries.get(ancestor), Some(Entry::File(_))) {
                return Err(io::Error::from_raw_os_error(errno::EINVAL));
            }
            state.make_dir(ancestor);
        }
        state.ops.push(Op::CreateDir(dir.to_path_buf()));
        Ok(())
    }

    async fn read_to_string(&self, file: &Path) -> io::Result<String> {
        let state = self.state.borrow();
        if let Some(code) = state.failing_reads.get(file) {
            return Err(io::Error::from_raw_os_error(*code));
        }
        match state.entries.get(file) {
            Some(Entry::File(content)) => Ok(content.clone()),
            Some(Entry::Dir) => Err(io::Error::from_raw_os_error(errno::EINVAL)),
            None => Err(io::Error::from_raw_os_error(errno::ENOENT)),
        }
    }

    async fn write_value(&self, file: &Path, value: &str) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(code) = state.failing_writes.get(file) {
            return Err(io::Error::from_raw_os_error(*code));
        }
        *state.file_mut(file)? = format!("{value}\n");
        state.ops.push(Op::Write(file.to_path_buf(), value.to_string()));
        Ok(())
    }

    async fn append_line(&self, file: &Path, line: &str) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        let key = (file.to_path_buf(), line.to_string());
        if let Some(code) = state.failing_lines.get(&key) {
            return Err(io::Error::from_raw_os_error(*code));
        }
        let content = state.file_mut(file)?;
        content.push_str(line);
        content.push('\n');
        state.ops.push(Op::Append(key.0, key.1));
        Ok(())
    }

    async fn remove_dir(&self, dir: &Path) -> io::Result<()> {
        let mut state = self.state.borrow_mut();
        if let Some(remaining) = state.busy_dirs.get_mut(dir) {
            match remaining {
                None => return Err(io::Error::from_raw_os_error(errno::EBUSY)),
                Some(0) => {}
                Some(count) => {
                    *count -= 1;
                    return Err(io::Error::from_raw_os_error(errno::EBUSY));
                }
            }
        }
        if !state.is_dir(dir) {
            return Err(io::Error::from_raw_os_error(errno::ENOENT));
        }
        if state.children(dir).any(|(_, entry)| matches!(entry, Entry::Dir)) {
            return Err(io::Error::from_raw_os_error(errno::ENOTEMPTY));
        }
        let doomed = state
            .children(dir)
            .map(|(path, _)| path.clone())
            .collect::<Vec<_>>();
        for path in doomed {
            state.entries.remove(&path);
        }
        state.entries.remove(dir);
        state.ops.push(Op::RemoveDir(dir.to_path_buf()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[compio::test]
    async fn new_groups_come_with_control_files() {
        let fs = MemoryControlFs::new();
        fs.add_group("/cg/pods/a");

        let listing = fs.list_dir(Path::new("/cg/pods/a")).await.expect("listing");
        assert!(listing.dirs.is_empty());
        assert!(listing.files.contains(&PathBuf::from("/cg/pods/a/cgroup.procs")));
        assert!(fs.is_dir("/cg/pods"));
    }

    #[compio::test]
    async fn groups_with_children_cannot_be_removed() {
        let fs = MemoryControlFs::new();
        fs.add_group("/cg/pods/a");

        let err = fs.remove_dir(Path::new("/cg/pods")).await.expect_err("has child");
        assert_eq!(err.raw_os_error(), Some(errno::ENOTEMPTY));

        fs.remove_dir(Path::new("/cg/pods/a")).await.expect("leaf removal");
        fs.remove_dir(Path::new("/cg/pods")).await.expect("now a leaf");
        assert!(!fs.exists(Path::new("/cg/pods/cgroup.procs")).await);
    }

    #[compio::test]
    async fn busy_groups_fail_the_requested_number_of_times() {
        let fs = MemoryControlFs::new();
        fs.add_group("/cg/a").busy("/cg/a", Some(2));

        assert!(fs.remove_dir(Path::new("/cg/a")).await.is_err());
        assert!(fs.remove_dir(Path::new("/cg/a")).await.is_err());
        assert!(fs.remove_dir(Path::new("/cg/a")).await.is_ok());
    }

    #[compio::test]
    async fn injected_line_failures_leave_content_untouched() {
        let fs = MemoryControlFs::new();
        fs.add_group("/cg/a")
            .fail_line("/cg/a/cgroup.procs", "7", errno::ESRCH);

        let procs = Path::new("/cg/a/cgroup.procs");
        fs.append_line(procs, "6").await.expect("append");
        assert!(fs.append_line(procs, "7").await.is_err());
        assert_eq!(fs.lines(procs), ["6"]);
    }
}

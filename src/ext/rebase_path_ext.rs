use std::path::{Path, PathBuf};

/// Moves a path from one root to another.
pub trait RebasePathExt {
    /// Replaces the leading `from` components with `to`.
    ///
    /// Matching is done per component, so `/a/pods2/x` is not considered to
    /// be under `/a/pods`. Returns `None` when the path is not under `from`.
    fn rebase(&self, from: &Path, to: &Path) -> Option<PathBuf>;
}

impl RebasePathExt for Path {
    fn rebase(&self, from: &Path, to: &Path) -> Option<PathBuf> {
        let relative = self.strip_prefix(from).ok()?;
        if relative.as_os_str().is_empty() {
            Some(to.to_path_buf())
        } else {
            Some(to.join(relative))
        }
    }
}

impl RebasePathExt for PathBuf {
    fn rebase(&self, from: &Path, to: &Path) -> Option<PathBuf> {
        self.as_path().rebase(from, to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/cg/kubepods", "/cg/kubepods2")]
    #[case("/cg/kubepods/burstable", "/cg/kubepods2/burstable")]
    #[case("/cg/kubepods/burstable/pod1/abc", "/cg/kubepods2/burstable/pod1/abc")]
    fn rebases_paths_under_the_source(#[case] path: &str, #[case] expected: &str) {
        let rebased = Path::new(path).rebase(Path::new("/cg/kubepods"), Path::new("/cg/kubepods2"));
        assert_eq!(rebased, Some(PathBuf::from(expected)));
    }

    #[rstest]
    #[case("/cg/kubepods2/burstable")]
    #[case("/cg/other")]
    #[case("relative/kubepods")]
    fn refuses_paths_outside_the_source(#[case] path: &str) {
        let rebased =
            PathBuf::from(path).rebase(Path::new("/cg/kubepods"), Path::new("/cg/kubepods2"));
        assert_eq!(rebased, None);
    }

    #[test]
    fn rebasing_back_is_symmetric() {
        let source = Path::new("/cg/kubepods");
        let mirror = Path::new("/cg/kubepods2");
        let path = Path::new("/cg/kubepods/besteffort/pod9");

        let there = path.rebase(source, mirror).expect("under source");
        assert_eq!(there.rebase(mirror, source).as_deref(), Some(path));
    }
}

mod rebase_path_ext;

pub use rebase_path_ext::RebasePathExt;

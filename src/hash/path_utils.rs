// src/hash/path_utils.rs

//! Resolution of declared output paths.

use std::io;
use std::path::{Component, Path, PathBuf};

/// Resolve a declared output path to an absolute one.
///
/// Absolute paths are returned verbatim and never joined onto `work_dir`.
/// Relative paths are joined onto `work_dir`, made absolute against the
/// process working directory and then normalized lexically.
///
/// Fails only if the process working directory cannot be determined.
pub fn resolve_output_path(work_dir: &Path, output: &Path) -> io::Result<PathBuf> {
    if output.is_absolute() {
        return Ok(output.to_path_buf());
    }

    let joined = work_dir.join(output);
    let absolute = std::path::absolute(&joined)?;
    Ok(normalize_lexically(&absolute))
}

/// Drop `.` components and fold `..` into its parent without touching the
/// filesystem (symlinks are not resolved).
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root.
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn absolute_output_is_not_rejoined() {
        let resolved = resolve_output_path(Path::new("/a/b"), Path::new("/etc/x")).unwrap();
        assert_eq!(resolved, PathBuf::from("/etc/x"));
    }

    #[cfg(unix)]
    #[test]
    fn relative_output_is_joined_and_cleaned() {
        let resolved =
            resolve_output_path(Path::new("/a/b"), Path::new("./gen/../out/x.txt")).unwrap();
        assert_eq!(resolved, PathBuf::from("/a/b/out/x.txt"));
    }

    #[test]
    fn relative_work_dir_resolves_against_cwd() {
        let cwd = std::env::current_dir().unwrap();
        let resolved = resolve_output_path(Path::new("sub"), Path::new("x.txt")).unwrap();
        assert_eq!(resolved, cwd.join("sub").join("x.txt"));
    }

    #[test]
    fn empty_work_dir_means_cwd() {
        let cwd = std::env::current_dir().unwrap();
        let resolved = resolve_output_path(Path::new(""), Path::new("x.txt")).unwrap();
        assert_eq!(resolved, cwd.join("x.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn normalize_handles_parent_at_root() {
        assert_eq!(normalize_lexically(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_lexically(Path::new("a/../../b")), PathBuf::from("../b"));
    }
}

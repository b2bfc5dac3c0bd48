//! Symlink-safe filesystem helpers for catalog discovery and project scans.
//!
//! These helpers use `symlink_metadata()` instead of `metadata()` so a
//! symlink inside a project or catalog never pulls the walk outside it.

use std::path::Path;

/// Directories never descended into while scanning a project.
const SKIP_DIRECTORIES: &[&str] = &[
    "node_modules",
    "target",
    "build",
    "dist",
    "out",
    "__pycache__",
    "venv",
    "env",
    "vendor",
    "bin",
    "obj",
];

/// Returns `true` if the path is a regular file (not a symlink).
#[must_use]
pub(crate) fn is_regular_file(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_file())
        .unwrap_or(false)
}

/// Returns `true` if the path is a regular directory (not a symlink).
#[must_use]
pub(crate) fn is_regular_dir(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false)
}

/// Returns `true` for hidden directories and build/dependency output.
#[must_use]
pub(crate) fn should_skip_dir(name: &str) -> bool {
    name.starts_with('.') || SKIP_DIRECTORIES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn is_regular_file_true_for_regular_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("package.json");
        fs::write(&file, "{}").unwrap();
        assert!(is_regular_file(&file));
    }

    #[test]
    fn is_regular_file_false_for_directory_and_missing() {
        let dir = tempdir().unwrap();
        assert!(!is_regular_file(dir.path()));
        assert!(!is_regular_file(&dir.path().join("missing.toml")));
    }

    #[cfg(unix)]
    #[test]
    fn is_regular_file_false_for_symlink_to_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("go.mod");
        fs::write(&target, "module x\n").unwrap();
        let link = dir.path().join("link.mod");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        assert!(!is_regular_file(&link));
    }

    #[test]
    fn is_regular_dir_true_for_regular_dir() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("pkg");
        fs::create_dir(&sub).unwrap();
        assert!(is_regular_dir(&sub));
        assert!(!is_regular_dir(&dir.path().join("nope")));
    }

    #[cfg(unix)]
    #[test]
    fn is_regular_dir_false_for_symlink_to_dir() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("real");
        fs::create_dir(&target).unwrap();
        let link = dir.path().join("alias");
        std::os::unix::fs::symlink(&target, &link).unwrap();
        assert!(!is_regular_dir(&link));
    }

    #[test]
    fn skips_hidden_and_output_dirs() {
        assert!(should_skip_dir(".git"));
        assert!(should_skip_dir("node_modules"));
        assert!(should_skip_dir("target"));
        assert!(!should_skip_dir("packages"));
        assert!(!should_skip_dir("src"));
    }
}

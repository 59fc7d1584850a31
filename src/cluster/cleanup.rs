//! Best-effort workspace removal
//!
//! Every entry is attempted even when earlier deletions fail; failures are
//! collected and reported together.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct CleanReport {
    /// Files and directories deleted
    pub removed: usize,
    /// Entries that could not be deleted
    pub errors: Vec<(PathBuf, std::io::Error)>,
}

impl CleanReport {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Recursively delete `root`, continuing past failures
pub fn remove_tree(root: &Path) -> CleanReport {
    let mut report = CleanReport::default();
    if root.symlink_metadata().is_err() {
        debug!("{} does not exist; nothing to remove", root.display());
        return report;
    }
    remove_entry(root, &mut report);
    for (path, e) in &report.errors {
        warn!("Could not remove {}: {}", path.display(), e);
    }
    report
}

fn remove_entry(path: &Path, report: &mut CleanReport) {
    let is_dir = match path.symlink_metadata() {
        Ok(meta) => meta.is_dir(),
        Err(e) => {
            report.errors.push((path.to_path_buf(), e));
            return;
        }
    };

    if !is_dir {
        match std::fs::remove_file(path) {
            Ok(()) => report.removed += 1,
            Err(e) => report.errors.push((path.to_path_buf(), e)),
        }
        return;
    }

    match std::fs::read_dir(path) {
        Ok(entries) => {
            for entry in entries {
                match entry {
                    Ok(entry) => remove_entry(&entry.path(), report),
                    Err(e) => report.errors.push((path.to_path_buf(), e)),
                }
            }
        }
        Err(e) => report.errors.push((path.to_path_buf(), e)),
    }

    match std::fs::remove_dir(path) {
        Ok(()) => report.removed += 1,
        Err(e) => report.errors.push((path.to_path_buf(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_nested_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        std::fs::create_dir_all(root.join("data/kraft-combined-logs-1/t-0")).unwrap();
        std::fs::write(root.join("data/kraft-combined-logs-1/t-0/0.log"), b"x").unwrap();
        std::fs::write(root.join("cluster.id"), b"id").unwrap();

        let report = remove_tree(&root);

        assert!(report.is_complete());
        assert!(!root.exists());
        // 2 files + ws, data, kraft-combined-logs-1, t-0
        assert_eq!(report.removed, 6);
    }

    #[test]
    fn test_missing_root_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let report = remove_tree(&tmp.path().join("absent"));
        assert!(report.is_complete());
        assert_eq!(report.removed, 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_continues_past_failures() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        let locked = root.join("locked");
        std::fs::create_dir_all(&locked).unwrap();
        std::fs::write(locked.join("keep.log"), b"x").unwrap();
        std::fs::write(root.join("other.log"), b"x").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o500)).unwrap();

        // Privileged users ignore directory permissions
        if std::fs::write(locked.join("probe"), b"x").is_ok() {
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o700)).unwrap();
            return;
        }

        let report = remove_tree(&root);

        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o700)).unwrap();
        assert!(!report.is_complete());
        assert!(!root.join("other.log").exists());
        assert!(locked.join("keep.log").exists());
    }
}

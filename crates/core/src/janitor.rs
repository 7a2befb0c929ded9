//! Best-effort cleanup of the generated-sources directory before a run

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

/// Nesting beyond this is treated as a failure instead of recursing further
const MAX_DEPTH: usize = 256;

/// Deletes every non-hidden file and directory below `dir`.
///
/// Hidden entries (`.git`, `.svn`, dotfiles) are kept, and a subdirectory that
/// still holds hidden entries stays in place. Failures are logged and cleanup
/// carries on with the remaining siblings. Returns `true` only if everything
/// that should have been removed was removed. `dir` itself is never deleted.
pub fn clean(dir: &Path) -> bool {
    if !dir.is_dir() {
        warn!("Cannot clean {}: not a directory", dir.display());
        return false;
    }
    clean_children(dir, 0)
}

fn clean_children(dir: &Path, depth: usize) -> bool {
    if depth >= MAX_DEPTH {
        warn!("Not cleaning {}: nested too deeply", dir.display());
        return false;
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to list {}: {}", dir.display(), e);
            return false;
        }
    };

    let mut all_removed = true;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry in {}: {}", dir.display(), e);
                all_removed = false;
                continue;
            }
        };
        if is_hidden(&entry.file_name().to_string_lossy()) {
            debug!("Keeping hidden entry {}", entry.path().display());
            continue;
        }
        all_removed &= remove_entry(&entry.path(), depth);
    }
    all_removed
}

fn remove_entry(path: &Path, depth: usize) -> bool {
    // symlink_metadata so a link to a directory is removed, not followed
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Failed to stat {}: {}", path.display(), e);
            return false;
        }
    };

    if !metadata.is_dir() {
        return match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                false
            }
        };
    }

    let children_removed = clean_children(path, depth + 1);
    if !is_empty_dir(path) {
        // only hidden leftovers (or failures already reported) remain
        return children_removed;
    }
    match fs::remove_dir(path) {
        Ok(()) => children_removed,
        Err(e) => {
            warn!("Failed to delete directory {}: {}", path.display(), e);
            false
        }
    }
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_removes_visible_and_keeps_hidden() {
        let temp = TempDir::new().unwrap();
        let out = temp.path();
        fs::write(out.join("Old.gen"), "stale").unwrap();
        fs::create_dir_all(out.join(".git/refs")).unwrap();
        fs::write(out.join(".git/HEAD"), "ref").unwrap();
        fs::create_dir_all(out.join("com/acme")).unwrap();
        fs::write(out.join("com/acme/Api.java"), "class Api {}").unwrap();

        assert!(clean(out));
        assert!(!out.join("Old.gen").exists());
        assert!(!out.join("com").exists());
        assert!(out.join(".git/HEAD").exists());
        assert!(out.exists());
    }

    #[test]
    fn test_directory_with_only_hidden_entries_survives() {
        let temp = TempDir::new().unwrap();
        let out = temp.path();
        fs::create_dir_all(out.join("pkg")).unwrap();
        fs::write(out.join("pkg/.keep"), "").unwrap();
        fs::write(out.join("pkg/Gen.java"), "").unwrap();

        assert!(clean(out));
        assert!(out.join("pkg").is_dir());
        assert!(out.join("pkg/.keep").exists());
        assert!(!out.join("pkg/Gen.java").exists());
    }

    #[test]
    fn test_empty_directory_is_clean() {
        let temp = TempDir::new().unwrap();
        assert!(clean(temp.path()));
        assert!(temp.path().is_dir());
    }

    #[test]
    fn test_missing_directory_is_not_clean() {
        let temp = TempDir::new().unwrap();
        assert!(!clean(&temp.path().join("missing")));
    }

    #[test]
    fn test_failure_does_not_stop_siblings() {
        let temp = TempDir::new().unwrap();
        let out = temp.path();

        // nesting past the depth guard fails no matter who runs the test
        let mut deep = out.join("deep");
        for _ in 0..MAX_DEPTH + 4 {
            deep.push("d");
        }
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("Buried.java"), "").unwrap();
        for name in ["A.java", "B.java", "C.java"] {
            fs::write(out.join(name), "").unwrap();
        }
        fs::create_dir_all(out.join("pkg")).unwrap();
        fs::write(out.join("pkg/D.java"), "").unwrap();

        assert!(!clean(out));
        assert!(deep.join("Buried.java").exists());
        for name in ["A.java", "B.java", "C.java", "pkg"] {
            assert!(!out.join(name).exists(), "{name} should have been removed");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_directory_is_reported() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let out = temp.path();
        let locked = out.join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::write(locked.join("Pinned.java"), "").unwrap();
        fs::write(out.join("Loose.java"), "").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let result = clean(out);
        let pinned_survived = locked.join("Pinned.java").exists();
        // root bypasses the mode and removes the whole directory
        if locked.exists() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        }

        assert!(!out.join("Loose.java").exists());
        assert_eq!(result, !pinned_survived);
    }
}

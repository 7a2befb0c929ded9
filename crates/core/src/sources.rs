//! Discovery of .proto sources under a source root

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};

/// Directories never descended into, whatever the patterns say
const DEFAULT_EXCLUDED_DIRS: &[&str] = &[".git", ".svn", ".hg", ".bzr", "CVS"];

/// Include/exclude matching over root-relative paths.
///
/// A file is selected when it matches any include and no exclude.
#[derive(Debug, Clone)]
pub struct SourceSelector {
    includes: GlobSet,
    excludes: GlobSet,
}

impl SourceSelector {
    pub fn new<I, E>(includes: I, excludes: E) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Ok(Self {
            includes: build_globset(includes)?,
            excludes: build_globset(excludes)?,
        })
    }

    pub fn is_selected(&self, relative: &str) -> bool {
        self.includes.is_match(relative) && !self.excludes.is_match(relative)
    }

    /// Walk `root` recursively and collect every selected file
    pub fn resolve(&self, root: &Path) -> Result<BTreeSet<PathBuf>> {
        if !root.is_dir() {
            return Err(Error::NotADirectory(root.to_path_buf()));
        }

        let mut files = BTreeSet::new();
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(should_descend)
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                Error::fs(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = normalize_rel(root, entry.path()) else {
                continue;
            };
            if self.is_selected(&relative) {
                files.insert(entry.into_path());
            }
        }

        debug!("Resolved {} file(s) under {}", files.len(), root.display());
        Ok(files)
    }
}

/// Convenience wrapper around [`SourceSelector::resolve`]
pub fn resolve<I, E>(root: &Path, includes: I, excludes: E) -> Result<BTreeSet<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
    E: IntoIterator,
    E::Item: AsRef<str>,
{
    SourceSelector::new(includes, excludes)?.resolve(root)
}

fn build_globset<P>(patterns: P) -> Result<GlobSet>
where
    P: IntoIterator,
    P::Item: AsRef<str>,
{
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref().trim();
        if pattern.is_empty() {
            continue;
        }
        let pattern = ant_pattern(pattern);
        let glob = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| Error::InvalidGlob {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| Error::InvalidGlob {
        pattern: String::new(),
        reason: e.to_string(),
    })
}

/// `dir/` means everything below `dir`; backslashes are path separators
fn ant_pattern(pattern: &str) -> String {
    let mut pattern = pattern.replace('\\', "/");
    if pattern.ends_with('/') {
        pattern.push_str("**");
    }
    pattern
}

fn should_descend(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    !DEFAULT_EXCLUDED_DIRS.contains(&&*name)
}

fn normalize_rel(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

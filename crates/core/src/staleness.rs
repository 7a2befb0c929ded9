//! Timestamp-only check for skipping protoc when outputs are newer than sources

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StalenessCheck {
    pub enabled: bool,
    pub slack_millis: u64,
}

impl StalenessCheck {
    pub fn new(enabled: bool, slack_millis: u64) -> Self {
        Self {
            enabled,
            slack_millis,
        }
    }

    /// True when protoc has to run.
    ///
    /// Compilation is skipped only if checking is enabled and the newest source,
    /// plus the slack, is still older than the newest generated file. With no
    /// generated files the newest output is 0, so a first build always compiles.
    pub fn is_stale(&self, sources: &[PathBuf], outputs: &[PathBuf]) -> bool {
        if !self.enabled {
            return true;
        }

        let newest_source = last_modified(sources);
        let newest_output = last_modified(outputs);
        debug!(
            "Staleness: newest source {}ms, newest output {}ms, slack {}ms",
            newest_source, newest_output, self.slack_millis
        );

        newest_source.saturating_add(self.slack_millis as u128) >= newest_output
    }
}

/// Newest modification time in milliseconds since the epoch, 0 for an empty set
pub fn last_modified<P: AsRef<Path>>(files: &[P]) -> u128 {
    files
        .iter()
        .map(|f| modified_millis(f.as_ref()))
        .max()
        .unwrap_or(0)
}

fn modified_millis(path: &Path) -> u128 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

//! Makes .proto files shipped inside dependencies visible to protoc

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::archive::DependencyArchive;
use super::codec::PathCodec;
use crate::error::{Error, Result};
use crate::{METADATA_SUFFIX, PROTO_SUFFIX};

/// Extracts .proto entries from dependency archives into a scratch directory.
///
/// protoc cannot read from archives, so every archive gets its own
/// subdirectory (named by the [`PathCodec`]) holding the .proto entries at their
/// original relative paths. Dependency directories are used in place when they
/// hold .proto files at their top level.
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    codec: PathCodec,
}

impl ArchiveExtractor {
    pub fn new(codec: PathCodec) -> Self {
        Self { codec }
    }

    /// Returns the directories to add to the proto path, one per proto file parent
    pub fn extract(&self, scratch_root: &Path, locations: &[PathBuf]) -> Result<BTreeSet<PathBuf>> {
        clear_directory(scratch_root)?;

        let mut proto_dirs = BTreeSet::new();
        for location in locations {
            if is_readable_file(location) {
                if has_suffix(location, METADATA_SUFFIX) {
                    debug!("Ignoring metadata file {}", location.display());
                    continue;
                }
                self.extract_archive(scratch_root, location, &mut proto_dirs)?;
            } else if location.is_dir() {
                if contains_proto_files(location) {
                    debug!("Using dependency directory {} in place", location.display());
                    proto_dirs.insert(location.clone());
                } else {
                    // only the top level is scanned
                    debug!("No proto files directly in {}", location.display());
                }
            } else {
                debug!("Skipping unusable dependency location {}", location.display());
            }
        }

        info!(
            "Found proto files in {} dependency location(s)",
            proto_dirs.len()
        );
        Ok(proto_dirs)
    }

    fn extract_archive(
        &self,
        scratch_root: &Path,
        location: &Path,
        proto_dirs: &mut BTreeSet<PathBuf>,
    ) -> Result<()> {
        let archive = DependencyArchive::open(location)?;
        let target_root = scratch_root.join(self.codec.encode(location));
        let mut copied = 0usize;

        archive.for_each_entry(
            |name| has_suffix(name, PROTO_SUFFIX),
            |name, bytes| {
                let destination = target_root.join(name);
                let parent = destination
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| target_root.clone());
                create_dir(&parent)?;
                fs::write(&destination, bytes).map_err(|e| Error::fs(&destination, e))?;
                proto_dirs.insert(parent);
                copied += 1;
                Ok(())
            },
        )?;

        debug!(
            "Extracted {} proto file(s) from {}",
            copied,
            location.display()
        );
        Ok(())
    }
}

impl Default for ArchiveExtractor {
    fn default() -> Self {
        Self::new(PathCodec::default())
    }
}

/// Empties `dir` so nothing from a previous run lingers; a missing directory is fine
pub fn clear_directory(dir: &Path) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(Error::fs(dir, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| Error::fs(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| Error::fs(&path, e))?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path).map_err(|e| Error::fs(&path, e))?;
        } else {
            fs::remove_file(&path).map_err(|e| Error::fs(&path, e))?;
        }
    }
    Ok(())
}

fn create_dir(dir: &Path) -> Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(_) if dir.is_dir() => Ok(()),
        Err(e) => Err(Error::fs(dir, e)),
    }
}

fn is_readable_file(path: &Path) -> bool {
    path.is_file() && fs::File::open(path).is_ok()
}

/// Only the top level is scanned, nested .proto files do not count
fn contains_proto_files(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries
        .filter_map(|entry| entry.ok())
        .any(|entry| has_suffix(&entry.path(), PROTO_SUFFIX))
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.to_string_lossy().ends_with(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_jar(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extracts_only_proto_entries_under_codec_name() -> Result<()> {
        let temp = TempDir::new()?;
        let jar = temp.path().join("api-1.0.jar");
        write_jar(&jar, &[("a/b.proto", "message B {}"), ("README.md", "docs")]);
        let scratch = temp.path().join("scratch");

        let codec = PathCodec::hashed();
        let dirs = ArchiveExtractor::new(codec.clone()).extract(&scratch, &[jar.clone()])?;

        let expected_dir = scratch.join(codec.encode(&jar)).join("a");
        assert_eq!(dirs.into_iter().collect::<Vec<_>>(), vec![expected_dir.clone()]);
        assert_eq!(fs::read_to_string(expected_dir.join("b.proto"))?, "message B {}");
        assert!(!scratch.join(codec.encode(&jar)).join("README.md").exists());
        Ok(())
    }

    #[test]
    fn test_archive_without_protos_contributes_nothing() -> Result<()> {
        let temp = TempDir::new()?;
        let jar = temp.path().join("plain.jar");
        write_jar(&jar, &[("META-INF/MANIFEST.MF", "Manifest-Version: 1.0")]);

        let dirs = ArchiveExtractor::default().extract(&temp.path().join("scratch"), &[jar])?;
        assert!(dirs.is_empty());
        Ok(())
    }

    #[test]
    fn test_scratch_root_is_cleared() -> Result<()> {
        let temp = TempDir::new()?;
        let scratch = temp.path().join("scratch");
        fs::create_dir_all(scratch.join("stale"))?;
        fs::write(scratch.join("stale/old.proto"), "")?;
        fs::write(scratch.join("leftover.txt"), "")?;

        ArchiveExtractor::default().extract(&scratch, &[])?;

        assert!(scratch.is_dir());
        assert_eq!(fs::read_dir(&scratch)?.count(), 0);
        Ok(())
    }

    #[test]
    fn test_directories_are_scanned_shallowly() -> Result<()> {
        let temp = TempDir::new()?;
        let flat = temp.path().join("flat");
        let nested = temp.path().join("nested");
        fs::create_dir_all(&flat)?;
        fs::create_dir_all(nested.join("deeper"))?;
        fs::write(flat.join("x.proto"), "")?;
        fs::write(nested.join("deeper/y.proto"), "")?;

        let dirs = ArchiveExtractor::default().extract(
            &temp.path().join("scratch"),
            &[flat.clone(), nested],
        )?;

        assert_eq!(dirs.into_iter().collect::<Vec<_>>(), vec![flat]);
        Ok(())
    }

    #[test]
    fn test_metadata_and_missing_locations_are_ignored() -> Result<()> {
        let temp = TempDir::new()?;
        let pom = temp.path().join("api-1.0.xml");
        fs::write(&pom, "<project/>")?;

        let dirs = ArchiveExtractor::default().extract(
            &temp.path().join("scratch"),
            &[pom, temp.path().join("does-not-exist.jar")],
        )?;
        assert!(dirs.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_archive_is_reported() {
        let temp = TempDir::new().unwrap();
        let bogus = temp.path().join("bogus.jar");
        fs::write(&bogus, "not a zip").unwrap();

        let err = ArchiveExtractor::default()
            .extract(&temp.path().join("scratch"), &[bogus])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArchive { .. }));
        assert!(err.to_string().contains("bogus.jar"));
    }
}

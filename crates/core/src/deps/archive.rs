//! Read-only access to dependency archives (zip/jar, tar, tar.gz)

use std::fmt::Display;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];
const ZIP_EMPTY_MAGIC: [u8; 4] = [b'P', b'K', 0x05, 0x06];
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_MAGIC: &[u8] = b"ustar";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
    Tar,
}

impl ArchiveFormat {
    /// Detect the format from the leading bytes of the file
    pub fn sniff(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| invalid(path, e))?;
        let mut head = [0u8; TAR_MAGIC_OFFSET + 5];
        let mut filled = 0;
        while filled < head.len() {
            let n = file.read(&mut head[filled..]).map_err(|e| invalid(path, e))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        let head = &head[..filled];

        if head.starts_with(&ZIP_MAGIC) || head.starts_with(&ZIP_EMPTY_MAGIC) {
            Ok(ArchiveFormat::Zip)
        } else if head.starts_with(&GZIP_MAGIC) {
            Ok(ArchiveFormat::TarGz)
        } else if head.len() >= TAR_MAGIC_OFFSET + TAR_MAGIC.len()
            && &head[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()] == TAR_MAGIC
        {
            Ok(ArchiveFormat::Tar)
        } else if has_zip_directory(path) {
            // self-extracting and launcher-prefixed jars carry a preamble before the zip data
            Ok(ArchiveFormat::Zip)
        } else {
            Err(invalid(path, "unrecognized archive format"))
        }
    }
}

/// Whether the zip central directory at the end of the file can be read
fn has_zip_directory(path: &Path) -> bool {
    File::open(path)
        .map(|file| zip::ZipArchive::new(BufReader::new(file)).is_ok())
        .unwrap_or(false)
}

/// An opened dependency archive.
///
/// Every entry is read fully into memory before being handed to the caller, so
/// a corrupt archive surfaces as [`Error::InvalidArchive`] while failures on the
/// caller's side (writing the copy) keep their own error kind.
pub struct DependencyArchive {
    path: PathBuf,
    format: ArchiveFormat,
}

impl DependencyArchive {
    pub fn open(path: &Path) -> Result<Self> {
        let format = ArchiveFormat::sniff(path)?;
        debug!("Opened {:?} archive {}", format, path.display());
        Ok(Self {
            path: path.to_path_buf(),
            format,
        })
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Visit the regular-file entries whose relative path satisfies `select`.
    ///
    /// The underlying file handle is dropped before this returns, whatever the outcome.
    pub fn for_each_entry<S, V>(&self, mut select: S, mut visit: V) -> Result<()>
    where
        S: FnMut(&Path) -> bool,
        V: FnMut(&Path, &[u8]) -> Result<()>,
    {
        let file = File::open(&self.path).map_err(|e| invalid(&self.path, e))?;
        let reader = BufReader::new(file);

        match self.format {
            ArchiveFormat::Zip => self.visit_zip(reader, &mut select, &mut visit),
            ArchiveFormat::TarGz => self.visit_tar(
                flate2::read::GzDecoder::new(reader),
                &mut select,
                &mut visit,
            ),
            ArchiveFormat::Tar => self.visit_tar(reader, &mut select, &mut visit),
        }
    }

    fn visit_zip<R, S, V>(&self, reader: R, select: &mut S, visit: &mut V) -> Result<()>
    where
        R: Read + std::io::Seek,
        S: FnMut(&Path) -> bool,
        V: FnMut(&Path, &[u8]) -> Result<()>,
    {
        let mut archive = zip::ZipArchive::new(reader).map_err(|e| invalid(&self.path, e))?;

        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| invalid(&self.path, e))?;
            if entry.is_dir() {
                continue;
            }

            let Some(name) = entry.enclosed_name() else {
                warn!(
                    "Skipping unsafe entry {:?} in {}",
                    entry.name(),
                    self.path.display()
                );
                continue;
            };
            let name = name.to_path_buf();
            if !select(&name) {
                continue;
            }

            let mut bytes = Vec::new();
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| invalid(&self.path, e))?;
            visit(&name, &bytes)?;
        }

        Ok(())
    }

    fn visit_tar<R, S, V>(&self, reader: R, select: &mut S, visit: &mut V) -> Result<()>
    where
        R: Read,
        S: FnMut(&Path) -> bool,
        V: FnMut(&Path, &[u8]) -> Result<()>,
    {
        let mut archive = tar::Archive::new(reader);
        let entries = archive.entries().map_err(|e| invalid(&self.path, e))?;

        for entry in entries {
            let mut entry = entry.map_err(|e| invalid(&self.path, e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let name = entry
                .path()
                .map_err(|e| invalid(&self.path, e))?
                .into_owned();
            if !is_enclosed(&name) {
                warn!(
                    "Skipping unsafe entry {} in {}",
                    name.display(),
                    self.path.display()
                );
                continue;
            }
            if !select(&name) {
                continue;
            }

            let mut bytes = Vec::new();
            entry
                .read_to_end(&mut bytes)
                .map_err(|e| invalid(&self.path, e))?;
            visit(&name, &bytes)?;
        }

        Ok(())
    }
}

/// A relative path made only of normal components, so joining it stays under the base
fn is_enclosed(path: &Path) -> bool {
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn invalid(path: &Path, reason: impl Display) -> Error {
    Error::InvalidArchive {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, data) in entries {
            writer
                .start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    fn write_tar_gz(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn collect(archive: &DependencyArchive) -> Vec<(PathBuf, Vec<u8>)> {
        let mut seen = Vec::new();
        archive
            .for_each_entry(
                |name| name.to_string_lossy().ends_with(".proto"),
                |name, bytes| {
                    seen.push((name.to_path_buf(), bytes.to_vec()));
                    Ok(())
                },
            )
            .unwrap();
        seen
    }

    #[test]
    fn test_sniff_and_read_zip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("api-1.0.jar");
        write_zip(
            &path,
            &[("a/b.proto", b"syntax = \"proto3\";"), ("README.md", b"docs")],
        );

        let archive = DependencyArchive::open(&path).unwrap();
        assert_eq!(archive.format(), ArchiveFormat::Zip);

        let seen = collect(&archive);
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, PathBuf::from("a/b.proto"));
        assert_eq!(seen[0].1, b"syntax = \"proto3\";");
    }

    #[test]
    fn test_sniff_and_read_tar_gz() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("api-1.0.crate");
        write_tar_gz(
            &path,
            &[("api-1.0/proto/x.proto", b"message X {}"), ("api-1.0/Cargo.toml", b"")],
        );

        let archive = DependencyArchive::open(&path).unwrap();
        assert_eq!(archive.format(), ArchiveFormat::TarGz);

        let seen = collect(&archive);
        assert_eq!(
            seen,
            vec![(PathBuf::from("api-1.0/proto/x.proto"), b"message X {}".to_vec())]
        );
    }

    #[test]
    fn test_non_archive_is_invalid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        std::fs::write(&path, "just text").unwrap();

        let err = DependencyArchive::open(&path).err().unwrap();
        assert!(matches!(err, Error::InvalidArchive { .. }));
        assert!(err.to_string().contains("notes.txt"));
    }

    #[test]
    fn test_is_enclosed() {
        assert!(is_enclosed(Path::new("a/b.proto")));
        assert!(!is_enclosed(Path::new("../b.proto")));
        assert!(!is_enclosed(Path::new("/etc/b.proto")));
        assert!(!is_enclosed(Path::new("")));
    }

    #[test]
    fn test_plain_tar_is_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("schemas.tar");
        let mut builder = tar::Builder::new(File::create(&path).unwrap());
        let data: &[u8] = b"message T {}";
        let mut header = tar::Header::new_ustar();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, "proto/t.proto", data).unwrap();
        builder.into_inner().unwrap();

        let archive = DependencyArchive::open(&path).unwrap();
        assert_eq!(archive.format(), ArchiveFormat::Tar);
        assert_eq!(
            collect(&archive),
            vec![(PathBuf::from("proto/t.proto"), data.to_vec())]
        );
    }

    #[test]
    fn test_escaping_tar_entry_is_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("evil.tar");
        let mut builder = tar::Builder::new(File::create(&path).unwrap());

        // append_data refuses `..`, so write the name into the header directly
        let data: &[u8] = b"message Evil {}";
        let mut header = tar::Header::new_ustar();
        let name = b"../evil.proto";
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, data).unwrap();

        let mut header = tar::Header::new_ustar();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, "ok/fine.proto", data).unwrap();
        builder.into_inner().unwrap();

        let seen = collect(&DependencyArchive::open(&path).unwrap());
        assert_eq!(seen, vec![(PathBuf::from("ok/fine.proto"), data.to_vec())]);
    }

    #[test]
    fn test_zip_behind_launcher_script_is_read() {
        let temp = TempDir::new().unwrap();
        let plain = temp.path().join("plain.jar");
        write_zip(&plain, &[("a/b.proto", b"message B {}")]);

        let path = temp.path().join("app-1.0.jar");
        let mut bytes = b"#!/bin/sh\nexec java -jar \"$0\" \"$@\"\n".to_vec();
        bytes.extend(std::fs::read(&plain).unwrap());
        std::fs::write(&path, bytes).unwrap();

        let archive = DependencyArchive::open(&path).unwrap();
        assert_eq!(archive.format(), ArchiveFormat::Zip);
        assert_eq!(
            collect(&archive),
            vec![(PathBuf::from("a/b.proto"), b"message B {}".to_vec())]
        );
    }
}

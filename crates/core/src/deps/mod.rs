//! Dependency handling: archive access, scratch naming and extraction

pub mod archive;
pub mod codec;
pub mod extractor;

pub use archive::{ArchiveFormat, DependencyArchive};
pub use codec::PathCodec;
pub use extractor::{clear_directory, ArchiveExtractor};

//! Archive validation.
//!
//! A converted payload is only handed to the caller after its central
//! directory has been walked and every entry decompresses to the recorded
//! CRC-32 and size.

pub mod zip;

pub use zip::{list_entries, validate_archive, ArchiveInfo, ZipFileInfo};

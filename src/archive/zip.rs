//! ZIP archive validation.
//!
//! Walks the central directory of an in-memory archive, checks every local
//! header, then decompresses each entry and compares its CRC-32 and size
//! against the directory record.

use crate::error::{Error, Result};

use flate2::read::DeflateDecoder;
use flate2::Crc;
use std::io::Read;

const EOCD_SIGNATURE: &[u8; 4] = b"\x50\x4b\x05\x06";
const CENTRAL_DIR_SIGNATURE: &[u8; 4] = b"\x50\x4b\x01\x02";
const LOCAL_HEADER_SIGNATURE: &[u8; 4] = b"\x50\x4b\x03\x04";

const COMPRESSION_STORED: u16 = 0;
const COMPRESSION_DEFLATE: u16 = 8;

const EOCD_MIN_SIZE: usize = 22;
const CENTRAL_DIR_ENTRY_MIN_SIZE: usize = 46;
const LOCAL_HEADER_MIN_SIZE: usize = 30;

/// The EOCD record may be followed by a comment of up to 64 KiB.
const EOCD_SEARCH_SIZE: usize = EOCD_MIN_SIZE + u16::MAX as usize;

const ZIP64_MARKER: u32 = u32::MAX;

/// Upper bound on the output buffer reserved up front, as a multiple of the
/// compressed size.
const INFLATE_RESERVE_RATIO: u64 = 4;

/// Information about a file within a ZIP archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipFileInfo {
    pub name: String,
    pub compression_method: u16,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub local_header_offset: u64,
}

/// Summary of a validated archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    /// Number of entries in the central directory.
    pub entries: usize,
    /// Sum of the uncompressed entry sizes.
    pub uncompressed_size: u64,
}

fn integrity(message: impl Into<String>) -> Error {
    Error::Integrity(message.into())
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Locate the end of central directory record.
fn find_eocd(data: &[u8]) -> Result<usize> {
    if data.len() < EOCD_MIN_SIZE {
        return Err(integrity("archive is too small to hold an end of central directory record"));
    }
    let search_start = data.len().saturating_sub(EOCD_SEARCH_SIZE);
    let window = &data[search_start..data.len() - EOCD_MIN_SIZE + 4];
    window
        .windows(4)
        .rposition(|w| w == EOCD_SIGNATURE)
        .map(|pos| search_start + pos)
        .ok_or_else(|| integrity("could not find End of Central Directory Record"))
}

/// Parse the central directory entries.
fn read_central_directory(data: &[u8], cd_offset: usize, cd_size: usize) -> Result<Vec<ZipFileInfo>> {
    let cd = &data[cd_offset..cd_offset + cd_size];
    let mut entries = Vec::new();
    let mut offset = 0;

    while offset < cd.len() {
        if offset + CENTRAL_DIR_ENTRY_MIN_SIZE > cd.len() {
            return Err(integrity("truncated central directory entry"));
        }
        if &cd[offset..offset + 4] != CENTRAL_DIR_SIGNATURE {
            return Err(integrity(format!(
                "bad central directory signature at offset {}",
                cd_offset + offset
            )));
        }

        let compression_method = read_u16(cd, offset + 10);
        let crc32 = read_u32(cd, offset + 16);
        let compressed_size = read_u32(cd, offset + 20);
        let uncompressed_size = read_u32(cd, offset + 24);
        let filename_length = read_u16(cd, offset + 28) as usize;
        let extra_field_length = read_u16(cd, offset + 30) as usize;
        let comment_length = read_u16(cd, offset + 32) as usize;
        let local_header_offset = read_u32(cd, offset + 42);

        let filename_start = offset + CENTRAL_DIR_ENTRY_MIN_SIZE;
        let entry_end = filename_start + filename_length + extra_field_length + comment_length;
        if entry_end > cd.len() {
            return Err(integrity("central directory entry overruns the directory"));
        }
        if [compressed_size, uncompressed_size, local_header_offset].contains(&ZIP64_MARKER) {
            return Err(integrity("zip64 archives are not supported"));
        }

        let name =
            String::from_utf8_lossy(&cd[filename_start..filename_start + filename_length]).into_owned();
        entries.push(ZipFileInfo {
            name,
            compression_method,
            crc32,
            compressed_size: u64::from(compressed_size),
            uncompressed_size: u64::from(uncompressed_size),
            local_header_offset: u64::from(local_header_offset),
        });

        offset = entry_end;
    }

    Ok(entries)
}

/// Check one entry's local header and decompressed contents.
fn verify_entry(data: &[u8], entry: &ZipFileInfo, data_limit: usize) -> Result<()> {
    let header_start = entry.local_header_offset as usize;
    if header_start + LOCAL_HEADER_MIN_SIZE > data_limit {
        return Err(integrity(format!("local header of '{}' is out of bounds", entry.name)));
    }
    if &data[header_start..header_start + 4] != LOCAL_HEADER_SIGNATURE {
        return Err(integrity(format!("bad local header signature for '{}'", entry.name)));
    }

    let filename_length = read_u16(data, header_start + 26) as usize;
    let extra_field_length = read_u16(data, header_start + 28) as usize;
    let data_start = header_start + LOCAL_HEADER_MIN_SIZE + filename_length + extra_field_length;
    let data_end = data_start as u64 + entry.compressed_size;
    if data_end > data_limit as u64 {
        return Err(integrity(format!("data of '{}' is out of bounds", entry.name)));
    }
    let compressed = &data[data_start..data_end as usize];

    let contents = match entry.compression_method {
        COMPRESSION_STORED => compressed.to_vec(),
        COMPRESSION_DEFLATE => {
            // Never inflate more than one byte past the recorded size.
            let mut decoder = DeflateDecoder::new(compressed).take(entry.uncompressed_size + 1);
            let capacity = entry
                .uncompressed_size
                .min(compressed.len() as u64 * INFLATE_RESERVE_RATIO);
            let mut decompressed = Vec::with_capacity(usize::try_from(capacity).unwrap_or(0));
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| integrity(format!("cannot inflate '{}': {}", entry.name, e)))?;
            decompressed
        }
        method => {
            return Err(integrity(format!(
                "unsupported compression method {} for '{}'",
                method, entry.name
            )))
        }
    };

    if contents.len() as u64 > entry.uncompressed_size {
        return Err(integrity(format!(
            "'{}' inflates past its recorded size of {} bytes",
            entry.name, entry.uncompressed_size
        )));
    }
    if contents.len() as u64 != entry.uncompressed_size {
        return Err(integrity(format!(
            "size mismatch for '{}': expected {}, got {}",
            entry.name,
            entry.uncompressed_size,
            contents.len()
        )));
    }

    let mut crc = Crc::new();
    crc.update(&contents);
    if crc.sum() != entry.crc32 {
        return Err(integrity(format!(
            "CRC mismatch for '{}': expected {:08x}, got {:08x}",
            entry.name,
            entry.crc32,
            crc.sum()
        )));
    }

    Ok(())
}

/// List the entries of an archive without verifying their contents.
pub fn list_entries(data: &[u8]) -> Result<Vec<ZipFileInfo>> {
    let eocd_offset = find_eocd(data)?;
    let eocd = &data[eocd_offset..];

    let total_entries = read_u16(eocd, 10) as usize;
    let cd_size = read_u32(eocd, 12) as usize;
    let cd_offset = read_u32(eocd, 16) as usize;

    if cd_offset.checked_add(cd_size).map_or(true, |end| end > eocd_offset) {
        return Err(integrity("central directory lies outside the archive"));
    }

    let entries = read_central_directory(data, cd_offset, cd_size)?;
    if entries.len() != total_entries {
        return Err(integrity(format!(
            "central directory holds {} entries, end record claims {}",
            entries.len(),
            total_entries
        )));
    }
    Ok(entries)
}

/// Confirm that `data` is a well-formed ZIP archive.
///
/// Fails with [`Error::Integrity`] on a missing end record, a damaged
/// central directory, a bad local header, or any entry whose contents do
/// not match their recorded CRC-32 and size.
pub fn validate_archive(data: &[u8]) -> Result<ArchiveInfo> {
    let entries = list_entries(data)?;
    // Entry data always precedes the central directory.
    let data_limit = find_eocd(data)?;

    let mut uncompressed_size = 0u64;
    for entry in &entries {
        verify_entry(data, entry, data_limit)?;
        uncompressed_size += entry.uncompressed_size;
    }

    Ok(ArchiveInfo {
        entries: entries.len(),
        uncompressed_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A single entry named "a" with the given method, data and recorded size.
    fn single_entry(method: u16, data: &[u8], crc: u32, size: u32) -> Vec<u8> {
        let method = method.to_le_bytes();
        let compressed_size = (data.len() as u32).to_le_bytes();

        let mut zip = Vec::new();
        zip.extend_from_slice(LOCAL_HEADER_SIGNATURE);
        zip.extend_from_slice(&[20, 0, 0, 0, method[0], method[1], 0, 0, 0, 0]);
        zip.extend_from_slice(&crc.to_le_bytes());
        zip.extend_from_slice(&compressed_size);
        zip.extend_from_slice(&size.to_le_bytes());
        zip.extend_from_slice(&1u16.to_le_bytes());
        zip.extend_from_slice(&0u16.to_le_bytes());
        zip.push(b'a');
        zip.extend_from_slice(data);

        let cd_offset = zip.len() as u32;
        zip.extend_from_slice(CENTRAL_DIR_SIGNATURE);
        zip.extend_from_slice(&[20, 0, 20, 0, 0, 0, method[0], method[1], 0, 0, 0, 0]);
        zip.extend_from_slice(&crc.to_le_bytes());
        zip.extend_from_slice(&compressed_size);
        zip.extend_from_slice(&size.to_le_bytes());
        zip.extend_from_slice(&1u16.to_le_bytes());
        zip.extend_from_slice(&[0; 12]);
        zip.extend_from_slice(&0u32.to_le_bytes());
        zip.push(b'a');
        let cd_size = zip.len() as u32 - cd_offset;

        zip.extend_from_slice(EOCD_SIGNATURE);
        zip.extend_from_slice(&[0, 0, 0, 0, 1, 0, 1, 0]);
        zip.extend_from_slice(&cd_size.to_le_bytes());
        zip.extend_from_slice(&cd_offset.to_le_bytes());
        zip.extend_from_slice(&0u16.to_le_bytes());
        zip
    }

    fn crc_of(data: &[u8]) -> u32 {
        let mut crc = Crc::new();
        crc.update(data);
        crc.sum()
    }

    /// A single stored entry named "a" containing "hi".
    fn tiny_archive() -> Vec<u8> {
        single_entry(COMPRESSION_STORED, b"hi", crc_of(b"hi"), 2)
    }

    fn deflate(data: &[u8]) -> Vec<u8> {
        use flate2::write::DeflateEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_validate_tiny_archive() {
        let info = validate_archive(&tiny_archive()).unwrap();
        assert_eq!(info.entries, 1);
        assert_eq!(info.uncompressed_size, 2);
    }

    #[test]
    fn test_list_entries() {
        let entries = list_entries(&tiny_archive()).unwrap();
        assert_eq!(entries[0].name, "a");
        assert_eq!(entries[0].compression_method, COMPRESSION_STORED);
    }

    #[test]
    fn test_corrupted_contents_fail_crc() {
        let mut zip = tiny_archive();
        // Contents start after the 30 byte header and the 1 byte name.
        zip[31] = b'X';
        assert!(matches!(validate_archive(&zip), Err(Error::Integrity(msg)) if msg.contains("CRC")));
    }

    #[test]
    fn test_truncated_archive() {
        let zip = tiny_archive();
        assert!(matches!(
            validate_archive(&zip[..zip.len() - 5]),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_missing_end_record() {
        assert!(matches!(
            validate_archive(b"PK\x03\x04 definitely not an archive"),
            Err(Error::Integrity(_))
        ));
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let mut zip = EOCD_SIGNATURE.to_vec();
        zip.extend_from_slice(&[0; 18]);
        let info = validate_archive(&zip).unwrap();
        assert_eq!(info.entries, 0);
    }

    #[test]
    fn test_deflate_entry() {
        let contents = b"hello hello hello hello".repeat(8);
        let zip = single_entry(
            COMPRESSION_DEFLATE,
            &deflate(&contents),
            crc_of(&contents),
            contents.len() as u32,
        );
        let info = validate_archive(&zip).unwrap();
        assert_eq!(info.uncompressed_size, contents.len() as u64);
    }

    #[test]
    fn test_inflation_stops_at_recorded_size() {
        // 8 MiB of zeros compresses to a few KiB but claims a single byte.
        let contents = vec![0u8; 8 * 1024 * 1024];
        let compressed = deflate(&contents);
        assert!(compressed.len() < 64 * 1024);
        let zip = single_entry(COMPRESSION_DEFLATE, &compressed, crc_of(&contents), 1);

        let err = validate_archive(&zip).unwrap_err();
        assert!(matches!(err, Error::Integrity(msg) if msg.contains("past its recorded size")));
    }
}

//! Package format detection and container headers.
//!
//! All container integers are little-endian 32-bit fields.
//!
//! ```text
//! CRX2: "Cr24" | version=2 | pubkey_len | sig_len | pubkey | sig | zip...
//! CRX3: "Cr24" | version=3 | header_len | header (protobuf) | zip...
//! ```

use crate::error::{Error, Result};

use std::fmt;

/// Local file header signature that starts every plain ZIP archive.
pub const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";
/// Container magic number.
pub const CRX_MAGIC: &[u8; 4] = b"Cr24";

const CRX2_FIXED_SIZE: u64 = 16;
const CRX3_FIXED_SIZE: u64 = 12;
const MIN_DETECT_SIZE: usize = 8;

/// Classification of a byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageFormat {
    /// Already a ZIP archive.
    PlainArchive,
    /// Version 2 container.
    ContainerV2,
    /// Version 3 container.
    ContainerV3,
    /// Anything else.
    UnknownFormat,
}

impl PackageFormat {
    /// Whether this is one of the container versions.
    pub fn is_container(&self) -> bool {
        matches!(self, PackageFormat::ContainerV2 | PackageFormat::ContainerV3)
    }
}

impl fmt::Display for PackageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PackageFormat::PlainArchive => "zip",
            PackageFormat::ContainerV2 => "crx2",
            PackageFormat::ContainerV3 => "crx3",
            PackageFormat::UnknownFormat => "unknown",
        };
        f.write_str(name)
    }
}

fn read_u32_le(buf: &[u8], offset: usize) -> Option<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Classify a buffer by its leading bytes.
///
/// Buffers shorter than eight bytes are always [`PackageFormat::UnknownFormat`].
pub fn detect(buf: &[u8]) -> PackageFormat {
    if buf.len() < MIN_DETECT_SIZE {
        return PackageFormat::UnknownFormat;
    }
    if &buf[..4] == ZIP_MAGIC {
        return PackageFormat::PlainArchive;
    }
    if &buf[..4] != CRX_MAGIC {
        return PackageFormat::UnknownFormat;
    }
    match read_u32_le(buf, 4) {
        Some(2) => PackageFormat::ContainerV2,
        Some(3) => PackageFormat::ContainerV3,
        _ => PackageFormat::UnknownFormat,
    }
}

/// Explain why a buffer was classified as unknown.
pub(crate) fn describe_unknown(buf: &[u8]) -> String {
    if buf.len() < MIN_DETECT_SIZE {
        return format!("buffer too short ({} bytes)", buf.len());
    }
    if &buf[..4] == CRX_MAGIC {
        let version = read_u32_le(buf, 4).unwrap_or_default();
        return format!("unsupported container version {}", version);
    }
    format!("unexpected leading bytes {:02x?}", &buf[..4])
}

/// Version-dependent container header.
///
/// Only exists while a container is being unwrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerHeader {
    V2 {
        public_key_len: u32,
        signature_len: u32,
    },
    V3 {
        header_len: u32,
    },
}

impl ContainerHeader {
    /// Parse the header at the start of `buf`.
    ///
    /// Fails with [`Error::TruncatedFile`] when `buf` is shorter than the
    /// full header (including key, signature or protobuf block).
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let actual = buf.len() as u64;
        let header = match detect(buf) {
            PackageFormat::ContainerV2 => {
                if actual < CRX2_FIXED_SIZE {
                    return Err(Error::TruncatedFile {
                        needed: CRX2_FIXED_SIZE,
                        actual,
                    });
                }
                ContainerHeader::V2 {
                    public_key_len: read_u32_le(buf, 8).unwrap_or_default(),
                    signature_len: read_u32_le(buf, 12).unwrap_or_default(),
                }
            }
            PackageFormat::ContainerV3 => {
                if actual < CRX3_FIXED_SIZE {
                    return Err(Error::TruncatedFile {
                        needed: CRX3_FIXED_SIZE,
                        actual,
                    });
                }
                ContainerHeader::V3 {
                    header_len: read_u32_le(buf, 8).unwrap_or_default(),
                }
            }
            _ => return Err(Error::Format(describe_unknown(buf))),
        };

        let needed = header.header_size();
        if actual < needed {
            return Err(Error::TruncatedFile { needed, actual });
        }
        Ok(header)
    }

    /// Offset at which the payload begins.
    pub fn header_size(&self) -> u64 {
        match *self {
            ContainerHeader::V2 {
                public_key_len,
                signature_len,
            } => CRX2_FIXED_SIZE + u64::from(public_key_len) + u64::from(signature_len),
            ContainerHeader::V3 { header_len } => CRX3_FIXED_SIZE + u64::from(header_len),
        }
    }

    /// The format this header belongs to.
    pub fn format(&self) -> PackageFormat {
        match self {
            ContainerHeader::V2 { .. } => PackageFormat::ContainerV2,
            ContainerHeader::V3 { .. } => PackageFormat::ContainerV3,
        }
    }
}

//! Container to archive conversion.
//!
//! Conversion never copies or re-encodes: the payload is a sub-slice of the
//! input. Nested containers are unwrapped by a bounded loop.

use super::format::{describe_unknown, detect, ContainerHeader, PackageFormat};
use crate::error::{Error, Result};

use bytes::Bytes;
use std::ops::Range;

/// Maximum number of container layers (the outer one plus one nested).
pub const MAX_CONTAINER_DEPTH: usize = 2;

/// The plain archive extracted from a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// The ZIP archive, byte-identical to the embedded payload.
    pub payload: Bytes,
    /// Format of the outermost input.
    pub format: PackageFormat,
    /// Nesting depth consumed: 0 for a plain archive or a single
    /// container, 1 when a container held another container.
    pub depth: usize,
}

impl ConversionResult {
    /// Size of the payload in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Where the payload lives inside the input buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadLocation {
    pub range: Range<usize>,
    pub format: PackageFormat,
    pub depth: usize,
}

/// Locate the innermost archive payload of `buf`.
pub fn locate_payload(buf: &[u8]) -> Result<PayloadLocation> {
    let format = detect(buf);
    match format {
        PackageFormat::UnknownFormat => return Err(Error::Format(describe_unknown(buf))),
        PackageFormat::PlainArchive => {
            return Ok(PayloadLocation {
                range: 0..buf.len(),
                format,
                depth: 0,
            })
        }
        _ => {}
    }

    let mut start = 0usize;
    let mut layers = 0usize;
    while detect(&buf[start..]).is_container() {
        if layers == MAX_CONTAINER_DEPTH {
            return Err(Error::NestedFormatLoop { depth: layers });
        }
        let header = ContainerHeader::parse(&buf[start..])?;
        // parse() guarantees the header fits inside the remaining buffer.
        start += header.header_size() as usize;
        layers += 1;
    }

    Ok(PayloadLocation {
        range: start..buf.len(),
        format,
        depth: layers - 1,
    })
}

/// Extract the archive payload as a borrowed slice of `buf`.
///
/// Plain archives are returned unchanged.
pub fn convert(buf: &[u8]) -> Result<&[u8]> {
    let location = locate_payload(buf)?;
    Ok(&buf[location.range])
}

/// Extract the archive payload from an owned buffer without copying it.
pub fn convert_bytes(buf: Bytes) -> Result<ConversionResult> {
    let location = locate_payload(&buf)?;
    Ok(ConversionResult {
        payload: buf.slice(location.range),
        format: location.format,
        depth: location.depth,
    })
}

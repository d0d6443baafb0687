//! Container parsing and conversion.
//!
//! Extension packages are distributed inside a signed container ("CRX")
//! wrapping a plain ZIP archive. Two incompatible header layouts exist,
//! distinguished by a version field, and some distributors nest one
//! container inside another.
//!
//! - [`format`] - [`detect`] and the version-dependent [`ContainerHeader`]
//! - [`convert`] - payload extraction, including nested containers
//!
//! # Example
//!
//! ```rust
//! use crxdl::crx::{convert, detect, PackageFormat};
//!
//! let mut package = b"Cr24".to_vec();
//! package.extend_from_slice(&3u32.to_le_bytes());
//! package.extend_from_slice(&0u32.to_le_bytes());
//! package.extend_from_slice(b"PK\x03\x04archive bytes");
//!
//! assert_eq!(detect(&package), PackageFormat::ContainerV3);
//! assert_eq!(convert(&package)?, b"PK\x03\x04archive bytes");
//! # Ok::<(), crxdl::Error>(())
//! ```

pub mod convert;
pub mod format;

pub use convert::{
    convert, convert_bytes, locate_payload, ConversionResult, PayloadLocation,
    MAX_CONTAINER_DEPTH,
};
pub use format::{detect, ContainerHeader, PackageFormat, CRX_MAGIC, ZIP_MAGIC};

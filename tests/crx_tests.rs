//! Tests for format detection and container conversion.
//!
//! Fixtures are real ZIP archives wrapped in synthetic CRX2/CRX3 headers.

use crxdl::archive::validate_archive;
use crxdl::crx::{convert, convert_bytes, detect, locate_payload, PackageFormat};
use crxdl::Error;

use bytes::Bytes;

mod common;
use common::helpers::*;

#[test]
fn test_plain_archive_identity_law() {
    for zip in [
        sample_zip(),
        build_zip(&[]),
        build_zip(&[("a.txt", b"a", false)]),
        build_zip(&[("big.bin", &[7u8; 10_000], true)]),
    ] {
        assert_eq!(detect(&zip), PackageFormat::PlainArchive);
        assert_eq!(convert(&zip).unwrap(), &zip[..]);
    }
}

#[test]
fn test_crx2_payload_starts_at_28() {
    let zip = sample_zip();
    let package = crx2(&[0xAA; 4], &[0xBB; 8], &zip);
    assert_eq!(detect(&package), PackageFormat::ContainerV2);

    let location = locate_payload(&package).unwrap();
    assert_eq!(location.range.start, 16 + 4 + 8);
    assert_eq!(&package[28..], &zip[..]);
    assert_eq!(convert(&package).unwrap(), &zip[..]);
}

#[test]
fn test_crx3_payload_starts_at_32() {
    let zip = sample_zip();
    let package = crx3(&[0x0A; 20], &zip);
    assert_eq!(detect(&package), PackageFormat::ContainerV3);
    assert_eq!(locate_payload(&package).unwrap().range.start, 12 + 20);
    assert_eq!(convert(&package).unwrap(), &zip[..]);
}

#[test]
fn test_converted_payload_is_a_valid_archive() {
    let zip = sample_zip();
    let package = crx3(&[1; 64], &zip);
    let result = convert_bytes(Bytes::from(package)).unwrap();
    let info = validate_archive(&result.payload).unwrap();
    assert_eq!(info.entries, 3);
    assert_eq!(result.format, PackageFormat::ContainerV3);
}

#[test]
fn test_nested_container_is_fully_unwrapped() {
    let zip = sample_zip();
    let package = crx3(&[3; 10], &crx2(&[1; 4], &[2; 8], &zip));
    let result = convert_bytes(Bytes::from(package)).unwrap();
    assert_eq!(result.payload, zip);
    assert_eq!(result.depth, 1);
    assert_eq!(result.format, PackageFormat::ContainerV3);
}

#[test]
fn test_doubly_nested_container_is_rejected() {
    let zip = sample_zip();
    let package = crx2(&[], &[], &crx3(&[], &crx2(&[], &[], &zip)));
    assert!(matches!(
        convert(&package),
        Err(Error::NestedFormatLoop { depth: 2 })
    ));
}

#[test]
fn test_truncated_headers() {
    let package = crx2(&[1; 4], &[2; 8], b"");
    assert!(matches!(
        convert(&package[..20]),
        Err(Error::TruncatedFile {
            needed: 28,
            actual: 20
        })
    ));

    let package = crx3(&[1; 20], b"");
    assert!(matches!(
        convert(&package[..31]),
        Err(Error::TruncatedFile { needed: 32, .. })
    ));
}

#[test]
fn test_unknown_formats() {
    for input in [
        &b"<!DOCTYPE html><html></html>"[..],
        b"Cr24",
        b"PK\x03\x04",
        b"",
    ] {
        assert_eq!(detect(input), PackageFormat::UnknownFormat);
        assert!(matches!(convert(input), Err(Error::Format(_))));
    }

    let mut v4 = crx3(&[], b"PK\x03\x04");
    v4[4] = 4;
    assert!(matches!(convert(&v4), Err(Error::Format(msg)) if msg.contains("version 4")));
}

#[test]
fn test_container_around_garbage_fails_validation() {
    let package = crx3(&[0; 8], b"PK\x03\x04 not really an archive");
    let payload = convert(&package).unwrap();
    assert!(matches!(validate_archive(payload), Err(Error::Integrity(_))));
}

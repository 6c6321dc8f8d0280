//! The PE and MSI readers against synthesized files.

use crate::common::{MsiBuilder, PeBuilder, PRODUCT_CODE};
use unattend::formats::msi::{is_compound_document, read_package};
use unattend::core::{InstallerFile, InstallerImage};
use unattend::engine::config::SignatureConfig;
use unattend::engine::SignatureDetector;
use unattend::formats::pe::{is_pe_candidate, PeView};
use unattend::Framework;

#[test]
fn pe_sections_and_overlay() {
    let bytes = PeBuilder::new()
        .section(".wixburn")
        .overlay(b"OVERLAYDATA")
        .build();
    assert!(is_pe_candidate(&bytes));

    let view = PeView::parse(&bytes).unwrap();
    assert_eq!(view.machine, 0x14c);
    assert!(!view.is_64bit);
    let names: Vec<_> = view.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, [".text", ".wixburn"]);
    assert!(view.section(".wixburn").is_some());
    assert!(view.has_overlay(bytes.len() as u64));
    assert_eq!(&bytes[view.overlay_offset as usize..], b"OVERLAYDATA");
    assert!(view.version_info.is_none());
}

#[test]
fn pe_version_resource() {
    let bytes = PeBuilder::new()
        .version_string("CompanyName", "Contoso Ltd")
        .version_string("ProductName", "Contoso Viewer")
        .version_string("FileDescription", "  ")
        .product_version([7, 1, 0, 42])
        .build();

    let view = PeView::parse(&bytes).unwrap();
    assert!(view.has_resources);
    let version = view.version().unwrap();
    assert_eq!(version.get("productname"), Some("Contoso Viewer"));
    assert_eq!(version.get("CompanyName"), Some("Contoso Ltd"));
    assert_eq!(version.get("FileDescription"), None);
    assert_eq!(version.fixed.unwrap().product_version_string(), "7.1.0.42");
}

#[test]
fn corrupt_version_resource_keeps_sections() {
    let mut bytes = PeBuilder::new()
        .version_string("ProductName", "Broken")
        .build();
    // Rename the root node inside .rsrc (raw data at 0x600, blob at +88)
    let key = 0x600 + 88 + 6;
    bytes[key..key + 2].copy_from_slice(&u16::from(b'X').to_le_bytes());

    let view = PeView::parse(&bytes).unwrap();
    assert_eq!(view.sections.len(), 2);
    assert!(matches!(view.version_info, Some(Err(_))));
    assert!(view.version().is_none());
}

#[test]
fn truncated_headers_fail() {
    let mut bytes = PeBuilder::new().build();
    bytes.truncate(0x50);
    assert!(PeView::parse(&bytes).is_err());
}

#[test]
fn msi_summary_and_properties() {
    let bytes = MsiBuilder::new().build();
    assert!(is_compound_document(&bytes));

    let info = read_package(&bytes).unwrap();
    assert!(info.is_installer());
    assert_eq!(info.title.as_deref(), Some("Installation Database"));
    assert_eq!(info.author.as_deref(), Some("Contoso Ltd"));
    assert_eq!(info.arch.as_deref(), Some("x64"));
    assert!(info.package_code.is_some());
    assert_eq!(info.property("ProductName"), Some("Contoso Agent"));
    assert_eq!(info.property("ProductCode"), Some(PRODUCT_CODE));
}

#[test]
fn msi_without_property_rows() {
    let bytes = MsiBuilder::without_properties().subject("Bare Package").build();
    let info = read_package(&bytes).unwrap();
    assert_eq!(info.subject.as_deref(), Some("Bare Package"));
    assert!(info.property("ProductName").is_none());
}

#[test]
fn overlay_signature_straddling_head_window_is_found() {
    // .text ends at 0x600, so the overlay starts there; the head window
    // ends 512 bytes into it
    let mut overlay = vec![0u8; 508];
    overlay.extend_from_slice(b"NullsoftInst");
    overlay.extend_from_slice(&[0u8; 100]);
    let bytes = PeBuilder::new().overlay(&overlay).build();
    assert_eq!(&bytes[0x600 + 508..0x600 + 520], b"NullsoftInst");

    let cfg = SignatureConfig {
        scan_window_kb: 2,
        ..SignatureConfig::default()
    };
    let file = InstallerFile::new("straddle.exe", bytes.len() as u64, "00".repeat(32));
    let matches = SignatureDetector::new(&cfg).detect(&InstallerImage::new(file, bytes));

    assert_eq!(matches[0].framework, Framework::Nsis);
    assert_eq!(matches[0].matched_offset, 0x600 + 508);
}

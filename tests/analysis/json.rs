//! Flat record export and its stability.

use crate::common::test_utils::*;
use crate::common::{MsiBuilder, PeBuilder};
use std::sync::Arc;
use unattend::FlatRecord;

#[tokio::test]
async fn flat_record_carries_nested_results() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("scratch");
    let path = write_file(dir.path(), "bundle.exe", &PeBuilder::new().build());
    let analyzer = analyzer_with(
        test_config(&scratch),
        Arc::new(HelpTextRunner::silent()),
        Arc::new(PayloadExtractor::new(vec![("payload/product.msi", MsiBuilder::new().build())])),
    );
    let result = analyzer.analyze(&path).await.unwrap();

    let json = result.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    for key in [
        "installer_type",
        "product_name",
        "product_version",
        "confidence",
        "install_switches",
        "uninstall_switches",
        "warnings",
        "nested",
        "relative_path",
        "sha256",
    ] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert_eq!(value["install_switches"], serde_json::json!(["/qn", "/norestart"]));
    assert_eq!(value["nested"][0]["relative_path"], "payload/product.msi");
    assert_eq!(value["nested"][0]["installer_type"], "MSI");
    assert_eq!(value["nested"][0]["product_name"], "Contoso Agent");

    let back: FlatRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result.to_flat_record());
}

#[tokio::test]
async fn repeated_analysis_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = PeBuilder::new()
        .body(b"Inno Setup Setup Data (6.2.0)\0")
        .version_string("ProductName", "Contoso Tools")
        .build();
    let path = write_file(dir.path(), "setup.exe", &bytes);
    let analyzer = analyzer_with(
        test_config(dir.path()),
        Arc::new(HelpTextRunner::silent()),
        Arc::new(PayloadExtractor::empty()),
    );

    let first = analyzer.analyze(&path).await.unwrap();
    let second = analyzer.analyze(&path).await.unwrap();
    assert_ne!(first.analysis_id, second.analysis_id);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    assert_eq!(first.installer.sha256, sha256_hex(&bytes));
}

#[tokio::test]
async fn warnings_render_with_their_kind() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "plain.bin", b"no installer in here");
    let mut config = test_config(dir.path());
    config.extraction.enabled = false;
    let analyzer = analyzer_with(
        config,
        Arc::new(HelpTextRunner::silent()),
        Arc::new(PayloadExtractor::empty()),
    );
    let record = analyzer.analyze(&path).await.unwrap().to_flat_record();

    assert!(record.install_switches.is_empty());
    assert_eq!(record.confidence, 0.0);
    assert!(record.warnings.iter().any(|w| w.starts_with("MetadataIncomplete: ")));
    assert!(record.warnings.iter().any(|w| w.starts_with("ProbeSkipped: ")));
}

//! Batch analysis through `Analyzer::analyze_many`.

use crate::common::test_utils::*;
use crate::common::{MsiBuilder, PeBuilder};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn results_follow_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let msi = write_file(dir.path(), "a.msi", &MsiBuilder::new().build());
    let missing = dir.path().join("missing.exe");
    let nsis = write_file(
        dir.path(),
        "b.exe",
        &PeBuilder::new().body(b"NullsoftInst\0").build(),
    );

    let mut config = test_config(dir.path());
    config.max_concurrent_files = 2;
    let analyzer = analyzer_with(
        config,
        Arc::new(HelpTextRunner::silent()),
        Arc::new(PayloadExtractor::empty()),
    );
    let results = analyzer
        .analyze_many(vec![msi.clone(), missing.clone(), nsis.clone()])
        .await;

    let paths: Vec<_> = results.iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(paths, vec![msi, missing, nsis]);
    assert_eq!(
        results[0].1.as_ref().unwrap().installer_type.as_deref(),
        Some("MSI")
    );
    assert!(results[1].1.is_err());
    assert_eq!(
        results[2].1.as_ref().unwrap().installer_type.as_deref(),
        Some("NSIS")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn file_concurrency_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<_> = (0..3)
        .map(|i| {
            let body = format!("unknown tool {i}");
            write_file(
                dir.path(),
                &format!("tool{i}.exe"),
                &PeBuilder::new().body(body.as_bytes()).build(),
            )
        })
        .collect();

    let runner = Arc::new(HelpTextRunner::silent().with_delay(Duration::from_millis(2)));
    let mut config = test_config(dir.path());
    config.max_concurrent_files = 1;
    config.extraction.enabled = false;
    let analyzer = analyzer_with(config, runner.clone(), Arc::new(PayloadExtractor::empty()));
    let results = analyzer.analyze_many(paths).await;

    assert!(results.iter().all(|(_, r)| r.is_ok()));
    assert_eq!(runner.max_in_flight(), 1);
    assert_eq!(runner.calls().len(), 3 * unattend::engine::probe::DIAGNOSTIC_ARGUMENTS.len());
}

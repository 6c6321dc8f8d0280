use crate::common::test_utils::*;
use crate::common::{MsiBuilder, PeBuilder};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use unattend::engine::ArchiveExtractor;
use unattend::{AnalysisConfig, AnalysisResult, Result, UnattendError, WarningKind};

/// Every extraction yields `fan_out` executables never seen before.
struct Fresh {
    fan_out: usize,
    counter: AtomicUsize,
}

impl Fresh {
    fn new(fan_out: usize) -> Self {
        Self {
            fan_out,
            counter: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ArchiveExtractor for Fresh {
    async fn extract(&self, _input: &Path, output: &Path) -> Result<()> {
        for i in 0..self.fan_out {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            let body = format!("unique payload {n}");
            let bytes = PeBuilder::new().body(body.as_bytes()).build();
            write_file(output, &format!("part{i}/setup.exe"), &bytes);
        }
        Ok(())
    }
}

struct NoTool;

#[async_trait]
impl ArchiveExtractor for NoTool {
    async fn extract(&self, _input: &Path, _output: &Path) -> Result<()> {
        Err(UnattendError::ExternalToolMissing("7z".into()))
    }
}

fn no_probe_config(scratch: &Path) -> AnalysisConfig {
    let mut config = test_config(scratch);
    config.probing.enabled = false;
    config
}

fn walk(result: &AnalysisResult, depth: usize, max_depth: &mut usize, count: &mut usize) {
    *max_depth = (*max_depth).max(depth);
    for child in &result.nested {
        *count += 1;
        walk(child, depth + 1, max_depth, count);
    }
}

fn any_warning(result: &AnalysisResult, kind: WarningKind) -> bool {
    result.has_warning(kind) || result.nested.iter().any(|n| any_warning(n, kind))
}

#[tokio::test]
async fn self_containing_archive_is_a_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("scratch");
    let path = write_file(dir.path(), "loop.exe", &PeBuilder::new().build());

    let analyzer = analyzer_with(
        no_probe_config(&scratch),
        Arc::new(HelpTextRunner::silent()),
        Arc::new(EchoExtractor),
    );
    let result = analyzer.analyze(&path).await.unwrap();

    assert!(result.nested.is_empty());
    assert!(result.has_warning(WarningKind::NestedCycle));
    assert_eq!(entries_in(&scratch), 0);
}

#[tokio::test]
async fn depth_limit_holds() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("scratch");
    let path = write_file(dir.path(), "outer.exe", &PeBuilder::new().build());

    let mut config = no_probe_config(&scratch);
    config.extraction.max_depth = 2;
    config.extraction.max_nested = 1_000;
    let analyzer = analyzer_with(config, Arc::new(HelpTextRunner::silent()), Arc::new(Fresh::new(1)));
    let result = analyzer.analyze(&path).await.unwrap();

    let (mut max_depth, mut count) = (0, 0);
    walk(&result, 0, &mut max_depth, &mut count);
    assert_eq!(max_depth, 2);
    assert_eq!(count, 2);
    assert!(any_warning(&result, WarningKind::NestedLimit));
    assert_eq!(entries_in(&scratch), 0);
}

#[tokio::test]
async fn nested_count_limit_holds() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("scratch");
    let path = write_file(dir.path(), "outer.exe", &PeBuilder::new().build());

    let mut config = no_probe_config(&scratch);
    config.extraction.max_depth = 3;
    config.extraction.max_nested = 4;
    let analyzer = analyzer_with(config, Arc::new(HelpTextRunner::silent()), Arc::new(Fresh::new(3)));
    let result = analyzer.analyze(&path).await.unwrap();

    let (mut max_depth, mut count) = (0, 0);
    walk(&result, 0, &mut max_depth, &mut count);
    assert!(count <= 4, "{count} nested results");
    assert!(max_depth <= 3);
    assert!(any_warning(&result, WarningKind::NestedLimit));
    assert_eq!(entries_in(&scratch), 0);
}

#[tokio::test]
async fn missing_extraction_tool_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("scratch");
    let path = write_file(dir.path(), "outer.exe", &PeBuilder::new().build());

    let analyzer = analyzer_with(
        no_probe_config(&scratch),
        Arc::new(HelpTextRunner::silent()),
        Arc::new(NoTool),
    );
    let result = analyzer.analyze(&path).await.unwrap();

    assert!(result.has_warning(WarningKind::ExtractionToolMissing));
    assert!(result.nested.is_empty());
    assert!(result.switch_set.is_none());
    assert_eq!(entries_in(&scratch), 0);
}

#[tokio::test]
async fn nested_confidence_decays_per_level() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("scratch");
    let path = write_file(dir.path(), "outer.exe", &PeBuilder::new().build());

    /// Level one is an unknown executable, level two the MSI.
    struct TwoLevels;

    #[async_trait]
    impl ArchiveExtractor for TwoLevels {
        async fn extract(&self, input: &Path, output: &Path) -> Result<()> {
            let name = input.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if name == "outer.exe" {
                let bytes = PeBuilder::new().body(b"middle layer").build();
                write_file(output, "middle.exe", &bytes);
            } else {
                write_file(output, "inner/product.msi", &MsiBuilder::new().build());
            }
            Ok(())
        }
    }

    let analyzer = analyzer_with(
        no_probe_config(&scratch),
        Arc::new(HelpTextRunner::silent()),
        Arc::new(TwoLevels),
    );
    let result = analyzer.analyze(&path).await.unwrap();

    let middle = &result.nested[0];
    let inner = &middle.nested[0];
    assert_eq!(inner.installer_type.as_deref(), Some("MSI"));
    assert!((middle.confidence - 0.9).abs() < 1e-4);
    assert!((result.confidence - 0.81).abs() < 1e-4);
    assert_eq!(entries_in(&scratch), 0);
}

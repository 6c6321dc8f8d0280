use crate::common::test_utils::*;
use crate::common::{MsiBuilder, PeBuilder};
use std::sync::Arc;
use unattend::core::{InstallerFile, InstallerImage};
use unattend::engine::{
    CachedCommunityDatabase, CommunityDatabase, SignatureDetector, StaticCommunityDatabase,
};
use unattend::{AnalysisResult, SwitchSource, WarningKind};

/// Deterministic xorshift so the byte soup is the same on every run.
fn noise(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state as u8
        })
        .collect()
}

fn assorted_inputs() -> Vec<(&'static str, Vec<u8>)> {
    let mut truncated_pe = PeBuilder::new().build();
    truncated_pe.truncate(0x90);
    let mut truncated_msi = MsiBuilder::new().build();
    truncated_msi.truncate(600);
    let mut cfb_header = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
    cfb_header.extend(noise(7, 256));
    let mut mz_noise = b"MZ".to_vec();
    mz_noise.extend(noise(11, 4096));

    vec![
        ("two-bytes.bin", b"MZ".to_vec()),
        ("noise.bin", noise(3, 8192)),
        ("mz-noise.exe", mz_noise),
        ("cfb-header.msi", cfb_header),
        ("truncated.exe", truncated_pe),
        ("truncated.msi", truncated_msi),
        ("zip.zip", b"PK\x03\x04 not really a zip".to_vec()),
        (
            "everything.exe",
            PeBuilder::new()
                .body(b"Inno Setup Setup Data (6.2.0)\0Nullsoft Install System\0InstallShield\0")
                .body(b"Dell Update Package\0SilentModeDisabled\0")
                .section(".wixburn")
                .version_string("InternalName", "7zS.sfx")
                .build(),
        ),
        ("msi.msi", MsiBuilder::without_properties().subject("Bare").build()),
    ]
}

fn assert_bounded(result: &AnalysisResult) {
    assert!(
        (0.0..=1.0).contains(&result.confidence),
        "{} has confidence {}",
        result.installer.path.display(),
        result.confidence
    );
    if let Some(set) = &result.switch_set {
        assert!(!set.install_args.is_empty());
        assert!((0.0..=1.0).contains(&set.confidence));
    } else {
        assert_eq!(result.confidence, 0.0);
    }
    result.nested.iter().for_each(assert_bounded);
}

#[tokio::test]
async fn confidence_stays_in_unit_interval() {
    let dir = tempfile::tempdir().unwrap();
    let scratch = dir.path().join("scratch");
    let help = "  /S   silent\n  --quiet  quiet mode\n";
    let analyzer = analyzer_with(
        test_config(&scratch),
        Arc::new(HelpTextRunner::new(help)),
        Arc::new(PayloadExtractor::new(vec![(
            "inner.msi",
            MsiBuilder::new().build(),
        )])),
    );

    for (name, bytes) in assorted_inputs() {
        let path = write_file(dir.path(), name, &bytes);
        let result = analyzer.analyze(&path).await.unwrap();
        assert_bounded(&result);
    }
    assert_eq!(entries_in(&scratch), 0);
}

#[tokio::test]
async fn single_byte_input_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "one.bin", b"M");
    let analyzer = analyzer_with(
        test_config(dir.path()),
        Arc::new(HelpTextRunner::silent()),
        Arc::new(PayloadExtractor::empty()),
    );
    assert!(analyzer.analyze(&path).await.is_err());
}

#[tokio::test]
async fn marker_ceiling_applies_even_to_community_answers() {
    let dir = tempfile::tempdir().unwrap();
    let bytes = PeBuilder::new()
        .body(b"silent installation is not supported\0")
        .build();
    let path = write_file(dir.path(), "setup.exe", &bytes);
    let db = community_db(vec![community_record(&sha256_hex(&bytes), "EXE", &["/quiet"])]);

    let analyzer = unattend::Analyzer::builder(test_config(dir.path()))
        .probe_runner(Arc::new(HelpTextRunner::silent()))
        .extractor(Arc::new(PayloadExtractor::empty()))
        .community(db)
        .build()
        .unwrap();
    let result = analyzer.analyze(&path).await.unwrap();

    assert_eq!(result.switch_set.as_ref().unwrap().source, SwitchSource::Community);
    assert!(result.confidence <= 0.05);
    assert!(result.has_warning(WarningKind::SilentDisabled));
}

#[test]
fn detection_is_deterministic_and_one_match_per_framework() {
    let bytes = PeBuilder::new()
        .body(b"Nullsoft Install System\0NullsoftInst\0Inno Setup Setup Data\0")
        .build();
    let file = InstallerFile::new("x.exe", bytes.len() as u64, "00".repeat(32));
    let image = InstallerImage::new(file, bytes);
    let detector = SignatureDetector::default();

    let first = detector.detect(&image);
    let second = detector.detect(&image);
    assert_eq!(first, second);

    let mut frameworks: Vec<_> = first.iter().map(|m| m.framework).collect();
    let before = frameworks.len();
    frameworks.sort();
    frameworks.dedup();
    assert_eq!(frameworks.len(), before);
    assert_eq!(before, 2);
}

#[tokio::test]
async fn community_cache_serves_concurrent_readers() {
    let sha = "ab".repeat(32);
    let backend = StaticCommunityDatabase::new(vec![community_record(&sha, "NSIS", &["/S"])]);
    let cached = Arc::new(CachedCommunityDatabase::new(backend));

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let db = cached.clone();
        let sha = sha.clone();
        tasks.spawn(async move { db.lookup(&sha).await });
    }
    while let Some(joined) = tasks.join_next().await {
        let record = joined.unwrap().unwrap().unwrap();
        assert_eq!(record.install_args, vec!["/S"]);
    }
    assert_eq!(cached.cached_entries().await, 1);
}

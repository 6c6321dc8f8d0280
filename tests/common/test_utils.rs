//! Shared test utilities: temporary installers, configurations and fake
//! collaborators for the probe runner, extractor and community database.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use unattend::engine::{
    ArchiveExtractor, CommunityRecord, ProbeArgument, ProbeOutput, ProbeRunner,
    StaticCommunityDatabase,
};
use unattend::{AnalysisConfig, Analyzer, Result};

/// Writes `content` to `dir/name`, creating parent directories.
pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

pub fn sha256_hex(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// Configuration with probing on and real extraction scratch space under
/// `scratch`. Community lookups are left to the caller.
pub fn test_config(scratch: &Path) -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.extraction.scratch_root = Some(scratch.to_path_buf());
    config.probing.timeout_ms = 2_000;
    config.community.enabled = false;
    config
}

/// Analyzer wired to the given fakes and no community database.
pub fn analyzer_with(
    config: AnalysisConfig,
    runner: Arc<dyn ProbeRunner>,
    extractor: Arc<dyn ArchiveExtractor>,
) -> Analyzer {
    Analyzer::builder(config)
        .probe_runner(runner)
        .extractor(extractor)
        .without_community()
        .build()
        .unwrap()
}

/// Prints the same text for every probe and records what it was asked to
/// run and how many probes overlapped.
#[derive(Default)]
pub struct HelpTextRunner {
    text: String,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl HelpTextRunner {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn silent() -> Self {
        Self::new("")
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProbeRunner for HelpTextRunner {
    async fn run(
        &self,
        _program: &Path,
        argument: ProbeArgument,
        _timeout: Duration,
        max_output_bytes: usize,
    ) -> Result<ProbeOutput> {
        self.calls.lock().unwrap().push(argument.as_str().to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut text = self.text.clone();
        text.truncate(max_output_bytes);
        Ok(ProbeOutput {
            exit_code: Some(0),
            text,
        })
    }
}

/// Extracts a fixed set of files regardless of the input.
pub struct PayloadExtractor {
    files: Vec<(String, Vec<u8>)>,
    calls: AtomicUsize,
}

impl PayloadExtractor {
    pub fn new(files: Vec<(&str, Vec<u8>)>) -> Self {
        Self {
            files: files.into_iter().map(|(n, b)| (n.to_string(), b)).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArchiveExtractor for PayloadExtractor {
    async fn extract(&self, _input: &Path, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for (name, bytes) in &self.files {
            write_file(output, name, bytes);
        }
        Ok(())
    }
}

/// Copies its input into the output directory, so every extraction yields
/// the same content again.
pub struct EchoExtractor;

#[async_trait]
impl ArchiveExtractor for EchoExtractor {
    async fn extract(&self, input: &Path, output: &Path) -> Result<()> {
        std::fs::copy(input, output.join("again.exe"))?;
        Ok(())
    }
}

pub fn community_record(sha256: &str, installer_type: &str, args: &[&str]) -> CommunityRecord {
    CommunityRecord {
        sha256: sha256.to_string(),
        installer_type: Some(installer_type.to_string()),
        product_name: None,
        install_args: args.iter().map(|s| s.to_string()).collect(),
        uninstall_args: Vec::new(),
    }
}

pub fn community_db(records: Vec<CommunityRecord>) -> Arc<StaticCommunityDatabase> {
    Arc::new(StaticCommunityDatabase::new(records))
}

/// Number of entries directly under `dir`.
pub fn entries_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

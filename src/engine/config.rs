//! Configuration for the analysis pipeline.
//!
//! One immutable `AnalysisConfig` is built up front and shared by every
//! stage. All sections deserialize with defaults, so a JSON file only needs
//! the fields it changes.

use crate::engine::probe::whitelist::{is_whitelisted, ProbeArgument};
use crate::error::{Result, UnattendError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Master configuration for the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// I/O configuration for file reading.
    pub io: IoConfig,
    /// Signature scanning configuration.
    pub signatures: SignatureConfig,
    /// Diagnostic probing configuration.
    pub probing: ProbeConfig,
    /// Archive extraction and nested exploration.
    pub extraction: ExtractionConfig,
    /// Confidence weights.
    pub scoring: ScoringConfig,
    /// Community database lookups.
    pub community: CommunityConfig,
    /// Upper bound on files analyzed at once by `analyze_many`.
    pub max_concurrent_files: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            io: IoConfig::default(),
            signatures: SignatureConfig::default(),
            probing: ProbeConfig::default(),
            extraction: ExtractionConfig::default(),
            scoring: ScoringConfig::default(),
            community: CommunityConfig::default(),
            max_concurrent_files: 4,
        }
    }
}

/// I/O configuration for file reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// Maximum bytes held in memory per file (default: 64 MiB).
    pub max_read_bytes: usize,
    /// Files larger than this are rejected (default: 4 GiB).
    pub max_file_size: u64,
    /// Read buffer size (default: 64 KiB).
    pub buffer_size: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            max_read_bytes: 64 * 1024 * 1024,
            max_file_size: 4 * 1024 * 1024 * 1024,
            buffer_size: 64 * 1024,
        }
    }
}

/// Signature and marker scanning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Substring rules look at this many KiB from the start of the file.
    pub scan_window_kb: usize,
    /// And at this many KiB from the start of the PE overlay.
    pub overlay_scan_kb: usize,
    /// Minimum length of strings searched for "silent disabled" markers.
    pub min_string_length: usize,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            scan_window_kb: 1024,
            overlay_scan_kb: 1024,
            min_string_length: 6,
        }
    }
}

impl SignatureConfig {
    pub fn scan_window_bytes(&self) -> usize {
        self.scan_window_kb.saturating_mul(1024)
    }

    pub fn overlay_scan_bytes(&self) -> usize {
        self.overlay_scan_kb.saturating_mul(1024)
    }
}

/// Diagnostic probing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub enabled: bool,
    /// Ordered subset of the diagnostic whitelist to try.
    pub arguments: Vec<String>,
    /// Wall-clock budget per probe in milliseconds (default: 5000).
    pub timeout_ms: u64,
    /// Probes that must run before early stop is considered.
    pub min_probes_before_stop: usize,
    /// Distinct probes the top candidate must appear in to stop early.
    pub early_stop_frequency: usize,
    /// Characters around a keyword in which switch tokens count.
    pub keyword_window: usize,
    /// Captured stdout+stderr is truncated to this many bytes.
    pub max_output_bytes: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            arguments: ProbeArgument::all().map(|a| a.as_str().to_string()).collect(),
            timeout_ms: 5_000,
            min_probes_before_stop: 2,
            early_stop_frequency: 2,
            keyword_window: 80,
            max_output_bytes: 64 * 1024,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Archive extraction and nested exploration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub enabled: bool,
    /// Extraction tool executable.
    pub program: String,
    /// Argument template; `{input}` and `{output}` are substituted.
    pub args: Vec<String>,
    /// Wall-clock budget per extraction in seconds (default: 120).
    pub timeout_secs: u64,
    /// Parent of per-analysis scratch directories; system temp when unset.
    pub scratch_root: Option<PathBuf>,
    /// Maximum nesting depth below the analyzed file (default: 2).
    pub max_depth: usize,
    /// Maximum nested candidates per analysis (default: 50).
    pub max_nested: usize,
    /// File extensions treated as installer candidates.
    pub candidate_extensions: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "7z".to_string(),
            args: ["x", "-y", "-o{output}", "{input}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_secs: 120,
            scratch_root: None,
            max_depth: 2,
            max_nested: 50,
            candidate_extensions: ["msi", "exe", "msp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Confidence weights used by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Confidence assigned to an exact community match.
    pub community_confidence: f32,
    /// Multiplier for signature results when metadata is incomplete.
    pub incomplete_metadata_factor: f32,
    /// Per-level multiplier for nested results.
    pub nested_depth_decay: f32,
    /// Multiplier for brute-force results.
    pub brute_force_weight: f32,
    /// Upper bound on confidence when a silent-disabled marker is present.
    pub silent_disabled_ceiling: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            community_confidence: 0.99,
            incomplete_metadata_factor: 0.85,
            nested_depth_decay: 0.9,
            brute_force_weight: 0.6,
            silent_disabled_ceiling: 0.05,
        }
    }
}

/// Community database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityConfig {
    pub enabled: bool,
    /// Base URL; lookups are `GET {endpoint}/{sha256}`.
    pub endpoint: Option<String>,
    /// Offline JSON database used instead of, or before, the endpoint.
    pub database_file: Option<PathBuf>,
    /// Request budget in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            database_file: None,
            timeout_ms: 3_000,
        }
    }
}

impl CommunityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn check_unit(field: &str, value: f32) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(UnattendError::invalid_config(
            field,
            format!("{value} is outside [0, 1]"),
        ))
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values that would make a stage meaningless or unbounded.
    pub fn validate(&self) -> Result<()> {
        if self.io.max_read_bytes == 0 {
            return Err(UnattendError::invalid_config("io.max_read_bytes", "must be > 0"));
        }
        if self.io.buffer_size == 0 {
            return Err(UnattendError::invalid_config("io.buffer_size", "must be > 0"));
        }
        if self.signatures.scan_window_kb == 0 {
            return Err(UnattendError::invalid_config(
                "signatures.scan_window_kb",
                "must be > 0",
            ));
        }
        if self.probing.timeout_ms == 0 {
            return Err(UnattendError::invalid_config("probing.timeout_ms", "must be > 0"));
        }
        if let Some(bad) = self.probing.arguments.iter().find(|a| !is_whitelisted(a)) {
            return Err(UnattendError::invalid_config(
                "probing.arguments",
                format!("{bad:?} is not a diagnostic argument"),
            ));
        }
        if self.probing.early_stop_frequency == 0 {
            return Err(UnattendError::invalid_config(
                "probing.early_stop_frequency",
                "must be > 0",
            ));
        }
        if self.extraction.timeout_secs == 0 {
            return Err(UnattendError::invalid_config(
                "extraction.timeout_secs",
                "must be > 0",
            ));
        }
        if self.extraction.max_depth == 0 && self.extraction.max_nested > 0 && self.extraction.enabled {
            return Err(UnattendError::invalid_config(
                "extraction.max_depth",
                "depth 0 allows no nested candidates; disable extraction instead",
            ));
        }
        if self.extraction.program.trim().is_empty() {
            return Err(UnattendError::invalid_config("extraction.program", "is empty"));
        }
        if self.community.timeout_ms == 0 {
            return Err(UnattendError::invalid_config("community.timeout_ms", "must be > 0"));
        }
        if self.max_concurrent_files == 0 {
            return Err(UnattendError::invalid_config("max_concurrent_files", "must be > 0"));
        }
        let s = &self.scoring;
        check_unit("scoring.community_confidence", s.community_confidence)?;
        check_unit("scoring.incomplete_metadata_factor", s.incomplete_metadata_factor)?;
        check_unit("scoring.nested_depth_decay", s.nested_depth_decay)?;
        check_unit("scoring.brute_force_weight", s.brute_force_weight)?;
        check_unit("scoring.silent_disabled_ceiling", s.silent_disabled_ceiling)?;
        Ok(())
    }
}

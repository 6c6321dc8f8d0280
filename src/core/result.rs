//! Terminal analysis result and its flat export form.

use super::framework::Framework;
use super::installer::InstallerFile;
use super::metadata::Metadata;
use super::probe::BruteForceAttempt;
use super::signature::SignatureMatch;
use super::switches::SwitchSet;
use super::warnings::AnalysisWarning;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything learned about one installer, including nested installers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: String,
    pub installer: InstallerFile,
    /// Location inside the parent's extracted tree, for nested results
    pub relative_path: Option<String>,
    pub framework: Option<Framework>,
    pub installer_type: Option<String>,
    pub metadata: Metadata,
    pub signatures: Vec<SignatureMatch>,
    /// The canonical switch set, if any source produced one
    pub switch_set: Option<SwitchSet>,
    pub confidence: f32,
    pub warnings: Vec<AnalysisWarning>,
    pub probe_attempts: Vec<BruteForceAttempt>,
    pub nested: Vec<AnalysisResult>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Creates a new builder for the given installer.
    pub fn builder(installer: InstallerFile) -> AnalysisResultBuilder {
        AnalysisResultBuilder::new(installer)
    }

    pub fn install_args(&self) -> &[String] {
        self.switch_set
            .as_ref()
            .map(|s| s.install_args.as_slice())
            .unwrap_or_default()
    }

    pub fn has_warning(&self, kind: super::warnings::WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    pub fn to_flat_record(&self) -> FlatRecord {
        FlatRecord {
            installer_type: self.installer_type.clone(),
            product_name: self.metadata.product_name.clone(),
            product_version: self.metadata.product_version.clone(),
            confidence: self.confidence,
            install_switches: self.install_args().to_vec(),
            uninstall_switches: self
                .switch_set
                .as_ref()
                .map(|s| s.uninstall_args.clone())
                .unwrap_or_default(),
            warnings: self.warnings.iter().map(|w| w.to_string()).collect(),
            nested: self.nested.iter().map(|n| n.to_flat_record()).collect(),
            relative_path: self.relative_path.clone(),
            sha256: self.installer.sha256.clone(),
        }
    }

    /// Serialize the flat record as pretty JSON.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_flat_record())?)
    }
}

/// Flat, caller-facing shape of a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub installer_type: Option<String>,
    pub product_name: Option<String>,
    pub product_version: Option<String>,
    pub confidence: f32,
    pub install_switches: Vec<String>,
    pub uninstall_switches: Vec<String>,
    pub warnings: Vec<String>,
    pub nested: Vec<FlatRecord>,
    pub relative_path: Option<String>,
    pub sha256: String,
}

/// Builder for constructing AnalysisResult instances.
#[derive(Debug)]
pub struct AnalysisResultBuilder {
    installer: InstallerFile,
    relative_path: Option<String>,
    framework: Option<Framework>,
    /// Used when no framework was detected
    fallback_type: Option<String>,
    metadata: Metadata,
    signatures: Vec<SignatureMatch>,
    switch_set: Option<SwitchSet>,
    confidence: f32,
    warnings: Vec<AnalysisWarning>,
    probe_attempts: Vec<BruteForceAttempt>,
    nested: Vec<AnalysisResult>,
    analyzed_at: Option<DateTime<Utc>>,
}

impl AnalysisResultBuilder {
    pub fn new(installer: InstallerFile) -> Self {
        Self {
            installer,
            relative_path: None,
            framework: None,
            fallback_type: None,
            metadata: Metadata::default(),
            signatures: Vec::new(),
            switch_set: None,
            confidence: 0.0,
            warnings: Vec::new(),
            probe_attempts: Vec::new(),
            nested: Vec::new(),
            analyzed_at: None,
        }
    }

    pub fn with_relative_path(mut self, relative_path: Option<String>) -> Self {
        self.relative_path = relative_path;
        self
    }

    pub fn with_framework(mut self, framework: Option<Framework>) -> Self {
        self.framework = framework;
        self
    }

    /// Installer type reported when `framework` is unset, e.g. from a
    /// community record.
    pub fn with_fallback_type(mut self, installer_type: Option<String>) -> Self {
        self.fallback_type = installer_type.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_signatures(mut self, signatures: Vec<SignatureMatch>) -> Self {
        self.signatures = signatures;
        self
    }

    pub fn with_switch_set(mut self, switch_set: Option<SwitchSet>) -> Self {
        self.switch_set = switch_set;
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<AnalysisWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_probe_attempts(mut self, attempts: Vec<BruteForceAttempt>) -> Self {
        self.probe_attempts = attempts;
        self
    }

    pub fn with_nested(mut self, nested: Vec<AnalysisResult>) -> Self {
        self.nested = nested;
        self
    }

    pub fn with_analyzed_at(mut self, at: DateTime<Utc>) -> Self {
        self.analyzed_at = Some(at);
        self
    }

    /// Builds the result. Confidence is clamped here so no result can carry
    /// a value outside [0, 1].
    pub fn build(self) -> AnalysisResult {
        let confidence = if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        };
        AnalysisResult {
            analysis_id: uuid::Uuid::new_v4().to_string(),
            installer_type: self
                .framework
                .map(|f| f.display_name().to_string())
                .or(self.fallback_type),
            installer: self.installer,
            relative_path: self.relative_path,
            framework: self.framework,
            metadata: self.metadata,
            signatures: self.signatures,
            switch_set: self.switch_set,
            confidence,
            warnings: self.warnings,
            probe_attempts: self.probe_attempts,
            nested: self.nested,
            analyzed_at: self.analyzed_at.unwrap_or_else(Utc::now),
        }
    }
}

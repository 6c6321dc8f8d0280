//! Silent switch sets and where they came from.

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the product code in uninstall templates.
pub const PRODUCT_CODE_PLACEHOLDER: &str = "{ProductCode}";

/// Provenance of a switch set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchSource {
    Signature,
    BruteForce,
    Community,
    Nested,
}

impl SwitchSource {
    /// Tie-break rank; higher wins.
    pub fn priority(self) -> u8 {
        match self {
            SwitchSource::Community => 3,
            SwitchSource::Signature => 2,
            SwitchSource::Nested => 1,
            SwitchSource::BruteForce => 0,
        }
    }
}

/// Arguments for an unattended install and uninstall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchSet {
    pub install_args: Vec<String>,
    pub uninstall_args: Vec<String>,
    pub source: SwitchSource,
    pub confidence: f32,
}

impl SwitchSet {
    pub fn new(
        install_args: Vec<String>,
        uninstall_args: Vec<String>,
        source: SwitchSource,
        confidence: f32,
    ) -> Self {
        Self {
            install_args,
            uninstall_args,
            source,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn from_static(
        install: &[&str],
        uninstall: &[&str],
        source: SwitchSource,
        confidence: f32,
    ) -> Self {
        Self::new(
            install.iter().map(|s| s.to_string()).collect(),
            uninstall.iter().map(|s| s.to_string()).collect(),
            source,
            confidence,
        )
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_source(mut self, source: SwitchSource) -> Self {
        self.source = source;
        self
    }

    pub fn is_usable(&self) -> bool {
        !self.install_args.is_empty()
    }

    /// Replace the product code placeholder. Without a code, uninstall
    /// arguments that still need it are dropped entirely.
    pub fn substitute_product_code(mut self, product_code: Option<&str>) -> Self {
        let needs_code = self
            .uninstall_args
            .iter()
            .any(|a| a.contains(PRODUCT_CODE_PLACEHOLDER));
        if !needs_code {
            return self;
        }
        match product_code {
            Some(code) => {
                for arg in &mut self.uninstall_args {
                    *arg = arg.replace(PRODUCT_CODE_PLACEHOLDER, code);
                }
            }
            None => self.uninstall_args.clear(),
        }
        self
    }

    /// Ordering for choosing the canonical set: confidence, then source.
    pub fn outranks(&self, other: &SwitchSet) -> bool {
        match self.confidence.partial_cmp(&other.confidence) {
            Some(std::cmp::Ordering::Greater) => true,
            Some(std::cmp::Ordering::Less) => false,
            _ => self.source.priority() > other.source.priority(),
        }
    }
}

//! Signature match type.

use super::framework::Framework;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One signature rule that fired against a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureMatch {
    pub framework: Framework,
    /// Name of the rule that fired
    pub rule: String,
    /// Higher is more precise; vendor overlays sit above generic frameworks
    pub specificity: u8,
    pub confidence: f32,
    /// File offset of the matched bytes (0 for whole-structure rules)
    pub matched_offset: u64,
    /// Position of the rule in the rule table
    pub declaration_index: usize,
}

impl SignatureMatch {
    pub fn new(
        framework: Framework,
        rule: impl Into<String>,
        specificity: u8,
        confidence: f32,
        matched_offset: u64,
        declaration_index: usize,
    ) -> Self {
        Self {
            framework,
            rule: rule.into(),
            specificity,
            confidence: confidence.clamp(0.0, 1.0),
            matched_offset,
            declaration_index,
        }
    }

    /// Priority order: specificity descending, then first-registered rule.
    pub fn priority_cmp(&self, other: &Self) -> Ordering {
        other
            .specificity
            .cmp(&self.specificity)
            .then(self.declaration_index.cmp(&other.declaration_index))
    }
}

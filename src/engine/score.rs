//! Combining every signal into one canonical switch set and confidence.

use crate::core::{AnalysisResult, SwitchSet, SwitchSource};
use crate::engine::community::CommunityRecord;
use crate::engine::config::ScoringConfig;
use tracing::debug;

/// Signals gathered for one file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreInputs<'a> {
    pub community: Option<&'a CommunityRecord>,
    /// Switch set from the signature table, already capped if a marker was found
    pub signature: Option<&'a SwitchSet>,
    pub metadata_complete: bool,
    /// Finished results of nested installers one level down
    pub nested: &'a [AnalysisResult],
    pub brute_force: Option<&'a SwitchSet>,
    pub silent_disabled: bool,
    pub product_code: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub switch_set: Option<SwitchSet>,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub struct ConfidenceAggregator {
    scoring: ScoringConfig,
}

impl ConfidenceAggregator {
    pub fn new(scoring: ScoringConfig) -> Self {
        Self { scoring }
    }

    /// Weighted candidates in source priority order.
    fn candidates(&self, inputs: &ScoreInputs<'_>) -> Vec<SwitchSet> {
        let s = &self.scoring;
        let mut out = Vec::with_capacity(4);

        if let Some(record) = inputs.community {
            if !record.install_args.is_empty() {
                out.push(record.switch_set(s.community_confidence));
            }
        }

        if let Some(set) = inputs.signature {
            let factor = if inputs.metadata_complete {
                1.0
            } else {
                s.incomplete_metadata_factor
            };
            let weighted = set.confidence * factor;
            out.push(set.clone().with_confidence(weighted));
        }

        // Children are one level below this file; their own confidence
        // already carries the decay of anything deeper.
        let best_nested = inputs
            .nested
            .iter()
            .filter_map(|child| {
                child.switch_set.as_ref().map(|set| {
                    set.clone()
                        .with_source(SwitchSource::Nested)
                        .with_confidence(child.confidence * s.nested_depth_decay)
                })
            })
            .reduce(|best, next| if next.outranks(&best) { next } else { best });
        out.extend(best_nested);

        if let Some(set) = inputs.brute_force {
            let weighted = set.confidence * s.brute_force_weight;
            out.push(set.clone().with_confidence(weighted));
        }
        out
    }

    pub fn aggregate(&self, inputs: &ScoreInputs<'_>) -> Score {
        let winner = self
            .candidates(inputs)
            .into_iter()
            .filter(SwitchSet::is_usable)
            .reduce(|best, next| if next.outranks(&best) { next } else { best });

        let Some(mut winner) = winner else {
            debug!(phase = "score", "no switch set from any source");
            return Score {
                switch_set: None,
                confidence: 0.0,
            };
        };

        let mut confidence = winner.confidence.clamp(0.0, 1.0);
        if inputs.silent_disabled {
            confidence = confidence.min(self.scoring.silent_disabled_ceiling);
        }
        winner = winner
            .with_confidence(confidence)
            .substitute_product_code(inputs.product_code);

        debug!(
            phase = "score",
            source = ?winner.source,
            confidence,
            "selected canonical switch set"
        );
        Score {
            switch_set: Some(winner),
            confidence,
        }
    }
}

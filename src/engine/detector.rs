//! Signature detection against the static rule table.

use crate::core::{Framework, InstallerImage, SignatureMatch};
use crate::engine::config::SignatureConfig;
use crate::engine::rules::{RuleKind, SignatureRule, RULES};
use crate::strings::utf16le_bytes;
use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use tracing::debug;

/// One automaton over every substring rule, in both encodings.
struct SubstringIndex {
    automaton: Option<AhoCorasick>,
    /// Pattern index -> rule index
    pattern_to_rule: Vec<usize>,
    /// Longest needle in bytes
    max_pattern_len: usize,
}

impl SubstringIndex {
    fn build(rules: &[SignatureRule]) -> Self {
        let mut patterns: Vec<Vec<u8>> = Vec::new();
        let mut pattern_to_rule = Vec::new();
        for (idx, rule) in rules.iter().enumerate() {
            if let RuleKind::Substring(text) = rule.kind {
                patterns.push(text.as_bytes().to_vec());
                pattern_to_rule.push(idx);
                patterns.push(utf16le_bytes(text));
                pattern_to_rule.push(idx);
            }
        }
        let max_pattern_len = patterns.iter().map(Vec::len).max().unwrap_or(0);
        let automaton = if patterns.is_empty() {
            None
        } else {
            AhoCorasick::builder()
                .ascii_case_insensitive(false)
                .build(&patterns)
                .ok()
        };
        Self {
            automaton,
            pattern_to_rule,
            max_pattern_len,
        }
    }

    /// First offset per rule index found in `hay`, shifted by `base`.
    fn scan(&self, hay: &[u8], base: u64, hits: &mut BTreeMap<usize, u64>) {
        let Some(ac) = &self.automaton else {
            return;
        };
        for mat in ac.find_overlapping_iter(hay) {
            if let Some(&rule_idx) = self.pattern_to_rule.get(mat.pattern().as_usize()) {
                let offset = base + mat.start() as u64;
                hits.entry(rule_idx)
                    .and_modify(|o| *o = (*o).min(offset))
                    .or_insert(offset);
            }
        }
    }
}

static SUBSTRINGS: Lazy<SubstringIndex> = Lazy::new(|| SubstringIndex::build(RULES));

fn structural_hit(rule: &SignatureRule, image: &InstallerImage) -> Option<u64> {
    match rule.kind {
        RuleKind::Magic { offset, bytes } => {
            let end = offset.checked_add(bytes.len())?;
            (image.data.get(offset..end)? == bytes).then_some(offset as u64)
        }
        RuleKind::CompoundInstaller => image.msi_info()?.is_installer().then_some(0),
        RuleKind::PeSection(name) => image
            .pe_view()?
            .section(name)
            .map(|s| s.raw_offset as u64),
        RuleKind::VersionValue { key, value } => {
            let found = image.pe_view()?.version()?.get(key)?;
            found.eq_ignore_ascii_case(value).then_some(0)
        }
        RuleKind::Substring(_) => None,
    }
}

/// Classifies an installer image against `RULES`.
#[derive(Debug, Clone)]
pub struct SignatureDetector {
    scan_window: usize,
    overlay_window: usize,
}

impl SignatureDetector {
    pub fn new(cfg: &SignatureConfig) -> Self {
        Self {
            scan_window: cfg.scan_window_bytes(),
            overlay_window: cfg.overlay_scan_bytes(),
        }
    }

    /// Matches in priority order, at most one per framework.
    pub fn detect(&self, image: &InstallerImage) -> Vec<SignatureMatch> {
        let mut hits: BTreeMap<usize, u64> = BTreeMap::new();

        let head = &image.data[..image.data.len().min(self.scan_window)];
        SUBSTRINGS.scan(head, 0, &mut hits);
        if let (Some(overlay), Some(view)) = (image.overlay(), image.pe_view()) {
            // Skip what the head scan covered, minus room for a needle
            // that straddles the end of the head window
            let covered = (head.len() as u64).saturating_sub(view.overlay_offset) as usize;
            let start = covered.saturating_sub(SUBSTRINGS.max_pattern_len.saturating_sub(1));
            let end = overlay.len().min(self.overlay_window);
            if covered < end {
                SUBSTRINGS.scan(
                    &overlay[start..end],
                    view.overlay_offset + start as u64,
                    &mut hits,
                );
            }
        }

        for (idx, rule) in RULES.iter().enumerate() {
            if let Some(offset) = structural_hit(rule, image) {
                hits.entry(idx).or_insert(offset);
            }
        }

        let mut matches: Vec<SignatureMatch> = hits
            .into_iter()
            .map(|(idx, offset)| {
                let rule = &RULES[idx];
                SignatureMatch::new(
                    rule.framework,
                    rule.name,
                    rule.specificity,
                    rule.confidence,
                    offset,
                    idx,
                )
            })
            .collect();
        matches.sort_by(|a, b| a.priority_cmp(b));

        let mut seen: Vec<Framework> = Vec::new();
        matches.retain(|m| {
            if seen.contains(&m.framework) {
                false
            } else {
                seen.push(m.framework);
                true
            }
        });

        debug!(
            phase = "detect",
            matches = matches.len(),
            top = ?matches.first().map(|m| m.framework),
            "signature detection complete"
        );
        matches
    }
}

impl Default for SignatureDetector {
    fn default() -> Self {
        Self::new(&SignatureConfig::default())
    }
}

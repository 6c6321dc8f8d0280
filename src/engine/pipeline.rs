//! Per-file orchestration, including nested installers.
//!
//! Nested exploration is a worklist over an arena of nodes rather than
//! recursion. A node's children always have larger indices than the node,
//! so results are assembled bottom-up by walking the arena in reverse.

use crate::core::{
    merge_warnings, AnalysisResult, AnalysisWarning, ContainerShape, InstallerFile,
    InstallerImage, Metadata, SignatureMatch, SwitchSet, WarningKind,
};
use crate::engine::cancel::CancelToken;
use crate::engine::community::{CommunityDatabase, CommunityRecord};
use crate::engine::config::AnalysisConfig;
use crate::engine::detector::SignatureDetector;
use crate::engine::explore::{ArchiveExplorer, ArchiveExtractor};
use crate::engine::io::{load_installer, IoLimits, SafeFileReader};
use crate::engine::metadata::extract_metadata;
use crate::engine::probe::{BruteForceProber, ProbeOutcome, ProbeRunner};
use crate::engine::score::{ConfidenceAggregator, ScoreInputs};
use crate::engine::switches::SwitchResolver;
use crate::error::Result;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, debug_span, warn, Instrument};

/// Signals gathered for one node before nested results are known.
#[derive(Debug, Default)]
struct Findings {
    signatures: Vec<SignatureMatch>,
    metadata: Metadata,
    signature_set: Option<SwitchSet>,
    silent_disabled: bool,
    community: Option<CommunityRecord>,
    probe: ProbeOutcome,
    warnings: Vec<AnalysisWarning>,
}

#[derive(Debug)]
struct Node {
    file: InstallerFile,
    relative_path: Option<String>,
    depth: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    /// `None` until analyzed; stays `None` if the run stopped first
    findings: Option<Findings>,
    /// Conditions found while expanding this node (limits, cycles, extraction)
    warnings: Vec<AnalysisWarning>,
}

impl Node {
    fn new(file: InstallerFile, relative_path: Option<String>, depth: usize, parent: Option<usize>) -> Self {
        Self {
            file,
            relative_path,
            depth,
            parent,
            children: Vec::new(),
            findings: None,
            warnings: Vec::new(),
        }
    }
}

/// Mutable state of one run. Dropping it deletes every scratch directory.
struct Run {
    arena: Vec<Node>,
    pending: VecDeque<(usize, Option<InstallerImage>)>,
    scratch: Vec<TempDir>,
    nested_total: usize,
    cancelled: bool,
}

impl Run {
    fn on_ancestor_chain(&self, from: usize, sha256: &str) -> bool {
        let mut cursor = Some(from);
        while let Some(idx) = cursor {
            if self.arena[idx].file.sha256 == sha256 {
                return true;
            }
            cursor = self.arena[idx].parent;
        }
        false
    }
}

fn fingerprint(path: &Path, limits: IoLimits) -> Result<(u64, String)> {
    let mut reader = SafeFileReader::open(path, limits)?;
    let sha256 = reader.sha256()?;
    Ok((reader.size(), sha256))
}

/// All stages wired to one immutable configuration.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<AnalysisConfig>,
    detector: SignatureDetector,
    resolver: SwitchResolver,
    prober: BruteForceProber,
    explorer: ArchiveExplorer,
    aggregator: ConfidenceAggregator,
    community: Option<Arc<dyn CommunityDatabase>>,
}

impl Pipeline {
    pub fn new(
        config: Arc<AnalysisConfig>,
        runner: Arc<dyn ProbeRunner>,
        extractor: Arc<dyn ArchiveExtractor>,
        community: Option<Arc<dyn CommunityDatabase>>,
    ) -> Self {
        Self {
            detector: SignatureDetector::new(&config.signatures),
            resolver: SwitchResolver::new(
                config.signatures.min_string_length,
                config.scoring.silent_disabled_ceiling,
            ),
            prober: BruteForceProber::new(config.probing.clone(), runner),
            explorer: ArchiveExplorer::new(config.extraction.clone(), extractor),
            aggregator: ConfidenceAggregator::new(config.scoring.clone()),
            community,
            config,
        }
    }

    /// Analyze `root` and everything nested inside it.
    pub async fn run(&self, root: InstallerImage, cancel: &CancelToken) -> AnalysisResult {
        let mut run = Run {
            arena: vec![Node::new(root.file.clone(), None, 0, None)],
            pending: VecDeque::from([(0, Some(root))]),
            scratch: Vec::new(),
            nested_total: 0,
            cancelled: false,
        };

        while let Some((idx, image)) = run.pending.pop_front() {
            if cancel.is_cancelled() {
                run.cancelled = true;
                break;
            }
            let image = match image {
                Some(image) => image,
                None => match load_installer(run.arena[idx].file.path(), &self.config.io) {
                    Ok(image) => image,
                    Err(e) => {
                        warn!(error = %e, path = %run.arena[idx].file.path.display(), "nested file unreadable");
                        if let Some(parent) = run.arena[idx].parent {
                            let rel = run.arena[idx].relative_path.clone().unwrap_or_default();
                            run.arena[parent].warnings.push(AnalysisWarning::new(
                                WarningKind::ExtractionFailed,
                                format!("could not read nested {rel}: {e}"),
                            ));
                        }
                        continue;
                    }
                },
            };

            let span = debug_span!(
                "node",
                depth = run.arena[idx].depth,
                sha256 = %image.file.short_hash()
            );
            let (findings, needs_extraction) =
                self.analyze_node(&image, cancel).instrument(span).await;
            drop(image);
            run.arena[idx].findings = Some(findings);

            if cancel.is_cancelled() {
                run.cancelled = true;
                break;
            }
            if needs_extraction && self.expand(&mut run, idx, cancel).await {
                run.cancelled = true;
                break;
            }
        }

        debug!(
            phase = "pipeline",
            nodes = run.arena.len(),
            scratch_dirs = run.scratch.len(),
            cancelled = run.cancelled,
            "assembling results"
        );
        self.assemble(run)
    }

    /// Detection, metadata, switch resolution, community lookup and probing
    /// for one file. Returns whether extraction should be tried.
    async fn analyze_node(&self, image: &InstallerImage, cancel: &CancelToken) -> (Findings, bool) {
        let (signatures, metadata) =
            rayon::join(|| self.detector.detect(image), || extract_metadata(image));
        let resolution = self.resolver.resolve(&signatures, image);

        let mut warnings = metadata.warnings;
        warnings.extend(resolution.warnings.iter().cloned());
        let usable = resolution.is_usable();

        let community = self.lookup_community(&image.file, cancel, &mut warnings).await;
        let answered = usable || community.is_some();

        let mut probe = ProbeOutcome::default();
        if !answered && self.config.probing.enabled && !cancel.is_cancelled() {
            if image.shape == ContainerShape::PortableExecutable {
                probe = self.prober.probe(image.file.path(), cancel).await;
                warnings.extend(probe.warnings.iter().cloned());
            } else {
                debug!(phase = "probe", shape = ?image.shape, "not an executable; probing skipped");
                warnings.push(AnalysisWarning::new(
                    WarningKind::ProbeSkipped,
                    format!("{:?} container is not executable", image.shape),
                ));
            }
        }

        let needs_extraction = !answered
            && probe.switch_set.is_none()
            && self.config.extraction.enabled
            && !cancel.is_cancelled();

        let findings = Findings {
            signatures,
            metadata: metadata.metadata,
            signature_set: resolution.switch_set,
            silent_disabled: resolution.marker.is_some(),
            community,
            probe,
            warnings,
        };
        (findings, needs_extraction)
    }

    async fn lookup_community(
        &self,
        file: &InstallerFile,
        cancel: &CancelToken,
        warnings: &mut Vec<AnalysisWarning>,
    ) -> Option<CommunityRecord> {
        let db = self.community.as_ref()?;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            r = db.lookup(&file.sha256) => r,
        };
        match result {
            Ok(record) => {
                debug!(phase = "community", matched = record.is_some(), "community lookup");
                record
            }
            Err(e) => {
                let e = crate::log_error!(e, "community");
                warnings.push(AnalysisWarning::new(
                    WarningKind::CommunityUnavailable,
                    e.to_string(),
                ));
                None
            }
        }
    }

    /// Extract node `idx` and queue its candidates. Returns true if the run
    /// was cancelled meanwhile.
    async fn expand(&self, run: &mut Run, idx: usize, cancel: &CancelToken) -> bool {
        let limits = &self.config.extraction;
        let depth = run.arena[idx].depth;

        if depth >= limits.max_depth {
            debug!(phase = "explore", depth, "depth limit reached");
            run.arena[idx].warnings.push(AnalysisWarning::new(
                WarningKind::NestedLimit,
                format!("not extracted: depth limit {} reached", limits.max_depth),
            ));
            return false;
        }
        let remaining = limits.max_nested.saturating_sub(run.nested_total);
        if remaining == 0 {
            run.arena[idx].warnings.push(AnalysisWarning::new(
                WarningKind::NestedLimit,
                format!("not extracted: {} nested candidates already queued", limits.max_nested),
            ));
            return false;
        }

        let file = run.arena[idx].file.clone();
        let exploration = self.explorer.explore(&file, depth + 1, remaining, cancel).await;
        run.arena[idx].warnings.extend(exploration.warnings);
        if let Some(dir) = exploration.scratch {
            run.scratch.push(dir);
        }
        if exploration.cancelled {
            return true;
        }

        for candidate in exploration.candidates {
            let rel = candidate.display_path();
            let (size, sha256) = match fingerprint(&candidate.absolute_path, IoLimits::from(&self.config.io)) {
                Ok(fp) => fp,
                Err(e) => {
                    warn!(error = %e, path = %rel, "nested candidate unreadable");
                    run.arena[idx].warnings.push(AnalysisWarning::new(
                        WarningKind::ExtractionFailed,
                        format!("could not read nested {rel}: {e}"),
                    ));
                    continue;
                }
            };
            if run.on_ancestor_chain(idx, &sha256) {
                warn!(path = %rel, "nested installer repeats an ancestor; skipped");
                run.arena[idx].warnings.push(AnalysisWarning::new(
                    WarningKind::NestedCycle,
                    format!("{rel} has the same content as an enclosing installer"),
                ));
                continue;
            }

            let child = run.arena.len();
            let nested_file = InstallerFile::new(candidate.absolute_path, size, sha256);
            run.arena
                .push(Node::new(nested_file, Some(rel), candidate.depth, Some(idx)));
            run.arena[idx].children.push(child);
            run.pending.push_back((child, None));
            run.nested_total += 1;
        }

        if exploration.truncated {
            run.arena[idx].warnings.push(AnalysisWarning::new(
                WarningKind::NestedLimit,
                format!("nested candidate limit {} reached; remaining files ignored", limits.max_nested),
            ));
        }
        false
    }

    fn assemble(&self, mut run: Run) -> AnalysisResult {
        let cancelled = run.cancelled;
        let mut results: Vec<Option<AnalysisResult>> = Vec::with_capacity(run.arena.len());
        results.resize_with(run.arena.len(), || None);

        let arena = std::mem::take(&mut run.arena);
        let mut root = None;
        for (idx, node) in arena.into_iter().enumerate().rev() {
            let nested: Vec<AnalysisResult> =
                node.children.iter().filter_map(|&c| results[c].take()).collect();
            if idx == 0 {
                root = Some(self.build_result(node, nested, cancelled));
            } else if node.findings.is_some() {
                results[idx] = Some(self.build_result(node, nested, false));
            }
        }
        // `run` still owns the scratch directories until here
        drop(run);

        root.unwrap_or_else(|| {
            AnalysisResult::builder(InstallerFile::new("", 0, String::new()))
                .with_warnings(vec![AnalysisWarning::new(WarningKind::Cancelled, "nothing analyzed")])
                .build()
        })
    }

    fn build_result(&self, node: Node, nested: Vec<AnalysisResult>, cancelled: bool) -> AnalysisResult {
        let findings = node.findings.unwrap_or_default();
        let score = self.aggregator.aggregate(&ScoreInputs {
            community: findings.community.as_ref(),
            signature: findings.signature_set.as_ref(),
            metadata_complete: findings.metadata.complete,
            nested: &nested,
            brute_force: findings.probe.switch_set.as_ref(),
            silent_disabled: findings.silent_disabled,
            product_code: findings.metadata.product_code(),
        });

        let mut warnings = findings.warnings;
        warnings.extend(node.warnings);
        if cancelled {
            warnings.push(AnalysisWarning::new(
                WarningKind::Cancelled,
                "analysis cancelled; result is partial",
            ));
        }

        AnalysisResult::builder(node.file)
            .with_relative_path(node.relative_path)
            .with_framework(findings.signatures.first().map(|m| m.framework))
            .with_fallback_type(findings.community.as_ref().and_then(|r| r.installer_type.clone()))
            .with_metadata(findings.metadata)
            .with_signatures(findings.signatures)
            .with_switch_set(score.switch_set)
            .with_confidence(score.confidence)
            .with_warnings(merge_warnings(warnings))
            .with_probe_attempts(findings.probe.attempts)
            .with_nested(nested)
            .build()
    }
}

//! Extracting an installer and discovering the installers inside it.
//!
//! Every extraction gets its own scratch directory named after the content
//! hash. The directory is a `TempDir` handed back to the pipeline, which owns
//! it for the rest of the run so nested files stay readable until their
//! analysis is finished and are removed on every exit path.

pub mod candidates;
pub mod extractor;

pub use candidates::{find_candidates, FoundFile};
pub use extractor::{ArchiveExtractor, CommandExtractor};

use crate::core::{AnalysisWarning, InstallerFile, NestedCandidate, WarningKind};
use crate::engine::cancel::CancelToken;
use crate::engine::config::ExtractionConfig;
use crate::error::UnattendError;
use std::io;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, warn};

/// Result of one extraction attempt.
#[derive(Debug, Default)]
pub struct Exploration {
    /// Kept alive by the caller until nested analysis is done
    pub scratch: Option<TempDir>,
    pub candidates: Vec<NestedCandidate>,
    /// More candidates existed than the caller allowed
    pub truncated: bool,
    pub warnings: Vec<AnalysisWarning>,
    pub cancelled: bool,
}

#[derive(Clone)]
pub struct ArchiveExplorer {
    config: ExtractionConfig,
    extractor: Arc<dyn ArchiveExtractor>,
}

impl ArchiveExplorer {
    pub fn new(config: ExtractionConfig, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        Self { config, extractor }
    }

    /// `unattend-<hash16>-XXXXXX` under the configured scratch root.
    pub fn create_scratch(&self, file: &InstallerFile) -> io::Result<TempDir> {
        let root = self.config.scratch_root();
        std::fs::create_dir_all(&root)?;
        tempfile::Builder::new()
            .prefix(&format!("unattend-{}-", file.short_hash()))
            .tempdir_in(root)
    }

    /// Extract `file` and collect at most `limit` candidates at `child_depth`.
    pub async fn explore(
        &self,
        file: &InstallerFile,
        child_depth: usize,
        limit: usize,
        cancel: &CancelToken,
    ) -> Exploration {
        let mut out = Exploration::default();

        let scratch = match self.create_scratch(file) {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "could not create scratch directory");
                out.warnings.push(AnalysisWarning::new(
                    WarningKind::ExtractionFailed,
                    format!("scratch directory: {e}"),
                ));
                return out;
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            r = self.extractor.extract(file.path(), scratch.path()) => Some(r),
        };

        match result {
            None => {
                debug!(phase = "explore", "extraction interrupted by cancellation");
                out.cancelled = true;
                return out;
            }
            Some(Err(UnattendError::ExternalToolMissing(tool))) => {
                warn!(%tool, "extraction tool not found");
                out.warnings.push(AnalysisWarning::new(
                    WarningKind::ExtractionToolMissing,
                    format!("{tool} is not installed or not on PATH"),
                ));
                return out;
            }
            Some(Err(e)) => {
                warn!(error = %e, path = %file.path.display(), "extraction failed");
                out.warnings
                    .push(AnalysisWarning::new(WarningKind::ExtractionFailed, e.to_string()));
                return out;
            }
            Some(Ok(())) => {}
        }

        let (found, truncated) =
            find_candidates(scratch.path(), &self.config.candidate_extensions, limit);
        debug!(
            phase = "explore",
            candidates = found.len(),
            truncated,
            scratch = %scratch.path().display(),
            "extraction complete"
        );
        out.candidates = found
            .into_iter()
            .map(|f| {
                NestedCandidate::new(f.relative_path, f.absolute_path, child_depth, file.sha256.clone())
            })
            .collect();
        out.truncated = truncated;
        out.scratch = Some(scratch);
        out
    }
}

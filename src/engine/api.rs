//! Public entry point.
//!
//! ```no_run
//! # async fn demo() -> unattend::Result<()> {
//! use unattend::{AnalysisConfig, Analyzer};
//!
//! let analyzer = Analyzer::new(AnalysisConfig::default())?;
//! let result = analyzer.analyze("setup.exe").await?;
//! println!("{}", result.to_json()?);
//! # Ok(())
//! # }
//! ```

use crate::core::AnalysisResult;
use crate::engine::cancel::CancelToken;
use crate::engine::community::{database_from_config, CommunityDatabase};
use crate::engine::config::AnalysisConfig;
use crate::engine::explore::{ArchiveExtractor, CommandExtractor};
use crate::engine::io::load_installer;
use crate::engine::pipeline::Pipeline;
use crate::engine::probe::{ProbeRunner, ProcessProbeRunner};
use crate::error::{Result, UnattendError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn, Instrument};

/// Analyzes installers with one shared configuration.
///
/// Cheap to clone; clones share the probe runner, extractor and community
/// cache.
#[derive(Clone)]
pub struct Analyzer {
    config: Arc<AnalysisConfig>,
    pipeline: Pipeline,
}

/// Substitutes collaborators, mostly for tests and embedding hosts.
pub struct AnalyzerBuilder {
    config: AnalysisConfig,
    runner: Option<Arc<dyn ProbeRunner>>,
    extractor: Option<Arc<dyn ArchiveExtractor>>,
    community: Option<Option<Arc<dyn CommunityDatabase>>>,
}

impl AnalyzerBuilder {
    pub fn probe_runner(mut self, runner: Arc<dyn ProbeRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Use `db` instead of the database described by the configuration.
    pub fn community(mut self, db: Arc<dyn CommunityDatabase>) -> Self {
        self.community = Some(Some(db));
        self
    }

    pub fn without_community(mut self) -> Self {
        self.community = Some(None);
        self
    }

    pub fn build(self) -> Result<Analyzer> {
        self.config.validate()?;
        let community = match self.community {
            Some(explicit) => explicit,
            None => database_from_config(&self.config.community)?,
        };
        let extractor = self
            .extractor
            .unwrap_or_else(|| Arc::new(CommandExtractor::from_config(&self.config.extraction)));
        let runner = self.runner.unwrap_or_else(|| Arc::new(ProcessProbeRunner));

        let config = Arc::new(self.config);
        let pipeline = Pipeline::new(config.clone(), runner, extractor, community);
        Ok(Analyzer { config, pipeline })
    }
}

impl Analyzer {
    /// Analyzer with the real process runner, command extractor and the
    /// configured community database.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: AnalysisConfig) -> AnalyzerBuilder {
        AnalyzerBuilder {
            config,
            runner: None,
            extractor: None,
            community: None,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn analyze(&self, path: impl AsRef<Path>) -> Result<AnalysisResult> {
        self.analyze_with_cancel(path, &CancelToken::new()).await
    }

    /// Like `analyze`, but stops early when `cancel` fires and returns the
    /// partial result with a `Cancelled` warning.
    ///
    /// Only an unreadable input is an error.
    pub async fn analyze_with_cancel(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> Result<AnalysisResult> {
        let path = path.as_ref();
        let analysis_id = uuid::Uuid::new_v4().to_string();
        let span = crate::span_trace!(
            "analysis",
            analysis_id = %analysis_id,
            path = %path.display(),
            size_bytes = tracing::field::Empty
        );

        async {
            let image = load_installer(path, &self.config.io).inspect_err(|e| {
                warn!(error = %e, "installer unreadable");
            })?;
            tracing::Span::current().record("size_bytes", image.file.size);

            let mut result = self.pipeline.run(image, cancel).await;
            result.analysis_id = analysis_id.clone();
            info!(
                installer_type = result.installer_type.as_deref().unwrap_or("unknown"),
                confidence = result.confidence,
                warnings = result.warnings.len(),
                nested = result.nested.len(),
                "analysis complete"
            );
            Ok(result)
        }
        .instrument(span)
        .await
    }

    /// Blocking wrapper for synchronous callers. Must not be called from
    /// inside a tokio runtime.
    pub fn analyze_blocking(&self, path: impl AsRef<Path>) -> Result<AnalysisResult> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.analyze(path))
    }

    /// Analyze many files, at most `max_concurrent_files` at a time.
    ///
    /// Results come back in input order; one failure never affects the
    /// others.
    pub async fn analyze_many<I, P>(&self, paths: I) -> Vec<(PathBuf, Result<AnalysisResult>)>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_files.max(1)));
        let mut tasks = JoinSet::new();

        for (index, path) in paths.iter().cloned().enumerate() {
            let analyzer = self.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => analyzer.analyze(&path).await,
                    Err(_) => Err(UnattendError::Cancelled),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<Result<AnalysisResult>>> = Vec::with_capacity(paths.len());
        slots.resize_with(paths.len(), || None);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = Some(result),
                Err(e) => warn!(error = %e, "analysis task failed"),
            }
        }

        paths
            .into_iter()
            .zip(slots)
            .map(|(path, slot)| {
                let result = slot.unwrap_or_else(|| {
                    Err(UnattendError::Io(std::io::Error::other(
                        "analysis task panicked",
                    )))
                });
                (path, result)
            })
            .collect()
    }
}

//! Whitelisted diagnostic probing.
//!
//! When no signature produced usable switches, the installer is launched
//! with harmless arguments (`--help`, `/?` ...) one at a time and its output
//! is mined for switch tokens that sit near unattended-install keywords.
//! Discovered tokens are reported, never executed.

pub mod mining;
pub mod runner;
pub mod whitelist;

pub use mining::{mine_switches, Candidate, CandidateTally};
pub use runner::{decode_output, ProbeOutput, ProbeRunner, ProcessProbeRunner};
pub use whitelist::{is_whitelisted, ProbeArgument, DIAGNOSTIC_ARGUMENTS};

use crate::core::{AnalysisWarning, BruteForceAttempt, SwitchSet, SwitchSource, WarningKind};
use crate::engine::cancel::CancelToken;
use crate::engine::config::ProbeConfig;
use crate::error::UnattendError;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Confidence of a mined candidate seen in a single probe.
const BASE_CONFIDENCE: f32 = 0.3;
/// Added per additional probe the candidate appeared in.
const PER_PROBE_BONUS: f32 = 0.1;
const MAX_CONFIDENCE: f32 = 0.5;

/// Everything the prober learned about one file.
#[derive(Debug, Clone, Default)]
pub struct ProbeOutcome {
    pub switch_set: Option<SwitchSet>,
    pub attempts: Vec<BruteForceAttempt>,
    pub warnings: Vec<AnalysisWarning>,
    pub cancelled: bool,
}

fn candidate_confidence(probes: usize) -> f32 {
    let extra = probes.saturating_sub(1) as f32;
    (BASE_CONFIDENCE + PER_PROBE_BONUS * extra).min(MAX_CONFIDENCE)
}

/// Sequential prober over a `ProbeRunner`.
#[derive(Clone)]
pub struct BruteForceProber {
    config: ProbeConfig,
    runner: Arc<dyn ProbeRunner>,
}

impl BruteForceProber {
    pub fn new(config: ProbeConfig, runner: Arc<dyn ProbeRunner>) -> Self {
        Self { config, runner }
    }

    /// Probe `program` with each configured argument in order.
    ///
    /// Exactly one child runs at a time: each probe is awaited to completion,
    /// timeout or cancellation before the next one starts.
    pub async fn probe(&self, program: &Path, cancel: &CancelToken) -> ProbeOutcome {
        let mut outcome = ProbeOutcome::default();
        let mut tally = CandidateTally::new();
        let mut ran = 0usize;

        for raw in &self.config.arguments {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            let Some(argument) = ProbeArgument::whitelisted(raw) else {
                warn!(argument = %raw, "refusing non-diagnostic probe argument");
                outcome.warnings.push(AnalysisWarning::new(
                    WarningKind::InvalidConfiguration,
                    format!("{raw:?} is not a diagnostic argument"),
                ));
                continue;
            };

            let started = Instant::now();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                r = self.runner.run(
                    program,
                    argument,
                    self.config.timeout(),
                    self.config.max_output_bytes,
                ) => Some(r),
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                None => {
                    debug!(phase = "probe", %argument, "probe interrupted by cancellation");
                    outcome.cancelled = true;
                    break;
                }
                Some(Ok(output)) => {
                    ran += 1;
                    let mined = mine_switches(&output.text, self.config.keyword_window);
                    debug!(
                        phase = "probe",
                        %argument,
                        exit_code = ?output.exit_code,
                        candidates = mined.len(),
                        elapsed_ms,
                        "probe finished"
                    );
                    tally.record(mined);
                    outcome.attempts.push(BruteForceAttempt::completed(
                        argument.as_str(),
                        output.exit_code,
                        output.text,
                        elapsed_ms,
                    ));
                }
                Some(Err(UnattendError::ProcessTimeout { millis })) => {
                    ran += 1;
                    warn!(%argument, millis, "probe timed out; child killed");
                    outcome
                        .attempts
                        .push(BruteForceAttempt::timed_out(argument.as_str(), elapsed_ms));
                    outcome.warnings.push(AnalysisWarning::new(
                        WarningKind::ProbeTimeout,
                        format!("{argument} did not exit within {millis}ms"),
                    ));
                }
                Some(Err(err)) => {
                    warn!(%argument, error = %err, "probe launch failed; skipping remaining probes");
                    outcome.warnings.push(AnalysisWarning::new(
                        WarningKind::ProbeLaunchFailed,
                        err.to_string(),
                    ));
                    break;
                }
            }

            if ran >= self.config.min_probes_before_stop
                && tally
                    .top()
                    .is_some_and(|c| c.probes >= self.config.early_stop_frequency)
            {
                debug!(phase = "probe", ran, "stopping early on a stable candidate");
                break;
            }
        }

        outcome.switch_set = tally.top().map(|top| {
            SwitchSet::new(
                vec![top.token],
                Vec::new(),
                SwitchSource::BruteForce,
                candidate_confidence(top.probes),
            )
        });
        outcome
    }
}

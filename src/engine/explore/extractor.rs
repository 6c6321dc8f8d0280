//! External archive extraction.

use crate::engine::config::ExtractionConfig;
use crate::engine::io::read_capped;
use crate::error::{Result, UnattendError};
use crate::timeout::{with_timeout, TimeoutConfig};
use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Tool diagnostics kept for the failure message.
const MAX_STDERR_BYTES: usize = 16 * 1024;

/// Unpacks `input` into the existing directory `output`.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    async fn extract(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Runs a command-line tool such as `7z x -y -o{output} {input}`.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone(), config.timeout())
    }

    /// Substitute `{input}` and `{output}` anywhere inside each argument.
    pub fn render_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

#[async_trait]
impl ArchiveExtractor for CommandExtractor {
    async fn extract(&self, input: &Path, output: &Path) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(self.render_args(input, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => UnattendError::ExternalToolMissing(self.program.clone()),
                _ => UnattendError::ExternalTool {
                    tool: self.program.clone(),
                    message: e.to_string(),
                },
            })?;

        let stderr = child.stderr.take();
        let config = TimeoutConfig::new(self.timeout, format!("extract with {}", self.program));
        let (status, stderr) = with_timeout(config, async {
            let captured = tokio::try_join!(child.wait(), read_capped(stderr, MAX_STDERR_BYTES))?;
            Ok::<_, UnattendError>(captured)
        })
        .await
        .map_err(|e| match e {
            UnattendError::ProcessTimeout { millis } => UnattendError::ExternalTool {
                tool: self.program.clone(),
                message: format!("timed out after {millis}ms"),
            },
            other => other,
        })?;

        if status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&stderr);
            Err(UnattendError::ExternalTool {
                tool: self.program.clone(),
                message: format!("{}: {}", status, stderr.trim()),
            })
        }
    }
}

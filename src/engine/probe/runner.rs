//! Child-process execution for diagnostic probes.

use super::whitelist::ProbeArgument;
use crate::engine::io::read_capped;
use crate::error::{Result, UnattendError};
use crate::timeout::{with_timeout, TimeoutConfig};
use async_trait::async_trait;
use encoding_rs::UTF_16LE;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Raw result of one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutput {
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr, decoded and truncated
    pub text: String,
}

/// Runs an installer with a single diagnostic argument.
///
/// Implementations must enforce `timeout` and must not leave the child
/// running when they return or are dropped.
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    async fn run(
        &self,
        program: &Path,
        argument: ProbeArgument,
        timeout: Duration,
        max_output_bytes: usize,
    ) -> Result<ProbeOutput>;
}

/// Spawns the real binary through tokio.
#[derive(Debug, Clone, Default)]
pub struct ProcessProbeRunner;

#[async_trait]
impl ProbeRunner for ProcessProbeRunner {
    async fn run(
        &self,
        program: &Path,
        argument: ProbeArgument,
        timeout: Duration,
        max_output_bytes: usize,
    ) -> Result<ProbeOutput> {
        let mut child = Command::new(program)
            .arg(argument.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| UnattendError::ProcessLaunch {
                program: program.to_path_buf(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let config = TimeoutConfig::new(timeout, format!("probe {argument}")).quiet();
        let (status, mut bytes, err_bytes) = with_timeout(config, async {
            let captured = tokio::try_join!(
                child.wait(),
                read_capped(stdout, max_output_bytes),
                read_capped(stderr, max_output_bytes),
            )?;
            Ok::<_, UnattendError>(captured)
        })
        .await?;

        bytes.extend_from_slice(&err_bytes);
        Ok(ProbeOutput {
            exit_code: status.code(),
            text: decode_output(&bytes, max_output_bytes),
        })
    }
}

/// Heuristic for UTF-16LE console output: most odd bytes are NUL.
fn looks_utf16le(bytes: &[u8]) -> bool {
    if bytes.len() < 4 {
        return false;
    }
    let sample = &bytes[..bytes.len().min(512)];
    let odd = sample.iter().skip(1).step_by(2).count();
    let odd_nul = sample.iter().skip(1).step_by(2).filter(|&&b| b == 0).count();
    odd_nul * 10 >= odd * 7
}

/// Decode captured output as UTF-8, or UTF-16LE when it looks wide.
pub fn decode_output(bytes: &[u8], max_bytes: usize) -> String {
    let bytes = &bytes[..bytes.len().min(max_bytes)];
    if looks_utf16le(bytes) {
        let (text, _, _) = UTF_16LE.decode(bytes);
        text.into_owned()
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

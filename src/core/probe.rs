//! Record of a single diagnostic probe.

use serde::{Deserialize, Serialize};

/// One diagnostic invocation of an installer. Append-only; never replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BruteForceAttempt {
    pub argument: String,
    pub exit_code: Option<i32>,
    pub captured_output: String,
    pub elapsed_ms: u64,
    pub timed_out: bool,
}

impl BruteForceAttempt {
    pub fn completed(
        argument: impl Into<String>,
        exit_code: Option<i32>,
        captured_output: String,
        elapsed_ms: u64,
    ) -> Self {
        Self {
            argument: argument.into(),
            exit_code,
            captured_output,
            elapsed_ms,
            timed_out: false,
        }
    }

    pub fn timed_out(argument: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            argument: argument.into(),
            exit_code: None,
            captured_output: String::new(),
            elapsed_ms,
            timed_out: true,
        }
    }
}

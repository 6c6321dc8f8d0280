//! Non-fatal conditions recorded during analysis.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    SilentDisabled,
    MetadataIncomplete,
    ProbeLaunchFailed,
    ProbeTimeout,
    ProbeSkipped,
    ExtractionToolMissing,
    ExtractionFailed,
    NestedCycle,
    NestedLimit,
    CommunityUnavailable,
    Cancelled,
    InvalidConfiguration,
}

impl WarningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningKind::SilentDisabled => "SilentDisabled",
            WarningKind::MetadataIncomplete => "MetadataIncomplete",
            WarningKind::ProbeLaunchFailed => "ProbeLaunchFailed",
            WarningKind::ProbeTimeout => "ProbeTimeout",
            WarningKind::ProbeSkipped => "ProbeSkipped",
            WarningKind::ExtractionToolMissing => "ExtractionToolMissing",
            WarningKind::ExtractionFailed => "ExtractionFailed",
            WarningKind::NestedCycle => "NestedCycle",
            WarningKind::NestedLimit => "NestedLimit",
            WarningKind::CommunityUnavailable => "CommunityUnavailable",
            WarningKind::Cancelled => "Cancelled",
            WarningKind::InvalidConfiguration => "InvalidConfiguration",
        }
    }
}

/// A recovered failure or notable condition, carried on the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl AnalysisWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

/// Ordered union of warnings, keeping the first occurrence of duplicates.
pub fn merge_warnings<I>(groups: I) -> Vec<AnalysisWarning>
where
    I: IntoIterator<Item = AnalysisWarning>,
{
    let mut out: Vec<AnalysisWarning> = Vec::new();
    for w in groups {
        if !out.contains(&w) {
            out.push(w);
        }
    }
    out
}

//! Installer analysis: identify the authoring framework of an installer,
//! read its product metadata and derive the switches for an unattended
//! install, without ever running a real installation.

/// Core data types module
pub mod core;
pub mod engine;
pub mod error;
pub mod formats;
pub mod hashing;
pub mod logging;
pub mod strings;
pub mod timeout;

pub use crate::core::{
    AnalysisResult, AnalysisWarning, Architecture, Framework, FlatRecord, InstallerFile,
    Metadata, SignatureMatch, SwitchSet, SwitchSource, WarningKind,
};
pub use crate::engine::{AnalysisConfig, Analyzer, CancelToken};
pub use crate::error::{Result, UnattendError};

//! Core data types shared by every analysis stage.

pub mod framework;
pub mod installer;
pub mod metadata;
pub mod nested;
pub mod probe;
pub mod result;
pub mod signature;
pub mod switches;
pub mod warnings;

pub use framework::Framework;
pub use installer::{ContainerShape, InstallerFile, InstallerImage};
pub use metadata::{Architecture, Metadata, PackageIdentifiers};
pub use nested::NestedCandidate;
pub use probe::BruteForceAttempt;
pub use result::{AnalysisResult, AnalysisResultBuilder, FlatRecord};
pub use signature::SignatureMatch;
pub use switches::{SwitchSet, SwitchSource, PRODUCT_CODE_PLACEHOLDER};
pub use warnings::{merge_warnings, AnalysisWarning, WarningKind};

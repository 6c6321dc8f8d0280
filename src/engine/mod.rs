//! The analysis engine: detection, metadata, switch resolution, probing,
//! nested exploration and scoring, orchestrated per file by `pipeline`.

pub mod api;
pub mod cancel;
pub mod community;
pub mod config;
pub mod detector;
pub mod explore;
pub mod io;
pub mod markers;
pub mod metadata;
pub mod pipeline;
pub mod probe;
pub mod rules;
pub mod score;
pub mod switches;

pub use api::{Analyzer, AnalyzerBuilder};
pub use cancel::CancelToken;
pub use community::{
    CachedCommunityDatabase, ChainedCommunityDatabase, CommunityDatabase, CommunityRecord,
    StaticCommunityDatabase,
};
#[cfg(feature = "community-http")]
pub use community::HttpCommunityDatabase;
pub use config::AnalysisConfig;
pub use detector::SignatureDetector;
pub use explore::{ArchiveExplorer, ArchiveExtractor, CommandExtractor};
pub use probe::{BruteForceProber, ProbeArgument, ProbeOutput, ProbeRunner, ProcessProbeRunner};
pub use score::ConfidenceAggregator;
pub use switches::SwitchResolver;

//! Diagpack Exporter - Builds shareable diagnostic bundles.
//!
//! An export collects the newest crash reports and the application logs,
//! records device and build facts in `info.json`, writes everything into a
//! single ZIP and mirrors it into a private cache for sharing.

pub mod collector;
pub mod config;
pub mod export;
pub mod host;
pub mod metadata;
pub mod notify;
pub mod permission;
pub mod share;
pub mod writer;

pub use collector::CollectedArtifacts;
pub use config::ExportConfig;
pub use export::{run_export, ExportOutcome, Exporter, OutcomeSink};
pub use host::{HostEnvironment, StaticHost};
pub use share::ShareableCopy;

//! Bundle schema definitions for diagpack.
//!
//! This crate defines the structure of diagnostic bundles: the artifacts
//! they carry, the info.json metadata record, and layout validation.

pub mod artifact;
pub mod metadata;
pub mod schema;
pub mod validation;

pub use artifact::{
    ArtifactKind, DiagnosticFile, EntryInfo, DEFAULT_MAX_TOMBSTONES, INFO_ENTRY, TOMBSTONE_PREFIX,
};
pub use metadata::{MetadataRecord, SettingsSnapshot, INFO_KEYS};
pub use validation::{validate_bundle, ValidationError, ValidationResult};

//! Diagnostic artifacts and their archive entry names.

use diagpack_common::Timestamp;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directory prefix for crash artifacts inside the archive.
pub const TOMBSTONE_PREFIX: &str = "tombstones/";

/// Entry name of the serialized metadata record.
pub const INFO_ENTRY: &str = "info.json";

/// Number of crash artifacts kept in a bundle by default.
pub const DEFAULT_MAX_TOMBSTONES: usize = 5;

/// Kind of diagnostic artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Native or managed crash report.
    Tombstone,
    /// Log file currently being written.
    CurrentLog,
    /// Rotated log file from the previous session.
    PreviousLog,
}

/// A read-only view over a host-owned diagnostic file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticFile {
    /// Location on disk.
    pub path: PathBuf,
    /// Last modification time.
    pub modified: Timestamp,
    /// Size in bytes at collection time.
    pub size_bytes: u64,
    /// What this file is.
    pub kind: ArtifactKind,
}

impl DiagnosticFile {
    /// Build a view from already-fetched metadata.
    pub fn from_metadata(
        path: impl Into<PathBuf>,
        metadata: &fs::Metadata,
        kind: ArtifactKind,
    ) -> io::Result<Self> {
        Ok(Self {
            path: path.into(),
            modified: Timestamp::from_system_time(metadata.modified()?),
            size_bytes: metadata.len(),
            kind,
        })
    }

    /// Look up a file at a fixed path.
    ///
    /// Returns `Ok(None)` when nothing exists there or the path is not a
    /// regular file.
    pub fn probe(path: &Path, kind: ArtifactKind) -> io::Result<Option<Self>> {
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => {
                Self::from_metadata(path, &metadata, kind).map(Some)
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Final path component, lossily converted to UTF-8.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Name of this file's entry inside the archive.
    pub fn entry_name(&self) -> String {
        match self.kind {
            ArtifactKind::Tombstone => format!("{}{}", TOMBSTONE_PREFIX, self.file_name()),
            ArtifactKind::CurrentLog | ArtifactKind::PreviousLog => self.file_name(),
        }
    }
}

/// An entry read back from a finished archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    pub name: String,
    pub size_bytes: u64,
}

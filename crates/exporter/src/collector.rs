//! Diagnostic artifact collector.

use diagpack_bundle_schema::{ArtifactKind, DiagnosticFile};
use diagpack_common::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// Artifacts selected for one bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedArtifacts {
    /// Crash reports, most recent first.
    pub tombstones: Vec<DiagnosticFile>,
    pub current_log: Option<DiagnosticFile>,
    pub previous_log: Option<DiagnosticFile>,
}

impl CollectedArtifacts {
    /// All artifacts in archive order: tombstones, current log, previous log.
    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticFile> {
        self.tombstones
            .iter()
            .chain(self.current_log.iter())
            .chain(self.previous_log.iter())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total size of all artifacts in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.iter().map(|f| f.size_bytes).sum()
    }
}

/// Collect the newest crash reports and the log files.
///
/// Never fails: an unreadable tombstone directory is logged and treated as
/// empty, and absent or unreadable logs are skipped.
pub fn collect(
    tombstone_dir: &Path,
    current_log: Option<&Path>,
    previous_log: Option<&Path>,
    max_tombstones: usize,
) -> CollectedArtifacts {
    let tombstones = match list_tombstones(tombstone_dir) {
        Ok(mut files) => {
            // Stable sort: equal timestamps keep directory enumeration order.
            files.sort_by(|a, b| b.modified.cmp(&a.modified));
            files.truncate(max_tombstones);
            files
        }
        Err(e) => {
            warn!("Ignoring tombstones: {}", e);
            Vec::new()
        }
    };

    let artifacts = CollectedArtifacts {
        tombstones,
        current_log: current_log.and_then(|p| probe_log(p, ArtifactKind::CurrentLog)),
        previous_log: previous_log.and_then(|p| probe_log(p, ArtifactKind::PreviousLog)),
    };

    info!(
        "Collected {} tombstones, current log: {}, previous log: {}",
        artifacts.tombstones.len(),
        artifacts.current_log.is_some(),
        artifacts.previous_log.is_some()
    );

    artifacts
}

/// List regular files in the tombstone directory, in enumeration order.
fn list_tombstones(dir: &Path) -> Result<Vec<DiagnosticFile>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No tombstone directory at {:?}", dir);
            return Ok(Vec::new());
        }
        Err(e) => return Err(Error::Collection(format!("reading {:?}: {}", dir, e))),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                continue;
            }
        };

        let path = entry.path();
        match DiagnosticFile::probe(&path, ArtifactKind::Tombstone) {
            Ok(Some(file)) => files.push(file),
            Ok(None) => debug!("Skipping non-file {:?}", path),
            Err(e) => warn!("Skipping {:?}: {}", path, e),
        }
    }

    Ok(files)
}

fn probe_log(path: &Path, kind: ArtifactKind) -> Option<DiagnosticFile> {
    match DiagnosticFile::probe(path, kind) {
        Ok(file) => file,
        Err(e) => {
            warn!("Skipping log {:?}: {}", path, e);
            None
        }
    }
}

//! Media index notification for freshly written bundles.

use diagpack_common::{Error, Result};
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Announces new files to the host's media/index service.
pub trait MediaIndexer: Send + Sync {
    fn notify(&self, path: &Path) -> Result<()>;
}

/// Indexer for hosts without a media index.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopIndexer;

impl MediaIndexer for NoopIndexer {
    fn notify(&self, path: &Path) -> Result<()> {
        debug!("No media index configured, skipping {:?}", path);
        Ok(())
    }
}

/// Indexer that runs an external program with the new file's path appended.
#[derive(Debug, Clone)]
pub struct CommandIndexer {
    program: String,
    args: Vec<String>,
}

impl CommandIndexer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a `[program, args...]` list.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

impl MediaIndexer for CommandIndexer {
    fn notify(&self, path: &Path) -> Result<()> {
        debug!("Indexing {:?} with {}", path, self.program);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| Error::IndexNotify(format!("running {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::IndexNotify(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Notify the index, logging and absorbing any failure.
///
/// Returns whether the notification went through.
pub fn notify_best_effort(indexer: &dyn MediaIndexer, path: &Path) -> bool {
    match indexer.notify(path) {
        Ok(()) => true,
        Err(e) => {
            warn!("Media index not updated for {:?}: {}", path, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_indexer() {
        assert!(notify_best_effort(&NoopIndexer, Path::new("/tmp/logs.zip")));
    }

    #[test]
    fn test_command_indexer_success() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("indexed");
        let indexer = CommandIndexer::new("touch", vec![]);

        assert!(notify_best_effort(&indexer, &marker));
        assert!(marker.exists());
    }

    #[test]
    fn test_command_indexer_failure_is_absorbed() {
        let indexer = CommandIndexer::new("false", vec![]);
        assert!(matches!(
            indexer.notify(Path::new("/tmp/logs.zip")),
            Err(Error::IndexNotify(_))
        ));
        assert!(!notify_best_effort(&indexer, Path::new("/tmp/logs.zip")));

        let missing = CommandIndexer::new("/nonexistent/media-scanner", vec![]);
        assert!(!notify_best_effort(&missing, Path::new("/tmp/logs.zip")));
    }

    #[test]
    fn test_from_command() {
        assert!(CommandIndexer::from_command(&[]).is_none());
        let indexer =
            CommandIndexer::from_command(&["scan".to_string(), "--quiet".to_string()]).unwrap();
        assert_eq!(indexer.program, "scan");
        assert_eq!(indexer.args, vec!["--quiet"]);
    }
}

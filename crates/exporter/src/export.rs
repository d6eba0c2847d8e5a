//! The export operation: permission gate, background bundle build and
//! outcome reporting, guarded so that only one export runs at a time.

use crate::collector;
use crate::config::ExportConfig;
use crate::host::HostEnvironment;
use crate::metadata::build_metadata;
use crate::notify::{CommandIndexer, MediaIndexer, NoopIndexer};
use crate::permission::{self, FixedGate, NotRequired, StoragePermissionGate};
use crate::share::ShareableCopy;
use crate::writer::BundleWriter;
use diagpack_bundle_schema::SettingsSnapshot;
use diagpack_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// Result of one export invocation. Exactly one is produced per trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// Bundle written to `output`; `share` is ready for a share action.
    Saved {
        output: PathBuf,
        share: ShareableCopy,
    },
    /// Collecting metadata or writing the bundle failed.
    Failed { reason: String },
    /// Storage permission was refused; nothing was written.
    PermissionDenied,
    /// Another export was still running; nothing was written.
    Busy,
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Saved { .. })
    }

    /// Localization key of the user-facing message.
    pub fn message_key(&self) -> &'static str {
        match self {
            ExportOutcome::Saved { .. } => "save_log_success",
            ExportOutcome::Failed { .. } => "save_log_failed",
            ExportOutcome::PermissionDenied => "write_storage_failed",
            ExportOutcome::Busy => "save_log_in_progress",
        }
    }

    /// Default (English) user-facing message.
    pub fn message(&self) -> String {
        match self {
            ExportOutcome::Saved { output, .. } => {
                format!("Logs saved to {}", output.display())
            }
            ExportOutcome::Failed { .. } => "Failed to save logs".to_string(),
            ExportOutcome::PermissionDenied => {
                "Storage permission is required to save logs".to_string()
            }
            ExportOutcome::Busy => "Logs are already being saved".to_string(),
        }
    }
}

impl ExportOutcome {
    /// Map an export result onto the outcome shown to the user.
    pub fn from_result(output: &Path, result: Result<ShareableCopy>) -> Self {
        match result {
            Ok(share) => ExportOutcome::Saved {
                output: output.to_path_buf(),
                share,
            },
            Err(Error::ExportInProgress) => ExportOutcome::Busy,
            Err(Error::PermissionDenied) => ExportOutcome::PermissionDenied,
            Err(e) => ExportOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// Presents export outcomes to the user.
pub trait OutcomeSink: Send + Sync {
    fn present(&self, outcome: &ExportOutcome);
}

/// Holds the single-flight latch; releases it on drop.
struct FlightGuard(Arc<AtomicBool>);

impl FlightGuard {
    fn try_acquire(latch: &Arc<AtomicBool>) -> Option<Self> {
        latch
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard(Arc::clone(latch)))
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs diagnostic exports.
pub struct Exporter {
    config: ExportConfig,
    host: Arc<dyn HostEnvironment>,
    gate: Arc<dyn StoragePermissionGate>,
    indexer: Arc<dyn MediaIndexer>,
    in_flight: Arc<AtomicBool>,
}

impl Exporter {
    /// Create an exporter. The permission gate and media indexer follow the
    /// configuration until overridden; a required permission is refused
    /// until an interactive gate is supplied.
    pub fn new(config: ExportConfig, host: Arc<dyn HostEnvironment>) -> Self {
        let gate: Arc<dyn StoragePermissionGate> = if config.permission_required {
            Arc::new(FixedGate::new(true, false))
        } else {
            Arc::new(NotRequired)
        };

        let indexer: Arc<dyn MediaIndexer> = match config
            .media_index
            .as_ref()
            .and_then(|index| CommandIndexer::from_command(&index.command))
        {
            Some(indexer) => Arc::new(indexer),
            None => Arc::new(NoopIndexer),
        };

        Self {
            config,
            host,
            gate,
            indexer,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_permission_gate(mut self, gate: Arc<dyn StoragePermissionGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn MediaIndexer>) -> Self {
        self.indexer = indexer;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Whether an export is currently running.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one export.
    ///
    /// The bundle is built on a blocking worker; this future only waits for
    /// it. Dropping the future does not stop a started build, and the latch
    /// stays held until the build ends.
    pub async fn export(&self, settings: SettingsSnapshot) -> ExportOutcome {
        let span = info_span!("export", id = %Uuid::new_v4());
        self.export_inner(settings).instrument(span).await
    }

    /// Run one export and hand the outcome to `sink`.
    pub async fn export_and_present(
        &self,
        settings: SettingsSnapshot,
        sink: &dyn OutcomeSink,
    ) -> ExportOutcome {
        let outcome = self.export(settings).await;
        sink.present(&outcome);
        outcome
    }

    async fn export_inner(&self, settings: SettingsSnapshot) -> ExportOutcome {
        let result = self.try_export(settings).await;
        match &result {
            Ok(_) => info!("Export complete: {:?}", self.config.output),
            Err(Error::ExportInProgress) => {
                warn!("Export requested while another export is running")
            }
            Err(Error::PermissionDenied) => warn!("Storage permission denied"),
            Err(e) => error!("Export failed: {}", e),
        }
        ExportOutcome::from_result(&self.config.output, result)
    }

    async fn try_export(&self, settings: SettingsSnapshot) -> Result<ShareableCopy> {
        let guard = FlightGuard::try_acquire(&self.in_flight).ok_or(Error::ExportInProgress)?;

        if !permission::acquire(self.gate.as_ref()).await {
            return Err(Error::PermissionDenied);
        }

        let config = self.config.clone();
        let host = Arc::clone(&self.host);
        let indexer = Arc::clone(&self.indexer);
        let span = Span::current();

        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            span.in_scope(|| run_export(&config, host.as_ref(), indexer.as_ref(), &settings))
        })
        .await
        .map_err(|e| Error::Other(format!("export task did not complete: {}", e)))?
    }
}

/// Collect, build metadata and write the bundle on the current thread.
pub fn run_export(
    config: &ExportConfig,
    host: &dyn HostEnvironment,
    indexer: &dyn MediaIndexer,
    settings: &SettingsSnapshot,
) -> Result<ShareableCopy> {
    let artifacts = collector::collect(
        &config.artifacts.tombstone_dir,
        config.artifacts.current_log.as_deref(),
        config.artifacts.previous_log.as_deref(),
        config.max_tombstones,
    );
    let metadata = build_metadata(host, settings)?;

    BundleWriter::new(indexer, config.share_dir()).write(&config.output, &artifacts, &metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArtifactPaths;
    use crate::metadata::tests::{sample_facts, sample_host};
    use crate::writer::read_bundle;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn config_in(root: &Path) -> ExportConfig {
        ExportConfig {
            artifacts: ArtifactPaths {
                tombstone_dir: root.join("files/tombstones"),
                current_log: Some(root.join("files/log.txt")),
                previous_log: Some(root.join("files/old_log.txt")),
            },
            output: root.join("public/Download/diagpack/logs.zip"),
            cache_dir: root.join("cache"),
            share_subdir: "boxing".to_string(),
            max_tombstones: 5,
            permission_required: false,
            media_index: None,
            host: sample_facts(None),
        }
    }

    fn settings() -> SettingsSnapshot {
        let mut settings = SettingsSnapshot::new();
        settings.insert("a", "1");
        settings
    }

    fn exporter(config: ExportConfig) -> Exporter {
        Exporter::new(config, Arc::new(sample_host()))
    }

    /// Blocks the permission request until released.
    #[derive(Default)]
    struct HeldGate {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl StoragePermissionGate for HeldGate {
        fn is_required(&self) -> bool {
            true
        }

        async fn request(&self) -> bool {
            self.entered.notify_one();
            self.release.notified().await;
            true
        }
    }

    #[derive(Default)]
    struct RecordingIndexer {
        seen: Mutex<Vec<PathBuf>>,
    }

    impl MediaIndexer for RecordingIndexer {
        fn notify(&self, path: &Path) -> Result<()> {
            self.seen.lock().unwrap().push(path.to_path_buf());
            Err(Error::IndexNotify("media scanner unavailable".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        keys: Mutex<Vec<&'static str>>,
    }

    impl OutcomeSink for RecordingSink {
        fn present(&self, outcome: &ExportOutcome) {
            self.keys.lock().unwrap().push(outcome.message_key());
        }
    }

    #[tokio::test]
    async fn test_export_saves_and_shares() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let output = config.output.clone();

        let (saved, share) = match exporter(config).export(settings()).await {
            ExportOutcome::Saved { output, share } => (output, share),
            other => panic!("unexpected outcome: {:?}", other),
        };

        assert_eq!(saved, output);
        assert_eq!(share.path, dir.path().join("cache/boxing/logs.zip"));
        assert_eq!(
            share.content_locator("tv.danmaku.bili"),
            "content://tv.danmaku.bili.fileprovider/internal/logs.zip"
        );

        let contents = read_bundle(&output).unwrap();
        assert_eq!(contents.entry_names(), vec!["info.json"]);
        assert_eq!(
            serde_json::Value::Object(contents.metadata().unwrap().module_settings),
            serde_json::json!({ "a": "1" })
        );
    }

    #[tokio::test]
    async fn test_index_failure_does_not_fail_export() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let output = config.output.clone();
        let indexer = Arc::new(RecordingIndexer::default());

        let outcome = exporter(config)
            .with_indexer(indexer.clone())
            .export(settings())
            .await;

        assert!(outcome.is_success(), "{:?}", outcome);
        assert_eq!(*indexer.seen.lock().unwrap(), vec![output]);
    }

    #[tokio::test]
    async fn test_permission_denied_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.permission_required = true;
        let output = config.output.clone();

        let outcome = exporter(config).export(settings()).await;

        assert_eq!(outcome, ExportOutcome::PermissionDenied);
        assert_eq!(outcome.message_key(), "write_storage_failed");
        assert!(!output.parent().unwrap().exists());
        assert!(!dir.path().join("cache").exists());
    }

    #[tokio::test]
    async fn test_granted_permission_proceeds() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = exporter(config_in(dir.path()))
            .with_permission_gate(Arc::new(FixedGate::new(true, true)))
            .export(settings())
            .await;
        assert!(outcome.is_success(), "{:?}", outcome);
    }

    #[tokio::test]
    async fn test_concurrent_trigger_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(HeldGate::default());
        let exporter = Arc::new(exporter(config_in(dir.path())).with_permission_gate(gate.clone()));

        let first = {
            let exporter = Arc::clone(&exporter);
            tokio::spawn(async move { exporter.export(settings()).await })
        };

        gate.entered.notified().await;
        assert!(exporter.is_running());
        assert_eq!(exporter.export(settings()).await, ExportOutcome::Busy);

        gate.release.notify_one();
        let outcome = first.await.unwrap();
        assert!(outcome.is_success(), "{:?}", outcome);
        assert!(!exporter.is_running());

        // The latch is free again once the first export is done.
        gate.release.notify_one();
        let again = exporter.export(settings()).await;
        assert!(again.is_success(), "{:?}", again);
    }

    #[tokio::test]
    async fn test_write_failure_reports_failure_without_share_copy() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        std::fs::create_dir_all(dir.path().join("public/Download")).unwrap();
        // A file where the output directory should be.
        std::fs::write(dir.path().join("public/Download/diagpack"), b"blocker").unwrap();

        let sink = RecordingSink::default();
        let outcome = exporter(config).export_and_present(settings(), &sink).await;

        assert!(matches!(outcome, ExportOutcome::Failed { .. }));
        assert_eq!(outcome.message(), "Failed to save logs");
        assert_eq!(*sink.keys.lock().unwrap(), vec!["save_log_failed"]);
        assert!(!dir.path().join("cache/boxing/logs.zip").exists());
    }

    #[tokio::test]
    async fn test_output_in_share_dir_is_not_reported_saved() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.output = config.share_dir().join("logs.zip");
        let output = config.output.clone();

        let outcome = exporter(config).export(settings()).await;

        assert!(matches!(outcome, ExportOutcome::Failed { .. }), "{:?}", outcome);
        // The bundle itself survives the refused copy.
        assert_eq!(read_bundle(&output).unwrap().entry_names(), vec!["info.json"]);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_both_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let tombstones = config.artifacts.tombstone_dir.clone();
        let exporter = exporter(config);

        assert!(exporter.export(settings()).await.is_success());

        std::fs::create_dir_all(&tombstones).unwrap();
        std::fs::write(tombstones.join("tombstone_00"), b"signal 6").unwrap();
        let (output, share) = match exporter.export(settings()).await {
            ExportOutcome::Saved { output, share } => (output, share),
            other => panic!("unexpected outcome: {:?}", other),
        };

        let names = read_bundle(&output).unwrap().entry_names();
        assert_eq!(names, vec!["tombstones/tombstone_00", "info.json"]);
        assert_eq!(std::fs::read(&share.path).unwrap(), std::fs::read(&output).unwrap());

        let shared: Vec<_> = std::fs::read_dir(dir.path().join("cache/boxing"))
            .unwrap()
            .collect();
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn test_outcome_from_result() {
        let output = Path::new("/sdcard/Download/logs.zip");
        assert_eq!(
            ExportOutcome::from_result(output, Err(Error::ExportInProgress)),
            ExportOutcome::Busy
        );
        assert_eq!(
            ExportOutcome::from_result(output, Err(Error::PermissionDenied)),
            ExportOutcome::PermissionDenied
        );
        assert_eq!(
            ExportOutcome::from_result(output, Err(Error::archive("finalizing archive", "disk full"))),
            ExportOutcome::Failed {
                reason: "Archive write failed: finalizing archive - disk full".to_string()
            }
        );
    }

    #[test]
    fn test_outcome_messages() {
        let saved = ExportOutcome::Saved {
            output: PathBuf::from("/sdcard/Download/logs.zip"),
            share: ShareableCopy {
                path: PathBuf::from("/data/cache/boxing/logs.zip"),
                size_bytes: 0,
                sha256: String::new(),
            },
        };
        assert_eq!(saved.message_key(), "save_log_success");
        assert_eq!(saved.message(), "Logs saved to /sdcard/Download/logs.zip");
        assert_eq!(ExportOutcome::Busy.message_key(), "save_log_in_progress");
    }
}

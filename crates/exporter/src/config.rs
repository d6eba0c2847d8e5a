//! Exporter configuration.

use crate::host::HostFacts;
use anyhow::{Context, Result};
use diagpack_bundle_schema::DEFAULT_MAX_TOMBSTONES;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Locations of the diagnostic files owned by the host's logging setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    /// Directory holding crash reports.
    pub tombstone_dir: PathBuf,
    /// Log file currently being written.
    #[serde(default)]
    pub current_log: Option<PathBuf>,
    /// Rotated log file from the previous run.
    #[serde(default)]
    pub previous_log: Option<PathBuf>,
}

/// External command used to announce a new bundle to a media index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaIndexConfig {
    /// Program followed by its arguments; the bundle path is appended.
    pub command: Vec<String>,
}

/// Exporter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub artifacts: ArtifactPaths,
    /// Public, shareable output file. Overwritten on every export.
    pub output: PathBuf,
    /// App-private cache root.
    pub cache_dir: PathBuf,
    /// Subdirectory of `cache_dir` holding the copy handed to share actions.
    #[serde(default = "default_share_subdir")]
    pub share_subdir: String,
    #[serde(default = "default_max_tombstones")]
    pub max_tombstones: usize,
    /// Whether writing the output needs an explicit storage grant.
    #[serde(default)]
    pub permission_required: bool,
    #[serde(default)]
    pub media_index: Option<MediaIndexConfig>,
    pub host: HostFacts,
}

fn default_share_subdir() -> String {
    "boxing".to_string()
}

fn default_max_tombstones() -> usize {
    DEFAULT_MAX_TOMBSTONES
}

impl ExportConfig {
    /// Load configuration from a YAML or JSON file (chosen by extension).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let config: ExportConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config {:?}", path))?,
            _ => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config {:?}", path))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let subdir = Path::new(&self.share_subdir);
        let plain = subdir
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if self.share_subdir.is_empty() || !plain {
            anyhow::bail!(
                "share_subdir must be a relative path inside the cache dir, got {:?}",
                self.share_subdir
            );
        }

        if self.output.file_name().is_none() {
            anyhow::bail!("output must name a file, got {:?}", self.output);
        }

        if self.output.parent() == Some(self.share_dir().as_path()) {
            anyhow::bail!(
                "output {:?} must not be inside the share dir {:?}",
                self.output,
                self.share_dir()
            );
        }

        if let Some(ref index) = self.media_index {
            if index.command.is_empty() {
                anyhow::bail!("media_index.command must name a program");
            }
        }

        Ok(())
    }

    /// Directory the shareable copy is placed in.
    pub fn share_dir(&self) -> PathBuf {
        self.cache_dir.join(&self.share_subdir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
artifacts:
  tombstone_dir: /data/files/tombstones
  current_log: /data/files/log.txt
output: /sdcard/Download/diagpack/logs.zip
cache_dir: /data/cache
host:
  device:
    os_release: "14"
    api_level: 34
    manufacturer: Google
    model: Pixel 8
    supported_abis: [arm64-v8a]
    supported_64bit_abis: [arm64-v8a]
  package:
    app_id: tv.danmaku.bili
    version_name: 7.60.0
    version_code: 7600300
"#;

    #[test]
    fn test_load_yaml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagpack.yaml");
        std::fs::write(&path, YAML).unwrap();

        let config = ExportConfig::load(&path).unwrap();
        assert_eq!(config.max_tombstones, 5);
        assert_eq!(config.share_subdir, "boxing");
        assert!(!config.permission_required);
        assert!(config.artifacts.previous_log.is_none());
        assert_eq!(config.share_dir(), PathBuf::from("/data/cache/boxing"));
    }

    #[test]
    fn test_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diagpack.json");
        let value: serde_json::Value = serde_yaml::from_str(YAML).unwrap();
        std::fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        let config = ExportConfig::load(&path).unwrap();
        assert_eq!(config.host.package.app_id, "tv.danmaku.bili");
    }

    #[test]
    fn test_rejects_escaping_share_subdir() {
        let mut config: ExportConfig = serde_yaml::from_str(YAML).unwrap();
        config.share_subdir = "../public".to_string();
        assert!(config.validate().is_err());

        config.share_subdir = String::new();
        assert!(config.validate().is_err());

        config.share_subdir = "boxing/logs".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_output_in_share_dir() {
        let mut config: ExportConfig = serde_yaml::from_str(YAML).unwrap();
        config.output = PathBuf::from("/data/cache/boxing/logs.zip");
        assert!(config.validate().is_err());

        config.output = PathBuf::from("/data/cache/logs.zip");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_media_index_command() {
        let mut config: ExportConfig = serde_yaml::from_str(YAML).unwrap();
        config.media_index = Some(MediaIndexConfig { command: vec![] });
        assert!(config.validate().is_err());
    }
}

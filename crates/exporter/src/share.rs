//! Shareable copy of a finished bundle.

use diagpack_common::{hash, ArchiveContext, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// MIME type attached to share actions.
pub const SHARE_MIME_TYPE: &str = "application/zip";

/// Copy of the bundle in the app-private cache, handed to share actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareableCopy {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// SHA256 of the archive.
    pub sha256: String,
}

impl ShareableCopy {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Content-provider style locator for the copy, served by the
    /// application's file provider.
    pub fn content_locator(&self, app_id: &str) -> String {
        format!(
            "content://{}.fileprovider/internal/{}",
            app_id,
            self.file_name()
        )
    }

    pub fn mime_type(&self) -> &'static str {
        SHARE_MIME_TYPE
    }
}

/// Copy a finished bundle into `share_dir`, replacing any earlier copy.
pub fn mirror_to_cache(bundle: &Path, share_dir: &Path) -> Result<ShareableCopy> {
    let name = bundle
        .file_name()
        .ok_or_else(|| Error::Config(format!("bundle path {:?} has no file name", bundle)))?;
    let target = share_dir.join(name);

    fs::create_dir_all(share_dir).archive_context(format!("creating {:?}", share_dir))?;
    if same_file(bundle, &target) {
        return Err(Error::archive(
            format!("copying bundle to {:?}", target),
            "source and destination are the same file",
        ));
    }
    let size_bytes = fs::copy(bundle, &target)
        .archive_context(format!("copying bundle to {:?}", target))?;
    let sha256 =
        hash::sha256_file(&target).archive_context(format!("hashing {:?}", target))?;

    info!("Shareable copy at {:?} ({} bytes)", target, size_bytes);

    Ok(ShareableCopy {
        path: target,
        size_bytes,
        sha256,
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

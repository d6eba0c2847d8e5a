//! Bundle reading and writing utilities.

use crate::collector::CollectedArtifacts;
use crate::notify::{self, MediaIndexer};
use crate::share::{self, ShareableCopy};
use diagpack_bundle_schema::{
    validation, DiagnosticFile, EntryInfo, MetadataRecord, INFO_ENTRY,
};
use diagpack_common::{ArchiveContext, Error, Result, Timestamp};
use std::fs::{self, File};
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::write::{FileOptions, FullFileOptions, SimpleFileOptions};
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Writes bundles to the public output path and publishes them.
pub struct BundleWriter<'a> {
    indexer: &'a dyn MediaIndexer,
    share_dir: PathBuf,
}

impl<'a> BundleWriter<'a> {
    pub fn new(indexer: &'a dyn MediaIndexer, share_dir: impl Into<PathBuf>) -> Self {
        Self {
            indexer,
            share_dir: share_dir.into(),
        }
    }

    /// Write the bundle to `dest`, announce it to the media index and mirror
    /// it into the share directory.
    ///
    /// Index notification failures are absorbed; everything else fails the
    /// whole write.
    pub fn write(
        &self,
        dest: &Path,
        artifacts: &CollectedArtifacts,
        metadata: &MetadataRecord,
    ) -> Result<ShareableCopy> {
        write_bundle(dest, artifacts, metadata)?;
        notify::notify_best_effort(self.indexer, dest);
        share::mirror_to_cache(dest, &self.share_dir)
    }
}

/// Write a bundle to a ZIP file, replacing any existing file at `dest`.
///
/// Returns the size of the finished archive. On error, a partially written
/// file may remain at `dest`.
pub fn write_bundle(
    dest: &Path,
    artifacts: &CollectedArtifacts,
    metadata: &MetadataRecord,
) -> Result<u64> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).archive_context(format!("creating {:?}", parent))?;
    }
    remove_existing(dest)?;

    let file = File::create(dest).archive_context(format!("creating {:?}", dest))?;
    let file = write_archive(file, artifacts, metadata)?;
    file.sync_all()
        .archive_context(format!("flushing {:?}", dest))?;

    let size = file
        .metadata()
        .archive_context(format!("reading size of {:?}", dest))?
        .len();
    info!("Bundle written to {:?} ({} bytes)", dest, size);

    Ok(size)
}

fn remove_existing(dest: &Path) -> Result<()> {
    match fs::remove_file(dest) {
        Ok(()) => {
            debug!("Removed previous bundle at {:?}", dest);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::archive(format!("removing {:?}", dest), e)),
    }
}

/// Stream the artifacts and the metadata record into a ZIP archive.
///
/// Entries are written in order: tombstones, current log, previous log,
/// `info.json`. Returns the underlying writer once the central directory is
/// written.
pub fn write_archive<W: Write + Seek>(
    sink: W,
    artifacts: &CollectedArtifacts,
    metadata: &MetadataRecord,
) -> Result<W> {
    let mut zip = ZipWriter::new(sink);

    for file in artifacts.iter() {
        add_file(&mut zip, file)?;
    }

    let info = metadata
        .to_pretty_json()
        .archive_context("serializing info.json")?;
    zip.start_file(INFO_ENTRY, entry_options())
        .archive_context(format!("adding {}", INFO_ENTRY))?;
    zip.write_all(info.as_bytes())
        .archive_context(format!("writing {}", INFO_ENTRY))?;

    zip.finish().archive_context("finalizing archive")
}

/// Header id of the extended timestamp extra field.
const EXTENDED_TIMESTAMP_ID: u16 = 0x5455;

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Options for an artifact entry: its mtime goes into the DOS fields and,
/// as UTC seconds, into an extended timestamp field.
fn artifact_options(file: &DiagnosticFile) -> Result<FullFileOptions<'static>> {
    let mut options: FullFileOptions<'static> = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(file.size_bytes >= u64::from(u32::MAX));
    if let Some(time) = entry_time(&file.modified) {
        options = options.last_modified_time(time);
    }
    if let Some(field) = extended_timestamp(&file.modified) {
        options
            .add_extra_data(EXTENDED_TIMESTAMP_ID, field, false)
            .archive_context(format!("timestamping {}", file.entry_name()))?;
    }
    Ok(options)
}

fn add_file<W: Write + Seek>(zip: &mut ZipWriter<W>, file: &DiagnosticFile) -> Result<()> {
    let name = file.entry_name();
    let options = artifact_options(file)?;

    debug!("Adding {} from {:?}", name, file.path);
    let mut source =
        File::open(&file.path).archive_context(format!("opening {:?}", file.path))?;
    zip.start_file(name.as_str(), options)
        .archive_context(format!("adding {}", name))?;
    io::copy(&mut source, zip).archive_context(format!("writing {}", name))?;

    Ok(())
}

/// ZIP timestamp for a modification time; `None` outside the DOS range.
fn entry_time(modified: &Timestamp) -> Option<zip::DateTime> {
    let f = modified.calendar_fields()?;
    zip::DateTime::from_date_and_time(f.year, f.month, f.day, f.hour, f.minute, f.second).ok()
}

/// Extended timestamp payload carrying only the modification time.
fn extended_timestamp(modified: &Timestamp) -> Option<Box<[u8]>> {
    let secs = u32::try_from(modified.unix_seconds()).ok()?;
    let mut field = Vec::with_capacity(5);
    field.push(0x01);
    field.extend_from_slice(&secs.to_le_bytes());
    Some(field.into_boxed_slice())
}

/// Entry listing and metadata read back from a bundle.
#[derive(Debug, Clone)]
pub struct BundleContents {
    /// Entries in archive order.
    pub entries: Vec<EntryInfo>,
    /// Raw `info.json` bytes, when present.
    pub info_json: Option<Vec<u8>>,
}

impl BundleContents {
    pub fn entry_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    /// Parse `info.json` into a metadata record.
    pub fn metadata(&self) -> Result<MetadataRecord> {
        let bytes = self
            .info_json
            .as_deref()
            .ok_or_else(|| Error::InvalidBundle(format!("missing {}", INFO_ENTRY)))?;
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Read a bundle's entry list and `info.json`.
pub fn read_bundle(path: &Path) -> Result<BundleContents> {
    let file = File::open(path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| Error::InvalidBundle(format!("{:?}: {}", path, e)))?;

    let mut entries = Vec::with_capacity(archive.len());
    let mut info_json = None;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::InvalidBundle(format!("entry {}: {}", i, e)))?;
        let name = entry.name().to_string();

        if name == INFO_ENTRY {
            let mut content = Vec::new();
            entry.read_to_end(&mut content)?;
            info_json = Some(content);
        }

        entries.push(EntryInfo {
            name,
            size_bytes: entry.size(),
        });
    }

    Ok(BundleContents { entries, info_json })
}

/// Validate a bundle file.
pub fn validate_bundle_file(
    path: &Path,
    max_tombstones: usize,
) -> Result<validation::ValidationResult> {
    let contents = read_bundle(path)?;
    validation::validate_bundle(
        &contents.entry_names(),
        contents.info_json.as_deref(),
        max_tombstones,
    )
    .map_err(|e| Error::SchemaValidation(e.to_string()))
}

/// Archival of stale files into per-category zip containers.
///
/// Each category folder gets one container next to it,
/// `<folder>_Archive.zip`, which is appended to on every run and never
/// deleted. Entries are stored as `<folder>/<file name>`.
use crate::config::CompiledConfig;
use crate::error::{ArchiveError, OrganizeResult};
use crate::file_organizer::validate_base_path;
use chrono::{DateTime, Datelike, Local, Timelike};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A file that now lives only inside an archive container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedFile {
    /// Where the file was before it was archived.
    pub source: PathBuf,
    pub container: PathBuf,
    /// Path of the entry inside the container.
    pub entry_name: String,
}

/// Outcome of one archival pass.
#[derive(Debug, Default)]
pub struct ArchiveReport {
    /// False when archival is switched off in configuration.
    pub enabled: bool,
    pub archived: Vec<ArchivedFile>,
    pub failures: Vec<ArchiveError>,
}

/// Moves stale files out of category folders and into archive containers.
pub struct ArchiveManager;

impl ArchiveManager {
    /// Archives every file older than the configured threshold.
    ///
    /// Does nothing when archival is disabled. For each category folder that
    /// exists, stale files are appended to the category's container and the
    /// originals removed once the container has been written successfully.
    /// A problem with one file or one container is logged and recorded in
    /// the report; the original stays where it is.
    pub fn archive_stale(
        base_path: &Path,
        config: &CompiledConfig,
    ) -> OrganizeResult<ArchiveReport> {
        if !config.archive.enabled {
            debug!("Archival disabled, skipping");
            return Ok(ArchiveReport::default());
        }
        validate_base_path(base_path)?;

        let threshold = config.archive.threshold();
        let now = SystemTime::now();
        let mut report = ArchiveReport {
            enabled: true,
            ..Default::default()
        };

        for category in config.mapper.categories() {
            let folder_name = config.mapper.folder_name(&category);
            let category_path = base_path.join(folder_name);
            if !category_path.is_dir() {
                continue;
            }

            let stale = match stale_files(&category_path, threshold, now) {
                Ok(stale) => stale,
                Err(e) => {
                    error!("Failed to scan {}: {}", category_path.display(), e);
                    report.failures.push(ArchiveError::ScanFailed {
                        path: category_path,
                        source: e,
                    });
                    continue;
                }
            };
            if stale.is_empty() {
                continue;
            }

            let container_path = base_path.join(config.mapper.archive_container_name(&category));
            archive_into(&container_path, folder_name, stale, &mut report);
        }

        if !report.archived.is_empty() {
            info!("Archived {} files.", report.archived.len());
        }
        Ok(report)
    }
}

/// Files directly inside `folder` whose age exceeds `threshold`.
fn stale_files(folder: &Path, threshold: Duration, now: SystemTime) -> io::Result<Vec<PathBuf>> {
    let mut stale = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                error!("Failed to read an entry of {}: {}", folder.display(), e);
                continue;
            }
        };
        let Ok(metadata) = fs::metadata(&path) else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > threshold) {
            stale.push(path);
        }
    }
    Ok(stale)
}

/// Appends `files` to one container and removes the originals once the
/// container is finalized.
fn archive_into(
    container_path: &Path,
    folder_name: &str,
    files: Vec<PathBuf>,
    report: &mut ArchiveReport,
) {
    let mut container = match ArchiveContainer::open(container_path) {
        Ok(container) => container,
        Err(e) => {
            error!("Failed to open {}: {}", container_path.display(), e);
            report.failures.push(e);
            return;
        }
    };

    let mut appended = Vec::new();
    for file in files {
        match container.append(&file, folder_name) {
            Ok(entry_name) => appended.push((file, entry_name)),
            Err(e) => {
                error!("Failed to archive {}: {}", file.display(), e);
                report.failures.push(e);
            }
        }
    }

    if let Err(e) = container.finish() {
        error!("Failed to finalize {}: {}", container_path.display(), e);
        report.failures.push(e);
        return;
    }

    for (source, entry_name) in appended {
        match fs::remove_file(&source) {
            Ok(()) => {
                info!(
                    "Archived: {} → {}",
                    source.display(),
                    container_path.display()
                );
                report.archived.push(ArchivedFile {
                    source,
                    container: container_path.to_path_buf(),
                    entry_name,
                });
            }
            Err(e) => {
                error!("Failed to remove archived file {}: {}", source.display(), e);
                report
                    .failures
                    .push(ArchiveError::RemoveFailed { path: source, source: e });
            }
        }
    }
}

/// A zip container opened for appending.
struct ArchiveContainer {
    path: PathBuf,
    writer: ZipWriter<File>,
    entries: HashSet<String>,
}

impl ArchiveContainer {
    /// Opens an existing container for appending, or creates a new one.
    fn open(path: &Path) -> Result<Self, ArchiveError> {
        let container_error = |source: zip::result::ZipError| ArchiveError::Container {
            path: path.to_path_buf(),
            source,
        };

        if !path.exists() {
            let file = File::create(path).map_err(|e| container_error(e.into()))?;
            return Ok(Self {
                path: path.to_path_buf(),
                writer: ZipWriter::new(file),
                entries: HashSet::new(),
            });
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| container_error(e.into()))?;
        let entries = ZipArchive::new(&file)
            .map_err(container_error)?
            .file_names()
            .map(str::to_owned)
            .collect();
        let writer = ZipWriter::new_append(file).map_err(container_error)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            entries,
        })
    }

    /// Writes `source` as `<folder_name>/<file name>`, returning the entry name used.
    fn append(&mut self, source: &Path, folder_name: &str) -> Result<String, ArchiveError> {
        let append_error = |source_error: io::Error| ArchiveError::AppendFailed {
            path: source.to_path_buf(),
            source: source_error,
        };

        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                append_error(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "path has no file name",
                ))
            })?;

        let mut input = File::open(source).map_err(append_error)?;
        let modified = input.metadata().and_then(|m| m.modified()).ok();

        let entry_name = self.unique_entry_name(folder_name, &file_name);
        let mut options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
        if let Some(timestamp) = modified.and_then(zip_timestamp) {
            options = options.last_modified_time(timestamp);
        }

        self.writer
            .start_file(entry_name.clone(), options)
            .map_err(|e| append_error(e.into()))?;
        if let Err(e) = io::copy(&mut input, &mut self.writer) {
            // Drop the partial entry so the container never holds a truncated copy.
            if let Err(abort) = self.writer.abort_file() {
                error!("Failed to discard partial entry {}: {}", entry_name, abort);
            }
            return Err(append_error(e));
        }

        debug!("Added {} to {}", entry_name, self.path.display());
        self.entries.insert(entry_name.clone());
        Ok(entry_name)
    }

    /// `<folder>/<name>`, or `<folder>/<stem> (n).<ext>` if the container
    /// already holds that entry from an earlier run.
    fn unique_entry_name(&self, folder_name: &str, file_name: &str) -> String {
        let plain = format!("{}/{}", folder_name, file_name);
        if !self.entries.contains(&plain) {
            return plain;
        }

        let (stem, extension) = match file_name.rfind('.') {
            Some(index) if index > 0 => (&file_name[..index], &file_name[index..]),
            _ => (file_name, ""),
        };

        let mut counter: u32 = 1;
        loop {
            let candidate = format!("{}/{} ({}){}", folder_name, stem, counter, extension);
            if !self.entries.contains(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Writes the central directory.
    fn finish(mut self) -> Result<(), ArchiveError> {
        self.writer
            .finish()
            .map(|_| ())
            .map_err(|source| ArchiveError::Container {
                path: self.path.clone(),
                source,
            })
    }
}

/// Converts a modification time to the zip format, which cannot represent
/// dates before 1980.
fn zip_timestamp(modified: SystemTime) -> Option<zip::DateTime> {
    let local: DateTime<Local> = modified.into();
    let year = u16::try_from(local.year()).ok()?;
    zip::DateTime::from_date_and_time(
        year,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}

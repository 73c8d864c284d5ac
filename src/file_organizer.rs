/// Organizing a directory into category folders.
///
/// This module provisions the category folders, relocates single entries
/// into them and drives a full organize pass: enumerate, classify, move,
/// persist the journal, then archive stale files.
use crate::archive::{ArchiveManager, ArchiveReport};
use crate::config::CompiledConfig;
use crate::error::{MoveFailure, OrganizeError, OrganizeResult};
use crate::file_category::{Category, CategoryMapper};
use crate::history::{HistoryJournal, MoveRecord};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Why an entry was left where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Its basename is in the exclusion set.
    Excluded,
    /// It is the journal, the log or an archive container.
    Reserved,
    /// It is a directory named like a category or its folder.
    CategoryFolder,
    /// It is some other directory. Directories are never moved.
    Directory,
}

/// An entry the pass did not move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// A move a dry run would perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub category: Category,
    pub folder_name: String,
}

/// Knobs for a single organize pass.
#[derive(Debug, Clone, Copy)]
pub struct OrganizeOptions {
    /// Run the archival step after moving, if archival is enabled in config.
    pub run_archival: bool,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self { run_archival: true }
    }
}

/// Outcome of one organize pass.
#[derive(Debug, Default)]
pub struct OrganizeReport {
    /// Every category folder that was ensured.
    pub folders: Vec<PathBuf>,
    /// Successful moves, in the order they happened. This is the journal.
    pub moved: Vec<MoveRecord>,
    /// Entries that could not be moved.
    pub failures: Vec<MoveFailure>,
    pub skipped: Vec<SkippedEntry>,
    /// Set when an unconsumed journal from an earlier run was replaced.
    pub overwrote_journal: bool,
    /// Archival results, when archival ran.
    pub archive: Option<ArchiveReport>,
}

impl OrganizeReport {
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
            && self
                .archive
                .as_ref()
                .is_none_or(|archive| archive.failures.is_empty())
    }

    /// Number of moved files per destination folder.
    pub fn folder_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.moved {
            let folder = record
                .new_path
                .parent()
                .and_then(Path::file_name)
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            *counts.entry(folder).or_insert(0) += 1;
        }
        counts
    }
}

/// What the pass should do with one enumerated entry.
enum Disposition {
    Move(Category),
    Skip(SkipReason),
}

/// Organizes files by moving them into category subdirectories.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Creates every category folder (plus `Other`) under `base_path`.
    ///
    /// Existing folders are left as they are, so calling this twice is
    /// harmless. Any failure is fatal for the pass.
    pub fn ensure_category_folders(
        base_path: &Path,
        mapper: &CategoryMapper,
    ) -> OrganizeResult<Vec<PathBuf>> {
        validate_base_path(base_path)?;

        let mut folders = Vec::new();
        for category in mapper.categories() {
            let folder = base_path.join(mapper.folder_name(&category));
            fs::create_dir_all(&folder).map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: folder.clone(),
                source: e,
            })?;
            folders.push(folder);
        }
        Ok(folders)
    }

    /// Moves a single entry into its category folder.
    ///
    /// The destination is `<base>/<folder>/<basename>`. If that name is
    /// taken, a numbered suffix is added (`photo (1).jpg`, `photo (2).jpg`,
    /// ...) so nothing is overwritten. The folder must already exist.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use desktidy::file_category::{Category, CategoryMapper};
    /// use desktidy::file_organizer::FileOrganizer;
    /// use std::path::Path;
    ///
    /// let mapper = CategoryMapper::default();
    /// let result = FileOrganizer::move_entry(
    ///     Path::new("/home/me/Desktop/cat.png"),
    ///     &Category::new("Image"),
    ///     Path::new("/home/me/Desktop"),
    ///     &mapper,
    /// );
    /// match result {
    ///     Ok(record) => println!("Moved to {}", record.new_path.display()),
    ///     Err(failure) => eprintln!("{}", failure),
    /// }
    /// ```
    pub fn move_entry(
        file_path: &Path,
        category: &Category,
        base_path: &Path,
        mapper: &CategoryMapper,
    ) -> Result<MoveRecord, MoveFailure> {
        let dest_folder = base_path.join(mapper.folder_name(category));

        let Some(file_name) = file_path.file_name() else {
            return Err(MoveFailure {
                from: file_path.to_path_buf(),
                to: dest_folder,
                source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
            });
        };

        let destination = unique_destination(&dest_folder, file_name);

        match relocate(file_path, &destination) {
            Ok(()) => {
                info!("Moved: {} → {}", file_path.display(), destination.display());
                Ok(MoveRecord::new(file_path.to_path_buf(), destination))
            }
            Err(e) => {
                error!("Failed to move {}: {}", file_path.display(), e);
                Err(MoveFailure {
                    from: file_path.to_path_buf(),
                    to: destination,
                    source: e,
                })
            }
        }
    }

    /// Runs a full organize pass with default options.
    pub fn organize(directory: &Path, config: &CompiledConfig) -> OrganizeResult<OrganizeReport> {
        Self::organize_with_options(directory, config, OrganizeOptions::default())
    }

    /// Runs a full organize pass over `directory`.
    ///
    /// 1. Ensures the category folders exist
    /// 2. Enumerates the directory (not recursively)
    /// 3. Skips excluded names, reserved files and directories
    /// 4. Moves every other file into its category folder
    /// 5. Writes the journal, replacing any earlier one
    /// 6. Archives stale files, if enabled
    ///
    /// A failed move is recorded and the pass carries on; only folder
    /// provisioning, enumeration and journal I/O abort it.
    pub fn organize_with_options(
        directory: &Path,
        config: &CompiledConfig,
        options: OrganizeOptions,
    ) -> OrganizeResult<OrganizeReport> {
        info!("--- Starting organization in: {} ---", directory.display());

        let mut report = OrganizeReport {
            folders: Self::ensure_category_folders(directory, &config.mapper)?,
            overwrote_journal: HistoryJournal::exists(directory),
            ..Default::default()
        };

        let mut journal = HistoryJournal::new();
        for (path, disposition) in Self::scan(directory, config)? {
            match disposition {
                Disposition::Skip(reason) => report.skipped.push(SkippedEntry { path, reason }),
                Disposition::Move(category) => {
                    match Self::move_entry(&path, &category, directory, &config.mapper) {
                        Ok(record) => journal.push(record),
                        Err(failure) => report.failures.push(failure),
                    }
                }
            }
        }

        if report.overwrote_journal {
            warn!(
                "Replacing an unconsumed move history in {}; the previous organize run can no longer be undone",
                directory.display()
            );
        }
        journal.save(directory)?;
        report.moved = journal.into_records();

        if options.run_archival && config.archive.enabled {
            report.archive = Some(ArchiveManager::archive_stale(directory, config)?);
        }

        info!(
            "--- Completed organization: {} moved, {} failed, {} skipped ---",
            report.moved.len(),
            report.failures.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Works out what an organize pass would do, without touching anything.
    pub fn plan(directory: &Path, config: &CompiledConfig) -> OrganizeResult<Vec<PlannedMove>> {
        validate_base_path(directory)?;

        Ok(Self::scan(directory, config)?
            .into_iter()
            .filter_map(|(source, disposition)| match disposition {
                Disposition::Move(category) => Some(PlannedMove {
                    source,
                    folder_name: config.mapper.folder_name(&category).to_string(),
                    category,
                }),
                Disposition::Skip(_) => None,
            })
            .collect())
    }

    /// Enumerates `directory` once and decides what to do with each entry.
    fn scan(
        directory: &Path,
        config: &CompiledConfig,
    ) -> OrganizeResult<Vec<(PathBuf, Disposition)>> {
        let entries = fs::read_dir(directory).map_err(|e| OrganizeError::ReadDirFailed {
            path: directory.to_path_buf(),
            source: e,
        })?;

        let mut scanned = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    error!("Failed to read an entry of {}: {}", directory.display(), e);
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            let disposition = Self::triage(&name, &path, config);

            if let Disposition::Skip(reason) = &disposition {
                match reason {
                    SkipReason::Excluded => info!("Skipped (excluded): {}", name),
                    other => debug!("Skipped ({:?}): {}", other, name),
                }
            }
            scanned.push((path, disposition));
        }
        Ok(scanned)
    }

    fn triage(name: &str, path: &Path, config: &CompiledConfig) -> Disposition {
        if config.exclusions.is_excluded(name) {
            return Disposition::Skip(SkipReason::Excluded);
        }

        let is_directory = path.is_dir();
        if is_directory && config.mapper.is_category_folder(name) {
            return Disposition::Skip(SkipReason::CategoryFolder);
        }
        if !is_directory && config.is_reserved_file(name) {
            return Disposition::Skip(SkipReason::Reserved);
        }

        let category = config.mapper.classify(name, is_directory);
        if category.is_folder() {
            return Disposition::Skip(SkipReason::Directory);
        }
        debug!("Classified {} as {}", name, category);
        Disposition::Move(category)
    }
}

/// Checks that `path` is an existing directory.
pub(crate) fn validate_base_path(path: &Path) -> OrganizeResult<()> {
    let metadata = fs::metadata(path).map_err(|e| OrganizeError::InvalidBasePath {
        path: path.to_path_buf(),
        source: e,
    })?;
    if !metadata.is_dir() {
        return Err(OrganizeError::NotADirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Moves `from` to `to`, copying then deleting when they sit on different devices.
pub(crate) fn relocate(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(from, to)?;
            if let Err(e) = fs::remove_file(from) {
                let _ = fs::remove_file(to);
                return Err(e);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// First free path for `file_name` inside `folder`, adding ` (n)` before the
/// extension when the plain name is taken.
pub(crate) fn unique_destination(folder: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = folder.join(file_name);
    if !is_occupied(&candidate) {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = as_path.file_stem().unwrap_or(file_name);
    let extension = as_path.extension();

    let mut counter: u32 = 1;
    loop {
        let mut name = stem.to_os_string();
        name.push(format!(" ({})", counter));
        if let Some(ext) = extension {
            name.push(".");
            name.push(ext);
        }

        let candidate = folder.join(name);
        if !is_occupied(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

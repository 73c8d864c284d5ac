/// Reversal of the most recent organize run.
///
/// Undo reads the journal written by organize and moves every entry back to
/// where it came from. Records whose restore fails are written back as a
/// smaller journal, so a partial undo can be retried.
use crate::config::CompiledConfig;
use crate::error::{MoveFailure, OrganizeResult};
use crate::file_organizer::{relocate, validate_base_path};
use crate::history::{HistoryJournal, MoveRecord};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// A journal record that could not be restored.
#[derive(Debug)]
pub struct RestoreFailure {
    pub record: MoveRecord,
    pub error: MoveFailure,
    /// Where the file that occupied the original path was left, if it could
    /// not be put back after the restore failed.
    pub backup: Option<PathBuf>,
}

/// What an undo pass did, record by record.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Records moved back to their original path.
    pub restored: Vec<MoveRecord>,
    /// Records left in place because the original name is excluded.
    pub skipped: Vec<MoveRecord>,
    /// Records whose file was no longer at its organized location.
    pub missing: Vec<MoveRecord>,
    pub failures: Vec<RestoreFailure>,
    /// Files that occupied an original path and were renamed out of the way.
    pub backups: Vec<PathBuf>,
}

impl UndoReport {
    /// Returns the total number of records processed.
    pub fn total_processed(&self) -> usize {
        self.restored.len() + self.skipped.len() + self.missing.len() + self.failures.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of [`UndoManager::undo`].
#[derive(Debug)]
pub enum UndoOutcome {
    /// There was no journal; nothing was touched.
    NothingToUndo,
    /// Every restorable record was handled and the journal removed.
    Completed(UndoReport),
    /// Some restores failed; the journal now holds only those records.
    Partial(UndoReport),
}

impl UndoOutcome {
    /// True once a journal has been consumed, fully or partially.
    pub fn performed(&self) -> bool {
        !matches!(self, UndoOutcome::NothingToUndo)
    }

    pub fn report(&self) -> Option<&UndoReport> {
        match self {
            UndoOutcome::NothingToUndo => None,
            UndoOutcome::Completed(report) | UndoOutcome::Partial(report) => Some(report),
        }
    }
}

/// Outcome of restoring a single record.
enum Restore {
    Restored { backup: Option<PathBuf> },
    Missing,
}

/// A restore that failed, plus any backup that could not be rolled back.
struct FailedRestore {
    error: MoveFailure,
    backup: Option<PathBuf>,
}

/// Manages undo operations for file organization.
pub struct UndoManager;

impl UndoManager {
    /// Undoes the most recent organize run on `base_path`.
    ///
    /// Records are processed in journal order. For each one:
    ///
    /// * **Excluded name**: left at its organized location and not retained
    /// * **File gone from its organized location**: reported as missing
    /// * **Original path occupied**: the occupant is renamed to
    ///   `<name>.bak.<YYYYmmdd-HHMMSS>` first
    /// * **Move error**: logged, and the record kept for a later retry
    ///
    /// Without a journal this returns [`UndoOutcome::NothingToUndo`] and
    /// changes nothing on disk.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use desktidy::config::CompiledConfig;
    /// use desktidy::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// let config = CompiledConfig::default();
    /// match UndoManager::undo(Path::new("/path/to/directory"), &config) {
    ///     Ok(outcome) if outcome.performed() => println!("Undo done"),
    ///     Ok(_) => println!("Nothing to undo"),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(base_path: &Path, config: &CompiledConfig) -> OrganizeResult<UndoOutcome> {
        validate_base_path(base_path)?;

        let Some(journal) = HistoryJournal::load(base_path)? else {
            info!("No move history found in {}", base_path.display());
            return Ok(UndoOutcome::NothingToUndo);
        };

        let mut report = UndoReport::default();
        for record in journal.into_records() {
            let excluded = record
                .original_name()
                .is_some_and(|name| config.exclusions.is_excluded(&name));
            if excluded {
                info!("Skipped excluded: {}", record.new_path.display());
                report.skipped.push(record);
                continue;
            }

            match Self::restore_file(&record) {
                Ok(Restore::Restored { backup }) => {
                    info!(
                        "Restored: {} → {}",
                        record.new_path.display(),
                        record.original_path.display()
                    );
                    report.backups.extend(backup);
                    report.restored.push(record);
                }
                Ok(Restore::Missing) => {
                    warn!("Not found, cannot restore: {}", record.new_path.display());
                    report.missing.push(record);
                }
                Err(FailedRestore { error: failure, backup }) => {
                    error!("Failed to restore {}: {}", record.new_path.display(), failure);
                    if let Some(backup) = &backup {
                        warn!(
                            "{} was left at {}",
                            record.original_path.display(),
                            backup.display()
                        );
                    }
                    report.failures.push(RestoreFailure {
                        record,
                        error: failure,
                        backup,
                    });
                }
            }
        }

        info!(
            "Undo finished: {} restored, {} failed, {} skipped, {} missing",
            report.restored.len(),
            report.failures.len(),
            report.skipped.len(),
            report.missing.len()
        );

        if report.failures.is_empty() {
            HistoryJournal::delete(base_path)?;
            return Ok(UndoOutcome::Completed(report));
        }

        let residual = HistoryJournal::from_records(
            report.failures.iter().map(|f| f.record.clone()).collect(),
        );
        residual.save(base_path)?;
        warn!(
            "Partial undo: {} records kept in {}",
            residual.len(),
            HistoryJournal::journal_path(base_path).display()
        );
        Ok(UndoOutcome::Partial(report))
    }

    /// Moves one file back to its original location.
    ///
    /// If the original path was occupied and the restore then fails, the
    /// occupant is moved back from its backup.
    fn restore_file(record: &MoveRecord) -> Result<Restore, FailedRestore> {
        if std::fs::symlink_metadata(&record.new_path).is_err() {
            return Ok(Restore::Missing);
        }

        let mut backup = None;
        if std::fs::symlink_metadata(&record.original_path).is_ok() {
            let backup_path = generate_backup_path(&record.original_path);
            relocate(&record.original_path, &backup_path).map_err(|e| FailedRestore {
                error: MoveFailure {
                    from: record.original_path.clone(),
                    to: backup_path.clone(),
                    source: e,
                },
                backup: None,
            })?;
            info!(
                "Backed up {} → {}",
                record.original_path.display(),
                backup_path.display()
            );
            backup = Some(backup_path);
        }

        if let Err(e) = relocate(&record.new_path, &record.original_path) {
            let stranded = backup.filter(|backup_path| {
                match relocate(backup_path, &record.original_path) {
                    Ok(()) => false,
                    Err(rollback) => {
                        error!(
                            "Failed to put {} back from {}: {}",
                            record.original_path.display(),
                            backup_path.display(),
                            rollback
                        );
                        true
                    }
                }
            });
            return Err(FailedRestore {
                error: MoveFailure {
                    from: record.new_path.clone(),
                    to: record.original_path.clone(),
                    source: e,
                },
                backup: stranded,
            });
        }

        Ok(Restore::Restored { backup })
    }
}

/// Backup path for a file occupying an original path.
///
/// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
fn generate_backup_path(original_path: &Path) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let filename = original_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());

    original_path.with_file_name(format!("{}.bak.{}", filename, timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleanerConfig;
    use crate::file_organizer::FileOrganizer;
    use std::fs;
    use tempfile::TempDir;

    fn config_excluding(names: &[&str]) -> CompiledConfig {
        let config = CleanerConfig {
            excluded_files: names.iter().map(|n| n.to_string()).collect(),
            ..CleanerConfig::default()
        };
        config.compile().expect("valid config")
    }

    fn journal_of(base: &Path, moves: &[(&str, &str)]) -> HistoryJournal {
        let records = moves
            .iter()
            .map(|(name, folder)| MoveRecord::new(base.join(name), base.join(folder).join(name)))
            .collect();
        HistoryJournal::from_records(records)
    }

    #[test]
    fn test_undo_without_journal_touches_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        fs::create_dir(base_path.join("Image")).unwrap();
        fs::write(base_path.join("Image").join("a.jpg"), "a").unwrap();

        let outcome = UndoManager::undo(base_path, &CompiledConfig::default()).unwrap();

        assert!(matches!(outcome, UndoOutcome::NothingToUndo));
        assert!(!outcome.performed());
        assert!(outcome.report().is_none());
        assert!(base_path.join("Image").join("a.jpg").exists());
        assert!(!base_path.join("a.jpg").exists());
    }

    #[test]
    fn test_undo_after_organize_restores_everything() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let config = CompiledConfig::default();

        fs::write(base_path.join("image.png"), "image data").unwrap();
        fs::write(base_path.join("document.pdf"), "pdf data").unwrap();
        fs::write(base_path.join("README"), "no extension").unwrap();

        let organized = FileOrganizer::organize(base_path, &config).expect("organize failed");
        assert_eq!(organized.moved.len(), 3);

        let outcome = UndoManager::undo(base_path, &config).expect("Undo failed");

        let UndoOutcome::Completed(report) = outcome else {
            panic!("expected a completed undo");
        };
        assert_eq!(report.restored.len(), 3);
        assert!(report.is_complete_success());
        assert_eq!(
            fs::read_to_string(base_path.join("image.png")).unwrap(),
            "image data"
        );
        assert!(base_path.join("document.pdf").exists());
        assert!(base_path.join("README").exists());
        assert!(!HistoryJournal::exists(base_path));
    }

    #[test]
    fn test_undo_backs_up_a_file_in_the_way() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let config = CompiledConfig::default();

        let file_path = base_path.join("test.txt");
        fs::write(&file_path, "original content").unwrap();
        FileOrganizer::organize(base_path, &config).unwrap();

        fs::write(&file_path, "new content").unwrap();

        let outcome = UndoManager::undo(base_path, &config).expect("Undo failed");
        let report = outcome.report().expect("undo should have run");

        assert_eq!(report.restored.len(), 1);
        assert_eq!(report.backups.len(), 1);
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "original content");

        let backup = &report.backups[0];
        assert!(
            backup
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("test.txt.bak.")
        );
        assert_eq!(fs::read_to_string(backup).unwrap(), "new content");
    }

    #[test]
    fn test_undo_reports_missing_files_and_completes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        journal_of(base_path, &[("nonexistent.txt", "Document")])
            .save(base_path)
            .unwrap();

        let outcome =
            UndoManager::undo(base_path, &CompiledConfig::default()).expect("Undo failed");

        let UndoOutcome::Completed(report) = outcome else {
            panic!("a missing file is not a restore failure");
        };
        assert_eq!(report.missing.len(), 1);
        assert!(report.restored.is_empty());
        assert!(!HistoryJournal::exists(base_path));
    }

    #[test]
    fn test_undo_leaves_excluded_files_in_place() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let folder = base_path.join("Document");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("keep.txt"), "keep").unwrap();
        fs::write(folder.join("back.txt"), "back").unwrap();

        journal_of(base_path, &[("keep.txt", "Document"), ("back.txt", "Document")])
            .save(base_path)
            .unwrap();

        let outcome = UndoManager::undo(base_path, &config_excluding(&["keep.txt"])).unwrap();
        let report = outcome.report().unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.restored.len(), 1);
        assert!(folder.join("keep.txt").exists());
        assert!(!base_path.join("keep.txt").exists());
        assert!(base_path.join("back.txt").exists());
        assert!(!HistoryJournal::exists(base_path));
    }

    #[test]
    fn test_partial_undo_keeps_only_failed_records() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let folder = base_path.join("Document");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("ok.txt"), "ok").unwrap();
        fs::write(folder.join("stuck.txt"), "stuck").unwrap();

        // The original parent of stuck.txt no longer exists, so it cannot go back.
        let stuck = MoveRecord::new(
            base_path.join("gone").join("stuck.txt"),
            folder.join("stuck.txt"),
        );
        let ok = MoveRecord::new(base_path.join("ok.txt"), folder.join("ok.txt"));
        HistoryJournal::from_records(vec![ok, stuck.clone()])
            .save(base_path)
            .unwrap();

        let outcome = UndoManager::undo(base_path, &CompiledConfig::default()).unwrap();

        let UndoOutcome::Partial(report) = &outcome else {
            panic!("expected a partial undo");
        };
        assert!(outcome.performed());
        assert_eq!(report.restored.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(base_path.join("ok.txt").exists());
        assert!(folder.join("stuck.txt").exists());

        let residual = HistoryJournal::load(base_path).unwrap().expect("residual journal");
        assert_eq!(residual.records(), &[stuck]);
    }

    #[test]
    fn test_failed_restore_puts_the_occupant_back() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let folder = base_path.join("Docs");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("x.txt"), "occupant").unwrap();

        // Moving a directory into itself always fails, after the occupant
        // has already been renamed out of the way.
        let record = MoveRecord::new(folder.join("x.txt"), folder.clone());
        HistoryJournal::from_records(vec![record]).save(base_path).unwrap();

        let outcome = UndoManager::undo(base_path, &CompiledConfig::default()).unwrap();

        let UndoOutcome::Partial(report) = outcome else {
            panic!("expected a partial undo");
        };
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].backup.is_none());
        assert!(report.backups.is_empty());
        assert_eq!(fs::read_to_string(folder.join("x.txt")).unwrap(), "occupant");

        let leftovers: Vec<_> = fs::read_dir(&folder)
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().contains(".bak."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_backup_path_format() {
        let backup = generate_backup_path(Path::new("/desk/notes.txt"));
        assert_eq!(backup.parent(), Some(Path::new("/desk")));
        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("notes.txt.bak."));
        assert_eq!(name.len(), "notes.txt.bak.".len() + "YYYYmmdd-HHMMSS".len());
    }

    #[test]
    fn test_undo_invalid_base_path() {
        let non_existent = Path::new("/non/existent/path");
        let result = UndoManager::undo(non_existent, &CompiledConfig::default());
        assert!(result.is_err());
    }
}

//! Command-line front end.
//!
//! Argument parsing and a thin dispatch layer: each subcommand maps onto one
//! library call (organize, undo, archive or reading the log) and renders its
//! report. No decisions about files are made here.

use crate::archive::{ArchiveManager, ArchiveReport};
use crate::config::CompiledConfig;
use crate::error::CliError;
use crate::file_organizer::{FileOrganizer, OrganizeOptions, OrganizeReport};
use crate::logging::{log_file_path, read_log};
use crate::output::OutputFormatter;
use crate::undo::{UndoManager, UndoOutcome, UndoReport};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "desktidy")]
#[command(author, version, long_about = None)]
#[command(about = "Sort a cluttered directory into category folders, with undo and archival of stale files")]
pub struct Args {
    /// Configuration file (TOML, or JSON with a .json extension)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move files into category folders and record the moves
    Organize {
        /// Directory to organize (defaults to source_directory from config)
        directory: Option<PathBuf>,

        /// Show what would be moved without changing anything
        #[arg(short, long)]
        dry_run: bool,

        /// Skip archival of stale files for this run
        #[arg(long)]
        no_archive: bool,
    },
    /// Move files back to where the last organize run found them
    Undo {
        /// Directory that was organized
        directory: Option<PathBuf>,
    },
    /// Compress files older than the configured age into per-folder zip archives
    Archive {
        /// Directory whose category folders are archived
        directory: Option<PathBuf>,
    },
    /// Print the activity log of a directory
    Log {
        /// Directory whose log is shown
        directory: Option<PathBuf>,
    },
}

impl Command {
    /// Directory given on the command line, if any.
    pub fn directory(&self) -> Option<&Path> {
        match self {
            Command::Organize { directory, .. }
            | Command::Undo { directory }
            | Command::Archive { directory }
            | Command::Log { directory } => directory.as_deref(),
        }
    }

    /// Whether the command changes the directory and so should be logged to
    /// its log file.
    pub fn writes_log(&self) -> bool {
        match self {
            Command::Organize { dry_run, .. } => !dry_run,
            Command::Undo { .. } | Command::Archive { .. } => true,
            Command::Log { .. } => false,
        }
    }
}

/// Picks the directory to work on: the explicit argument, else the
/// configured `source_directory`.
pub fn resolve_directory(
    explicit: Option<&Path>,
    config: &CompiledConfig,
) -> Result<PathBuf, CliError> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.source_directory.clone())
        .ok_or(CliError::NoDirectory)
}

/// Runs one subcommand against `directory`.
///
/// # Examples
///
/// ```no_run
/// use desktidy::cli::{run_cli, Command};
/// use desktidy::config::CompiledConfig;
/// use std::path::Path;
///
/// let command = Command::Organize { directory: None, dry_run: true, no_archive: false };
/// let config = CompiledConfig::default();
/// if let Err(e) = run_cli(&command, Path::new("/home/me/Desktop"), &config) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(
    command: &Command,
    directory: &Path,
    config: &CompiledConfig,
) -> Result<(), CliError> {
    match command {
        Command::Organize {
            dry_run: true, ..
        } => preview(directory, config),
        Command::Organize { no_archive, .. } => organize(directory, config, !no_archive),
        Command::Undo { .. } => undo(directory, config),
        Command::Archive { .. } => archive(directory, config),
        Command::Log { .. } => show_log(directory),
    }
}

fn organize(directory: &Path, config: &CompiledConfig, run_archival: bool) -> Result<(), CliError> {
    OutputFormatter::info(&format!("Organizing contents of: {}", directory.display()));

    let spinner = OutputFormatter::spinner("Organizing...");
    let result =
        FileOrganizer::organize_with_options(directory, config, OrganizeOptions { run_archival });
    spinner.finish_and_clear();
    let report = result?;

    print_organize_report(&report);
    if let Some(archive) = &report.archive {
        print_archive_report(archive);
    }

    if report.is_complete_success() {
        OutputFormatter::success("Organization complete!");
    } else {
        OutputFormatter::warning("Organization finished with errors. See the messages above.");
    }
    if !report.moved.is_empty() {
        OutputFormatter::plain(&format!(
            "Run 'desktidy undo {}' to revert these moves.",
            directory.display()
        ));
    }
    Ok(())
}

fn print_organize_report(report: &OrganizeReport) {
    if report.overwrote_journal {
        OutputFormatter::warning(
            "The previous move history was replaced; the earlier run can no longer be undone.",
        );
    }

    for record in &report.moved {
        OutputFormatter::plain(&format!(
            " - {} → {}",
            display_name(&record.original_path),
            record.new_path.display()
        ));
    }
    for failure in &report.failures {
        OutputFormatter::error(&failure.to_string());
    }

    if report.moved.is_empty() {
        OutputFormatter::info("No files needed organizing.");
    } else {
        OutputFormatter::summary_table(&report.folder_counts());
    }
}

fn preview(directory: &Path, config: &CompiledConfig) -> Result<(), CliError> {
    OutputFormatter::dry_run_notice(&format!("Analyzing contents of: {}", directory.display()));

    let planned = FileOrganizer::plan(directory, config)?;
    if planned.is_empty() {
        OutputFormatter::plain("No files found to organize.");
        return Ok(());
    }

    let mut counts = BTreeMap::new();
    for planned_move in &planned {
        OutputFormatter::plain(&format!(
            " - {} → would move to {}/",
            display_name(&planned_move.source),
            planned_move.folder_name
        ));
        *counts.entry(planned_move.folder_name.clone()).or_insert(0) += 1;
    }

    OutputFormatter::summary_table(&counts);
    OutputFormatter::dry_run_notice("No files were modified.");
    Ok(())
}

fn undo(directory: &Path, config: &CompiledConfig) -> Result<(), CliError> {
    OutputFormatter::info(&format!("Undoing previous organization of: {}", directory.display()));

    match UndoManager::undo(directory, config)? {
        UndoOutcome::NothingToUndo => {
            OutputFormatter::warning("Nothing to undo: no move history found.");
        }
        UndoOutcome::Completed(report) => {
            print_undo_report(&report);
            OutputFormatter::success("Undo complete!");
        }
        UndoOutcome::Partial(report) => {
            print_undo_report(&report);
            OutputFormatter::warning(&format!(
                "{} files could not be restored and were kept in the move history. Fix the problems above and run undo again.",
                report.failures.len()
            ));
        }
    }
    Ok(())
}

fn print_undo_report(report: &UndoReport) {
    OutputFormatter::plain(&format!("  Restored: {}", report.restored.len()));

    if !report.skipped.is_empty() {
        OutputFormatter::plain(&format!("  Skipped (excluded): {}", report.skipped.len()));
    }
    if !report.missing.is_empty() {
        OutputFormatter::plain(&format!("  Missing: {}", report.missing.len()));
        for record in &report.missing {
            OutputFormatter::plain(&format!("    - {}", record.new_path.display()));
        }
    }
    for backup in &report.backups {
        OutputFormatter::warning(&format!(
            "An existing file was in the way and was renamed to {}",
            backup.display()
        ));
    }
    for failure in &report.failures {
        OutputFormatter::error(&failure.error.to_string());
        if let Some(backup) = &failure.backup {
            OutputFormatter::warning(&format!(
                "{} is still at {}",
                failure.record.original_path.display(),
                backup.display()
            ));
        }
    }
}

fn archive(directory: &Path, config: &CompiledConfig) -> Result<(), CliError> {
    let spinner = OutputFormatter::spinner("Archiving stale files...");
    let result = ArchiveManager::archive_stale(directory, config);
    spinner.finish_and_clear();
    let report = result?;

    if !report.enabled {
        OutputFormatter::warning(
            "Archival is disabled. Set [archive] enabled = true in the configuration.",
        );
        return Ok(());
    }
    print_archive_report(&report);
    Ok(())
}

fn print_archive_report(report: &ArchiveReport) {
    for archived in &report.archived {
        OutputFormatter::plain(&format!(
            " - {} → {}",
            display_name(&archived.source),
            archived.container.display()
        ));
    }
    for failure in &report.failures {
        OutputFormatter::error(&failure.to_string());
    }

    if report.archived.is_empty() {
        OutputFormatter::info("No stale files to archive.");
    } else {
        OutputFormatter::success(&format!("Archived {} files.", report.archived.len()));
    }
}

fn show_log(directory: &Path) -> Result<(), CliError> {
    match read_log(directory) {
        Ok(Some(content)) => {
            print!("{}", content);
            Ok(())
        }
        Ok(None) => {
            OutputFormatter::info(&format!("No log file in {}", directory.display()));
            Ok(())
        }
        Err(source) => Err(CliError::LogRead {
            path: log_file_path(directory),
            source,
        }),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_organize_with_flags() {
        let args = Args::try_parse_from(["desktidy", "organize", "/desk", "--dry-run", "-vv"])
            .expect("valid arguments");

        assert_eq!(args.verbose, 2);
        assert_eq!(
            args.command,
            Command::Organize {
                directory: Some(PathBuf::from("/desk")),
                dry_run: true,
                no_archive: false,
            }
        );
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let args = Args::try_parse_from(["desktidy", "undo", "--config", "my.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("my.toml")));
        assert_eq!(args.command, Command::Undo { directory: None });
    }

    #[test]
    fn test_subcommand_is_required() {
        assert!(Args::try_parse_from(["desktidy"]).is_err());
    }

    #[test]
    fn test_resolve_directory_prefers_argument() {
        let config = CompiledConfig {
            source_directory: Some(PathBuf::from("/configured")),
            ..CompiledConfig::default()
        };

        let explicit = resolve_directory(Some(Path::new("/given")), &config).unwrap();
        assert_eq!(explicit, PathBuf::from("/given"));

        let fallback = resolve_directory(None, &config).unwrap();
        assert_eq!(fallback, PathBuf::from("/configured"));
    }

    #[test]
    fn test_resolve_directory_without_any_source() {
        let result = resolve_directory(None, &CompiledConfig::default());
        assert!(matches!(result, Err(CliError::NoDirectory)));
    }

    #[test]
    fn test_only_mutating_commands_write_the_log() {
        let organize = Command::Organize {
            directory: None,
            dry_run: false,
            no_archive: false,
        };
        let dry_run = Command::Organize {
            directory: None,
            dry_run: true,
            no_archive: false,
        };

        assert!(organize.writes_log());
        assert!(!dry_run.writes_log());
        assert!(Command::Undo { directory: None }.writes_log());
        assert!(Command::Archive { directory: None }.writes_log());
        assert!(!Command::Log { directory: None }.writes_log());
    }
}

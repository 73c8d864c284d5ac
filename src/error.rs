//! Error types shared across the organize, undo and archive passes.
//!
//! Only [`ConfigError`] and [`OrganizeError`] ever halt a pass. Per-entry
//! problems are reported through [`MoveFailure`] and [`ArchiveError`] values
//! collected in the pass reports, so one bad file never blocks the batch.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML/JSON or has the wrong shape.
    #[error("Invalid configuration {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    /// An exclusion glob failed to compile.
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },

    /// `Folder` and `Other` are assigned by the classifier and cannot be configured as groups.
    #[error("Category '{0}' is reserved and cannot be used as an extension group")]
    ReservedCategory(String),

    /// A custom folder name that cannot be used as a single directory component.
    #[error("Invalid folder name '{name}' for category '{category}'")]
    InvalidFolderName { category: String, name: String },
}

/// Errors that abort a whole organize, undo or archive pass.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The target directory does not exist or cannot be inspected.
    #[error("Invalid base path {path}: {source}")]
    InvalidBasePath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The target path exists but is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// A category folder could not be provisioned.
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The target directory could not be enumerated.
    #[error("Failed to read directory {path}: {source}")]
    ReadDirFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write history file {path}: {source}")]
    HistoryWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to read history file {path}: {source}")]
    HistoryReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid history file format in {path}: {reason}")]
    InvalidHistoryFormat { path: PathBuf, reason: String },
}

/// Result type for pass-level operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// A single relocation that did not happen.
///
/// Produced by the move engine during organize and by restores during undo.
/// The batch that produced it keeps going.
#[derive(Debug, Error)]
#[error("Failed to move {from} to {to}: {source}")]
pub struct MoveFailure {
    pub from: PathBuf,
    pub to: PathBuf,
    #[source]
    pub source: io::Error,
}

/// A per-file or per-container archival problem.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A category folder could not be listed.
    #[error("Failed to scan {path}: {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The archive container could not be opened, created or finalized.
    #[error("Archive container {path} is unusable: {source}")]
    Container {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// A stale file could not be written into its container.
    #[error("Failed to add {path} to archive: {source}")]
    AppendFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file was archived but the original could not be removed.
    #[error("Archived {path} but could not remove the original: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Top-level error for the command-line front end.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Organize(#[from] OrganizeError),

    #[error("No directory given and no source_directory configured")]
    NoDirectory,

    #[error("Failed to initialize log file: {0}")]
    Logging(#[from] tracing_appender::rolling::InitError),

    #[error("Failed to read log file {path}: {source}")]
    LogRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

//! desktidy - desktop cleanup with undo and archival
//!
//! This library classifies the entries of a directory by extension, moves
//! them into per-category folders, records every move so the run can be
//! undone, and optionally compresses stale files into per-folder zip
//! archives. Configuration is read from TOML (or the legacy JSON format).

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod file_category;
pub mod file_organizer;
pub mod history;
pub mod logging;
pub mod output;
pub mod undo;

pub use archive::{ArchiveManager, ArchiveReport};
pub use config::{CleanerConfig, CompiledConfig};
pub use error::{ArchiveError, ConfigError, MoveFailure, OrganizeError};
pub use file_category::{Category, CategoryMapper};
pub use file_organizer::{FileOrganizer, OrganizeReport};
pub use history::{HistoryJournal, MoveRecord};
pub use undo::{UndoManager, UndoOutcome, UndoReport};

pub use cli::{Command, run_cli};

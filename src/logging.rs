//! Log sink setup and read access to the per-directory log file.
//!
//! The passes only emit `tracing` events. The binary decides where they go:
//! warnings and above (more with `-v`) to stderr, and every INFO-or-higher
//! event appended to `<directory>/desktop_cleaner.log`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// File name of the log inside the organized directory.
pub const LOG_FILE_NAME: &str = "desktop_cleaner.log";

/// Maps the `-v` count to the console level.
pub fn console_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn log_file_path(directory: &Path) -> PathBuf {
    directory.join(LOG_FILE_NAME)
}

/// Installs the global subscriber.
///
/// When `log_directory` is given, events are also appended to its log file
/// without ANSI colors, one line per event.
pub fn init(verbosity: u8, log_directory: Option<&Path>) -> Result<(), InitError> {
    let filter = EnvFilter::from_default_env().add_directive(console_level(verbosity).into());

    let console = fmt::layer()
        .with_target(verbosity >= 2)
        .with_writer(io::stderr)
        .with_filter(filter);

    let file = match log_directory {
        Some(directory) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(LOG_FILE_NAME)
                .build(directory)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(appender)
                    .with_filter(LevelFilter::INFO),
            )
        }
        None => None,
    };

    tracing_subscriber::registry().with(console).with(file).init();
    Ok(())
}

/// Reads the log file of `directory`, or `None` if nothing has been logged yet.
pub fn read_log(directory: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(log_file_path(directory)) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_verbosity_level_mapping() {
        assert_eq!(console_level(0), Level::WARN);
        assert_eq!(console_level(1), Level::INFO);
        assert_eq!(console_level(2), Level::DEBUG);
        assert_eq!(console_level(3), Level::TRACE);
        assert_eq!(console_level(9), Level::TRACE);
    }

    #[test]
    fn test_read_log_missing_is_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert!(read_log(temp_dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_read_log_returns_contents() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(
            log_file_path(temp_dir.path()),
            "2026-01-01T00:00:00Z  INFO Moved: a -> b\n",
        )
        .unwrap();

        let content = read_log(temp_dir.path()).unwrap().unwrap();
        assert!(content.contains("Moved: a -> b"));
    }
}

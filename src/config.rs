//! Cleaner configuration: extension groups, exclusions, folder names and
//! archival policy.
//!
//! Configuration is read once, compiled into a [`CompiledConfig`] and then
//! passed by reference into every organize, undo and archive call.
//!
//! # Configuration File Format
//!
//! TOML is the native format. A `.json` file with the same keys is accepted
//! as well.
//!
//! ```toml
//! source_directory = "~/Desktop"
//! excluded_files = ["desktop.ini"]
//! excluded_patterns = ["*.lnk", "~$*"]
//!
//! [extension_groups]
//! Image = [".jpg", ".jpeg", ".png"]
//! Video = [".mp4", ".mkv"]
//! Document = [".pdf", ".txt"]
//!
//! [custom_folder_names]
//! Image = "Pictures"
//!
//! [archive]
//! enabled = true
//! days_old = 30
//! ```
//!
//! Extension groups are matched in the order they appear in the file.

use crate::error::ConfigError;
use crate::file_category::{Category, CategoryMapper};
use crate::history::JOURNAL_FILE_NAME;
use crate::logging::LOG_FILE_NAME;
use glob::Pattern;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-directory config file looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = ".desktidy.toml";
/// JSON config file name used by earlier versions of the tool.
pub const LEGACY_CONFIG_FILE: &str = "config.json";

const SECONDS_PER_DAY: u64 = 86_400;

/// Raw configuration as read from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Directory organized when none is given on the command line.
    pub source_directory: Option<String>,
    /// Category label to extension list, in match order.
    pub extension_groups: ExtensionGroups,
    /// Exact basenames never touched by organize or undo.
    pub excluded_files: Vec<String>,
    /// Glob patterns over basenames, treated like `excluded_files`.
    pub excluded_patterns: Vec<String>,
    /// Category label to the folder its files go into.
    pub custom_folder_names: BTreeMap<String, String>,
    pub archive: ArchiveSettings,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            source_directory: None,
            extension_groups: ExtensionGroups::standard(),
            excluded_files: Vec::new(),
            excluded_patterns: Vec::new(),
            custom_folder_names: BTreeMap::new(),
            archive: ArchiveSettings::default(),
        }
    }
}

/// Stale-file archival policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    pub enabled: bool,
    /// Files whose modification time is older than this many days get archived.
    pub days_old: u64,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            days_old: 30,
        }
    }
}

impl ArchiveSettings {
    /// Age a file must exceed to be considered stale.
    pub fn threshold(&self) -> Duration {
        Duration::from_secs(self.days_old.saturating_mul(SECONDS_PER_DAY))
    }
}

/// Extension groups in document order.
///
/// Serialized as a map; the order of keys is preserved because it decides
/// which group wins when an extension appears in more than one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionGroups(pub Vec<(String, Vec<String>)>);

impl ExtensionGroups {
    /// The groups used when nothing is configured.
    pub fn standard() -> Self {
        let group = |label: &str, exts: &[&str]| {
            (
                label.to_string(),
                exts.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
            )
        };
        Self(vec![
            group(
                "Image",
                &[".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".webp"],
            ),
            group("Video", &[".mp4", ".avi", ".mkv", ".mov", ".webm", ".flv"]),
            group("Audio", &[".mp3", ".wav", ".flac", ".aac", ".wma"]),
            group("Document", &[".pdf", ".docx", ".doc", ".txt", ".odt"]),
            group("Executable", &[".exe", ".msi"]),
        ])
    }
}

impl Serialize for ExtensionGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, extensions) in &self.0 {
            map.serialize_entry(label, extensions)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExtensionGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupsVisitor;

        impl<'de> Visitor<'de> for GroupsVisitor {
            type Value = ExtensionGroups;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of category names to extension lists")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut groups = Vec::new();
                while let Some((label, extensions)) = access.next_entry::<String, Vec<String>>()? {
                    groups.push((label, extensions));
                }
                Ok(ExtensionGroups(groups))
            }
        }

        deserializer.deserialize_map(GroupsVisitor)
    }
}

impl CleanerConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. `.desktidy.toml` in the current directory
    /// 3. `config.json` in the current directory
    /// 4. `~/.config/desktidy/config.toml`
    /// 5. Built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly provided file is missing, or if any
    /// file that is found cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        for candidate in [LOCAL_CONFIG_FILE, LEGACY_CONFIG_FILE] {
            let local = PathBuf::from(candidate);
            if local.is_file() {
                return Self::load_from_file(&local);
            }
        }

        if let Some(config_dir) = dirs::home_dir() {
            let home_config = config_dir
                .join(".config")
                .join("desktidy")
                .join("config.toml");
            if home_config.is_file() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file. `.json` files are parsed as
    /// JSON, everything else as TOML.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content).map_err(|reason| ConfigError::Invalid {
                path: path.to_path_buf(),
                reason,
            })
        } else {
            Self::from_toml_str(&content).map_err(|reason| ConfigError::Invalid {
                path: path.to_path_buf(),
                reason,
            })
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    pub fn from_json_str(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    /// Validates the configuration and builds the structures the passes use.
    ///
    /// # Errors
    ///
    /// Returns an error for reserved group labels, unusable folder names or
    /// invalid glob patterns.
    pub fn compile(self) -> Result<CompiledConfig, ConfigError> {
        let mut mapper = CategoryMapper::empty();
        for (label, extensions) in self.extension_groups.0 {
            if Category::is_reserved_label(&label) {
                return Err(ConfigError::ReservedCategory(label));
            }
            // Without a custom name the label itself becomes the folder.
            if !self.custom_folder_names.contains_key(&label) && !is_valid_folder_name(&label) {
                return Err(ConfigError::InvalidFolderName {
                    name: label.clone(),
                    category: label,
                });
            }
            mapper.add_group(Category::new(label), extensions);
        }

        for (label, name) in self.custom_folder_names {
            if Category::new(label.as_str()).is_folder() {
                return Err(ConfigError::ReservedCategory(label));
            }
            if !is_valid_folder_name(&name) {
                return Err(ConfigError::InvalidFolderName {
                    category: label,
                    name,
                });
            }
            mapper.set_folder_name(Category::new(label), name);
        }

        let exclusions = Exclusions::new(self.excluded_files, &self.excluded_patterns)?;

        Ok(CompiledConfig {
            source_directory: self.source_directory.as_deref().map(expand_home),
            mapper,
            exclusions,
            archive: self.archive,
        })
    }
}

/// A folder name must be a single, ordinary path component.
fn is_valid_folder_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Expands a leading `~` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Basenames exempt from both organize and undo.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    filenames: HashSet<String>,
    patterns: Vec<Pattern>,
}

impl Exclusions {
    /// Builds the exclusion set, compiling every glob pattern up front.
    pub fn new<I>(filenames: I, patterns: &[String]) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlobPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            filenames: filenames.into_iter().collect(),
            patterns,
        })
    }

    /// True if a basename is excluded by name or by pattern.
    pub fn is_excluded(&self, file_name: &str) -> bool {
        self.filenames.contains(file_name)
            || self.patterns.iter().any(|pattern| pattern.matches(file_name))
    }
}

/// Validated configuration handed to every pass.
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub source_directory: Option<PathBuf>,
    pub mapper: CategoryMapper,
    pub exclusions: Exclusions,
    pub archive: ArchiveSettings,
}

impl Default for CompiledConfig {
    fn default() -> Self {
        Self {
            source_directory: None,
            mapper: CategoryMapper::with_standard_groups(),
            exclusions: Exclusions::default(),
            archive: ArchiveSettings::default(),
        }
    }
}

impl CompiledConfig {
    /// True for files this tool writes into the organized directory itself:
    /// the journal, the log and the archive containers.
    pub fn is_reserved_file(&self, file_name: &str) -> bool {
        file_name == JOURNAL_FILE_NAME
            || file_name == LOG_FILE_NAME
            || self.mapper.is_archive_container(file_name)
    }
}

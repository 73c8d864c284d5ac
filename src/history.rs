/// Persisted record of the moves made by one organize run.
///
/// The journal lives at `<directory>/move_history.json` as a JSON array of
/// `{original_path, new_path, timestamp}` objects. Each organize run replaces
/// it wholesale; undo consumes it.
use crate::error::{OrganizeError, OrganizeResult};
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, de};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the journal inside the organized directory.
pub const JOURNAL_FILE_NAME: &str = "move_history.json";

/// One successful relocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Where the entry was before organize touched it.
    pub original_path: PathBuf,
    /// Where organize put it.
    pub new_path: PathBuf,
    /// When the move happened.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Local>,
}

/// Reads an RFC 3339 timestamp, or an ISO-8601 one without an offset
/// (`2024-05-01T10:20:30.123456`), which is taken as local time.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(timestamp.with_timezone(&Local));
    }

    let naive = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f").map_err(|e| {
        <D::Error as de::Error>::custom(format!("invalid timestamp '{}': {}", raw, e))
    })?;
    naive.and_local_timezone(Local).earliest().ok_or_else(|| {
        <D::Error as de::Error>::custom(format!("timestamp '{}' does not exist locally", raw))
    })
}

impl MoveRecord {
    /// Creates a record stamped with the current local time.
    pub fn new(original_path: PathBuf, new_path: PathBuf) -> Self {
        Self {
            original_path,
            new_path,
            timestamp: Local::now(),
        }
    }

    /// Basename of the original path, used to match exclusions on undo.
    pub fn original_name(&self) -> Option<String> {
        self.original_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

/// Ordered list of the moves made by one organize run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryJournal {
    records: Vec<MoveRecord>,
}

impl HistoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<MoveRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: MoveRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[MoveRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MoveRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the path of the journal file for a directory.
    pub fn journal_path(base_path: &Path) -> PathBuf {
        base_path.join(JOURNAL_FILE_NAME)
    }

    /// True if an unconsumed journal exists for `base_path`.
    pub fn exists(base_path: &Path) -> bool {
        Self::journal_path(base_path).is_file()
    }

    /// Writes the journal, replacing any previous one.
    pub fn save(&self, base_path: &Path) -> OrganizeResult<()> {
        let history_path = Self::journal_path(base_path);
        let json_string = serde_json::to_string_pretty(self).map_err(|e| {
            OrganizeError::HistoryWriteFailed {
                path: history_path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("JSON serialization failed: {}", e),
                ),
            }
        })?;

        fs::write(&history_path, json_string).map_err(|e| OrganizeError::HistoryWriteFailed {
            path: history_path,
            source: e,
        })
    }

    /// Loads the journal for `base_path`, or `None` if there is none.
    pub fn load(base_path: &Path) -> OrganizeResult<Option<Self>> {
        let history_path = Self::journal_path(base_path);

        if !history_path.exists() {
            return Ok(None);
        }

        let json_string =
            fs::read_to_string(&history_path).map_err(|e| OrganizeError::HistoryReadFailed {
                path: history_path.clone(),
                source: e,
            })?;

        serde_json::from_str(&json_string)
            .map(Some)
            .map_err(|e| OrganizeError::InvalidHistoryFormat {
                path: history_path,
                reason: e.to_string(),
            })
    }

    /// Removes the journal. Returns false if there was nothing to remove.
    pub fn delete(base_path: &Path) -> OrganizeResult<bool> {
        let history_path = Self::journal_path(base_path);
        if !history_path.exists() {
            return Ok(false);
        }

        fs::remove_file(&history_path).map_err(|e| OrganizeError::HistoryWriteFailed {
            path: history_path,
            source: e,
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(base: &Path, name: &str, folder: &str) -> MoveRecord {
        MoveRecord::new(base.join(name), base.join(folder).join(name))
    }

    #[test]
    fn test_load_without_journal_is_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        assert!(HistoryJournal::load(temp_dir.path()).unwrap().is_none());
        assert!(!HistoryJournal::exists(temp_dir.path()));
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let mut journal = HistoryJournal::new();
        journal.push(record(base, "b.txt", "Document"));
        journal.push(record(base, "a.jpg", "Image"));
        journal.save(base).expect("Failed to save journal");

        let loaded = HistoryJournal::load(base).unwrap().expect("journal missing");
        assert_eq!(loaded, journal);
        assert_eq!(loaded.records()[0].original_path, base.join("b.txt"));
    }

    #[test]
    fn test_journal_is_a_plain_json_array() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let mut journal = HistoryJournal::new();
        journal.push(record(base, "a.jpg", "Image"));
        journal.save(base).unwrap();

        let raw = fs::read_to_string(HistoryJournal::journal_path(base)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entries = value.as_array().expect("journal should be an array");
        assert_eq!(entries.len(), 1);
        assert!(entries[0]["original_path"].is_string());
        assert!(entries[0]["new_path"].is_string());
        assert!(entries[0]["timestamp"].is_string());
    }

    #[test]
    fn test_save_overwrites_previous_journal() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        HistoryJournal::from_records(vec![record(base, "first.txt", "Document")])
            .save(base)
            .unwrap();
        HistoryJournal::from_records(vec![record(base, "second.txt", "Document")])
            .save(base)
            .unwrap();

        let loaded = HistoryJournal::load(base).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.records()[0].original_name().as_deref(), Some("second.txt"));
    }

    #[test]
    fn test_load_accepts_timestamps_without_offset() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        fs::write(
            HistoryJournal::journal_path(base),
            r#"[
  {
    "original_path": "/desk/notes.txt",
    "new_path": "/desk/Document/notes.txt",
    "timestamp": "2024-05-01T10:20:30.123456"
  },
  {
    "original_path": "/desk/a.jpg",
    "new_path": "/desk/Image/a.jpg",
    "timestamp": "2024-05-01T10:20:31"
  }
]"#,
        )
        .unwrap();

        let loaded = HistoryJournal::load(base).unwrap().expect("journal missing");

        assert_eq!(loaded.len(), 2);
        let expected = chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_micro_opt(10, 20, 30, 123_456)
            .unwrap();
        assert_eq!(loaded.records()[0].timestamp.naive_local(), expected);
        assert_eq!(
            loaded.records()[1].original_path,
            PathBuf::from("/desk/a.jpg")
        );
    }

    #[test]
    fn test_saved_timestamps_carry_an_offset() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();
        HistoryJournal::from_records(vec![record(base, "a.jpg", "Image")])
            .save(base)
            .unwrap();

        let raw = fs::read_to_string(HistoryJournal::journal_path(base)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let timestamp = value[0]["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_corrupt_journal_is_rejected() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(HistoryJournal::journal_path(temp_dir.path()), "{ not json").unwrap();

        let result = HistoryJournal::load(temp_dir.path());
        assert!(matches!(
            result,
            Err(OrganizeError::InvalidHistoryFormat { .. })
        ));
    }

    #[test]
    fn test_delete_reports_whether_a_journal_existed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        assert!(!HistoryJournal::delete(base).unwrap());
        HistoryJournal::new().save(base).unwrap();
        assert!(HistoryJournal::delete(base).unwrap());
        assert!(!HistoryJournal::exists(base));
    }
}

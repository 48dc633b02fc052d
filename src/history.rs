//! Recently produced posts and user feedback, persisted on disk

use crate::error::Result;
use crate::pipeline::PipelineState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// How many entries [`RecentHistory::recent`] returns
pub const RECENT_LIMIT: usize = 3;

/// Most entries kept on disk; older ones are dropped first
pub const MAX_STORED_ENTRIES: usize = RECENT_LIMIT * 10;

const HISTORY_FILE: &str = "history.json";
const FEEDBACK_FILE: &str = "feedback.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub theme: String,
    pub subtopic: String,
    pub caption: String,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Entry for a session that has produced a non-empty caption
    pub fn from_state(state: &PipelineState) -> Option<Self> {
        let theme = state.theme()?;
        let selection = state.selection()?;
        let caption = state.caption().filter(|c| !c.caption.is_empty())?;

        Some(Self {
            theme: theme.as_str().to_string(),
            subtopic: selection.choice.clone(),
            caption: caption.caption.clone(),
            recorded_at: Utc::now(),
        })
    }
}

/// Posts produced so far, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentHistory {
    entries: Vec<HistoryEntry>,
}

impl RecentHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry unless one with the same theme and subtopic exists.
    ///
    /// Returns whether the entry was added.
    pub fn record(&mut self, entry: HistoryEntry) -> bool {
        let duplicate = self
            .entries
            .iter()
            .any(|e| e.theme == entry.theme && e.subtopic == entry.subtopic);
        if duplicate {
            debug!(theme = %entry.theme, subtopic = %entry.subtopic, "Already in history");
            return false;
        }
        self.entries.push(entry);
        self.trim();
        true
    }

    fn trim(&mut self) {
        let excess = self.entries.len().saturating_sub(MAX_STORED_ENTRIES);
        if excess > 0 {
            self.entries.drain(..excess);
        }
    }

    /// The latest entries, newest first
    pub fn recent(&self) -> Vec<&HistoryEntry> {
        self.entries.iter().rev().take(RECENT_LIMIT).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// JSON file holding a [`RecentHistory`]
pub struct HistoryStore {
    root: PathBuf,
}

impl HistoryStore {
    pub fn with_root(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }

    /// Load the history; a missing file is an empty history and a corrupted
    /// one is moved aside.
    pub fn load(&self) -> Result<RecentHistory> {
        let path = self.path();
        if !path.exists() {
            return Ok(RecentHistory::new());
        }

        let contents = fs::read_to_string(&path)?;
        match serde_json::from_str::<RecentHistory>(&contents) {
            Ok(mut history) => {
                history.trim();
                Ok(history)
            }
            Err(e) => {
                let backup = self.root.join(format!(
                    "{HISTORY_FILE}.corrupted.{}",
                    Utc::now().timestamp()
                ));
                fs::rename(&path, &backup)?;
                warn!(error = %e, backup = %backup.display(), "History file corrupted, starting fresh");
                Ok(RecentHistory::new())
            }
        }
    }

    pub fn save(&self, history: &RecentHistory) -> Result<()> {
        let json = serde_json::to_string_pretty(history)?;

        // Write to temp file first, then rename atomically
        let temp_file = self.root.join(format!("{HISTORY_FILE}.tmp"));
        fs::write(&temp_file, json)?;
        fs::rename(&temp_file, self.path())?;

        Ok(())
    }

    /// Record the session's caption, if any, and persist the history
    pub fn record_state(&self, state: &PipelineState) -> Result<bool> {
        let Some(entry) = HistoryEntry::from_state(state) else {
            return Ok(false);
        };

        let mut history = self.load()?;
        let added = history.record(entry);
        if added {
            self.save(&history)?;
        }
        Ok(added)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub timestamp: DateTime<Utc>,
    pub theme: String,
    pub comment: String,
}

/// Append-only `timestamp;theme;comment` file
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Log stored as `feedback.csv` under `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(FEEDBACK_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, theme: &str, comment: &str) -> Result<FeedbackRecord> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let record = FeedbackRecord {
            timestamp: Utc::now(),
            theme: theme.trim().to_string(),
            comment: comment.trim().to_string(),
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_writer(file);
        writer.serialize(&record)?;
        writer.flush()?;

        Ok(record)
    }

    /// Every record in file order; an absent log reads as empty
    pub fn read_all(&self) -> Result<Vec<FeedbackRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_path(&self.path)?;
        let mut records = Vec::new();
        for record in reader.deserialize() {
            records.push(record?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{CaptionResult, Selection, Theme};
    use tempfile::TempDir;

    fn entry(theme: &str, subtopic: &str) -> HistoryEntry {
        HistoryEntry {
            theme: theme.to_string(),
            subtopic: subtopic.to_string(),
            caption: format!("{subtopic} caption"),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_duplicates_are_skipped() {
        let mut history = RecentHistory::new();
        assert!(history.record(entry("eco", "Reciclagem")));
        assert!(!history.record(entry("eco", "Reciclagem")));
        assert!(history.record(entry("eco", "Energia solar")));
        assert!(history.record(entry("moda", "Reciclagem")));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_recent_returns_last_three_newest_first() {
        let mut history = RecentHistory::new();
        for subtopic in ["a", "b", "c", "d"] {
            history.record(entry("t", subtopic));
        }

        let subtopics: Vec<&str> = history
            .recent()
            .iter()
            .map(|e| e.subtopic.as_str())
            .collect();
        assert_eq!(subtopics, vec!["d", "c", "b"]);
    }

    #[test]
    fn test_stored_history_is_bounded() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::with_root(temp_dir.path().to_path_buf()).unwrap();

        let mut history = RecentHistory::new();
        for i in 0..MAX_STORED_ENTRIES + 5 {
            history.record(entry("t", &format!("sub {i}")));
        }
        assert_eq!(history.len(), MAX_STORED_ENTRIES);
        store.save(&history).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        let stored = saved["entries"].as_array().unwrap();
        assert_eq!(stored.len(), MAX_STORED_ENTRIES);
        assert_eq!(stored[0]["subtopic"], "sub 5");

        let newest = format!("sub {}", MAX_STORED_ENTRIES + 4);
        assert_eq!(store.load().unwrap().recent()[0].subtopic, newest);
    }

    #[test]
    fn test_oversized_history_file_is_trimmed_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::with_root(temp_dir.path().to_path_buf()).unwrap();

        let entries: Vec<HistoryEntry> = (0..MAX_STORED_ENTRIES * 2)
            .map(|i| entry("t", &format!("sub {i}")))
            .collect();
        fs::write(
            store.path(),
            serde_json::to_string(&serde_json::json!({ "entries": entries })).unwrap(),
        )
        .unwrap();

        assert_eq!(store.load().unwrap().len(), MAX_STORED_ENTRIES);
    }

    #[test]
    fn test_entry_requires_caption() {
        let mut state = PipelineState::new();
        state.start(Theme::parse("eco").unwrap(), 3);
        state.set_subtopics(vec!["Reciclagem".to_string()]);
        state.set_selection(Selection {
            choice: "Reciclagem".to_string(),
            reason: "r".to_string(),
        });
        assert!(HistoryEntry::from_state(&state).is_none());

        state.set_caption(CaptionResult::plain("Recicle!"));
        let entry = HistoryEntry::from_state(&state).unwrap();
        assert_eq!(entry.theme, "eco");
        assert_eq!(entry.subtopic, "Reciclagem");
        assert_eq!(entry.caption, "Recicle!");
    }

    #[test]
    fn test_store_round_trip_and_corruption_backup() {
        let temp_dir = TempDir::new().unwrap();
        let store = HistoryStore::with_root(temp_dir.path().to_path_buf()).unwrap();
        assert!(store.load().unwrap().is_empty());

        let mut history = RecentHistory::new();
        history.record(entry("eco", "Reciclagem"));
        store.save(&history).unwrap();
        assert_eq!(store.load().unwrap(), history);
        assert!(!temp_dir.path().join("history.json.tmp").exists());

        fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().unwrap().is_empty());
        let backups = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupted."))
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_feedback_appends_delimited_rows() {
        let temp_dir = TempDir::new().unwrap();
        let log = FeedbackLog::in_dir(temp_dir.path());
        assert!(log.read_all().unwrap().is_empty());

        log.append("eco", "Gostei muito").unwrap();
        log.append("moda", "Legenda longa; poderia ser menor").unwrap();

        let contents = fs::read_to_string(log.path()).unwrap();
        let first_line = contents.lines().next().unwrap();
        assert!(first_line.ends_with(";eco;Gostei muito"));

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].theme, "moda");
        assert_eq!(records[1].comment, "Legenda longa; poderia ser menor");
    }
}

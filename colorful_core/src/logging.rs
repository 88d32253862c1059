//! Learning journal.
//!
//! Every learning call made through a session is recorded with the context it
//! saw, what the model predicted before learning, the outcome, and the
//! prototypes of the involved categories before and after. Entries are kept
//! in memory and, when the journal has a path, appended as JSON lines.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::color::Color;
use crate::learning::LearningOutcome;
use crate::model::Category;

/// Which learning rule produced an entry.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LearningMode {
    Statistical,
    Naive,
    ContextSensitive,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LearningLogEntry {
    pub sequence: usize,
    pub mode: LearningMode,
    pub timestamp_ms: u128,
    pub colors: Vec<Color>,
    /// Slot the labels refer to, for single-label calls.
    pub target_index: Option<usize>,
    pub labels: Vec<String>,
    /// Whether the best-acceptability category already matched every label.
    pub naive_prediction_correct: bool,
    /// Whether the best-score category already matched every label.
    pub context_prediction_correct: bool,
    pub outcome: LearningOutcome,
    pub categories_before: Vec<(String, Category)>,
    pub categories_after: Vec<(String, Category)>,
}

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

/// Sequenced journal of learning calls.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LearningJournal {
    path: Option<PathBuf>,
    sequence: usize,
    entries: Vec<LearningLogEntry>,
}

impl LearningJournal {
    /// Journal kept in memory only.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Journal that also appends every entry to `path` as one JSON line.
    pub fn with_file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &[LearningLogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LearningLogEntry> {
        self.entries.last()
    }

    /// Stamps `entry` with the next sequence number and stores it. The entry
    /// stays in memory even when appending it to the file fails.
    pub fn record(&mut self, mut entry: LearningLogEntry) -> io::Result<()> {
        self.sequence += 1;
        entry.sequence = self.sequence;
        let written = match &self.path {
            Some(path) => append_json_line(path, &entry),
            None => Ok(()),
        };
        self.entries.push(entry);
        written
    }

    pub fn timestamp_now() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(label: &str) -> LearningLogEntry {
        LearningLogEntry {
            sequence: 0,
            mode: LearningMode::Statistical,
            timestamp_ms: 0,
            colors: vec![Color::new(10.0, 90.0, 50.0).unwrap()],
            target_index: Some(0),
            labels: vec![label.to_string()],
            naive_prediction_correct: true,
            context_prediction_correct: false,
            outcome: LearningOutcome::NoChangeNeeded,
            categories_before: Vec::new(),
            categories_after: Vec::new(),
        }
    }

    #[test]
    fn journal_records_sequence_in_order() {
        let mut journal = LearningJournal::in_memory();
        for label in ["red", "orange", "yellow"] {
            journal.record(entry(label)).unwrap();
        }
        let sequences: Vec<usize> = journal.entries().iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert_eq!(journal.last().unwrap().labels, vec!["yellow".to_string()]);
    }

    #[test]
    fn journal_appends_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("learning.jsonl");
        let mut journal = LearningJournal::with_file(&path);
        journal.record(entry("red")).unwrap();
        journal.record(entry("blue")).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["sequence"], 2);
        assert_eq!(second["mode"], "statistical");
        assert_eq!(second["outcome"]["outcome"], "no_change_needed");
    }
}

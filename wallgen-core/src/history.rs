//! Which prompt produced which wallpaper.
//!
//! One `wallpaper_<N>.jpg|<timestamp>|<prompt>` line per installed wallpaper.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::output::slot_file_name;

const MAX_ENTRIES: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub file_name: String,
    pub generated_at: DateTime<Utc>,
    pub prompt: String,
}

impl HistoryEntry {
    fn to_line(&self) -> String {
        // prompts are free text; keep the record on one line
        let prompt = self.prompt.replace(['\n', '\r'], " ");
        format!("{}|{}|{}", self.file_name, self.generated_at.to_rfc3339(), prompt)
    }

    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, '|');
        let file_name = parts.next()?.trim();
        let generated_at = DateTime::parse_from_rfc3339(parts.next()?.trim()).ok()?;
        let prompt = parts.next()?;
        if file_name.is_empty() {
            return None;
        }
        Some(HistoryEntry {
            file_name: file_name.to_string(),
            generated_at: generated_at.with_timezone(&Utc),
            prompt: prompt.to_string(),
        })
    }
}

pub fn load(history_file: &Path) -> Result<Vec<HistoryEntry>> {
    if !history_file.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(history_file)?;
    Ok(content.lines().filter_map(HistoryEntry::parse).collect())
}

/// Records `prompt` for slot `index`, replacing an older entry for the same file.
pub fn record(history_file: &Path, index: u64, prompt: &str) -> Result<HistoryEntry> {
    let entry = HistoryEntry {
        file_name: slot_file_name(index),
        generated_at: Utc::now(),
        prompt: prompt.to_string(),
    };

    let mut entries = load(history_file)?;
    entries.retain(|e| e.file_name != entry.file_name);
    entries.push(entry.clone());
    if entries.len() > MAX_ENTRIES {
        entries.drain(..entries.len() - MAX_ENTRIES);
    }

    if let Some(parent) = history_file.parent() {
        fs::create_dir_all(parent)?;
    }
    let content: String = entries.iter().map(|e| e.to_line() + "\n").collect();
    fs::write(history_file, content)?;

    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("history.conf");

        record(&file, 1, "a fox | in the snow").unwrap();
        record(&file, 2, "neon city\nat night").unwrap();

        let entries = load(&file).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file_name, "wallpaper_1.jpg");
        assert_eq!(entries[0].prompt, "a fox | in the snow");
        assert_eq!(entries[1].prompt, "neon city at night");
    }

    #[test]
    fn same_slot_replaces_entry() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("history.conf");

        record(&file, 3, "first").unwrap();
        record(&file, 3, "second").unwrap();

        let entries = load(&file).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].prompt, "second");
    }

    #[test]
    fn keeps_only_newest_entries() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("history.conf");
        for i in 1..=(MAX_ENTRIES as u64 + 5) {
            record(&file, i, "p").unwrap();
        }

        let entries = load(&file).unwrap();
        assert_eq!(entries.len(), MAX_ENTRIES);
        assert_eq!(entries[0].file_name, "wallpaper_6.jpg");
    }

    #[test]
    fn skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("history.conf");
        fs::write(
            &file,
            "garbage\nwallpaper_1.jpg|not-a-date|x\nwallpaper_2.jpg|2024-05-01T10:00:00+00:00|ok\n",
        )
        .unwrap();

        let entries = load(&file).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_name, "wallpaper_2.jpg");
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("none.conf")).unwrap().is_empty());
    }
}

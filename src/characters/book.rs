use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::settings::CharacterEntry;

use super::directory::CharacterDirectory;

/// Partition key used while the host has no character selected.
pub const NO_CHARACTER_KEY: &str = "no_char_selected";

const PREVIEW_CHARS: usize = 50;

/// Maps the host's current character id to the key its entry lives under.
pub fn partition_key(current: Option<&str>) -> String {
    match current.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => NO_CHARACTER_KEY.to_string(),
    }
}

/// One row of the saved-notes listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedNote {
    pub key: String,
    pub name: String,
    pub preview: String,
    pub content: String,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-character settings partitions, keyed by character identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct CharacterBook {
    entries: BTreeMap<String, CharacterEntry>,
}

impl CharacterBook {
    /// Returns the partition for `current`, creating it on first sight and
    /// backfilling caption lists an older entry may lack.
    ///
    /// Every call for the same key hands out the same slot, so edits made
    /// through the returned reference are what the next caller sees.
    pub fn resolve(&mut self, current: Option<&str>) -> (String, &mut CharacterEntry) {
        let key = partition_key(current);
        let entry = self.entries.entry(key.clone()).or_default();
        entry.backfill();
        (key, entry)
    }

    pub fn get(&self, key: &str) -> Option<&CharacterEntry> {
        self.entries.get(key)
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn insert(&mut self, key: String, entry: CharacterEntry) {
        self.entries.insert(key, entry);
    }

    /// Removes the entry. Clearing anything displayed from it is the caller's job.
    pub fn delete(&mut self, key: &str) -> Option<CharacterEntry> {
        self.entries.remove(key)
    }

    /// Moves the entry at `from` to `to`, replacing whatever `to` held.
    ///
    /// Nothing is touched when the target is blank, equal to the source, or the
    /// source has no entry.
    pub fn migrate(&mut self, from: &str, to: &str) -> Result<()> {
        let target = to.trim();
        if target.is_empty() {
            bail!("Choose a character to move the memo to");
        }
        if target == from {
            bail!("The memo already belongs to that character");
        }
        let Some(entry) = self.entries.get(from).cloned() else {
            bail!("No saved memo for '{from}'");
        };

        self.entries.insert(target.to_string(), entry);
        self.entries.remove(from);
        Ok(())
    }

    /// Entries with a non-blank memo, excluding the no-character partition.
    /// Most recently edited first; entries never stamped follow in key order.
    pub fn saved_notes(&self, directory: &CharacterDirectory) -> Vec<SavedNote> {
        let mut notes: Vec<SavedNote> = self
            .entries
            .iter()
            .filter(|(key, entry)| key.as_str() != NO_CHARACTER_KEY && entry.has_memo())
            .map(|(key, entry)| SavedNote {
                key: key.clone(),
                name: directory.display_name(key),
                preview: memo_preview(&entry.memo_content),
                content: entry.memo_content.clone(),
                updated_at: entry.updated_at,
            })
            .collect();

        // Stable sort keeps the BTreeMap's key order among equal timestamps.
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        notes
    }
}

/// First line of the memo, cut to 50 characters. The ellipsis marks both a cut
/// line and further lines below it.
pub fn memo_preview(memo: &str) -> String {
    let trimmed = memo.trim();
    let mut lines = trimmed.lines();
    let first = lines.next().unwrap_or_default();
    let more_lines = lines.next().is_some();

    let mut preview: String = first.chars().take(PREVIEW_CHARS).collect();
    if more_lines || first.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

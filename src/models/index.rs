use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{NoteRecord, PathRecord};

/// The garden's authoritative metadata store, persisted as `index.json`.
///
/// Maps are keyed by note title, tag name and path topic. Entries keep the
/// order they were first added in, both in memory and in the JSON layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GardenIndex {
    #[serde(default)]
    pub notes: IndexMap<String, NoteRecord>,
    #[serde(default)]
    pub tags: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub paths: IndexMap<String, PathRecord>,
    #[serde(with = "super::timestamp")]
    pub last_updated: OffsetDateTime,
}

impl Default for GardenIndex {
    fn default() -> Self {
        Self {
            notes: IndexMap::new(),
            tags: IndexMap::new(),
            paths: IndexMap::new(),
            last_updated: OffsetDateTime::now_utc(),
        }
    }
}

impl GardenIndex {
    /// Returns true if a note with this exact title exists.
    pub fn contains_note(&self, title: &str) -> bool {
        self.notes.contains_key(title)
    }

    /// Records `title` under `tag`, creating the tag on first use.
    pub fn tag_note(&mut self, tag: &str, title: &str) {
        let titles = self.tags.entry(tag.to_string()).or_default();
        if !titles.iter().any(|t| t == title) {
            titles.push(title.to_string());
        }
    }

    /// Returns the titles carrying any of `tags` (set union).
    pub fn titles_with_any_tag(&self, tags: &[&str]) -> std::collections::HashSet<String> {
        tags.iter()
            .filter_map(|tag| self.tags.get(*tag))
            .flatten()
            .cloned()
            .collect()
    }

    /// Returns the title of another note already stored at `path`, if any.
    pub fn note_at_path(&self, path: &str, except: &str) -> Option<&str> {
        self.notes
            .iter()
            .find(|(title, record)| record.path == path && title.as_str() != except)
            .map(|(title, _)| title.as_str())
    }
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Index summary of an exploration path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    /// File location relative to the garden root (e.g. `paths/ownership.json`).
    pub path: String,
    #[serde(with = "super::timestamp")]
    pub created: OffsetDateTime,
    #[serde(default)]
    pub subtopics: Vec<String>,
}

/// A curated tour through the garden: a topic, its subtopics, and the notes
/// collected under it so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationPath {
    pub topic: String,
    #[serde(default)]
    pub subtopics: Vec<String>,
    pub description: String,
    #[serde(with = "super::timestamp")]
    pub created: OffsetDateTime,
    /// Member note titles, in the order they were added.
    #[serde(default)]
    pub notes: Vec<String>,
}

impl ExplorationPath {
    /// Creates a path with no member notes.
    ///
    /// Uses `Exploration path for <topic>` when no description is given.
    pub fn new(topic: &str, subtopics: Vec<String>, description: Option<&str>) -> Self {
        Self {
            topic: topic.to_string(),
            subtopics,
            description: description
                .map(str::to_string)
                .unwrap_or_else(|| format!("Exploration path for {topic}")),
            created: OffsetDateTime::now_utc(),
            notes: Vec::new(),
        }
    }
}

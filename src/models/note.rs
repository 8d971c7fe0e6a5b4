use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Index entry for a single note.
///
/// The index is the source of truth for search and graph building; the
/// markdown file named by `path` is rendered from this record plus the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    /// File location relative to the garden root (e.g. `notes/rust.md`).
    pub path: String,
    /// When this note was created.
    #[serde(with = "super::timestamp")]
    pub created: OffsetDateTime,
    /// Tags as given by the author, in order.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Titles of related notes.
    #[serde(default)]
    pub related_notes: Vec<String>,
}

/// A note with its body and metadata.
///
/// Notes are the primary unit of knowledge in the garden. The title is the
/// unique key and also the stem of the markdown file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    title: String,
    content: String,
    #[serde(with = "super::timestamp")]
    created: OffsetDateTime,
    tags: Vec<String>,
    related_notes: Vec<String>,
}

impl Note {
    /// Returns the note title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the note body without heading or metadata.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the creation timestamp.
    pub fn created(&self) -> OffsetDateTime {
        self.created
    }

    /// Returns the note's tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the titles this note relates to.
    pub fn related_notes(&self) -> &[String] {
        &self.related_notes
    }
}

/// Assembles a [`Note`]; only the title is required.
///
/// # Examples
///
/// ```
/// use garden::NoteBuilder;
///
/// let note = NoteBuilder::new()
///     .title("Ownership")
///     .content("Every value has a single owner.")
///     .build();
///
/// assert_eq!(note.title(), "Ownership");
/// assert!(note.tags().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct NoteBuilder {
    title: Option<String>,
    content: Option<String>,
    created: Option<OffsetDateTime>,
    tags: Option<Vec<String>>,
    related_notes: Option<Vec<String>>,
}

impl NoteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a builder from an index record, keeping its timestamps and links.
    pub fn from_record(title: impl Into<String>, record: &NoteRecord) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
            created: Some(record.created),
            tags: Some(record.tags.clone()),
            related_notes: Some(record.related_notes.clone()),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Defaults to now.
    pub fn created(mut self, created: OffsetDateTime) -> Self {
        self.created = Some(created);
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn related_notes(mut self, related_notes: Vec<String>) -> Self {
        self.related_notes = Some(related_notes);
        self
    }

    /// # Panics
    ///
    /// Panics if `title` has not been set.
    pub fn build(self) -> Note {
        Note {
            title: self.title.expect("title is required"),
            content: self.content.unwrap_or_default(),
            created: self.created.unwrap_or_else(OffsetDateTime::now_utc),
            tags: self.tags.unwrap_or_default(),
            related_notes: self.related_notes.unwrap_or_default(),
        }
    }
}

/// A single hit returned by note search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    /// First 200 characters of the note file, with `...` when truncated.
    pub preview: String,
    pub tags: Vec<String>,
    #[serde(with = "super::timestamp")]
    pub created: OffsetDateTime,
    pub related_notes: Vec<String>,
}

use anyhow::Result;
use time::OffsetDateTime;

use crate::markdown::{parse_body, preview, render_note};
use crate::summary::{self, GardenSummary};
use crate::utils::{clean_list, slugify};
use crate::{
    ExplorationPath, GardenIndex, GardenStore, Note, NoteBuilder, NoteRecord, PathRecord,
    SearchResult,
};

const PREVIEW_CHARS: usize = 200;

/// Service layer providing note and exploration path operations.
///
/// GardenService owns a [`GardenStore`] and implements the garden's business
/// rules on top of it. Every operation loads the index from disk, so the file
/// stays the single source of truth even when several processes share a
/// garden. This service is UI-independent and is used by the CLI, the agent,
/// and the HTTP server alike.
///
/// # Examples
///
/// ```
/// use garden::{GardenService, GardenStore};
///
/// # fn main() -> anyhow::Result<()> {
/// let dir = tempfile::tempdir()?;
/// let service = GardenService::new(GardenStore::open(dir.path())?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GardenService {
    store: GardenStore,
}

impl GardenService {
    /// Creates a new GardenService over the given store.
    pub fn new(store: GardenStore) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &GardenStore {
        &self.store
    }

    /// Loads the current index.
    pub fn index(&self) -> Result<GardenIndex> {
        self.store.load_index()
    }

    /// Adds a note to the garden.
    ///
    /// Writes `notes/<slug>.md`, records the note in the index and the tag
    /// map, and links every existing related note back to the new one. Adding
    /// a title that already exists replaces its record. Two titles that share
    /// a slug share one file; the most recent write wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use garden::{GardenService, GardenStore};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let service = GardenService::new(GardenStore::open(dir.path())?);
    ///
    /// service.add_note("Ownership", "Each value has one owner.", &["rust"], &[])?;
    /// service.add_note("Borrowing", "References borrow.", &["rust"], &["Ownership"])?;
    ///
    /// let index = service.index()?;
    /// assert_eq!(index.notes["Ownership"].related_notes, vec!["Borrowing"]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_note(
        &self,
        title: &str,
        content: &str,
        tags: &[&str],
        related_notes: &[&str],
    ) -> Result<String> {
        let title = title.trim();
        if title.is_empty() {
            anyhow::bail!("Note title cannot be empty");
        }

        let tags = clean_list(tags);
        let related_notes: Vec<String> = clean_list(related_notes)
            .into_iter()
            .filter(|r| r != title)
            .collect();

        let mut index = self.store.load_index()?;
        let location = GardenStore::note_location(&slugify(title));

        if let Some(other) = index.note_at_path(&location, title) {
            tracing::warn!(
                title,
                other,
                path = %location,
                "note file name collides with another title; overwriting"
            );
        }

        let note = NoteBuilder::new()
            .title(title)
            .content(content)
            .created(OffsetDateTime::now_utc())
            .tags(tags.clone())
            .related_notes(related_notes.clone())
            .build();
        self.store.write_file(&location, &render_note(&note))?;

        index.notes.insert(
            title.to_string(),
            NoteRecord {
                path: location.clone(),
                created: note.created(),
                tags: tags.clone(),
                related_notes: related_notes.clone(),
            },
        );

        for tag in &tags {
            index.tag_note(tag, title);
        }

        for related in &related_notes {
            self.link_back(&mut index, related, title, &location)?;
        }

        self.store.save_index(&mut index)?;
        tracing::info!(title, tags = tags.len(), related = related_notes.len(), "note added");

        Ok(format!("Note '{title}' added to the knowledge garden"))
    }

    /// Adds `title` to the related list of `target` and re-renders the
    /// target's file. Unknown targets are skipped, and so is the file when
    /// the target shares `written`, the file just written for `title`.
    fn link_back(
        &self,
        index: &mut GardenIndex,
        target: &str,
        title: &str,
        written: &str,
    ) -> Result<()> {
        let Some(record) = index.notes.get_mut(target) else {
            return Ok(());
        };
        if record.related_notes.iter().any(|r| r == title) {
            return Ok(());
        }
        record.related_notes.push(title.to_string());

        if record.path == written {
            tracing::debug!(target, title, path = written, "shared file left as written");
            return Ok(());
        }

        if let Some(text) = self.store.read_file(&record.path)? {
            let note = NoteBuilder::from_record(target, record)
                .content(parse_body(target, &text))
                .build();
            self.store.write_file(&record.path, &render_note(&note))?;
        }

        tracing::debug!(target, title, "reciprocal link added");
        Ok(())
    }

    /// Searches notes by case-insensitive substring over title and file text.
    ///
    /// A non-empty `tags` filter first narrows candidates to notes carrying
    /// any of the tags. Title matches rank ahead of content-only matches;
    /// ties keep index order. At most `limit` results are returned.
    pub fn search_notes(
        &self,
        query: &str,
        tags: &[&str],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        let index = self.store.load_index()?;
        let needle = query.to_lowercase();

        let allowed = (!tags.is_empty()).then(|| index.titles_with_any_tag(tags));

        let mut results = Vec::new();
        for (title, record) in &index.notes {
            if let Some(allowed) = &allowed
                && !allowed.contains(title)
            {
                continue;
            }

            let Some(text) = self.store.read_file(&record.path)? else {
                continue;
            };

            if title.to_lowercase().contains(&needle) || text.to_lowercase().contains(&needle) {
                results.push(SearchResult {
                    title: title.clone(),
                    preview: preview(&text, PREVIEW_CHARS),
                    tags: record.tags.clone(),
                    created: record.created,
                    related_notes: record.related_notes.clone(),
                });
            }
        }

        // sort_by_key is stable, so non-title matches keep index order
        results.sort_by_key(|r| !r.title.to_lowercase().contains(&needle));
        results.truncate(limit);

        Ok(results)
    }

    /// Returns the markdown text of a note, or `None` if the title is unknown
    /// or its file is missing.
    pub fn get_note_content(&self, title: &str) -> Result<Option<String>> {
        let index = self.store.load_index()?;
        match index.notes.get(title) {
            Some(record) => self.store.read_file(&record.path),
            None => Ok(None),
        }
    }

    /// Returns a note with its parsed body and index metadata.
    pub fn get_note(&self, title: &str) -> Result<Option<Note>> {
        let index = self.store.load_index()?;
        let Some(record) = index.notes.get(title) else {
            return Ok(None);
        };
        let Some(text) = self.store.read_file(&record.path)? else {
            return Ok(None);
        };

        Ok(Some(
            NoteBuilder::from_record(title, record)
                .content(parse_body(title, &text))
                .build(),
        ))
    }

    /// Returns `(title, body)` for every note whose file exists.
    pub fn note_bodies(&self) -> Result<Vec<(String, String)>> {
        let index = self.store.load_index()?;
        let mut bodies = Vec::with_capacity(index.notes.len());
        for (title, record) in &index.notes {
            if let Some(text) = self.store.read_file(&record.path)? {
                bodies.push((title.clone(), parse_body(title, &text)));
            }
        }
        Ok(bodies)
    }

    /// Returns the titles recorded under a tag.
    pub fn notes_with_tag(&self, tag: &str) -> Result<Vec<String>> {
        let index = self.store.load_index()?;
        Ok(index.tags.get(tag).cloned().unwrap_or_default())
    }

    /// Returns every tag with its note count.
    pub fn list_tags(&self) -> Result<Vec<(String, usize)>> {
        let index = self.store.load_index()?;
        Ok(index
            .tags
            .iter()
            .map(|(tag, titles)| (tag.clone(), titles.len()))
            .collect())
    }

    /// Creates an exploration path and records it in the index.
    ///
    /// Re-creating an existing topic replaces it, including its member notes.
    pub fn create_exploration_path(
        &self,
        topic: &str,
        subtopics: &[&str],
        description: Option<&str>,
    ) -> Result<String> {
        let topic = topic.trim();
        if topic.is_empty() {
            anyhow::bail!("Path topic cannot be empty");
        }

        let subtopics = clean_list(subtopics);
        let path = ExplorationPath::new(topic, subtopics.clone(), description);
        let location = GardenStore::path_location(&slugify(topic));

        self.store
            .write_file(&location, &serde_json::to_string_pretty(&path)?)?;

        let mut index = self.store.load_index()?;
        index.paths.insert(
            topic.to_string(),
            PathRecord {
                path: location,
                created: path.created,
                subtopics: subtopics.clone(),
            },
        );
        self.store.save_index(&mut index)?;
        tracing::info!(topic, subtopics = subtopics.len(), "exploration path created");

        Ok(format!(
            "Created exploration path for '{topic}' with {} subtopics",
            subtopics.len()
        ))
    }

    /// Appends a note to an exploration path.
    ///
    /// Unknown paths or notes, and notes already on the path, are reported in
    /// the returned message rather than as errors.
    pub fn add_note_to_path(&self, path_topic: &str, note_title: &str) -> Result<String> {
        let index = self.store.load_index()?;

        let Some(record) = index.paths.get(path_topic) else {
            return Ok(format!("Path '{path_topic}' not found"));
        };
        if !index.contains_note(note_title) {
            return Ok(format!("Note '{note_title}' not found"));
        }

        let Some(mut path) = self.read_path(&record.path)? else {
            return Ok(format!("Path '{path_topic}' not found"));
        };

        if path.notes.iter().any(|n| n == note_title) {
            return Ok(format!(
                "Note '{note_title}' already in path '{path_topic}'"
            ));
        }

        path.notes.push(note_title.to_string());
        self.store
            .write_file(&record.path, &serde_json::to_string_pretty(&path)?)?;
        tracing::info!(path_topic, note_title, "note added to path");

        Ok(format!("Added note '{note_title}' to path '{path_topic}'"))
    }

    /// Loads an exploration path by topic.
    pub fn get_exploration_path(&self, topic: &str) -> Result<Option<ExplorationPath>> {
        let index = self.store.load_index()?;
        match index.paths.get(topic) {
            Some(record) => self.read_path(&record.path),
            None => Ok(None),
        }
    }

    /// Summarizes the garden with at most `recent` recent changes.
    pub fn garden_summary(&self, recent: usize) -> Result<GardenSummary> {
        Ok(summary::summarize(&self.store.load_index()?, recent))
    }

    fn read_path(&self, location: &str) -> Result<Option<ExplorationPath>> {
        match self.store.read_file(location)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use time::OffsetDateTime;

use crate::GardenIndex;

const INDEX_FILE: &str = "index.json";
const NOTES_DIR: &str = "notes";
const PATHS_DIR: &str = "paths";
const API_DIR: &str = "api";

/// On-disk layout of a garden: `index.json`, `notes/*.md`, `paths/*.json`.
///
/// All writes go through a temporary file in the same directory followed by
/// a rename, so readers never observe a half-written index or note.
#[derive(Debug, Clone)]
pub struct GardenStore {
    root: PathBuf,
}

impl GardenStore {
    /// Opens the garden rooted at `root`.
    ///
    /// Creates the directory structure and an empty index if they do not
    /// exist yet. Opening an existing garden leaves its index untouched.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            root: root.as_ref().to_path_buf(),
        };

        for dir in [store.root.clone(), store.notes_dir(), store.paths_dir()] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create garden directory: {}", dir.display()))?;
        }

        if !store.index_path().exists() {
            let mut index = GardenIndex::default();
            store.save_index(&mut index)?;
            tracing::info!(root = %store.root.display(), "initialized empty garden");
        }

        Ok(store)
    }

    /// Returns the garden root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn notes_dir(&self) -> PathBuf {
        self.root.join(NOTES_DIR)
    }

    pub fn paths_dir(&self) -> PathBuf {
        self.root.join(PATHS_DIR)
    }

    /// Directory holding cached analysis responses for the HTTP API.
    pub fn api_dir(&self) -> PathBuf {
        self.root.join(API_DIR)
    }

    /// Relative location for a note file with the given slug.
    pub fn note_location(slug: &str) -> String {
        format!("{NOTES_DIR}/{slug}.md")
    }

    /// Relative location for a path file with the given slug.
    pub fn path_location(slug: &str) -> String {
        format!("{PATHS_DIR}/{slug}.json")
    }

    /// Relative location for a cached API response.
    pub fn api_location(name: &str) -> String {
        format!("{API_DIR}/{name}.json")
    }

    /// Loads the index from disk.
    pub fn load_index(&self) -> Result<GardenIndex> {
        let path = self.index_path();
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read index: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Malformed index: {}", path.display()))
    }

    /// Stamps `last_updated` and writes the index atomically.
    pub fn save_index(&self, index: &mut GardenIndex) -> Result<()> {
        index.last_updated = OffsetDateTime::now_utc();
        let json = serde_json::to_string_pretty(index).context("Failed to serialize index")?;
        self.write_atomic(&self.index_path(), &json)
    }

    /// Reads a garden-relative file, returning `None` when it does not exist.
    pub fn read_file(&self, location: &str) -> Result<Option<String>> {
        let path = self.root.join(location);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Writes a garden-relative file atomically.
    pub fn write_file(&self, location: &str, contents: &str) -> Result<()> {
        self.write_atomic(&self.root.join(location), contents)
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        let dir = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(contents.as_bytes())?;
        tmp.flush()?;
        tmp.persist(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

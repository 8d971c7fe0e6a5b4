//! Importing markdown documents as chunked notes.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::GardenService;
use crate::agent::GardenAgent;

pub const DEFAULT_CHUNK_SIZE: usize = 8000;
pub const DEFAULT_OVERLAP: usize = 500;

const TITLE_LIMIT: usize = 50;

static SECTION_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n#+\s+").expect("section pattern is valid")
});

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^# (.+)$").expect("heading pattern is valid")
});

static LEADING_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#+\s+").expect("leading heading pattern is valid")
});

/// Settings for [`import_document`].
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub chunk_size: usize,
    pub overlap: usize,
    pub tags: Vec<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
            tags: Vec::new(),
        }
    }
}

/// Outcome of importing one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub document_title: String,
    pub notes: Vec<String>,
    pub insight_failures: usize,
}

/// Splits a document on heading boundaries into chunks of roughly
/// `max_chunk_size` characters.
///
/// Every section after the first is re-prefixed with `# `. A new chunk
/// begins with the last `overlap` characters of the previous one when that
/// chunk is longer than `overlap`. A single section larger than
/// `max_chunk_size` stays whole.
pub fn chunk_document(content: &str, max_chunk_size: usize, overlap: usize) -> Vec<String> {
    let mut pieces = SECTION_BREAK.split(content);
    let mut sections = Vec::new();
    if let Some(first) = pieces.next() {
        if content.starts_with('#') {
            sections.push(format!("# {}", LEADING_HEADING.replace(first, "")));
        } else if !first.trim().is_empty() {
            sections.push(first.to_string());
        }
    }
    sections.extend(pieces.map(|s| format!("# {s}")));

    let mut chunks = Vec::new();
    let mut current = String::new();

    for section in sections {
        let current_len = current.chars().count();
        if current_len + section.chars().count() > max_chunk_size && !current.is_empty() {
            let next = if overlap > 0 && current_len > overlap {
                let tail: String = current.chars().skip(current_len - overlap).collect();
                format!("{tail}\n\n{section}")
            } else {
                section
            };
            chunks.push(std::mem::replace(&mut current, next));
        } else if current.is_empty() {
            current = section;
        } else {
            current.push_str("\n\n");
            current.push_str(&section);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Picks a title for a chunk: its first `# ` heading, else its first
/// non-empty line (shortened to 50 characters), else `default_title`.
pub fn extract_title_from_chunk(chunk: &str, default_title: &str) -> String {
    if let Some(caps) = HEADING.captures(chunk) {
        let heading = caps[1].trim();
        if !heading.is_empty() {
            return heading.to_string();
        }
    }

    match chunk.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some(line) if line.chars().count() > TITLE_LIMIT => {
            let short: String = line.chars().take(TITLE_LIMIT - 3).collect();
            format!("{short}...")
        }
        Some(line) => line.to_string(),
        None => default_title.to_string(),
    }
}

/// Title of a whole document: its first `# ` heading, else the file stem.
pub fn document_title(path: &Path, content: &str) -> String {
    HEADING
        .captures(content)
        .map(|caps| caps[1].trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Imported document".to_string())
        })
}

/// Imports the document at `path` as one note per chunk.
///
/// When `insights` is given, insights are extracted from every chunk with the
/// chunk as parent. A failed extraction is logged and counted; the import
/// continues.
pub fn import_document(
    service: &GardenService,
    insights: Option<&GardenAgent>,
    path: &Path,
    options: &ImportOptions,
) -> Result<ImportReport> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read document {}", path.display()))?;
    let content = String::from_utf8_lossy(&bytes);

    let title = document_title(path, &content);
    let tags: Vec<&str> = options.tags.iter().map(String::as_str).collect();

    let chunks = chunk_document(&content, options.chunk_size, options.overlap);
    tracing::info!(
        document = %title,
        chars = content.chars().count(),
        chunks = chunks.len(),
        "importing document"
    );

    let mut report = ImportReport {
        document_title: title.clone(),
        notes: Vec::with_capacity(chunks.len()),
        insight_failures: 0,
    };

    for (i, chunk) in chunks.iter().enumerate() {
        let chunk_title = extract_title_from_chunk(chunk, &format!("{title} - Part {}", i + 1));
        service.add_note(&chunk_title, chunk, &tags, &[])?;

        if let Some(agent) = insights
            && let Err(e) = agent.extract_insights(chunk, Some(&chunk_title), &tags)
        {
            tracing::warn!(chunk = %chunk_title, error = %e, "insight extraction failed");
            report.insight_failures += 1;
        }
        report.notes.push(chunk_title);
    }

    Ok(report)
}

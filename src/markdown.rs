//! Rendering of note files from metadata.
//!
//! Note files are never patched in place: whenever a note's metadata changes,
//! the whole file is re-rendered from the index record and the body recovered
//! with [`parse_body`].

use time::format_description::well_known::Rfc3339;

use crate::Note;

const METADATA_SEPARATOR: &str = "\n---\n";

/// Renders a note as markdown.
///
/// ```text
/// # <title>
///
/// <body>
///
/// ---
/// Created: <rfc3339>
/// Tags: a, b
/// Related: x, y
/// ```
///
/// The `Related:` line is omitted when the note has no related notes.
pub fn render_note(note: &Note) -> String {
    let created = note
        .created()
        .format(&Rfc3339)
        .unwrap_or_else(|_| note.created().to_string());

    let mut out = format!("# {}\n\n{}\n", note.title(), note.content());
    out.push_str(METADATA_SEPARATOR);
    out.push_str(&format!("Created: {created}\n"));
    out.push_str(&format!("Tags: {}\n", note.tags().join(", ")));
    if !note.related_notes().is_empty() {
        out.push_str(&format!("Related: {}\n", note.related_notes().join(", ")));
    }
    out
}

/// Recovers the body of a rendered note file.
///
/// Strips the `# <title>` heading and everything from the last metadata
/// separator onwards. Text without a separator is treated as all body.
pub fn parse_body(title: &str, text: &str) -> String {
    let without_metadata = match text.rfind(METADATA_SEPARATOR) {
        Some(pos) => &text[..pos],
        None => text,
    };

    let heading = format!("# {title}");
    let body = match without_metadata.strip_prefix(&heading) {
        Some(rest) => rest,
        None => without_metadata,
    };

    body.trim_matches('\n').to_string()
}

/// Returns the first `limit` characters of `text`, with `...` when truncated.
pub fn preview(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

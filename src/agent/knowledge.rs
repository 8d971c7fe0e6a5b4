//! Knowledge expansion and insight extraction.

use anyhow::Result;
use serde::Deserialize;

use super::GardenAgent;
use super::tools::ExpansionType;

/// Prompt template for insight extraction.
///
/// The model must answer with a JSON object so insights can be parsed
/// schema-first instead of scraped from free text.
const INSIGHTS_PROMPT: &str = r#"You are a knowledge gardener. Extract 3-5 key insights from the text below.

For each insight:
1. Create a clear, concise title (5-10 words)
2. Write a detailed explanation (2-3 paragraphs)
3. Suggest 3-5 relevant tags

TEXT TO ANALYZE:
{text}

Return ONLY a JSON object of this shape:
{"insights": [{"title": "...", "content": "...", "tags": ["tag1", "tag2"]}]}

JSON OUTPUT:"#;

const EXPAND_SYSTEM: &str =
    "You are a knowledge gardener. Generate new insights based on existing notes.";

/// A titled piece of knowledge proposed by the model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Insight {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Extracts JSON from model response, handling various output formats.
///
/// Handles clean JSON, markdown code fences, and explanatory text around the
/// object by taking everything from the first `{` to the last `}`.
pub(crate) fn extract_json(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (start <= end).then(|| &trimmed[start..=end])
}

/// Parses the array stored under `key` in the model's JSON reply.
///
/// Entries that do not match the [`Insight`] shape, or have an empty title,
/// are dropped. Unparseable output yields no entries.
pub fn parse_entries(response: &str, key: &str) -> Vec<Insight> {
    let Some(json) = extract_json(response) else {
        tracing::warn!("model reply contained no JSON object");
        return Vec::new();
    };
    let value: serde_json::Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "model reply was not valid JSON");
            return Vec::new();
        }
    };
    let Some(entries) = value.get(key).and_then(|v| v.as_array()) else {
        tracing::warn!(key, "model reply is missing the expected array");
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match Insight::deserialize(entry) {
            Ok(insight) if !insight.title.trim().is_empty() => Some(insight),
            Ok(_) => {
                tracing::warn!("dropping entry with empty title");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed entry");
                None
            }
        })
        .collect()
}

impl GardenAgent {
    /// Generates a new note that expands on an existing one.
    ///
    /// With `depth > 1`, up to `depth` related notes are appended to the
    /// prompt as context. The new note is titled `<title> - <Type>`, carries
    /// the original tags plus the expansion type, and relates back to the
    /// original.
    pub fn expand_knowledge(
        &self,
        note_title: &str,
        expansion_type: ExpansionType,
        depth: usize,
    ) -> Result<String> {
        let Some(note_content) = self.service.get_note_content(note_title)? else {
            return Ok(format!("Note '{note_title}' not found in the knowledge garden"));
        };

        let index = self.service.index()?;
        let record = index.notes.get(note_title);
        let mut prompt = expansion_type.prompt(&note_content);

        if depth > 1
            && let Some(record) = record
        {
            let mut related_contents = Vec::new();
            for related in record.related_notes.iter().take(depth) {
                if let Some(content) = self.service.get_note_content(related)? {
                    related_contents.push(format!("Related note '{related}':\n{content}"));
                }
            }
            if !related_contents.is_empty() {
                prompt.push_str("\n\nAdditional context from related notes:\n\n");
                prompt.push_str(&related_contents.join("\n\n"));
            }
        }

        let expansion = self
            .client
            .generate(&self.model, &format!("{EXPAND_SYSTEM}\n\n{prompt}"))?;

        let title = format!("{note_title} - {}", expansion_type.label());
        let mut tags: Vec<&str> = record
            .map(|r| r.tags.iter().map(String::as_str).collect())
            .unwrap_or_default();
        tags.push(expansion_type.as_str());

        tracing::info!(note_title, expansion = %expansion_type, "expanding note");
        self.service
            .add_note(&title, expansion.trim(), &tags, &[note_title])
    }

    /// Asks the model for insights in `text` and stores each as a note.
    ///
    /// User `tags` are appended to every insight's own tags; `parent_note`, if
    /// given, becomes each insight's related note.
    pub fn extract_insights(
        &self,
        text: &str,
        parent_note: Option<&str>,
        tags: &[&str],
    ) -> Result<String> {
        let prompt = INSIGHTS_PROMPT.replace("{text}", text);
        let response = self.client.generate(&self.model, &prompt)?;
        let insights = parse_entries(&response, "insights");

        let related: Vec<&str> = parent_note.into_iter().collect();
        for insight in &insights {
            let mut insight_tags: Vec<&str> = insight.tags.iter().map(String::as_str).collect();
            insight_tags.extend_from_slice(tags);
            self.service
                .add_note(&insight.title, &insight.content, &insight_tags, &related)?;
        }

        tracing::info!(count = insights.len(), parent_note, "extracted insights");
        Ok(format!("Extracted {} insights from the text", insights.len()))
    }
}

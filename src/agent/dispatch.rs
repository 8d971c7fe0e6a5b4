//! Tool execution and the chat round trip for free-form questions.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::ollama::{ChatMessage, ToolCallRequest};

use super::GardenAgent;
use super::relevance::RelevantNote;
use super::tools::{ToolCall, tool_definitions};

const GARDENER_ROLE: &str = "You are a knowledge gardener. Your goal is to build a rich, interconnected knowledge garden by creating notes, extracting insights, and establishing connections between concepts.";

const CONTEXT_HEADER: &str =
    "\n\nHere are some notes from the knowledge garden that might be relevant:\n\n";

const TRUNCATION_MARKER: &str = "\n\n... [content truncated due to length] ...\n\n";

/// Prompts estimated above this many tokens get truncated.
const MAX_ESTIMATED_TOKENS: usize = 100_000;

/// Characters kept from each end of an oversized prompt.
const KEEP_CHARS: usize = 200_000;

/// Final answer and the raw tool outputs that fed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub answer: String,
    pub tool_results: Vec<String>,
}

/// Rough token count: four characters per token.
fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / 4
}

/// Keeps the head and tail of `text` when it is estimated too long.
fn truncate_context(text: String) -> String {
    if estimate_tokens(&text) <= MAX_ESTIMATED_TOKENS {
        return text;
    }
    let total = text.chars().count();
    if total <= KEEP_CHARS * 2 {
        return text;
    }

    tracing::warn!(
        estimated_tokens = estimate_tokens(&text),
        "prompt context too long; truncating"
    );
    let head: String = text.chars().take(KEEP_CHARS).collect();
    let tail: String = text.chars().skip(total - KEEP_CHARS).collect();
    format!("{head}{TRUNCATION_MARKER}{tail}")
}

fn context_entry(title: &str, content: &str, tags: &[String]) -> String {
    format!(
        "Note: {title}\nContent: {content}\nTags: {}\n---",
        tags.join(", ")
    )
}

impl GardenAgent {
    /// Runs one decoded tool call against the garden.
    ///
    /// Search results come back as pretty-printed JSON; the other tools
    /// return their confirmation message.
    pub fn execute_tool(&self, call: ToolCall) -> Result<String> {
        tracing::info!(?call, "executing tool");
        match call {
            ToolCall::AddNote {
                title,
                content,
                tags,
                related_notes,
            } => {
                let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
                let related: Vec<&str> = related_notes.iter().map(String::as_str).collect();
                self.service.add_note(&title, &content, &tags, &related)
            }
            ToolCall::SearchNotes { query, tags, limit } => {
                let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
                let results = self.service.search_notes(&query, &tags, limit)?;
                serde_json::to_string_pretty(&results).context("Failed to encode search results")
            }
            ToolCall::ExpandKnowledge {
                note_title,
                expansion_type,
                depth,
            } => self.expand_knowledge(&note_title, expansion_type, depth),
            ToolCall::ExtractInsights {
                text,
                parent_note,
                tags,
            } => {
                let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
                self.extract_insights(&text, parent_note.as_deref(), &tags)
            }
            ToolCall::CreateExplorationPath {
                topic,
                subtopics,
                description,
            } => {
                let subtopics: Vec<&str> = subtopics.iter().map(String::as_str).collect();
                self.service
                    .create_exploration_path(&topic, &subtopics, description.as_deref())
            }
        }
    }

    /// Executes every tool call the model requested.
    ///
    /// Each call yields one result string. A call that cannot be decoded or
    /// fails while running yields an `Error: ...` string instead, and the
    /// remaining calls still run.
    pub fn handle_tool_calls(&self, calls: &[ToolCallRequest]) -> Vec<String> {
        calls
            .iter()
            .map(|request| {
                let name = &request.function.name;
                let outcome = ToolCall::from_request(&request.function)
                    .with_context(|| format!("Invalid arguments for tool '{name}'"))
                    .and_then(|call| self.execute_tool(call));
                match outcome {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::warn!(tool = %name, error = %e, "tool call failed");
                        format!("Error: {e:#}")
                    }
                }
            })
            .collect()
    }

    /// Answers a question, letting the model call the garden tools.
    ///
    /// The system message carries the gardener role and the given context
    /// notes, or every note in the garden when `context_notes` is `None`.
    /// When the model requests tools, their results are sent back for a
    /// final answer.
    pub fn process_query(
        &self,
        query: &str,
        context_notes: Option<&[RelevantNote]>,
    ) -> Result<QueryOutcome> {
        let entries: Vec<String> = match context_notes {
            Some(notes) => notes
                .iter()
                .map(|n| context_entry(&n.title, &n.content, &n.tags))
                .collect(),
            None => {
                let index = self.service.index()?;
                self.service
                    .note_bodies()?
                    .into_iter()
                    .map(|(title, body)| {
                        let tags = index
                            .notes
                            .get(&title)
                            .map(|r| r.tags.as_slice())
                            .unwrap_or_default();
                        context_entry(&title, &body, tags)
                    })
                    .collect()
            }
        };

        let mut system = GARDENER_ROLE.to_string();
        if !entries.is_empty() {
            system.push_str(CONTEXT_HEADER);
            system.push_str(&entries.join("\n\n"));
        }
        let system = truncate_context(system);

        let mut messages = vec![ChatMessage::system(system), ChatMessage::user(query)];
        let tools = tool_definitions();

        let reply = self.client.chat(&self.model, &messages, &tools)?;
        if reply.tool_calls.is_empty() {
            return Ok(QueryOutcome {
                answer: reply.content,
                tool_results: Vec::new(),
            });
        }

        tracing::info!(count = reply.tool_calls.len(), "model requested tools");
        let tool_results = self.handle_tool_calls(&reply.tool_calls);
        let names: Vec<String> = reply
            .tool_calls
            .iter()
            .map(|c| c.function.name.clone())
            .collect();

        messages.push(reply);
        for (name, result) in names.into_iter().zip(&tool_results) {
            messages.push(ChatMessage::tool(name, result.clone()));
        }

        let final_reply = self.client.chat(&self.model, &messages, &[])?;
        Ok(QueryOutcome {
            answer: final_reply.content,
            tool_results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_context_is_untouched() {
        let text = "short".to_string();
        assert_eq!(truncate_context(text.clone()), text);
    }

    #[test]
    fn long_context_keeps_both_ends() {
        let text = format!("{}{}", "a".repeat(300_000), "b".repeat(300_000));
        let truncated = truncate_context(text);

        assert!(truncated.starts_with(&"a".repeat(KEEP_CHARS)));
        assert!(truncated.ends_with(&"b".repeat(KEEP_CHARS)));
        assert!(truncated.contains(TRUNCATION_MARKER));
        assert_eq!(
            truncated.chars().count(),
            KEEP_CHARS * 2 + TRUNCATION_MARKER.chars().count()
        );
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "é".repeat(450_000);
        let truncated = truncate_context(text);
        assert!(truncated.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn context_entry_format() {
        assert_eq!(
            context_entry("T", "C", &["a".into(), "b".into()]),
            "Note: T\nContent: C\nTags: a, b\n---"
        );
    }
}

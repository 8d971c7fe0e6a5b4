//! Tool schema offered to the model and typed decoding of its calls.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::ollama::{FunctionCall, ToolDefinition};

const DEFAULT_SEARCH_LIMIT: usize = 5;
const DEFAULT_DEPTH: usize = 1;

fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

fn default_depth() -> usize {
    DEFAULT_DEPTH
}

/// How `expand_knowledge` grows a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionType {
    Elaborate,
    Contrast,
    Question,
    Application,
    Connection,
}

impl ExpansionType {
    pub const ALL: [ExpansionType; 5] = [
        ExpansionType::Elaborate,
        ExpansionType::Contrast,
        ExpansionType::Question,
        ExpansionType::Application,
        ExpansionType::Connection,
    ];

    /// Lowercase name, also used as the tag of expansion notes.
    pub fn as_str(self) -> &'static str {
        match self {
            ExpansionType::Elaborate => "elaborate",
            ExpansionType::Contrast => "contrast",
            ExpansionType::Question => "question",
            ExpansionType::Application => "application",
            ExpansionType::Connection => "connection",
        }
    }

    /// Capitalized name used in expansion note titles.
    pub fn label(self) -> &'static str {
        match self {
            ExpansionType::Elaborate => "Elaborate",
            ExpansionType::Contrast => "Contrast",
            ExpansionType::Question => "Question",
            ExpansionType::Application => "Application",
            ExpansionType::Connection => "Connection",
        }
    }

    /// Instruction for the model, followed by the note text.
    pub fn prompt(self, note_content: &str) -> String {
        let instruction = match self {
            ExpansionType::Elaborate => {
                "Elaborate on the concepts in this note, providing more detail and examples:"
            }
            ExpansionType::Contrast => {
                "Contrast the ideas in this note with alternative perspectives:"
            }
            ExpansionType::Question => "Generate thought-provoking questions related to this note:",
            ExpansionType::Application => {
                "Explore practical applications of the concepts in this note:"
            }
            ExpansionType::Connection => {
                "Identify connections between this note and other domains or concepts:"
            }
        };
        format!("{instruction}\n\n{note_content}")
    }
}

impl fmt::Display for ExpansionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpansionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExpansionType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown expansion type: {s}"))
    }
}

/// A decoded tool call.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "name", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    AddNote {
        title: String,
        content: String,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        related_notes: Vec<String>,
    },
    SearchNotes {
        query: String,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default = "default_limit")]
        limit: usize,
    },
    ExpandKnowledge {
        note_title: String,
        expansion_type: ExpansionType,
        #[serde(default = "default_depth")]
        depth: usize,
    },
    ExtractInsights {
        text: String,
        #[serde(default)]
        parent_note: Option<String>,
        #[serde(default)]
        tags: Vec<String>,
    },
    CreateExplorationPath {
        topic: String,
        subtopics: Vec<String>,
        #[serde(default)]
        description: Option<String>,
    },
}

impl ToolCall {
    /// Decodes a model tool call.
    ///
    /// Arguments may arrive as a JSON object or as a string containing one.
    pub fn from_request(call: &FunctionCall) -> Result<Self, serde_json::Error> {
        let arguments = match &call.arguments {
            serde_json::Value::String(raw) => serde_json::from_str(raw)?,
            serde_json::Value::Null => json!({}),
            other => other.clone(),
        };
        serde_json::from_value(json!({ "name": call.name, "arguments": arguments }))
    }
}

/// The five garden tools with their JSON-schema parameters.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let string_list = |description: &str| {
        json!({
            "type": "array",
            "items": {"type": "string"},
            "description": description
        })
    };

    vec![
        ToolDefinition::function(
            "add_note",
            "Add a new note to the knowledge garden",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "The title of the note"},
                    "content": {"type": "string", "description": "The content of the note"},
                    "tags": string_list("Tags to categorize the note"),
                    "related_notes": string_list("Titles of related notes in the garden")
                },
                "required": ["title", "content"]
            }),
        ),
        ToolDefinition::function(
            "search_notes",
            "Search for notes in the knowledge garden",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The search query"},
                    "tags": string_list("Filter by tags"),
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results to return",
                        "default": DEFAULT_SEARCH_LIMIT
                    }
                },
                "required": ["query"]
            }),
        ),
        ToolDefinition::function(
            "expand_knowledge",
            "Generate new knowledge based on existing notes",
            json!({
                "type": "object",
                "properties": {
                    "note_title": {"type": "string", "description": "Title of the note to expand upon"},
                    "expansion_type": {
                        "type": "string",
                        "enum": ExpansionType::ALL.map(ExpansionType::as_str),
                        "description": "Type of knowledge expansion to perform"
                    },
                    "depth": {
                        "type": "integer",
                        "description": "Depth of expansion (1-3)",
                        "minimum": 1,
                        "maximum": 3,
                        "default": DEFAULT_DEPTH
                    }
                },
                "required": ["note_title", "expansion_type"]
            }),
        ),
        ToolDefinition::function(
            "extract_insights",
            "Extract key insights from a text and add them as separate notes",
            json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string", "description": "The text to extract insights from"},
                    "parent_note": {
                        "type": "string",
                        "description": "The title of the parent note these insights relate to"
                    },
                    "tags": string_list("Tags to apply to all extracted insights")
                },
                "required": ["text"]
            }),
        ),
        ToolDefinition::function(
            "create_exploration_path",
            "Create a structured exploration path for a topic",
            json!({
                "type": "object",
                "properties": {
                    "topic": {"type": "string", "description": "The main topic to explore"},
                    "subtopics": string_list("List of subtopics to explore"),
                    "description": {
                        "type": "string",
                        "description": "Description of this exploration path"
                    }
                },
                "required": ["topic", "subtopics"]
            }),
        ),
    ]
}

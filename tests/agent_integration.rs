//! LLM-backed garden operations driven by a mock Ollama client.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use garden::agent::{ExpansionType, GardenAgent, GardenAgentBuilder};
use garden::import::{ImportOptions, import_document};
use garden::ollama::{
    ChatMessage, FunctionCall, OllamaClientTrait, OllamaError, ToolCallRequest, ToolDefinition,
};
use garden::{GardenService, GardenStore};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

/// Mock client that returns queued replies in order.
#[derive(Default)]
struct MockOllamaClient {
    generations: Mutex<VecDeque<String>>,
    chats: Mutex<VecDeque<ChatMessage>>,
}

impl MockOllamaClient {
    fn generating(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            generations: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            ..Self::default()
        })
    }

    fn chatting(replies: Vec<ChatMessage>) -> Arc<Self> {
        Arc::new(Self {
            chats: Mutex::new(replies.into()),
            ..Self::default()
        })
    }

    fn exhausted() -> OllamaError {
        OllamaError::Api {
            message: "mock has no reply left".to_string(),
        }
    }
}

impl OllamaClientTrait for MockOllamaClient {
    fn generate(&self, _model: &str, _prompt: &str) -> Result<String, OllamaError> {
        self.generations
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(Self::exhausted)
    }

    fn chat(
        &self,
        _model: &str,
        _messages: &[ChatMessage],
        _tools: &[ToolDefinition],
    ) -> Result<ChatMessage, OllamaError> {
        self.chats
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(Self::exhausted)
    }
}

fn build_agent(client: Arc<MockOllamaClient>) -> Result<(TempDir, GardenAgent)> {
    let dir = tempfile::tempdir()?;
    let agent = GardenAgentBuilder::new()
        .service(GardenService::new(GardenStore::open(dir.path())?))
        .client(client)
        .model("mock-model")
        .explore_pause(Duration::ZERO)
        .build();
    Ok((dir, agent))
}

fn tool_reply(name: &str, arguments: serde_json::Value) -> ChatMessage {
    let mut reply = ChatMessage::assistant("");
    reply.tool_calls.push(ToolCallRequest {
        function: FunctionCall {
            name: name.to_string(),
            arguments,
        },
    });
    reply
}

#[test]
fn test_query_tool_call_adds_note_to_garden() -> Result<()> {
    // Arrange: the model asks to add a note, then answers
    let client = MockOllamaClient::chatting(vec![
        tool_reply(
            "add_note",
            serde_json::json!({
                "title": "Cover Crops",
                "content": "Clover fixes nitrogen.",
                "tags": ["soil"]
            }),
        ),
        ChatMessage::assistant("I planted a note about cover crops."),
    ]);
    let (_dir, agent) = build_agent(client)?;

    // Act
    let outcome = agent.process_query("Remember cover crops", None)?;

    // Assert
    assert_eq!(outcome.answer, "I planted a note about cover crops.");
    assert_eq!(
        outcome.tool_results,
        vec!["Note 'Cover Crops' added to the knowledge garden"]
    );
    let note = agent.service().get_note("Cover Crops")?.expect("note added");
    assert_eq!(note.tags(), ["soil"]);

    Ok(())
}

#[test]
fn test_expansion_creates_linked_note() -> Result<()> {
    // Arrange
    let client = MockOllamaClient::generating(&["Why does compost heat up?"]);
    let (_dir, agent) = build_agent(client)?;
    agent
        .service()
        .add_note("Compost", "Microbes break down waste.", &["soil"], &[])?;

    // Act
    agent.expand_knowledge("Compost", ExpansionType::Question, 1)?;

    // Assert
    let expansion = agent
        .service()
        .get_note("Compost - Question")?
        .expect("expansion note");
    assert_eq!(expansion.content(), "Why does compost heat up?");
    assert_eq!(expansion.related_notes(), ["Compost"]);
    assert!(expansion.tags().contains(&"question".to_string()));

    let original = agent.service().get_note("Compost")?.expect("original note");
    assert_eq!(original.related_notes(), ["Compost - Question"]);

    Ok(())
}

#[test]
fn test_exploration_grows_from_seed() -> Result<()> {
    // Arrange: seed note, then one round of concepts
    let client = MockOllamaClient::generating(&[
        r#"{"content": "Fungi connect roots.", "tags": ["fungi"]}"#,
        r#"{"concepts": [{"title": "Mycorrhiza", "content": "Root symbiosis.", "tags": []}]}"#,
    ]);
    let (_dir, agent) = build_agent(client)?;

    // Act
    let summary =
        agent.autonomous_exploration_with_rng("Soil Fungi", 1, &mut StdRng::seed_from_u64(3))?;

    // Assert
    assert!(summary.seed_created);
    assert_eq!(summary.iterations_run, 1);
    assert_eq!(summary.concepts_added, 1);

    let concept = agent.service().get_note("Mycorrhiza")?.expect("concept note");
    assert_eq!(concept.related_notes(), ["Soil Fungi"]);

    Ok(())
}

#[test]
fn test_import_with_insights_links_to_chunks() -> Result<()> {
    // Arrange: one insight reply per chunk
    let client = MockOllamaClient::generating(&[
        r#"{"insights": [{"title": "Tilling hurts structure", "content": "Less tilling.", "tags": []}]}"#,
        "not json at all",
    ]);
    let (dir, agent) = build_agent(client)?;

    let doc_path = dir.path().join("soil-guide.md");
    let mut file = std::fs::File::create(&doc_path)?;
    write!(file, "# Tilling\nTill less.\n# Watering\nWater deeply.")?;

    let options = ImportOptions {
        chunk_size: 20,
        overlap: 0,
        tags: vec!["guide".to_string()],
    };

    // Act
    let report = import_document(agent.service(), Some(&agent), &doc_path, &options)?;

    // Assert: both chunks imported; the garbage reply yields no insights
    assert_eq!(report.notes, vec!["Tilling", "Watering"]);
    assert_eq!(report.insight_failures, 0);

    let insight = agent
        .service()
        .get_note("Tilling hurts structure")?
        .expect("insight note");
    assert_eq!(insight.related_notes(), ["Tilling"]);
    assert_eq!(insight.tags(), ["guide"]);
    assert_eq!(agent.service().notes_with_tag("guide")?.len(), 3);

    Ok(())
}

//! LLM-driven garden operations.
//!
//! `GardenAgent` couples a [`GardenService`] with an Ollama client. It exposes
//! the five tools to the model, expands notes, extracts insights, and runs
//! autonomous exploration.

mod dispatch;
mod exploration;
mod knowledge;
mod relevance;
mod tools;

use std::sync::Arc;
use std::time::Duration;

use crate::GardenService;
use crate::ollama::OllamaClientTrait;

pub use dispatch::QueryOutcome;
pub use exploration::ExplorationSummary;
pub use knowledge::{Insight, parse_entries};
pub use relevance::{RelevantNote, find_relevant_nodes};
pub use tools::{ExpansionType, ToolCall, tool_definitions};

const DEFAULT_EXPLORE_PAUSE: Duration = Duration::from_secs(1);

/// Builder for constructing `GardenAgent` instances.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use garden::agent::GardenAgentBuilder;
/// use garden::ollama::OllamaClientBuilder;
/// use garden::{GardenService, GardenStore};
///
/// # fn example() -> anyhow::Result<()> {
/// let client = OllamaClientBuilder::new().build()?;
/// let service = GardenService::new(GardenStore::open("/tmp/garden")?);
///
/// let agent = GardenAgentBuilder::new()
///     .service(service)
///     .client(Arc::new(client))
///     .model("llama3.2")
///     .build();
///
/// agent.expand_knowledge("Ownership", garden::agent::ExpansionType::Question, 1)?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct GardenAgentBuilder {
    service: Option<GardenService>,
    client: Option<Arc<dyn OllamaClientTrait>>,
    model: Option<String>,
    explore_pause: Option<Duration>,
}

impl GardenAgentBuilder {
    /// Creates a new `GardenAgentBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the garden the agent works on.
    pub fn service(mut self, service: GardenService) -> Self {
        self.service = Some(service);
        self
    }

    /// Sets the Ollama client used for generation and chat.
    pub fn client(mut self, client: Arc<dyn OllamaClientTrait>) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets the model name passed to every LLM call.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the pause between autonomous exploration iterations.
    pub fn explore_pause(mut self, pause: Duration) -> Self {
        self.explore_pause = Some(pause);
        self
    }

    /// Builds the `GardenAgent`.
    ///
    /// # Panics
    ///
    /// Panics if `service()` or `client()` was not called before `build()`.
    #[must_use]
    pub fn build(self) -> GardenAgent {
        GardenAgent {
            service: self
                .service
                .expect("service must be set via service() method"),
            client: self.client.expect("client must be set via client() method"),
            model: self.model.unwrap_or_default(),
            explore_pause: self.explore_pause.unwrap_or(DEFAULT_EXPLORE_PAUSE),
        }
    }
}

/// Runs LLM-backed operations against a garden.
pub struct GardenAgent {
    service: GardenService,
    client: Arc<dyn OllamaClientTrait>,
    model: String,
    explore_pause: Duration,
}

impl GardenAgent {
    pub fn service(&self) -> &GardenService {
        &self.service
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

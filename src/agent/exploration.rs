//! Autonomous growth of the garden from a seed topic.

use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::GardenAgent;
use super::knowledge::{extract_json, parse_entries};

const SEED_PROMPT: &str = r#"Create an initial knowledge note about the topic: {topic}

Include:
1. A clear definition or explanation
2. Key aspects or components
3. Potential applications or implications

Return ONLY a JSON object of this shape:
{"content": "your detailed explanation", "tags": ["tag1", "tag2", "tag3"]}

JSON OUTPUT:"#;

const CONCEPTS_PROMPT: &str = r#"Based on the following note:

Title: {title}
Content: {content}

Generate new insights or related concepts that would expand our knowledge garden.

For each new concept:
1. Provide a clear title
2. Write a detailed explanation, including how it relates to {title}
3. Suggest relevant tags

Return ONLY a JSON object of this shape:
{"concepts": [{"title": "...", "content": "...", "tags": ["tag1", "tag2"]}]}

JSON OUTPUT:"#;

/// What one exploration run did to the garden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplorationSummary {
    pub seed_created: bool,
    pub iterations_run: usize,
    pub concepts_added: usize,
}

#[derive(Deserialize)]
struct SeedNote {
    content: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// Reads the seed note from the model's reply, keeping the raw text when it
/// is not the requested JSON.
fn parse_seed(response: &str) -> SeedNote {
    extract_json(response)
        .and_then(|json| serde_json::from_str::<SeedNote>(json).ok())
        .filter(|seed| !seed.content.trim().is_empty())
        .unwrap_or_else(|| {
            tracing::warn!("seed reply was not the expected JSON; storing raw text");
            SeedNote {
                content: response.trim().to_string(),
                tags: Vec::new(),
            }
        })
}

impl GardenAgent {
    /// Grows the garden around `seed_topic` for `iterations` rounds.
    pub fn autonomous_exploration(
        &self,
        seed_topic: &str,
        iterations: usize,
    ) -> Result<ExplorationSummary> {
        self.autonomous_exploration_with_rng(seed_topic, iterations, &mut rand::thread_rng())
    }

    /// [`autonomous_exploration`](Self::autonomous_exploration) with a caller
    /// supplied random source.
    ///
    /// Creates the seed note if the garden lacks it. Each iteration picks a
    /// random note, asks the model for related concepts, and adds each one as
    /// a note related to the pick. The agent's explore pause separates
    /// iterations.
    pub fn autonomous_exploration_with_rng<R: Rng + ?Sized>(
        &self,
        seed_topic: &str,
        iterations: usize,
        rng: &mut R,
    ) -> Result<ExplorationSummary> {
        let seed_topic = seed_topic.trim();
        if seed_topic.is_empty() {
            anyhow::bail!("Seed topic cannot be empty");
        }

        let mut summary = ExplorationSummary {
            seed_created: false,
            iterations_run: 0,
            concepts_added: 0,
        };

        if !self.service.index()?.contains_note(seed_topic) {
            let response = self
                .client
                .generate(&self.model, &SEED_PROMPT.replace("{topic}", seed_topic))?;
            let seed = parse_seed(&response);
            let tags: Vec<&str> = seed.tags.iter().map(String::as_str).collect();
            self.service.add_note(seed_topic, &seed.content, &tags, &[])?;
            summary.seed_created = true;
            tracing::info!(seed_topic, "created seed note");
        }

        for iteration in 0..iterations {
            if iteration > 0 && !self.explore_pause.is_zero() {
                std::thread::sleep(self.explore_pause);
            }

            let index = self.service.index()?;
            let titles: Vec<&String> = index.notes.keys().collect();
            if titles.is_empty() {
                break;
            }
            let chosen = titles[rng.gen_range(0..titles.len())].clone();
            let content = self.service.get_note_content(&chosen)?.unwrap_or_default();

            let prompt = CONCEPTS_PROMPT
                .replace("{title}", &chosen)
                .replace("{content}", &content);
            let response = self.client.generate(&self.model, &prompt)?;

            for concept in parse_entries(&response, "concepts") {
                let tags: Vec<&str> = concept.tags.iter().map(String::as_str).collect();
                self.service
                    .add_note(&concept.title, &concept.content, &tags, &[chosen.as_str()])?;
                summary.concepts_added += 1;
                tracing::info!(concept = %concept.title, related = %chosen, "added concept");
            }
            summary.iterations_run += 1;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_json_is_parsed() {
        let seed = parse_seed(r#"```json
{"content": "Mycelium networks.", "tags": ["fungi"]}
```"#);
        assert_eq!(seed.content, "Mycelium networks.");
        assert_eq!(seed.tags, vec!["fungi"]);
    }

    #[test]
    fn seed_falls_back_to_raw_text() {
        let seed = parse_seed("  Just prose about fungi.  ");
        assert_eq!(seed.content, "Just prose about fungi.");
        assert!(seed.tags.is_empty());
    }
}

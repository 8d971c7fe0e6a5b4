//! Picks the notes most useful as LLM context for a query.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use time::OffsetDateTime;

use crate::GardenIndex;

use super::GardenAgent;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "in", "on", "at", "to", "for", "with", "by", "about", "as", "of", "and", "or",
    "is", "are", "what", "how", "why", "when", "where", "who", "which",
];

const TITLE_HIT: f64 = 3.0;
const TAG_HIT: f64 = 2.0;
const KEYWORD_WEIGHT: f64 = 1.0;
const RECENCY_WEIGHT: f64 = 0.3;
const CONNECTION_WEIGHT: f64 = 0.5;
const IMPORTANCE_WEIGHT: f64 = 0.2;

/// A note selected as context, with its relevance score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelevantNote {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub related_notes: Vec<String>,
    pub score: f64,
}

fn keywords(query: &str) -> HashSet<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Scores every note against `query` and returns up to `max_nodes` of them.
///
/// Notes are ranked by total score: keyword hits plus recency, connection
/// and length bonuses. Every note is a candidate, so a query with few
/// keyword matches still fills the result from the best of the rest.
///
/// `bodies` maps titles to note text; notes without a body score on metadata
/// alone.
pub fn find_relevant_nodes(
    index: &GardenIndex,
    bodies: &HashMap<String, String>,
    query: &str,
    max_nodes: usize,
    now: OffsetDateTime,
) -> Vec<RelevantNote> {
    let keywords = keywords(query);
    let empty = String::new();

    let mut scored: Vec<RelevantNote> = index
        .notes
        .iter()
        .map(|(title, record)| {
            let content = bodies.get(title).unwrap_or(&empty);
            let title_lower = title.to_lowercase();
            let content_lower = content.to_lowercase();

            let mut keyword_score = 0.0;
            for keyword in &keywords {
                if title_lower.contains(keyword.as_str()) {
                    keyword_score += TITLE_HIT;
                }
                keyword_score += content_lower.matches(keyword.as_str()).count() as f64;
                for tag in &record.tags {
                    if tag.to_lowercase().contains(keyword.as_str()) {
                        keyword_score += TAG_HIT;
                    }
                }
            }

            let days_old = (now - record.created).whole_days() as f64;
            let recency = (10.0 - days_old / 30.0).max(0.0);
            let connection = record.related_notes.len() as f64 * 0.5;
            let importance = (content.chars().count() as f64 / 500.0).min(5.0);

            let score = keyword_score * KEYWORD_WEIGHT
                + recency * RECENCY_WEIGHT
                + connection * CONNECTION_WEIGHT
                + importance * IMPORTANCE_WEIGHT;

            tracing::debug!(title, keyword_score, score, "scored note");
            RelevantNote {
                title: title.clone(),
                content: content.clone(),
                tags: record.tags.clone(),
                related_notes: record.related_notes.clone(),
                score,
            }
        })
        .collect();

    // stable, so ties keep index order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    scored.truncate(max_nodes);
    scored
}

impl GardenAgent {
    /// Selects up to `max_nodes` notes relevant to `query` from the garden.
    pub fn relevant_notes(&self, query: &str, max_nodes: usize) -> anyhow::Result<Vec<RelevantNote>> {
        let index = self.service.index()?;
        let bodies: HashMap<String, String> = self.service.note_bodies()?.into_iter().collect();
        Ok(find_relevant_nodes(
            &index,
            &bodies,
            query,
            max_nodes,
            OffsetDateTime::now_utc(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NoteRecord;
    use time::Duration;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-06-01 0:00 UTC);

    fn garden(notes: &[(&str, &str, &[&str], &[&str], i64)]) -> (GardenIndex, HashMap<String, String>) {
        let mut index = GardenIndex::default();
        let mut bodies = HashMap::new();
        for (title, body, tags, related, age_days) in notes {
            index.notes.insert(
                title.to_string(),
                NoteRecord {
                    path: String::new(),
                    created: NOW - Duration::days(*age_days),
                    tags: tags.iter().map(|s| s.to_string()).collect(),
                    related_notes: related.iter().map(|s| s.to_string()).collect(),
                },
            );
            bodies.insert(title.to_string(), body.to_string());
        }
        (index, bodies)
    }

    fn titles(notes: &[RelevantNote]) -> Vec<&str> {
        notes.iter().map(|n| n.title.as_str()).collect()
    }

    #[test]
    fn stop_words_are_ignored() {
        let words = keywords("What is the Borrow checker");
        assert_eq!(words, HashSet::from(["borrow".to_string(), "checker".to_string()]));
    }

    #[test]
    fn score_combines_components() {
        let (index, bodies) = garden(&[("Rust", "rust rust", &["rustlang"], &["A", "B"], 0)]);
        let found = find_relevant_nodes(&index, &bodies, "rust", 5, NOW);

        // keyword: title 3 + content 2 + tag 2 = 7; recency 10 * 0.3;
        // connection 2 * 0.5 * 0.5; importance (9/500) * 0.2
        let expected = 7.0 + 3.0 + 0.5 + (9.0 / 500.0) * 0.2;
        assert!((found[0].score - expected).abs() < 1e-9);
    }

    #[test]
    fn recency_decays_to_zero() {
        let (index, bodies) = garden(&[("Old", "", &[], &[], 600)]);
        let found = find_relevant_nodes(&index, &bodies, "nothing", 5, NOW);
        assert_eq!(found[0].score, 0.0);
    }

    #[test]
    fn selection_follows_total_score_not_keyword_hits_alone() {
        let (index, bodies) = garden(&[
            ("Ownership", "values have owners", &[], &["Lifetimes"], 0),
            ("Lifetimes", "scopes of references", &[], &["Ownership"], 400),
            ("Gardening", "plants plants plants", &[], &[], 0),
        ]);
        let found = find_relevant_nodes(&index, &bodies, "ownership", 2, NOW);

        // Gardening's recency outweighs Lifetimes' single link
        assert_eq!(titles(&found), vec!["Ownership", "Gardening"]);
    }

    #[test]
    fn selection_fills_up_to_max_nodes_when_the_garden_allows() {
        let (index, bodies) = garden(&[
            ("Ownership", "values have owners", &[], &["Lifetimes"], 0),
            ("Lifetimes", "scopes of references", &[], &["Ownership"], 400),
            ("Gardening", "plants plants plants", &[], &[], 0),
        ]);
        let found = find_relevant_nodes(&index, &bodies, "plants", 3, NOW);

        assert_eq!(found.len(), 3);
        assert_eq!(found[0].title, "Gardening");
    }

    #[test]
    fn no_match_falls_back_to_total_score() {
        let (index, bodies) = garden(&[("Fresh", "", &[], &[], 0), ("Stale", "", &[], &[], 400)]);
        let found = find_relevant_nodes(&index, &bodies, "quantum", 1, NOW);

        assert_eq!(titles(&found), vec!["Fresh"]);
    }

    #[test]
    fn empty_garden_yields_nothing() {
        let found = find_relevant_nodes(&GardenIndex::default(), &HashMap::new(), "x", 5, NOW);
        assert!(found.is_empty());
    }
}

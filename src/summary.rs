//! Dashboard statistics computed straight from the index.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use time::OffsetDateTime;

use crate::GardenIndex;

/// Notes whose incoming plus outgoing related links reach this count are hubs.
pub const HUB_THRESHOLD: usize = 5;

/// Heuristic overview of a garden.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GardenSummary {
    pub note_count: usize,
    pub tag_count: usize,
    pub path_count: usize,
    /// Stored related references, counted once per direction.
    pub edge_count: usize,
    pub hub_count: usize,
    pub bridge_count: usize,
    pub recent_changes: Vec<RecentChange>,
}

/// One entry of the recent-changes list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentChange {
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    pub tags: Vec<String>,
    pub related_notes: Vec<String>,
}

/// Computes the summary, listing at most `limit` recent changes.
pub fn summarize(index: &GardenIndex, limit: usize) -> GardenSummary {
    GardenSummary {
        note_count: index.notes.len(),
        tag_count: index.tags.len(),
        path_count: index.paths.len(),
        edge_count: edge_count(index),
        hub_count: hub_count(index, HUB_THRESHOLD),
        bridge_count: bridge_count(index),
        recent_changes: recent_changes(index, limit),
    }
}

pub fn edge_count(index: &GardenIndex) -> usize {
    index.notes.values().map(|n| n.related_notes.len()).sum()
}

/// Counts notes with at least `threshold` related links in either direction.
pub fn hub_count(index: &GardenIndex, threshold: usize) -> usize {
    let mut incoming: HashMap<&str, usize> = HashMap::new();
    for record in index.notes.values() {
        for related in &record.related_notes {
            if index.contains_note(related) {
                *incoming.entry(related.as_str()).or_default() += 1;
            }
        }
    }

    index
        .notes
        .iter()
        .filter(|(title, record)| {
            incoming.get(title.as_str()).copied().unwrap_or(0) + record.related_notes.len()
                >= threshold
        })
        .count()
}

/// Counts notes linking at least two neighbours whose tag sets barely overlap.
///
/// Two tag sets count as different clusters when their intersection is
/// smaller than half of the smaller set.
pub fn bridge_count(index: &GardenIndex) -> usize {
    index
        .notes
        .values()
        .filter(|record| record.related_notes.len() > 1)
        .filter(|record| {
            let neighbour_tags: Vec<BTreeSet<&str>> = record
                .related_notes
                .iter()
                .filter_map(|r| index.notes.get(r))
                .map(|n| n.tags.iter().map(String::as_str).collect())
                .collect();

            neighbour_tags.iter().enumerate().any(|(i, a)| {
                neighbour_tags[i + 1..].iter().any(|b| {
                    let overlap = a.intersection(b).count() as f64;
                    overlap < a.len().min(b.len()) as f64 / 2.0
                })
            })
        })
        .count()
}

/// Returns the `limit` most recently created notes, newest first.
pub fn recent_changes(index: &GardenIndex, limit: usize) -> Vec<RecentChange> {
    let mut changes: Vec<RecentChange> = index
        .notes
        .iter()
        .map(|(title, record)| RecentChange {
            title: title.clone(),
            created: record.created,
            tags: record.tags.clone(),
            related_notes: record.related_notes.clone(),
        })
        .collect();

    changes.sort_by(|a, b| b.created.cmp(&a.created));
    changes.truncate(limit);
    changes
}

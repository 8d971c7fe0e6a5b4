use std::sync::Arc;

use anyhow::Context;
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiError, ApiResult, AppState};
use crate::graph::{
    self, DEFAULT_NUM_PATHS, DEFAULT_RANDOMNESS, DEFAULT_SUBGRAPH_DISTANCE, GardenGraph, Subgraph,
};
use crate::summary::GardenSummary;
use crate::utils::parse_list;
use crate::{GardenStore, Note, SearchResult};

const DEFAULT_SEARCH_LIMIT: usize = 20;
const DEFAULT_RECENT: usize = 10;

/// Runs garden work on the blocking pool.
async fn blocking<T, F>(state: Arc<AppState>, work: F) -> ApiResult<T>
where
    F: FnOnce(&AppState) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&state))
        .await
        .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("Blocking task failed")))?
}

/// Returns the cached response `name`, computing and storing it on a miss.
///
/// The service lock is only held for the cache file reads and writes;
/// `compute` takes whatever locks it needs itself.
fn cached<T, F>(state: &AppState, name: &str, compute: F) -> ApiResult<Value>
where
    T: Serialize,
    F: FnOnce(&AppState) -> ApiResult<T>,
{
    let location = GardenStore::api_location(name);

    let hit = state.service()?.store().read_file(&location)?;
    if let Some(raw) = hit {
        match serde_json::from_str(&raw) {
            Ok(value) => return Ok(value),
            Err(e) => tracing::warn!(name, error = %e, "discarding unreadable cached response"),
        }
    }

    let value = serde_json::to_value(compute(state)?)
        .with_context(|| format!("Failed to encode {name}"))?;
    let pretty = serde_json::to_string_pretty(&value)
        .with_context(|| format!("Failed to encode {name}"))?;
    state.service()?.store().write_file(&location, &pretty)?;
    tracing::info!(name, "cached analysis response");

    Ok(value)
}

/// Snapshots the garden graph, releasing the service lock before returning.
fn load_graph(state: &AppState) -> ApiResult<GardenGraph> {
    let service = state.service()?;
    let index = service.index()?;
    Ok(GardenGraph::from_index(&index))
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub async fn graph_analysis(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    blocking(state, |state| {
        cached(state, "graph-analysis", |state| {
            let graph = load_graph(state)?;
            Ok(graph::generate_report(&graph, &mut rand::thread_rng()))
        })
    })
    .await
    .map(Json)
}

pub async fn semantic_connections(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    blocking(state, |state| {
        cached(state, "semantic-connections", |state| {
            let bodies = state.service()?.note_bodies()?;
            // embedding calls run with only the analyzer locked
            let mut analyzer = state.analyzer()?;
            Ok(analyzer.find_semantic_connections(&bodies, state.similarity_threshold)?)
        })
    })
    .await
    .map(Json)
}

pub async fn communities(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    blocking(state, |state| {
        cached(state, "communities", |state| {
            let graph = load_graph(state)?;
            Ok(graph::detect_communities(&graph, &mut rand::thread_rng()))
        })
    })
    .await
    .map(Json)
}

pub async fn centrality(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    blocking(state, |state| {
        cached(state, "centrality", |state| {
            Ok(graph::centrality_measures(&load_graph(state)?))
        })
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct PathsQuery {
    source: Option<String>,
    target: Option<String>,
}

pub async fn paths(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathsQuery>,
) -> ApiResult<Json<Vec<Vec<String>>>> {
    let (Some(source), Some(target)) = (required(query.source), required(query.target)) else {
        return Err(ApiError::MissingParameter("source or target"));
    };

    blocking(state, move |state| {
        let graph = load_graph(state)?;
        Ok(graph::agentic_path_finding(
            &graph,
            &source,
            &target,
            DEFAULT_NUM_PATHS,
            DEFAULT_RANDOMNESS,
            &mut rand::thread_rng(),
        ))
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct SubgraphQuery {
    node: Option<String>,
    distance: Option<String>,
}

pub async fn subgraph(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SubgraphQuery>,
) -> ApiResult<Json<Subgraph>> {
    let Some(node) = required(query.node) else {
        return Err(ApiError::MissingParameter("node"));
    };
    let distance = match required(query.distance) {
        Some(raw) => raw.parse().map_err(|e: std::num::ParseIntError| {
            ApiError::InvalidParameter {
                field: "distance",
                reason: e.to_string(),
            }
        })?,
        None => DEFAULT_SUBGRAPH_DISTANCE,
    };

    blocking(state, move |state| {
        let graph = load_graph(state)?;
        Ok(graph::extract_subgraph(&graph, &node, distance).unwrap_or_default())
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct NotesQuery {
    q: Option<String>,
    tags: Option<String>,
    limit: Option<usize>,
}

pub async fn search_notes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotesQuery>,
) -> ApiResult<Json<Vec<SearchResult>>> {
    let text = query.q.unwrap_or_default();
    let tags = query.tags.as_deref().map(parse_list).unwrap_or_default();
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    blocking(state, move |state| {
        let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
        Ok(state.service()?.search_notes(&text, &tags, limit)?)
    })
    .await
    .map(Json)
}

pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Path(title): Path<String>,
) -> ApiResult<Json<Note>> {
    blocking(state, move |state| {
        state
            .service()?
            .get_note(&title)?
            .ok_or(ApiError::NoteNotFound(title))
    })
    .await
    .map(Json)
}

#[derive(Debug, Serialize)]
pub struct TagNotes {
    tag: String,
    notes: Vec<String>,
}

pub async fn notes_with_tag(
    State(state): State<Arc<AppState>>,
    Path(tag): Path<String>,
) -> ApiResult<Json<TagNotes>> {
    blocking(state, move |state| {
        let index = state.service()?.index()?;
        match index.tags.get(&tag) {
            Some(notes) => Ok(TagNotes {
                notes: notes.clone(),
                tag,
            }),
            None => Err(ApiError::TagNotFound(tag)),
        }
    })
    .await
    .map(Json)
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    recent: Option<usize>,
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> ApiResult<Json<GardenSummary>> {
    let recent = query.recent.unwrap_or(DEFAULT_RECENT);
    blocking(state, move |state| {
        Ok(state.service()?.garden_summary(recent)?)
    })
    .await
    .map(Json)
}

//! Graph analytics: properties, centrality, cores, paths, and reports.
//!
//! All functions take a [`GardenGraph`] reference and return serializable
//! results keyed by node id. Traversals run on petgraph's algorithms, and the
//! centrality and core measures come from rustworkx-core.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use petgraph::algo::{astar, connected_components, dijkstra, kosaraju_scc};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rand::Rng;
use rustworkx_core::centrality::{betweenness_centrality, eigenvector_centrality};
use rustworkx_core::connectivity::core_number;
use serde::Serialize;

use super::builder::{EdgeKind, GardenGraph, NodeKind};
use super::community::detect_communities;
use super::powerlaw::analyze_degree_distribution;

const EIGENVECTOR_MAX_ITER: usize = 1000;
const EIGENVECTOR_TOLERANCE: f64 = 1e-6;

/// Below this many nodes betweenness runs on one thread.
const PARALLEL_THRESHOLD: usize = 50;

/// Hop distances from `source` to every node it reaches, itself included.
fn hop_distances<N, E>(graph: &UnGraph<N, E>, source: NodeIndex) -> Vec<usize> {
    dijkstra(graph, source, None, |_| 1usize)
        .into_values()
        .collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// Whole-graph statistics.
///
/// Path length and diameter are reported on the whole graph when it is
/// connected, otherwise on the largest connected component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphProperties {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub density: f64,
    pub is_connected: bool,
    pub num_connected_components: usize,
    pub average_clustering: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_shortest_path_length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diameter: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_component_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_component_avg_path_length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_component_diameter: Option<usize>,
}

/// Average shortest path length and diameter of a connected graph.
fn path_stats<N, E>(graph: &UnGraph<N, E>) -> (f64, usize) {
    let n = graph.node_count();
    if n < 2 {
        return (0.0, 0);
    }
    let mut total = 0usize;
    let mut diameter = 0usize;
    for v in graph.node_indices() {
        for d in hop_distances(graph, v) {
            total += d;
            diameter = diameter.max(d);
        }
    }
    (total as f64 / (n * (n - 1)) as f64, diameter)
}

fn average_clustering<N, E>(graph: &UnGraph<N, E>) -> f64 {
    let n = graph.node_count();
    if n == 0 {
        return 0.0;
    }
    let total: f64 = graph
        .node_indices()
        .map(|v| {
            let nbrs: Vec<NodeIndex> = graph.neighbors(v).collect();
            let k = nbrs.len();
            if k < 2 {
                return 0.0;
            }
            let mut links = 0usize;
            for (i, a) in nbrs.iter().enumerate() {
                for b in &nbrs[i + 1..] {
                    if graph.contains_edge(*a, *b) {
                        links += 1;
                    }
                }
            }
            2.0 * links as f64 / (k * (k - 1)) as f64
        })
        .sum();
    total / n as f64
}

/// Computes node and edge counts, density, connectivity, clustering, and
/// path statistics. An empty graph reports zeros and is not connected.
pub fn graph_properties(graph: &GardenGraph) -> GraphProperties {
    let g = graph.graph();
    let n = g.node_count();
    let m = g.edge_count();

    if n == 0 {
        return GraphProperties {
            num_nodes: 0,
            num_edges: 0,
            density: 0.0,
            is_connected: false,
            num_connected_components: 0,
            average_clustering: 0.0,
            average_shortest_path_length: None,
            diameter: None,
            largest_component_size: Some(0),
            largest_component_avg_path_length: Some(0.0),
            largest_component_diameter: Some(0),
        };
    }

    let density = if n > 1 {
        2.0 * m as f64 / (n * (n - 1)) as f64
    } else {
        0.0
    };
    let num_components = connected_components(g);
    let is_connected = num_components == 1;

    let mut props = GraphProperties {
        num_nodes: n,
        num_edges: m,
        density,
        is_connected,
        num_connected_components: num_components,
        average_clustering: average_clustering(g),
        average_shortest_path_length: None,
        diameter: None,
        largest_component_size: None,
        largest_component_avg_path_length: None,
        largest_component_diameter: None,
    };

    if is_connected {
        let (avg, diameter) = path_stats(g);
        props.average_shortest_path_length = Some(avg);
        props.diameter = Some(diameter);
    } else {
        // ties go to the component holding the earliest node
        let largest: HashSet<NodeIndex> = kosaraju_scc(g)
            .into_iter()
            .max_by_key(|c| (c.len(), Reverse(c.iter().min().copied())))
            .unwrap_or_default()
            .into_iter()
            .collect();
        let component = g.filter_map(
            |idx, _| largest.contains(&idx).then_some(()),
            |_, _| Some(()),
        );
        let (avg, diameter) = path_stats(&component);
        props.largest_component_size = Some(largest.len());
        props.largest_component_avg_path_length = Some(avg);
        props.largest_component_diameter = Some(diameter);
    }

    props
}

// ---------------------------------------------------------------------------
// Centrality
// ---------------------------------------------------------------------------

/// Centrality scores of note nodes, computed on the note-only subgraph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CentralityMeasures {
    pub degree: BTreeMap<String, f64>,
    pub betweenness: BTreeMap<String, f64>,
    pub closeness: BTreeMap<String, f64>,
    pub eigenvector: BTreeMap<String, f64>,
    /// Unweighted mean of the four measures.
    pub combined: BTreeMap<String, f64>,
}

/// A node with a score, used for rankings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedNode {
    pub title: String,
    pub score: f64,
}

impl CentralityMeasures {
    /// Returns the `k` highest combined scores, ties broken by title.
    pub fn top(&self, k: usize) -> Vec<RankedNode> {
        let mut ranked: Vec<RankedNode> = self
            .combined
            .iter()
            .map(|(title, score)| RankedNode {
                title: title.clone(),
                score: *score,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(k);
        ranked
    }
}

fn degree_centrality<N, E>(graph: &UnGraph<N, E>) -> Vec<f64> {
    let n = graph.node_count();
    if n <= 1 {
        return vec![1.0; n];
    }
    graph
        .node_indices()
        .map(|v| graph.neighbors(v).count() as f64 / (n - 1) as f64)
        .collect()
}

/// Closeness with the Wasserman-Faust correction for disconnected graphs.
fn closeness_centrality<N, E>(graph: &UnGraph<N, E>) -> Vec<f64> {
    let n = graph.node_count();
    graph
        .node_indices()
        .map(|v| {
            let reachable = hop_distances(graph, v);
            let total: usize = reachable.iter().sum();
            let r = reachable.len();
            if total > 0 && n > 1 {
                let c = (r - 1) as f64 / total as f64;
                c * (r - 1) as f64 / (n - 1) as f64
            } else {
                0.0
            }
        })
        .collect()
}

/// Computes degree, betweenness, closeness, and eigenvector centrality over
/// the subgraph induced by note nodes.
pub fn centrality_measures(graph: &GardenGraph) -> CentralityMeasures {
    let notes: UnGraph<String, EdgeKind> = graph.graph().filter_map(
        |_, node| (node.kind == NodeKind::Note).then(|| node.id.clone()),
        |_, kind| Some(*kind),
    );
    let n = notes.node_count();
    if n == 0 {
        return CentralityMeasures::default();
    }

    let degree = degree_centrality(&notes);
    let betweenness = betweenness_centrality(&notes, false, true, PARALLEL_THRESHOLD);
    let closeness = closeness_centrality(&notes);
    let eigenvector = eigenvector_centrality(
        &notes,
        |_| Ok::<f64, std::convert::Infallible>(1.0),
        Some(EIGENVECTOR_MAX_ITER),
        Some(EIGENVECTOR_TOLERANCE),
    )
    .ok()
    .flatten()
    .unwrap_or_else(|| {
        tracing::warn!(
            iterations = EIGENVECTOR_MAX_ITER,
            "eigenvector centrality did not converge; scoring zero"
        );
        vec![0.0; n]
    });

    let mut measures = CentralityMeasures::default();
    for idx in notes.node_indices() {
        let i = idx.index();
        let title = notes[idx].clone();
        let between = betweenness[i].unwrap_or(0.0);
        let combined = (degree[i] + between + closeness[i] + eigenvector[i]) / 4.0;
        measures.degree.insert(title.clone(), degree[i]);
        measures.betweenness.insert(title.clone(), between);
        measures.closeness.insert(title.clone(), closeness[i]);
        measures.eigenvector.insert(title.clone(), eigenvector[i]);
        measures.combined.insert(title, combined);
    }
    measures
}

// ---------------------------------------------------------------------------
// k-core decomposition
// ---------------------------------------------------------------------------

/// Core number of every node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KCoreDecomposition {
    pub core_numbers: BTreeMap<String, usize>,
    pub cores: BTreeMap<usize, Vec<String>>,
    pub max_core: usize,
}

/// Computes the core number of every node and groups nodes by core.
pub fn k_core_decomposition(graph: &GardenGraph) -> KCoreDecomposition {
    let cores = core_number(graph.graph());
    let mut result = KCoreDecomposition::default();

    for idx in graph.graph().node_indices() {
        let id = graph.node(idx).id.clone();
        let core = cores.get(&idx).copied().unwrap_or(0);
        result.core_numbers.insert(id.clone(), core);
        result.cores.entry(core).or_default().push(id);
        result.max_core = result.max_core.max(core);
    }
    result
}

// ---------------------------------------------------------------------------
// Paths and subgraphs
// ---------------------------------------------------------------------------

/// Finds up to `num_paths` distinct routes between two nodes.
///
/// Each attempt gives every edge a weight of `1 + U(0,1) * randomness` and
/// takes the cheapest route, so repeated attempts can surface alternative
/// paths. Unknown endpoints or disconnected nodes yield an empty list.
pub fn agentic_path_finding<R: Rng + ?Sized>(
    graph: &GardenGraph,
    start: &str,
    end: &str,
    num_paths: usize,
    randomness: f64,
    rng: &mut R,
) -> Vec<Vec<String>> {
    let (Some(from), Some(to)) = (graph.node_index(start), graph.node_index(end)) else {
        return Vec::new();
    };

    let mut paths: Vec<Vec<String>> = Vec::new();
    for _ in 0..num_paths {
        let weights: Vec<f64> = (0..graph.edge_count())
            .map(|_| 1.0 + rng.gen_range(0.0..1.0) * randomness)
            .collect();

        let found = astar(
            graph.graph(),
            from,
            |n| n == to,
            |e| weights[e.id().index()],
            |_| 0.0,
        );

        if let Some((_cost, route)) = found {
            let ids: Vec<String> = route.into_iter().map(|i| graph.node(i).id.clone()).collect();
            if !paths.contains(&ids) {
                paths.push(ids);
            }
        }
    }
    paths
}

/// A node of an extracted subgraph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubgraphNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
}

/// An edge of an extracted subgraph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubgraphEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

/// Induced subgraph around a centre node.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Subgraph {
    pub nodes: Vec<SubgraphNode>,
    pub edges: Vec<SubgraphEdge>,
}

/// Extracts the subgraph induced by nodes within `max_distance` hops of
/// `center`. Returns `None` when the centre is not in the graph.
pub fn extract_subgraph(graph: &GardenGraph, center: &str, max_distance: usize) -> Option<Subgraph> {
    let center = graph.node_index(center)?;
    let g = graph.graph();

    let mut members: Vec<NodeIndex> = dijkstra(g, center, None, |_| 1usize)
        .into_iter()
        .filter(|(_, d)| *d <= max_distance)
        .map(|(idx, _)| idx)
        .collect();
    members.sort();
    let included: HashSet<NodeIndex> = members.iter().copied().collect();

    let nodes = members
        .iter()
        .map(|&i| {
            let node = graph.node(i);
            SubgraphNode {
                id: node.id.clone(),
                kind: node.kind,
                label: node.label.clone(),
            }
        })
        .collect();

    let edges = g
        .edge_references()
        .filter(|e| included.contains(&e.source()) && included.contains(&e.target()))
        .map(|e| SubgraphEdge {
            source: graph.node(e.source()).id.clone(),
            target: graph.node(e.target()).id.clone(),
            kind: *e.weight(),
        })
        .collect();

    Some(Subgraph { nodes, edges })
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityStructure {
    pub num_communities: usize,
    pub modularity: f64,
    pub largest_community_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchicalStructure {
    pub max_core: usize,
    pub core_distribution: BTreeMap<usize, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeSummary {
    pub is_power_law: bool,
    pub alpha: Option<f64>,
    pub max_degree: usize,
    pub avg_degree: f64,
}

/// Overview combining every structural analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphReport {
    pub graph_properties: GraphProperties,
    pub top_central_nodes: Vec<RankedNode>,
    pub community_structure: CommunityStructure,
    pub hierarchical_structure: HierarchicalStructure,
    pub degree_distribution: DegreeSummary,
}

/// Number of nodes listed in [`GraphReport::top_central_nodes`].
pub const REPORT_TOP_NODES: usize = 10;

/// Builds the full report. `rng` drives community detection.
pub fn generate_report<R: Rng + ?Sized>(graph: &GardenGraph, rng: &mut R) -> GraphReport {
    let properties = graph_properties(graph);
    let centrality = centrality_measures(graph);
    let communities = detect_communities(graph, rng);
    let cores = k_core_decomposition(graph);
    let degrees = analyze_degree_distribution(&graph.degrees());

    let max_degree = degrees.degrees.iter().copied().max().unwrap_or(0);
    let avg_degree = if degrees.degrees.is_empty() {
        0.0
    } else {
        degrees.degrees.iter().sum::<usize>() as f64 / degrees.degrees.len() as f64
    };

    GraphReport {
        graph_properties: properties,
        top_central_nodes: centrality.top(REPORT_TOP_NODES),
        community_structure: CommunityStructure {
            num_communities: communities.num_communities,
            modularity: communities.modularity,
            largest_community_size: communities
                .communities
                .values()
                .map(Vec::len)
                .max()
                .unwrap_or(0),
        },
        hierarchical_structure: HierarchicalStructure {
            max_core: cores.max_core,
            core_distribution: cores
                .cores
                .iter()
                .map(|(core, nodes)| (*core, nodes.len()))
                .collect(),
        },
        degree_distribution: DegreeSummary {
            is_power_law: degrees.is_power_law,
            alpha: degrees.alpha,
            max_degree,
            avg_degree,
        },
    }
}

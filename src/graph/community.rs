//! Louvain community detection on petgraph graphs.

use std::collections::{BTreeMap, HashMap};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use super::builder::GardenGraph;

const MIN_GAIN: f64 = 1e-12;

/// Result of community detection over the full graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommunityDetection {
    /// Node id to community id; ids are renumbered `0..num_communities`.
    pub partition: BTreeMap<String, usize>,
    pub communities: BTreeMap<usize, Vec<String>>,
    pub modularity: f64,
    pub num_communities: usize,
}

/// Weighted graph used between Louvain levels. Node weights hold the
/// self-loop weight of collapsed communities; edges never loop.
type LevelGraph = UnGraph<f64, f64>;

fn other_end(edge: petgraph::graph::EdgeReference<'_, f64>, v: NodeIndex) -> NodeIndex {
    if edge.source() == v { edge.target() } else { edge.source() }
}

fn weighted_degree(level: &LevelGraph, v: NodeIndex) -> f64 {
    level.edges(v).map(|e| *e.weight()).sum::<f64>() + 2.0 * level[v]
}

fn total_weight(level: &LevelGraph) -> f64 {
    level.edge_weights().sum::<f64>() + level.node_weights().sum::<f64>()
}

/// Moves nodes between communities until no move improves modularity.
/// Returns the community of every node, renumbered from zero.
fn one_level<R: Rng + ?Sized>(level: &LevelGraph, rng: &mut R) -> Vec<usize> {
    let n = level.node_count();
    let m2 = 2.0 * total_weight(level);
    let degrees: Vec<f64> = level.node_indices().map(|v| weighted_degree(level, v)).collect();
    let mut community: Vec<usize> = (0..n).collect();
    let mut tot: Vec<f64> = degrees.clone();

    let mut order: Vec<NodeIndex> = level.node_indices().collect();
    loop {
        order.shuffle(rng);
        let mut moved = false;

        for &v in &order {
            let current = community[v.index()];
            let k = degrees[v.index()];

            // ordered, so ties go to the lowest community id
            let mut links: BTreeMap<usize, f64> = BTreeMap::new();
            for edge in level.edges(v) {
                *links.entry(community[other_end(edge, v).index()]).or_default() += *edge.weight();
            }

            tot[current] -= k;
            let gain = |c: usize, links_to_c: f64| links_to_c - tot[c] * k / m2;

            let mut best = current;
            let mut best_gain = gain(current, links.get(&current).copied().unwrap_or(0.0));
            for (&c, &w) in &links {
                let g = gain(c, w);
                if g > best_gain + MIN_GAIN {
                    best = c;
                    best_gain = g;
                }
            }

            tot[best] += k;
            if best != current {
                community[v.index()] = best;
                moved = true;
            }
        }

        if !moved {
            break;
        }
    }

    renumber(&community)
}

/// Collapses each community into a single node.
fn aggregate(level: &LevelGraph, community: &[usize], count: usize) -> LevelGraph {
    let mut next = LevelGraph::with_capacity(count, level.edge_count());
    for _ in 0..count {
        next.add_node(0.0);
    }
    for v in level.node_indices() {
        next[NodeIndex::new(community[v.index()])] += level[v];
    }

    for edge in level.edge_references() {
        let a = NodeIndex::new(community[edge.source().index()]);
        let b = NodeIndex::new(community[edge.target().index()]);
        let w = *edge.weight();
        if a == b {
            next[a] += w;
        } else if let Some(existing) = next.find_edge(a, b) {
            next[existing] += w;
        } else {
            next.add_edge(a, b, w);
        }
    }
    next
}

fn renumber(community: &[usize]) -> Vec<usize> {
    let mut ids: HashMap<usize, usize> = HashMap::new();
    community
        .iter()
        .map(|c| {
            let next = ids.len();
            *ids.entry(*c).or_insert(next)
        })
        .collect()
}

/// Newman modularity of `community` over an unweighted graph.
fn modularity<N, E>(graph: &UnGraph<N, E>, community: &[usize]) -> f64 {
    let m = graph.edge_count() as f64;
    if m == 0.0 {
        return 0.0;
    }

    let mut internal: HashMap<usize, f64> = HashMap::new();
    let mut degree: HashMap<usize, f64> = HashMap::new();
    for edge in graph.edge_references() {
        let a = community[edge.source().index()];
        let b = community[edge.target().index()];
        *degree.entry(a).or_default() += 1.0;
        *degree.entry(b).or_default() += 1.0;
        if a == b {
            *internal.entry(a).or_default() += 1.0;
        }
    }

    degree
        .iter()
        .map(|(c, d)| internal.get(c).copied().unwrap_or(0.0) / m - (d / (2.0 * m)).powi(2))
        .sum()
}

/// Partitions the graph with the Louvain method.
///
/// `rng` decides the node visiting order, so a seeded generator gives a
/// reproducible partition. A graph without edges puts every node in its own
/// community with modularity 0.
pub fn detect_communities<R: Rng + ?Sized>(graph: &GardenGraph, rng: &mut R) -> CommunityDetection {
    let g = graph.graph();
    let mut assignment: Vec<usize> = (0..g.node_count()).collect();

    if g.edge_count() > 0 {
        let mut level: LevelGraph = g.map(|_, _| 0.0, |_, _| 1.0);
        loop {
            let local = one_level(&level, rng);
            let count = local.iter().copied().max().map_or(0, |c| c + 1);
            for c in assignment.iter_mut() {
                *c = local[*c];
            }
            if count == level.node_count() {
                break;
            }
            level = aggregate(&level, &local, count);
        }
    }
    let assignment = renumber(&assignment);

    let mut result = CommunityDetection {
        modularity: modularity(g, &assignment),
        ..Default::default()
    };
    for idx in g.node_indices() {
        let id = g[idx].id.clone();
        let c = assignment[idx.index()];
        result.partition.insert(id.clone(), c);
        result.communities.entry(c).or_default().push(id);
    }
    result.num_communities = result.communities.len();

    tracing::debug!(
        communities = result.num_communities,
        modularity = result.modularity,
        "detected communities"
    );
    result
}

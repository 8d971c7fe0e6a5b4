use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;

use crate::GardenIndex;

/// What a graph node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Note,
    Tag,
    Path,
}

/// Why two nodes are connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Tagged,
    Path,
    Related,
}

/// A node of the garden graph.
///
/// Note nodes use the note title as `id`; tag and path nodes use
/// `tag:<name>` and `path:<topic>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    /// Display name: the title, tag, or topic.
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Undirected garden graph with at most one edge per node pair.
#[derive(Debug, Clone, Default)]
pub struct GardenGraph {
    graph: UnGraph<GraphNode, EdgeKind>,
    ids: HashMap<String, NodeIndex>,
}

impl GardenGraph {
    /// Builds the graph from the index.
    ///
    /// Tag edges go to every listed note that exists. A path connects to each
    /// note whose tags contain the lowercased topic or whose lowercased title
    /// contains the topic or any subtopic. Related references whose target is
    /// a node become `related` edges. An already connected pair keeps its
    /// first edge.
    pub fn from_index(index: &GardenIndex) -> Self {
        let mut g = Self::default();

        for (title, record) in &index.notes {
            g.add_node(GraphNode {
                id: title.clone(),
                kind: NodeKind::Note,
                label: title.clone(),
                tags: record.tags.clone(),
            });
        }

        for (tag, titles) in &index.tags {
            let tag_id = format!("tag:{tag}");
            g.add_node(GraphNode {
                id: tag_id.clone(),
                kind: NodeKind::Tag,
                label: tag.clone(),
                tags: Vec::new(),
            });
            for title in titles {
                if index.contains_note(title) {
                    g.connect(&tag_id, title, EdgeKind::Tagged);
                }
            }
        }

        for (topic, record) in &index.paths {
            let path_id = format!("path:{topic}");
            g.add_node(GraphNode {
                id: path_id.clone(),
                kind: NodeKind::Path,
                label: topic.clone(),
                tags: Vec::new(),
            });

            let topic_lower = topic.to_lowercase();
            let subtopics: Vec<String> =
                record.subtopics.iter().map(|s| s.to_lowercase()).collect();

            for (title, note) in &index.notes {
                let title_lower = title.to_lowercase();
                let matches = note.tags.iter().any(|t| *t == topic_lower)
                    || title_lower.contains(&topic_lower)
                    || subtopics.iter().any(|s| title_lower.contains(s.as_str()));
                if matches {
                    g.connect(&path_id, title, EdgeKind::Path);
                }
            }
        }

        for (title, record) in &index.notes {
            for related in &record.related_notes {
                g.connect(title, related, EdgeKind::Related);
            }
        }

        tracing::debug!(
            nodes = g.node_count(),
            edges = g.edge_count(),
            "built knowledge graph"
        );
        g
    }

    fn add_node(&mut self, node: GraphNode) {
        if self.ids.contains_key(&node.id) {
            return;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.ids.insert(id, idx);
    }

    /// Connects two existing nodes; missing endpoints, self-loops and
    /// existing pairs are skipped.
    fn connect(&mut self, a: &str, b: &str, kind: EdgeKind) {
        if let (Some(&ia), Some(&ib)) = (self.ids.get(a), self.ids.get(b))
            && ia != ib
            && self.graph.find_edge(ia, ib).is_none()
        {
            self.graph.add_edge(ia, ib, kind);
        }
    }

    pub fn graph(&self) -> &UnGraph<GraphNode, EdgeKind> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.ids.get(id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &GraphNode {
        &self.graph[idx]
    }

    /// Node degrees in index order.
    pub fn degrees(&self) -> Vec<usize> {
        self.graph
            .node_indices()
            .map(|v| self.graph.neighbors(v).count())
            .collect()
    }
}

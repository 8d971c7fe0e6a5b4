//! Knowledge graph built from the index, plus its analytics.
//!
//! The graph is rebuilt from the index for every query. Notes, tags, and
//! exploration paths become nodes; tag membership, path matches, and related
//! references become edges.

mod analytics;
mod builder;
mod community;
mod powerlaw;
mod semantic;

pub use analytics::{
    CentralityMeasures, CommunityStructure, DegreeSummary, GraphProperties, GraphReport,
    HierarchicalStructure, KCoreDecomposition, RankedNode, Subgraph, SubgraphEdge, SubgraphNode,
    agentic_path_finding, centrality_measures, extract_subgraph, generate_report,
    graph_properties, k_core_decomposition,
};
pub use builder::{EdgeKind, GardenGraph, GraphNode, NodeKind};
pub use community::{CommunityDetection, detect_communities};
pub use powerlaw::{DegreeDistribution, DistributionComparison, analyze_degree_distribution};
pub use semantic::{
    Embedder, OllamaEmbedder, SemanticAnalyzer, SemanticConnection, cosine_similarity,
};

/// Default number of attempts for [`agentic_path_finding`].
pub const DEFAULT_NUM_PATHS: usize = 3;

/// Default edge weight jitter for [`agentic_path_finding`].
pub const DEFAULT_RANDOMNESS: f64 = 0.3;

/// Default hop radius for [`extract_subgraph`].
pub const DEFAULT_SUBGRAPH_DISTANCE: usize = 2;

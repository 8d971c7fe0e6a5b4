//! Graph analytics over a garden built through the service.

use anyhow::Result;
use garden::graph::{
    self, EdgeKind, GardenGraph, NodeKind, centrality_measures, extract_subgraph,
    graph_properties, k_core_decomposition,
};
use garden::{GardenService, GardenStore};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

/// Four soil notes in a chain of related links plus one isolated note, a
/// shared tag, and one exploration path.
fn sample_garden() -> Result<(TempDir, GardenService)> {
    let dir = tempfile::tempdir()?;
    let service = GardenService::new(GardenStore::open(dir.path())?);

    service.add_note("Compost", "Decomposed matter.", &["soil"], &[])?;
    service.add_note("Mulch", "Covers the soil.", &["soil"], &["Compost"])?;
    service.add_note("Worms", "Aerate the soil.", &["soil"], &["Mulch"])?;
    service.add_note("Loam", "Balanced soil texture.", &[], &["Worms"])?;
    service.add_note("Telescopes", "Look at the sky.", &["sky"], &[])?;
    service.create_exploration_path("Soil Care", &["compost"], None)?;

    Ok((dir, service))
}

fn sample_graph(service: &GardenService) -> Result<GardenGraph> {
    Ok(GardenGraph::from_index(&service.index()?))
}

#[test]
fn test_graph_contains_notes_tags_and_paths() -> Result<()> {
    // Arrange
    let (_dir, service) = sample_garden()?;

    // Act
    let graph = sample_graph(&service)?;

    // Assert: 5 notes, 2 tags, 1 path
    assert_eq!(graph.node_count(), 8);
    let path = graph.node_index("path:Soil Care").expect("path node");
    assert_eq!(graph.node(path).kind, NodeKind::Path);
    assert!(graph.contains("tag:soil"));
    assert!(graph.contains("tag:sky"));

    Ok(())
}

#[test]
fn test_properties_report_components() -> Result<()> {
    // Arrange
    let (_dir, service) = sample_garden()?;
    let graph = sample_graph(&service)?;

    // Act
    let props = graph_properties(&graph);

    // Assert: the sky cluster is separate from the soil cluster
    assert_eq!(props.num_nodes, 8);
    assert!(!props.is_connected);
    assert_eq!(props.num_connected_components, 2);
    assert_eq!(props.largest_component_size, Some(6));
    assert!(props.density > 0.0 && props.density < 1.0);

    Ok(())
}

#[test]
fn test_centrality_only_scores_notes() -> Result<()> {
    // Arrange
    let (_dir, service) = sample_garden()?;
    let graph = sample_graph(&service)?;

    // Act
    let measures = centrality_measures(&graph);

    // Assert
    assert_eq!(measures.combined.len(), 5);
    assert!(measures.combined.keys().all(|k| !k.contains(':')));
    assert_eq!(measures.betweenness["Telescopes"], 0.0);
    assert!(measures.betweenness["Mulch"] > measures.betweenness["Loam"]);

    let top = measures.top(2);
    assert_eq!(top.len(), 2);
    assert!(top[0].score >= top[1].score);

    Ok(())
}

#[test]
fn test_k_cores_separate_dense_cluster() -> Result<()> {
    // Arrange
    let (_dir, service) = sample_garden()?;
    let graph = sample_graph(&service)?;

    // Act
    let cores = k_core_decomposition(&graph);

    // Assert
    assert_eq!(cores.core_numbers.len(), 8);
    assert_eq!(cores.core_numbers["Telescopes"], 1);
    assert!(cores.max_core >= 2);
    assert!(cores.cores[&cores.max_core].contains(&"Mulch".to_string()));

    Ok(())
}

#[test]
fn test_paths_and_subgraph_around_a_note() -> Result<()> {
    // Arrange
    let (_dir, service) = sample_garden()?;
    let graph = sample_graph(&service)?;
    let mut rng = StdRng::seed_from_u64(7);

    // Act
    let paths = graph::agentic_path_finding(&graph, "Compost", "Loam", 3, 0.3, &mut rng);
    let none = graph::agentic_path_finding(&graph, "Compost", "Telescopes", 3, 0.3, &mut rng);
    let neighbourhood = extract_subgraph(&graph, "Loam", 1).expect("known node");

    // Assert
    assert!(!paths.is_empty());
    for path in &paths {
        assert_eq!(path.first().map(String::as_str), Some("Compost"));
        assert_eq!(path.last().map(String::as_str), Some("Loam"));
    }
    assert!(none.is_empty());

    let ids: Vec<&str> = neighbourhood.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"Worms"));
    assert_eq!(neighbourhood.edges.len(), 1);
    assert_eq!(neighbourhood.edges[0].kind, EdgeKind::Related);
    assert!(extract_subgraph(&graph, "Nowhere", 1).is_none());

    Ok(())
}

#[test]
fn test_report_combines_every_analysis() -> Result<()> {
    // Arrange
    let (_dir, service) = sample_garden()?;
    let graph = sample_graph(&service)?;

    // Act
    let report = graph::generate_report(&graph, &mut StdRng::seed_from_u64(1));

    // Assert
    assert_eq!(report.graph_properties, graph_properties(&graph));
    assert_eq!(report.top_central_nodes.len(), 5);
    assert_eq!(report.hierarchical_structure.max_core, 2);
    assert!(report.community_structure.num_communities >= 2);
    assert_eq!(report.degree_distribution.max_degree, 3);

    Ok(())
}

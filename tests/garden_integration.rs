use anyhow::Result;
use garden::utils::parse_list;
use garden::{GardenService, GardenStore};
use tempfile::TempDir;

fn open_garden() -> Result<(TempDir, GardenService)> {
    let dir = tempfile::tempdir()?;
    let service = GardenService::new(GardenStore::open(dir.path())?);
    Ok((dir, service))
}

/// Helper function that mimics the core logic of the add command.
fn add_note(
    service: &GardenService,
    title: &str,
    content: &str,
    tags: Option<&str>,
    related: Option<&str>,
) -> Result<String> {
    let tags = tags.map(parse_list).unwrap_or_default();
    let related = related.map(parse_list).unwrap_or_default();
    let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
    let related_refs: Vec<&str> = related.iter().map(String::as_str).collect();

    service.add_note(title, content, &tag_refs, &related_refs)
}

#[test]
fn test_add_note_writes_markdown_and_index() -> Result<()> {
    // Arrange
    let (dir, service) = open_garden()?;

    // Act
    let message = add_note(
        &service,
        "Rust Ownership",
        "Each value has one owner.",
        Some("rust, memory"),
        None,
    )?;

    // Assert: message, file on disk, index entry
    assert_eq!(message, "Note 'Rust Ownership' added to the knowledge garden");

    let text = std::fs::read_to_string(dir.path().join("notes/rust_ownership.md"))?;
    assert!(text.starts_with("# Rust Ownership"));
    assert!(text.contains("Each value has one owner."));

    let index: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("index.json"))?)?;
    assert_eq!(
        index["notes"]["Rust Ownership"]["tags"],
        serde_json::json!(["rust", "memory"])
    );
    assert_eq!(index["tags"]["rust"], serde_json::json!(["Rust Ownership"]));

    Ok(())
}

#[test]
fn test_related_notes_are_linked_both_ways() -> Result<()> {
    // Arrange
    let (_dir, service) = open_garden()?;
    add_note(&service, "Borrowing", "References borrow values.", None, None)?;

    // Act
    add_note(
        &service,
        "Lifetimes",
        "Lifetimes bound references.",
        None,
        Some("Borrowing"),
    )?;

    // Assert: the older note learned about the newer one
    let borrowing = service.get_note("Borrowing")?.expect("note exists");
    assert_eq!(borrowing.related_notes(), ["Lifetimes"]);
    assert_eq!(borrowing.content(), "References borrow values.");

    let text = service.get_note_content("Borrowing")?.expect("file exists");
    assert!(text.contains("Lifetimes"));

    Ok(())
}

#[test]
fn test_empty_title_is_rejected() -> Result<()> {
    // Arrange
    let (_dir, service) = open_garden()?;

    // Act
    let result = add_note(&service, "   ", "body", None, None);

    // Assert
    let err = result.expect_err("empty title must fail");
    assert!(err.to_string().contains("cannot be empty"));
    assert!(service.index()?.notes.is_empty());

    Ok(())
}

#[test]
fn test_search_ranks_title_matches_first_and_filters_by_tag() -> Result<()> {
    // Arrange
    let (_dir, service) = open_garden()?;
    add_note(&service, "Soil Life", "Worms and fungi.", Some("soil"), None)?;
    add_note(&service, "Compost", "Compost builds soil.", Some("soil"), None)?;
    add_note(&service, "Rain", "Water for the soil.", Some("weather"), None)?;

    // Act
    let all = service.search_notes("soil", &[], 10)?;
    let tagged = service.search_notes("soil", &["weather"], 10)?;
    let limited = service.search_notes("soil", &[], 1)?;

    // Assert
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].title, "Soil Life");

    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].title, "Rain");

    assert_eq!(limited.len(), 1);

    Ok(())
}

#[test]
fn test_tags_are_listed_with_counts() -> Result<()> {
    // Arrange
    let (_dir, service) = open_garden()?;
    add_note(&service, "Oak", "A tree.", Some("trees,native"), None)?;
    add_note(&service, "Birch", "Another tree.", Some("trees"), None)?;

    // Act
    let tags = service.list_tags()?;
    let trees = service.notes_with_tag("trees")?;

    // Assert
    assert_eq!(
        tags,
        vec![("trees".to_string(), 2), ("native".to_string(), 1)]
    );
    assert_eq!(trees, vec!["Oak", "Birch"]);
    assert!(service.notes_with_tag("missing")?.is_empty());

    Ok(())
}

#[test]
fn test_exploration_path_lifecycle() -> Result<()> {
    // Arrange
    let (dir, service) = open_garden()?;
    add_note(&service, "Seed Saving", "Keep seeds dry.", None, None)?;

    // Act
    let created = service.create_exploration_path(
        "Gardening",
        &["seeds", "soil"],
        Some("Growing food"),
    )?;
    let added = service.add_note_to_path("Gardening", "Seed Saving")?;
    let again = service.add_note_to_path("Gardening", "Seed Saving")?;
    let no_note = service.add_note_to_path("Gardening", "Ghost")?;
    let no_path = service.add_note_to_path("Cooking", "Seed Saving")?;

    // Assert
    assert_eq!(
        created,
        "Created exploration path for 'Gardening' with 2 subtopics"
    );
    assert_eq!(added, "Added note 'Seed Saving' to path 'Gardening'");
    assert_eq!(again, "Note 'Seed Saving' already in path 'Gardening'");
    assert_eq!(no_note, "Note 'Ghost' not found");
    assert_eq!(no_path, "Path 'Cooking' not found");

    let path = service
        .get_exploration_path("Gardening")?
        .expect("path exists");
    assert_eq!(path.notes, vec!["Seed Saving"]);
    assert_eq!(path.description, "Growing food");
    assert!(dir.path().join("paths/gardening.json").exists());

    Ok(())
}

#[test]
fn test_garden_survives_reopening() -> Result<()> {
    // Arrange
    let dir = tempfile::tempdir()?;
    {
        let service = GardenService::new(GardenStore::open(dir.path())?);
        add_note(&service, "Persistent", "Still here.", Some("archive"), None)?;
    }

    // Act
    let service = GardenService::new(GardenStore::open(dir.path())?);

    // Assert
    let note = service.get_note("Persistent")?.expect("note reloaded");
    assert_eq!(note.tags(), ["archive"]);
    assert_eq!(service.garden_summary(10)?.note_count, 1);

    Ok(())
}

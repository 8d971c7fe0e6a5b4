use super::*;
use tempfile::{TempDir, tempdir};

fn service() -> (TempDir, GardenService) {
    let dir = tempdir().expect("failed to create temp dir");
    let store = GardenStore::open(dir.path()).expect("failed to open store");
    (dir, GardenService::new(store))
}

// --- Note Store ---

#[test]
fn add_note_writes_file_and_index_entry() {
    let (dir, service) = service();

    let message = service
        .add_note("Rust Ownership", "Each value has one owner.", &["rust"], &[])
        .expect("failed to add note");
    assert_eq!(message, "Note 'Rust Ownership' added to the knowledge garden");

    let index = service.index().unwrap();
    let record = &index.notes["Rust Ownership"];
    assert_eq!(record.path, "notes/rust_ownership.md");
    assert_eq!(record.tags, vec!["rust"]);
    assert_eq!(index.tags["rust"], vec!["Rust Ownership"]);

    let text = std::fs::read_to_string(dir.path().join("notes/rust_ownership.md")).unwrap();
    assert!(text.starts_with("# Rust Ownership\n\nEach value has one owner.\n"));
    assert!(text.contains("Tags: rust\n"));
}

#[test]
fn add_note_rejects_empty_title() {
    let (_dir, service) = service();

    let err = service.add_note("   ", "body", &[], &[]).unwrap_err();
    assert!(err.to_string().contains("cannot be empty"));
}

#[test]
fn add_note_links_related_notes_both_ways() {
    let (_dir, service) = service();

    service.add_note("Ownership", "Owners.", &["rust"], &[]).unwrap();
    service
        .add_note("Borrowing", "Borrows.", &["rust"], &["Ownership", "Missing"])
        .unwrap();

    let index = service.index().unwrap();
    assert_eq!(
        index.notes["Borrowing"].related_notes,
        vec!["Ownership", "Missing"]
    );
    assert_eq!(index.notes["Ownership"].related_notes, vec!["Borrowing"]);
    assert!(!index.contains_note("Missing"));

    let text = service.get_note_content("Ownership").unwrap().unwrap();
    assert!(text.contains("Related: Borrowing\n"));
    assert!(text.contains("Owners."), "body must survive re-rendering");
}

#[test]
fn reciprocal_link_is_not_duplicated() {
    let (_dir, service) = service();

    service.add_note("A", "a", &[], &[]).unwrap();
    service.add_note("B", "b", &[], &["A"]).unwrap();
    service.add_note("B", "b again", &[], &["A"]).unwrap();

    let index = service.index().unwrap();
    assert_eq!(index.notes["A"].related_notes, vec!["B"]);
}

#[test]
fn self_reference_is_dropped() {
    let (_dir, service) = service();

    service.add_note("Loop", "me", &[], &["Loop"]).unwrap();

    let index = service.index().unwrap();
    assert!(index.notes["Loop"].related_notes.is_empty());
}

#[test]
fn re_adding_a_title_replaces_the_record_but_keeps_old_tag_entries() {
    let (_dir, service) = service();

    service.add_note("Traits", "v1", &["rust"], &[]).unwrap();
    service.add_note("Traits", "v2", &["generics"], &[]).unwrap();

    let index = service.index().unwrap();
    assert_eq!(index.notes.len(), 1);
    assert_eq!(index.notes["Traits"].tags, vec!["generics"]);
    assert_eq!(index.tags["rust"], vec!["Traits"]);
    assert_eq!(index.tags["generics"], vec!["Traits"]);

    let note = service.get_note("Traits").unwrap().unwrap();
    assert_eq!(note.content(), "v2");
}

#[test]
fn colliding_slugs_share_one_file() {
    let (_dir, service) = service();

    service.add_note("A B", "first", &[], &[]).unwrap();
    service.add_note("a/b", "second", &[], &[]).unwrap();

    let index = service.index().unwrap();
    assert_eq!(index.notes["A B"].path, index.notes["a/b"].path);

    let text = service.get_note_content("A B").unwrap().unwrap();
    assert!(text.contains("second"));
}

#[test]
fn linking_back_to_a_colliding_title_keeps_the_new_note() {
    let (dir, service) = service();

    service.add_note("A b", "old body", &[], &[]).unwrap();
    service.add_note("a/b", "new body", &[], &["A b"]).unwrap();

    let text = std::fs::read_to_string(dir.path().join("notes/a_b.md")).unwrap();
    assert!(text.starts_with("# a/b\n"));
    assert!(text.contains("new body"));
    assert!(!text.contains("old body"));

    let index = service.index().unwrap();
    assert_eq!(index.notes["A b"].related_notes, vec!["a/b"]);
}

#[test]
fn search_ranks_title_matches_first() {
    let (_dir, service) = service();

    service
        .add_note("Aliasing", "Mutable references and rust rules.", &[], &[])
        .unwrap();
    service.add_note("Rust Basics", "Intro.", &[], &[]).unwrap();
    service.add_note("Unrelated", "Nothing here.", &[], &[]).unwrap();

    let results = service.search_notes("RUST", &[], 5).unwrap();
    let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Rust Basics", "Aliasing"]);
}

#[test]
fn search_ties_follow_insertion_order() {
    let (_dir, service) = service();

    service.add_note("Zeta", "shared text", &[], &[]).unwrap();
    service.add_note("Alpha", "shared text", &[], &[]).unwrap();

    let results = service.search_notes("shared", &[], 1).unwrap();
    assert_eq!(results[0].title, "Zeta");
}

#[test]
fn search_tag_filter_is_a_union() {
    let (_dir, service) = service();

    service.add_note("One", "text", &["a"], &[]).unwrap();
    service.add_note("Two", "text", &["b"], &[]).unwrap();
    service.add_note("Three", "text", &["c"], &[]).unwrap();

    let results = service.search_notes("text", &["a", "b"], 10).unwrap();
    let mut titles: Vec<_> = results.iter().map(|r| r.title.clone()).collect();
    titles.sort();
    assert_eq!(titles, vec!["One", "Two"]);
}

#[test]
fn search_with_unknown_tag_returns_nothing() {
    let (_dir, service) = service();
    service.add_note("One", "text", &["a"], &[]).unwrap();

    assert!(service.search_notes("text", &["zzz"], 10).unwrap().is_empty());
}

#[test]
fn search_respects_limit_and_previews() {
    let (_dir, service) = service();

    let long_body = "x".repeat(500);
    for i in 0..8 {
        service
            .add_note(&format!("Note {i}"), &long_body, &[], &[])
            .unwrap();
    }

    let results = service.search_notes("note", &[], 5).unwrap();
    assert_eq!(results.len(), 5);
    assert!(results[0].preview.ends_with("..."));
    assert_eq!(results[0].preview.chars().count(), 203);
}

#[test]
fn search_skips_notes_with_missing_files() {
    let (dir, service) = service();
    service.add_note("Gone", "text", &[], &[]).unwrap();
    std::fs::remove_file(dir.path().join("notes/gone.md")).unwrap();

    assert!(service.search_notes("text", &[], 5).unwrap().is_empty());
    assert_eq!(service.get_note_content("Gone").unwrap(), None);
}

#[test]
fn get_note_content_returns_none_for_unknown_title() {
    let (_dir, service) = service();
    assert_eq!(service.get_note_content("Nope").unwrap(), None);
    assert!(service.get_note("Nope").unwrap().is_none());
}

#[test]
fn note_bodies_strip_heading_and_metadata() {
    let (_dir, service) = service();
    service.add_note("Body", "line one\nline two", &["t"], &[]).unwrap();

    let bodies = service.note_bodies().unwrap();
    assert_eq!(bodies, vec![("Body".to_string(), "line one\nline two".to_string())]);
}

#[test]
fn list_tags_counts_notes() {
    let (_dir, service) = service();
    service.add_note("One", "", &["a", "b"], &[]).unwrap();
    service.add_note("Two", "", &["a"], &[]).unwrap();

    let tags = service.list_tags().unwrap();
    assert_eq!(tags, vec![("a".to_string(), 2), ("b".to_string(), 1)]);
    assert_eq!(service.notes_with_tag("a").unwrap(), vec!["One", "Two"]);
    assert!(service.notes_with_tag("none").unwrap().is_empty());
}

// --- Path Store ---

#[test]
fn create_path_writes_file_and_index_entry() {
    let (dir, service) = service();

    let message = service
        .create_exploration_path("Rust", &["ownership", "traits"], None)
        .unwrap();
    assert_eq!(message, "Created exploration path for 'Rust' with 2 subtopics");
    assert!(dir.path().join("paths/rust.json").is_file());

    let path = service.get_exploration_path("Rust").unwrap().unwrap();
    assert_eq!(path.description, "Exploration path for Rust");
    assert_eq!(path.subtopics, vec!["ownership", "traits"]);
    assert!(path.notes.is_empty());

    let index = service.index().unwrap();
    assert_eq!(index.paths["Rust"].subtopics, vec!["ownership", "traits"]);
}

#[test]
fn add_note_to_path_reports_each_outcome() {
    let (_dir, service) = service();
    service.add_note("Ownership", "", &[], &[]).unwrap();
    service.create_exploration_path("Rust", &[], Some("desc")).unwrap();

    assert_eq!(
        service.add_note_to_path("Go", "Ownership").unwrap(),
        "Path 'Go' not found"
    );
    assert_eq!(
        service.add_note_to_path("Rust", "Missing").unwrap(),
        "Note 'Missing' not found"
    );
    assert_eq!(
        service.add_note_to_path("Rust", "Ownership").unwrap(),
        "Added note 'Ownership' to path 'Rust'"
    );
    assert_eq!(
        service.add_note_to_path("Rust", "Ownership").unwrap(),
        "Note 'Ownership' already in path 'Rust'"
    );

    let path = service.get_exploration_path("Rust").unwrap().unwrap();
    assert_eq!(path.notes, vec!["Ownership"]);
    assert_eq!(path.description, "desc");
}

#[test]
fn recreating_path_resets_notes() {
    let (_dir, service) = service();
    service.add_note("N", "", &[], &[]).unwrap();
    service.create_exploration_path("Topic", &[], None).unwrap();
    service.add_note_to_path("Topic", "N").unwrap();

    service.create_exploration_path("Topic", &["x"], None).unwrap();

    let path = service.get_exploration_path("Topic").unwrap().unwrap();
    assert!(path.notes.is_empty());
    assert_eq!(path.subtopics, vec!["x"]);
}

#[test]
fn get_exploration_path_returns_none_for_unknown_topic() {
    let (_dir, service) = service();
    assert!(service.get_exploration_path("Nothing").unwrap().is_none());
}

/// Tests for the authored seed files under data/seeds and the built-in catalog.
use std::fs;
use std::path::PathBuf;

use magic_buddy::buddy::{
    canonical_map, BuddyError, ContentCatalog, NodeType, ACHIEVEMENT_SCHEMA_VERSION,
};
use tempfile::tempdir;

fn seed_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/seeds")
}

#[test]
fn test_shipped_seed_pack_is_valid() {
    let catalog = ContentCatalog::from_seed_dir(seed_dir()).unwrap();
    assert_eq!(catalog.regions().len(), 2);
    assert_eq!(catalog.first_region().map(|r| r.id.as_str()), Some("region_beach"));
    assert_eq!(
        catalog.next_region("region_beach").map(|r| r.id.as_str()),
        Some("region_reef")
    );
    assert!(catalog.next_region("region_reef").is_none());
    assert!(catalog.lookup_word("  Whale ").is_some());
    assert!(catalog
        .achievements()
        .iter()
        .all(|a| a.schema_version == ACHIEVEMENT_SCHEMA_VERSION));
}

#[test]
fn test_every_region_has_one_boss() {
    let catalog = ContentCatalog::canonical().unwrap();
    for region in catalog.regions() {
        let bosses = catalog
            .nodes_in_region(&region.id)
            .filter(|n| n.node_type == NodeType::Boss)
            .count();
        assert_eq!(bosses, 1, "region {} should have exactly one boss", region.id);
    }
}

#[test]
fn test_every_story_node_resolves() {
    let (_, nodes, _) = canonical_map();
    let catalog = ContentCatalog::canonical().unwrap();
    for node in nodes {
        assert!(catalog.story(&node.story_id).is_some(), "{} has no story", node.id);
    }
}

#[test]
fn test_broken_seed_pack_is_rejected() {
    let dir = tempdir().unwrap();
    for name in ["map.json", "stories.json", "dictionary.json"] {
        fs::copy(seed_dir().join(name), dir.path().join(name)).unwrap();
    }
    // Drop the boss story so its node no longer resolves.
    let stories = fs::read_to_string(dir.path().join("stories.json")).unwrap();
    let mut parsed: Vec<serde_json::Value> = serde_json::from_str(&stories).unwrap();
    parsed.retain(|s| s["id"] != "story_beach_boss");
    fs::write(
        dir.path().join("stories.json"),
        serde_json::to_string(&parsed).unwrap(),
    )
    .unwrap();

    let err = ContentCatalog::from_seed_dir(dir.path()).unwrap_err();
    assert!(matches!(err, BuddyError::ConfigurationDefect(_)));
}

#[test]
fn test_missing_achievements_file_is_allowed() {
    let dir = tempdir().unwrap();
    for name in ["map.json", "stories.json", "dictionary.json"] {
        fs::copy(seed_dir().join(name), dir.path().join(name)).unwrap();
    }
    let catalog = ContentCatalog::from_seed_dir(dir.path()).unwrap();
    assert!(catalog.achievements().is_empty());
}

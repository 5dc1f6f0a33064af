//! Seed data loaders for data-driven content initialization
//!
//! Content authors can replace the built-in catalog by pointing `[content].seed_dir`
//! at a directory containing `map.json`, `stories.json`, `dictionary.json` and
//! (optionally) `achievements.json`.

use std::fs;
use std::path::Path;

use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::buddy::catalog::ContentCatalog;
use crate::buddy::errors::BuddyError;
use crate::buddy::types::{AchievementRecord, DictionaryEntry, MapNode, MapRegion, Story};

pub const MAP_FILE: &str = "map.json";
pub const STORIES_FILE: &str = "stories.json";
pub const DICTIONARY_FILE: &str = "dictionary.json";
pub const ACHIEVEMENTS_FILE: &str = "achievements.json";

/// Layout of `map.json`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MapSeed {
    pub regions: Vec<MapRegion>,
    pub nodes: Vec<MapNode>,
}

fn read_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, BuddyError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        BuddyError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to parse {}: {}", path.display(), e),
        ))
    })
}

/// Load regions and nodes from map.json
pub fn load_map_from_json<P: AsRef<Path>>(path: P) -> Result<MapSeed, BuddyError> {
    read_json(path)
}

/// Load stories from stories.json
pub fn load_stories_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<Story>, BuddyError> {
    read_json(path)
}

/// Load dictionary entries from dictionary.json
pub fn load_dictionary_from_json<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<DictionaryEntry>, BuddyError> {
    let entries: Vec<DictionaryEntry> = read_json(path)?;
    Ok(entries
        .into_iter()
        .map(|mut e| {
            e.word = e.word.to_ascii_lowercase();
            e
        })
        .collect())
}

/// Load achievements from achievements.json
pub fn load_achievements_from_json<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<AchievementRecord>, BuddyError> {
    read_json(path)
}

impl ContentCatalog {
    /// Load and validate a catalog from a seed directory. A missing achievements
    /// file means no achievements; every other file is required.
    pub fn from_seed_dir<P: AsRef<Path>>(dir: P) -> Result<Self, BuddyError> {
        let dir = dir.as_ref();
        let map = load_map_from_json(dir.join(MAP_FILE))?;
        let stories = load_stories_from_json(dir.join(STORIES_FILE))?;
        let dictionary = load_dictionary_from_json(dir.join(DICTIONARY_FILE))?;
        let achievements_path = dir.join(ACHIEVEMENTS_FILE);
        let achievements = if achievements_path.exists() {
            load_achievements_from_json(achievements_path)?
        } else {
            Vec::new()
        };
        info!(
            "Loaded seed content from {}: {} regions, {} nodes, {} stories, {} words",
            dir.display(),
            map.regions.len(),
            map.nodes.len(),
            stories.len(),
            dictionary.len()
        );
        ContentCatalog::new(map.regions, map.nodes, stories, dictionary, achievements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_stories_from_json("nonexistent.json");
        assert!(result.is_err());
    }

    #[test]
    fn loads_minimal_seed_dir() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join(MAP_FILE),
            r#"{
                "regions": [{"id": "r1", "name": "Meadow", "level": 1}],
                "nodes": [
                    {"id": "a", "region_id": "r1", "node_type": "story", "story_id": "s1",
                     "rewards": {"magic_power": 10}},
                    {"id": "b", "region_id": "r1", "node_type": "boss", "story_id": "s1",
                     "prerequisites": ["a"], "rewards": {"magic_power": 20, "cards": ["c1"]}}
                ]
            }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(STORIES_FILE),
            r#"[{"id": "s1", "title": "One", "level": 1, "pages": ["Hi."]}]"#,
        )
        .unwrap();
        fs::write(
            dir.path().join(DICTIONARY_FILE),
            r#"[{"word": "Hi", "meaning": "hello"}]"#,
        )
        .unwrap();

        let catalog = ContentCatalog::from_seed_dir(dir.path()).expect("catalog");
        assert_eq!(catalog.nodes().len(), 2);
        assert_eq!(catalog.node("b").unwrap().rewards.cards, vec!["c1".to_string()]);
        assert!(catalog.lookup_word("hi").is_some());
        assert!(catalog.achievements().is_empty());
    }

    #[test]
    fn broken_reference_in_seed_dir_is_defect() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(
            dir.path().join(MAP_FILE),
            r#"{"regions": [{"id": "r1", "name": "Meadow", "level": 1}],
                "nodes": [{"id": "a", "region_id": "r1", "node_type": "story", "story_id": "missing"}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join(STORIES_FILE), "[]").unwrap();
        fs::write(dir.path().join(DICTIONARY_FILE), "[]").unwrap();
        let err = ContentCatalog::from_seed_dir(dir.path()).unwrap_err();
        assert!(matches!(err, BuddyError::ConfigurationDefect(_)));
    }
}

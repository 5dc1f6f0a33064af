//! Static content catalog: stories, dictionary, achievements, and the map graph.
//!
//! Map nodes live in an arena indexed by id. Every reference in the catalog
//! (node → region, node → story, node → prerequisite, region → required node) is
//! resolved when the catalog is built, and prerequisite cycles are rejected, so
//! the evaluator never has to second-guess authored content at runtime.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use log::debug;

use crate::buddy::errors::BuddyError;
use crate::buddy::types::{AchievementRecord, DictionaryEntry, MapNode, MapRegion, Story};

#[derive(Debug, Clone, Default)]
pub struct ContentCatalog {
    nodes: Vec<MapNode>,
    node_index: HashMap<String, usize>,
    /// Sorted by level, then id; successor order for region transitions.
    regions: Vec<MapRegion>,
    stories: BTreeMap<String, Story>,
    dictionary: BTreeMap<String, DictionaryEntry>,
    achievements: Vec<AchievementRecord>,
}

fn defect(message: String) -> BuddyError {
    BuddyError::ConfigurationDefect(message)
}

impl ContentCatalog {
    /// Build and validate a catalog. Any dangling id or prerequisite cycle is a
    /// `ConfigurationDefect`.
    pub fn new(
        mut regions: Vec<MapRegion>,
        nodes: Vec<MapNode>,
        stories: Vec<Story>,
        dictionary: Vec<DictionaryEntry>,
        achievements: Vec<AchievementRecord>,
    ) -> Result<Self, BuddyError> {
        let mut region_ids = HashSet::new();
        for region in &regions {
            if !region_ids.insert(region.id.clone()) {
                return Err(defect(format!("duplicate region id {}", region.id)));
            }
        }
        regions.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.id.cmp(&b.id)));

        let mut story_map = BTreeMap::new();
        for story in stories {
            if story_map.contains_key(&story.id) {
                return Err(defect(format!("duplicate story id {}", story.id)));
            }
            story_map.insert(story.id.clone(), story);
        }

        let mut dictionary_map = BTreeMap::new();
        for entry in dictionary {
            // Later entries for the same word replace earlier ones.
            dictionary_map.insert(entry.word.to_ascii_lowercase(), entry);
        }

        let mut node_index = HashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            if node_index.insert(node.id.clone(), idx).is_some() {
                return Err(defect(format!("duplicate node id {}", node.id)));
            }
        }

        for node in &nodes {
            if !region_ids.contains(&node.region_id) {
                return Err(defect(format!(
                    "node {} belongs to unknown region {}",
                    node.id, node.region_id
                )));
            }
            if !story_map.contains_key(&node.story_id) {
                return Err(defect(format!(
                    "node {} references missing story {}",
                    node.id, node.story_id
                )));
            }
            for prereq in &node.prerequisites {
                if !node_index.contains_key(prereq) {
                    return Err(defect(format!(
                        "node {} requires unknown node {}",
                        node.id, prereq
                    )));
                }
            }
        }

        for region in &regions {
            for required in &region.unlock_condition.required_nodes {
                if !node_index.contains_key(required) {
                    return Err(defect(format!(
                        "region {} requires unknown node {}",
                        region.id, required
                    )));
                }
            }
        }

        let mut achievement_ids = HashSet::new();
        for achievement in &achievements {
            if !achievement_ids.insert(achievement.id.as_str()) {
                return Err(defect(format!("duplicate achievement id {}", achievement.id)));
            }
        }

        check_acyclic(&nodes, &node_index)?;

        debug!(
            "catalog validated: {} regions, {} nodes, {} stories, {} words",
            regions.len(),
            nodes.len(),
            story_map.len(),
            dictionary_map.len()
        );

        Ok(Self {
            nodes,
            node_index,
            regions,
            stories: story_map,
            dictionary: dictionary_map,
            achievements,
        })
    }

    pub fn nodes(&self) -> &[MapNode] {
        &self.nodes
    }

    pub fn node(&self, node_id: &str) -> Option<&MapNode> {
        self.node_index.get(node_id).map(|&idx| &self.nodes[idx])
    }

    pub fn regions(&self) -> &[MapRegion] {
        &self.regions
    }

    pub fn region(&self, region_id: &str) -> Option<&MapRegion> {
        self.regions.iter().find(|r| r.id == region_id)
    }

    pub fn first_region(&self) -> Option<&MapRegion> {
        self.regions.first()
    }

    /// Nodes of a region in authored order.
    pub fn nodes_in_region<'a>(&'a self, region_id: &'a str) -> impl Iterator<Item = &'a MapNode> + 'a {
        self.nodes.iter().filter(move |n| n.region_id == region_id)
    }

    /// The region after `region_id` in level order. `None` for the final region.
    pub fn next_region(&self, region_id: &str) -> Option<&MapRegion> {
        let pos = self.regions.iter().position(|r| r.id == region_id)?;
        self.regions.get(pos + 1)
    }

    pub fn story(&self, story_id: &str) -> Option<&Story> {
        self.stories.get(story_id)
    }

    pub fn stories(&self) -> impl Iterator<Item = &Story> {
        self.stories.values()
    }

    pub fn story_count(&self) -> usize {
        self.stories.len()
    }

    pub fn lookup_word(&self, word: &str) -> Option<&DictionaryEntry> {
        self.dictionary.get(&word.trim().to_ascii_lowercase())
    }

    pub fn dictionary(&self) -> impl Iterator<Item = &DictionaryEntry> {
        self.dictionary.values()
    }

    pub fn word_count(&self) -> usize {
        self.dictionary.len()
    }

    pub fn achievements(&self) -> &[AchievementRecord] {
        &self.achievements
    }

    /// Story node that plays a given story, if any.
    pub fn node_for_story(&self, story_id: &str) -> Option<&MapNode> {
        self.nodes.iter().find(|n| n.story_id == story_id)
    }
}

/// Kahn's algorithm over prerequisite edges; leftover nodes sit on a cycle.
fn check_acyclic(nodes: &[MapNode], index: &HashMap<String, usize>) -> Result<(), BuddyError> {
    let mut in_degree = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (idx, node) in nodes.iter().enumerate() {
        let unique: HashSet<&String> = node.prerequisites.iter().collect();
        for prereq in unique {
            let Some(&from) = index.get(prereq) else {
                continue;
            };
            dependents[from].push(idx);
            in_degree[idx] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut visited = 0usize;
    while let Some(idx) = queue.pop_front() {
        visited += 1;
        for &next in &dependents[idx] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if visited == nodes.len() {
        return Ok(());
    }
    let mut stuck: Vec<&str> = nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| in_degree[*i] > 0)
        .map(|(_, n)| n.id.as_str())
        .collect();
    stuck.sort_unstable();
    Err(defect(format!("prerequisite cycle among nodes: {}", stuck.join(", "))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buddy::types::NodeType;

    fn region() -> MapRegion {
        MapRegion::new("r1", "Meadow", 1)
    }

    fn stories() -> Vec<Story> {
        vec![Story::new("s1", "One", 1), Story::new("s2", "Two", 1)]
    }

    #[test]
    fn builds_valid_catalog() {
        let nodes = vec![
            MapNode::new("a", "r1", NodeType::Story, "s1"),
            MapNode::new("b", "r1", NodeType::Boss, "s2").with_prerequisite("a"),
        ];
        let catalog = ContentCatalog::new(vec![region()], nodes, stories(), vec![], vec![])
            .expect("catalog");
        assert_eq!(catalog.nodes().len(), 2);
        assert_eq!(catalog.node("b").unwrap().prerequisites, vec!["a".to_string()]);
        assert_eq!(catalog.nodes_in_region("r1").count(), 2);
        assert!(catalog.next_region("r1").is_none());
    }

    #[test]
    fn missing_story_is_configuration_defect() {
        let nodes = vec![MapNode::new("a", "r1", NodeType::Story, "nope")];
        let err = ContentCatalog::new(vec![region()], nodes, stories(), vec![], vec![]).unwrap_err();
        assert!(matches!(err, BuddyError::ConfigurationDefect(ref m) if m.contains("nope")));
    }

    #[test]
    fn dangling_prerequisite_is_rejected() {
        let nodes = vec![MapNode::new("a", "r1", NodeType::Story, "s1").with_prerequisite("ghost")];
        let err = ContentCatalog::new(vec![region()], nodes, stories(), vec![], vec![]).unwrap_err();
        assert!(matches!(err, BuddyError::ConfigurationDefect(_)));
    }

    #[test]
    fn unknown_region_is_rejected() {
        let nodes = vec![MapNode::new("a", "r9", NodeType::Story, "s1")];
        let err = ContentCatalog::new(vec![region()], nodes, stories(), vec![], vec![]).unwrap_err();
        assert!(matches!(err, BuddyError::ConfigurationDefect(_)));
    }

    #[test]
    fn region_requirement_must_resolve() {
        let r2 = MapRegion::new("r2", "Forest", 2).requires_node("missing_boss");
        let nodes = vec![MapNode::new("a", "r1", NodeType::Story, "s1")];
        let err = ContentCatalog::new(vec![region(), r2], nodes, stories(), vec![], vec![]).unwrap_err();
        assert!(matches!(err, BuddyError::ConfigurationDefect(ref m) if m.contains("missing_boss")));
    }

    #[test]
    fn cycle_is_rejected() {
        let nodes = vec![
            MapNode::new("a", "r1", NodeType::Story, "s1").with_prerequisite("b"),
            MapNode::new("b", "r1", NodeType::Story, "s2").with_prerequisite("a"),
        ];
        let err = ContentCatalog::new(vec![region()], nodes, stories(), vec![], vec![]).unwrap_err();
        assert!(matches!(err, BuddyError::ConfigurationDefect(ref m) if m.contains("cycle")));
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let nodes = vec![
            MapNode::new("a", "r1", NodeType::Story, "s1"),
            MapNode::new("a", "r1", NodeType::Story, "s2"),
        ];
        assert!(ContentCatalog::new(vec![region()], nodes, stories(), vec![], vec![]).is_err());
    }

    #[test]
    fn regions_are_ordered_by_level() {
        let regions = vec![
            MapRegion::new("r3", "Peaks", 3),
            MapRegion::new("r1", "Meadow", 1),
            MapRegion::new("r2", "Forest", 2),
        ];
        let catalog = ContentCatalog::new(regions, vec![], vec![], vec![], vec![]).unwrap();
        assert_eq!(catalog.first_region().unwrap().id, "r1");
        assert_eq!(catalog.next_region("r1").unwrap().id, "r2");
        assert_eq!(catalog.next_region("r2").unwrap().id, "r3");
        assert!(catalog.next_region("r3").is_none());
    }

    #[test]
    fn dictionary_lookup_is_case_insensitive() {
        let words = vec![DictionaryEntry::new("Apple", "/ˈæp.əl/", "a fruit", "I eat an apple.", 1)];
        let catalog = ContentCatalog::new(vec![], vec![], vec![], words, vec![]).unwrap();
        assert!(catalog.lookup_word(" APPLE ").is_some());
        assert_eq!(catalog.word_count(), 1);
    }
}

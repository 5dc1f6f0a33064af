use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const NODE_SCHEMA_VERSION: u8 = 1;
pub const REGION_SCHEMA_VERSION: u8 = 1;
pub const STORY_SCHEMA_VERSION: u8 = 1;
pub const DICTIONARY_SCHEMA_VERSION: u8 = 1;
pub const USER_SCHEMA_VERSION: u8 = 1;
pub const PROGRESS_SCHEMA_VERSION: u8 = 1;
pub const ACHIEVEMENT_SCHEMA_VERSION: u8 = 1;

fn node_schema_version() -> u8 {
    NODE_SCHEMA_VERSION
}

fn region_schema_version() -> u8 {
    REGION_SCHEMA_VERSION
}

fn story_schema_version() -> u8 {
    STORY_SCHEMA_VERSION
}

fn dictionary_schema_version() -> u8 {
    DICTIONARY_SCHEMA_VERSION
}

fn achievement_schema_version() -> u8 {
    ACHIEVEMENT_SCHEMA_VERSION
}

// ============================================================================
// Content catalog
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Story,
    Boss,
    Bonus,
    Challenge,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Story => "story",
            NodeType::Boss => "boss",
            NodeType::Bonus => "bonus",
            NodeType::Challenge => "challenge",
        }
    }
}

/// Display-only map coordinates, in percent of the map width/height.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NodeRewards {
    #[serde(default)]
    pub magic_power: u32,
    #[serde(default)]
    pub cards: Vec<String>,
}

/// A static node in a region's progression graph. Unlock and completion state
/// is never stored on the node; it is derived from the user's completed set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapNode {
    pub id: String,
    pub region_id: String,
    pub node_type: NodeType,
    pub story_id: String,
    #[serde(default)]
    pub position: Position,
    /// Node ids that must be completed first; order carries no meaning.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub rewards: NodeRewards,
    #[serde(default = "node_schema_version")]
    pub schema_version: u8,
}

impl MapNode {
    pub fn new(id: &str, region_id: &str, node_type: NodeType, story_id: &str) -> Self {
        Self {
            id: id.to_string(),
            region_id: region_id.to_string(),
            node_type,
            story_id: story_id.to_string(),
            position: Position::default(),
            prerequisites: Vec::new(),
            rewards: NodeRewards::default(),
            schema_version: NODE_SCHEMA_VERSION,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Position { x, y };
        self
    }

    pub fn with_prerequisite(mut self, node_id: &str) -> Self {
        self.prerequisites.push(node_id.to_string());
        self
    }

    pub fn with_magic_power(mut self, amount: u32) -> Self {
        self.rewards.magic_power = amount;
        self
    }

    pub fn with_card(mut self, card_id: &str) -> Self {
        self.rewards.cards.push(card_id.to_string());
        self
    }

    pub fn is_boss(&self) -> bool {
        self.node_type == NodeType::Boss
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UnlockCondition {
    #[serde(default)]
    pub required_level: u32,
    #[serde(default)]
    pub required_nodes: Vec<String>,
}

/// A themed group of nodes for one difficulty level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MapRegion {
    pub id: String,
    pub name: String,
    pub level: u32,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub unlock_condition: UnlockCondition,
    #[serde(default = "region_schema_version")]
    pub schema_version: u8,
}

impl MapRegion {
    pub fn new(id: &str, name: &str, level: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            level,
            theme: String::new(),
            unlock_condition: UnlockCondition::default(),
            schema_version: REGION_SCHEMA_VERSION,
        }
    }

    pub fn with_theme(mut self, theme: &str) -> Self {
        self.theme = theme.to_string();
        self
    }

    pub fn requires_level(mut self, level: u32) -> Self {
        self.unlock_condition.required_level = level;
        self
    }

    pub fn requires_node(mut self, node_id: &str) -> Self {
        self.unlock_condition.required_nodes.push(node_id.to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Story {
    pub id: String,
    pub title: String,
    pub level: u32,
    #[serde(default)]
    pub pages: Vec<String>,
    /// Dictionary words highlighted while reading.
    #[serde(default)]
    pub vocabulary: Vec<String>,
    #[serde(default = "story_schema_version")]
    pub schema_version: u8,
}

impl Story {
    pub fn new(id: &str, title: &str, level: u32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            level,
            pages: Vec::new(),
            vocabulary: Vec::new(),
            schema_version: STORY_SCHEMA_VERSION,
        }
    }

    pub fn with_page(mut self, text: &str) -> Self {
        self.pages.push(text.to_string());
        self
    }

    pub fn with_word(mut self, word: &str) -> Self {
        self.vocabulary.push(word.to_string());
        self
    }

    pub fn word_count(&self) -> usize {
        self.pages.iter().map(|p| p.split_whitespace().count()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DictionaryEntry {
    pub word: String,
    #[serde(default)]
    pub phonetic: String,
    pub meaning: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default = "dictionary_schema_version")]
    pub schema_version: u8,
}

impl DictionaryEntry {
    pub fn new(word: &str, phonetic: &str, meaning: &str, example: &str, level: u32) -> Self {
        Self {
            word: word.to_ascii_lowercase(),
            phonetic: phonetic.to_string(),
            meaning: meaning.to_string(),
            example: example.to_string(),
            level,
            schema_version: DICTIONARY_SCHEMA_VERSION,
        }
    }
}

// ============================================================================
// Achievements
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTrigger {
    /// Read N stories
    StoriesRead { required: u32 },
    /// Hold at least N magic power
    MagicPower { amount: u32 },
    /// Complete N map nodes
    NodesCompleted { required: u32 },
    /// Keep a reading streak of N days
    StreakDays { required: u32 },
    /// Complete a specific node
    CompleteNode { node_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AchievementRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub trigger: AchievementTrigger,
    #[serde(default = "achievement_schema_version")]
    pub schema_version: u8,
}

impl AchievementRecord {
    pub fn new(id: &str, name: &str, description: &str, trigger: AchievementTrigger) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            trigger,
            schema_version: ACHIEVEMENT_SCHEMA_VERSION,
        }
    }
}

// ============================================================================
// Buddy and user progress
// ============================================================================

/// Evolution tier of the companion, derived from cumulative magic power.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(into = "u8", try_from = "u8")]
pub enum BuddyStage {
    Egg,
    Hatchling,
    Sprout,
    Guardian,
    Legend,
}

impl BuddyStage {
    pub fn name(&self) -> &'static str {
        match self {
            BuddyStage::Egg => "Egg",
            BuddyStage::Hatchling => "Hatchling",
            BuddyStage::Sprout => "Sprout",
            BuddyStage::Guardian => "Guardian",
            BuddyStage::Legend => "Legend",
        }
    }
}

impl From<BuddyStage> for u8 {
    fn from(stage: BuddyStage) -> Self {
        match stage {
            BuddyStage::Egg => 0,
            BuddyStage::Hatchling => 1,
            BuddyStage::Sprout => 2,
            BuddyStage::Guardian => 3,
            BuddyStage::Legend => 4,
        }
    }
}

impl TryFrom<u8> for BuddyStage {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BuddyStage::Egg),
            1 => Ok(BuddyStage::Hatchling),
            2 => Ok(BuddyStage::Sprout),
            3 => Ok(BuddyStage::Guardian),
            4 => Ok(BuddyStage::Legend),
            other => Err(format!("unknown buddy stage {}", other)),
        }
    }
}

impl fmt::Display for BuddyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BuddyMood {
    #[default]
    Happy,
    Excited,
    Sleepy,
    Proud,
}

impl BuddyMood {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuddyMood::Happy => "happy",
            BuddyMood::Excited => "excited",
            BuddyMood::Sleepy => "sleepy",
            BuddyMood::Proud => "proud",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub buddy_name: String,
    pub created_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl UserRecord {
    pub fn new(name: &str, buddy_name: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            buddy_name: buddy_name.to_string(),
            created_at: Utc::now(),
            schema_version: USER_SCHEMA_VERSION,
        }
    }
}

/// Mutable progression state; one record per user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProgress {
    pub user_id: String,
    pub level: u32,
    pub magic_power: u32,
    pub buddy_stage: BuddyStage,
    pub buddy_mood: BuddyMood,
    /// Minutes spent reading.
    pub total_reading_time: u32,
    pub total_stories_read: u32,
    pub streak_days: u32,
    pub last_read_on: Option<NaiveDate>,
    pub completed_nodes: BTreeSet<String>,
    pub cards: BTreeSet<String>,
    /// Earned achievement ids in the order they were earned.
    pub achievements: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub schema_version: u8,
}

impl UserProgress {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            level: 1,
            magic_power: 0,
            buddy_stage: BuddyStage::Egg,
            buddy_mood: BuddyMood::Happy,
            total_reading_time: 0,
            total_stories_read: 0,
            streak_days: 0,
            last_read_on: None,
            completed_nodes: BTreeSet::new(),
            cards: BTreeSet::new(),
            achievements: Vec::new(),
            updated_at: Utc::now(),
            schema_version: PROGRESS_SCHEMA_VERSION,
        }
    }

    pub fn has_completed(&self, node_id: &str) -> bool {
        self.completed_nodes.contains(node_id)
    }

    pub fn has_achievement(&self, achievement_id: &str) -> bool {
        self.achievements.iter().any(|id| id == achievement_id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buddy_stage_round_trips_through_index() {
        for idx in 0u8..=4 {
            let stage = BuddyStage::try_from(idx).expect("stage");
            assert_eq!(u8::from(stage), idx);
        }
        assert!(BuddyStage::try_from(5).is_err());
    }

    #[test]
    fn buddy_stage_serializes_as_number() {
        let json = serde_json::to_string(&BuddyStage::Sprout).unwrap();
        assert_eq!(json, "2");
    }

    #[test]
    fn node_builder_collects_prerequisites_and_rewards() {
        let node = MapNode::new("b", "r1", NodeType::Story, "s2")
            .with_prerequisite("a")
            .with_magic_power(15)
            .with_card("card_cat");
        assert_eq!(node.prerequisites, vec!["a".to_string()]);
        assert_eq!(node.rewards.magic_power, 15);
        assert_eq!(node.rewards.cards, vec!["card_cat".to_string()]);
        assert!(!node.is_boss());
    }

    #[test]
    fn fresh_progress_starts_at_level_one() {
        let progress = UserProgress::new("u1");
        assert_eq!(progress.level, 1);
        assert_eq!(progress.buddy_stage, BuddyStage::Egg);
        assert!(progress.completed_nodes.is_empty());
    }
}

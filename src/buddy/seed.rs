//! Built-in content used when no seed directory is configured.
//!
//! The map is generated at catalog-generation time from a fixed per-level layout:
//! a chain of four story nodes, a bonus branch after the second story, a challenge
//! after the fourth, and a boss gated on the fourth story. Each region after the
//! first requires the previous region's boss and the matching level.

use crate::buddy::catalog::ContentCatalog;
use crate::buddy::errors::BuddyError;
use crate::buddy::types::{
    AchievementRecord, AchievementTrigger, DictionaryEntry, MapNode, MapRegion, NodeType, Story,
};

pub const FIRST_NODE_ID: &str = "node_l1_1";
pub const FINAL_BOSS_ID: &str = "node_l5_boss";

struct RegionSeed {
    name: &'static str,
    theme: &'static str,
    /// (slot, title, page) for every story in the region.
    stories: [(&'static str, &'static str, &'static str); 7],
}

const REGIONS: [RegionSeed; 5] = [
    RegionSeed {
        name: "Whisper Meadow",
        theme: "meadow",
        stories: [
            ("1", "Hello, Buddy!", "A small egg sat in the grass. It said hello to the sun."),
            ("2", "The Red Apple", "Mia found a red apple. She gave half to her friend."),
            ("3", "Big and Small", "The dog is big. The cat is small. They play together."),
            ("4", "Rainy Day", "It is raining. Tom has a yellow hat and a blue umbrella."),
            ("bonus", "The Lost Kite", "A green kite flew over the tree. Ben ran to catch it."),
            ("challenge", "Count the Bees", "One bee, two bees, three bees. The bees love flowers."),
            ("boss", "The Grumpy Goat", "The goat would not move. Mia sang a song and the goat smiled."),
        ],
    },
    RegionSeed {
        name: "Glow Forest",
        theme: "forest",
        stories: [
            ("1", "Night Lights", "Fireflies glow in the dark forest. They light the path home."),
            ("2", "The Owl's Question", "The owl asked, who are you? The fox said, I am your friend."),
            ("3", "Mushroom Houses", "Tiny mice live in mushroom houses. The roofs are red and white."),
            ("4", "The Hidden River", "Behind the trees there is a river. The water is cold and clear."),
            ("bonus", "Squirrel's Snack", "The squirrel hid nuts under a rock. Then he forgot where."),
            ("challenge", "Forest Colors", "Leaves are green, berries are purple, and the bark is brown."),
            ("boss", "The Shadow Bear", "A big shadow moved. It was only a bear looking for honey."),
        ],
    },
    RegionSeed {
        name: "Crystal Lake",
        theme: "lake",
        stories: [
            ("1", "The Shiny Stone", "Lily found a shiny stone by the lake. It sparkled like a star."),
            ("2", "Duck Parade", "Five ducks walked in a line. The baby duck was always last."),
            ("3", "The Boat Ride", "Grandpa rowed the boat slowly. Fish swam under the water."),
            ("4", "Frog Jump", "The frog jumped from leaf to leaf. Splash! He fell in the water."),
            ("bonus", "Swan Song", "The white swan opened her wings and sang a quiet song."),
            ("challenge", "Under the Water", "Crabs, shells, and weeds live under the water."),
            ("boss", "The Ice Dragon", "The lake froze. A kind dragon melted the ice with warm breath."),
        ],
    },
    RegionSeed {
        name: "Cloud Castle",
        theme: "castle",
        stories: [
            ("1", "Stairs to the Sky", "The stairs went up and up into the clouds."),
            ("2", "The Windy Tower", "The wind blew the flags. The tower was very tall."),
            ("3", "A Royal Breakfast", "The queen ate pancakes. The king drank warm milk."),
            ("4", "The Sleeping Knight", "The knight was sleeping. His armor made a loud snore."),
            ("bonus", "Cloud Sheep", "Fluffy sheep made of clouds jumped over the moon."),
            ("challenge", "Castle Rules", "Please knock before you enter. Say thank you to the guards."),
            ("boss", "The Thunder King", "The Thunder King was loud but lonely. Buddy became his friend."),
        ],
    },
    RegionSeed {
        name: "Star Mountain",
        theme: "mountain",
        stories: [
            ("1", "The Long Climb", "We climbed the mountain slowly. We stopped to drink water."),
            ("2", "Snow Friends", "At the top there was snow. We made a snowman with a carrot nose."),
            ("3", "The Eagle's Nest", "An eagle watched from her nest. Her eggs were safe and warm."),
            ("4", "Falling Stars", "At night the stars fell like rain. We made a wish."),
            ("bonus", "Mountain Echo", "Hello! Hello! The mountain answered every word."),
            ("challenge", "Brave Words", "Brave, kind, and honest are words for a true hero."),
            ("boss", "The Star Keeper", "The Star Keeper gave Buddy a golden star for reading every story."),
        ],
    },
];

const WORDS: [(&str, &str, &str, &str, u32); 24] = [
    ("hello", "/həˈloʊ/", "a word you say when you meet someone", "Hello, Buddy!", 1),
    ("apple", "/ˈæp.əl/", "a round fruit that is red or green", "Mia found a red apple.", 1),
    ("big", "/bɪɡ/", "large in size", "The dog is big.", 1),
    ("small", "/smɔːl/", "little in size", "The cat is small.", 1),
    ("rain", "/reɪn/", "water that falls from clouds", "It is raining.", 1),
    ("kite", "/kaɪt/", "a toy that flies in the wind", "A green kite flew over the tree.", 1),
    ("glow", "/ɡloʊ/", "to shine with soft light", "Fireflies glow in the dark.", 2),
    ("owl", "/aʊl/", "a bird that is awake at night", "The owl asked a question.", 2),
    ("mushroom", "/ˈmʌʃ.ruːm/", "a plant shaped like a small umbrella", "Mice live in mushroom houses.", 2),
    ("river", "/ˈrɪv.ər/", "water that flows across land", "There is a river behind the trees.", 2),
    ("honey", "/ˈhʌn.i/", "sweet food made by bees", "The bear wanted honey.", 2),
    ("shiny", "/ˈʃaɪ.ni/", "bright and reflecting light", "She found a shiny stone.", 3),
    ("parade", "/pəˈreɪd/", "a line of people or animals moving together", "The ducks had a parade.", 3),
    ("frog", "/frɒɡ/", "a small green animal that jumps", "The frog jumped from leaf to leaf.", 3),
    ("dragon", "/ˈdræɡ.ən/", "a big story animal with wings", "A kind dragon melted the ice.", 3),
    ("tower", "/ˈtaʊ.ər/", "a tall narrow building", "The tower was very tall.", 4),
    ("queen", "/kwiːn/", "a woman who rules a country", "The queen ate pancakes.", 4),
    ("knight", "/naɪt/", "a soldier who serves a king", "The knight was sleeping.", 4),
    ("thunder", "/ˈθʌn.dər/", "the loud sound in a storm", "The Thunder King was loud.", 4),
    ("climb", "/klaɪm/", "to go up using hands and feet", "We climbed the mountain.", 5),
    ("snow", "/snoʊ/", "soft white ice that falls in winter", "At the top there was snow.", 5),
    ("eagle", "/ˈiː.ɡəl/", "a large strong bird", "An eagle watched from her nest.", 5),
    ("wish", "/wɪʃ/", "something you hope will happen", "We made a wish.", 5),
    ("brave", "/breɪv/", "not afraid to do hard things", "Brave is a word for a hero.", 5),
];

fn story_id(level: u32, slot: &str) -> String {
    format!("story_l{}_{}", level, slot)
}

fn node_id(level: u32, slot: &str) -> String {
    format!("node_l{}_{}", level, slot)
}

/// Regions, nodes, and stories of the built-in map.
pub fn canonical_map() -> (Vec<MapRegion>, Vec<MapNode>, Vec<Story>) {
    let mut regions = Vec::new();
    let mut nodes = Vec::new();
    let mut stories = Vec::new();

    for (idx, seed) in REGIONS.iter().enumerate() {
        let level = idx as u32 + 1;
        let region_id = format!("region_l{}", level);

        let mut region = MapRegion::new(&region_id, seed.name, level)
            .with_theme(seed.theme)
            .requires_level(level);
        if level > 1 {
            region = region.requires_node(&node_id(level - 1, "boss"));
        }
        regions.push(region);

        for (slot, title, page) in seed.stories {
            let mut story = Story::new(&story_id(level, slot), title, level).with_page(page);
            for (word, _, _, _, word_level) in WORDS.iter() {
                if *word_level == level && page.to_ascii_lowercase().contains(word) {
                    story = story.with_word(word);
                }
            }
            stories.push(story);
        }

        let node = |slot: &str, node_type: NodeType| {
            MapNode::new(&node_id(level, slot), &region_id, node_type, &story_id(level, slot))
        };

        nodes.push(node("1", NodeType::Story).at(10.0, 85.0).with_magic_power(10 * level));
        nodes.push(
            node("2", NodeType::Story)
                .at(30.0, 70.0)
                .with_prerequisite(&node_id(level, "1"))
                .with_magic_power(10 * level),
        );
        nodes.push(
            node("bonus", NodeType::Bonus)
                .at(20.0, 45.0)
                .with_prerequisite(&node_id(level, "2"))
                .with_magic_power(15 * level)
                .with_card(&format!("card_l{}_bonus", level)),
        );
        nodes.push(
            node("3", NodeType::Story)
                .at(50.0, 60.0)
                .with_prerequisite(&node_id(level, "2"))
                .with_magic_power(15 * level),
        );
        nodes.push(
            node("4", NodeType::Story)
                .at(70.0, 45.0)
                .with_prerequisite(&node_id(level, "3"))
                .with_magic_power(15 * level),
        );
        nodes.push(
            node("challenge", NodeType::Challenge)
                .at(85.0, 60.0)
                .with_prerequisite(&node_id(level, "4"))
                .with_magic_power(20 * level)
                .with_card(&format!("card_l{}_challenge", level)),
        );
        nodes.push(
            node("boss", NodeType::Boss)
                .at(80.0, 15.0)
                .with_prerequisite(&node_id(level, "4"))
                .with_magic_power(30 * level)
                .with_card(&format!("card_l{}_boss", level)),
        );
    }

    (regions, nodes, stories)
}

pub fn canonical_dictionary() -> Vec<DictionaryEntry> {
    WORDS
        .iter()
        .map(|(word, phonetic, meaning, example, level)| {
            DictionaryEntry::new(word, phonetic, meaning, example, *level)
        })
        .collect()
}

pub fn seed_starter_achievements() -> Vec<AchievementRecord> {
    use AchievementTrigger::*;

    vec![
        AchievementRecord::new(
            "first_story",
            "First Page",
            "Read your first story",
            StoriesRead { required: 1 },
        ),
        AchievementRecord::new(
            "bookworm",
            "Bookworm",
            "Read 10 stories",
            StoriesRead { required: 10 },
        ),
        AchievementRecord::new(
            "spark_keeper",
            "Spark Keeper",
            "Collect 50 magic power",
            MagicPower { amount: 50 },
        ),
        AchievementRecord::new(
            "trailblazer",
            "Trailblazer",
            "Complete 5 map nodes",
            NodesCompleted { required: 5 },
        ),
        AchievementRecord::new(
            "daily_reader",
            "Daily Reader",
            "Read 3 days in a row",
            StreakDays { required: 3 },
        ),
        AchievementRecord::new(
            "reading_week",
            "Reading Week",
            "Read 7 days in a row",
            StreakDays { required: 7 },
        ),
        AchievementRecord::new(
            "meadow_champion",
            "Meadow Champion",
            "Calm the Grumpy Goat",
            CompleteNode {
                node_id: node_id(1, "boss"),
            },
        ),
        AchievementRecord::new(
            "star_hero",
            "Star Hero",
            "Finish the whole map",
            CompleteNode {
                node_id: FINAL_BOSS_ID.to_string(),
            },
        ),
    ]
}

impl ContentCatalog {
    /// The built-in catalog. Fails only if the generator itself is broken.
    pub fn canonical() -> Result<Self, BuddyError> {
        let (regions, nodes, stories) = canonical_map();
        ContentCatalog::new(
            regions,
            nodes,
            stories,
            canonical_dictionary(),
            seed_starter_achievements(),
        )
    }
}

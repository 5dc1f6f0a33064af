//! Magic English Buddy progression core.
//! Content catalog and map graph, unlock evaluation, buddy evolution, reading
//! streaks, achievements, sled-backed persistence, first-run seeding, and the
//! QR-code sync codec.

pub mod achievement;
pub mod catalog;
pub mod errors;
pub mod init;
pub mod progress;
pub mod seed;
pub mod seed_loader;
pub mod session;
pub mod stage;
pub mod storage;
pub mod sync;
pub mod types;
pub mod unlock;

pub use achievement::{check_achievements, earned_achievements, is_earned};
pub use catalog::ContentCatalog;
pub use errors::{BuddyError, PayloadDefect};
pub use init::{
    ensure_user, initialize_app_data, load_catalog, load_or_initialize, needs_initialization,
    InitProgress, InitSummary, LoadOutcome, ProgressReporter,
};
pub use progress::{current_streak, record_reading, refresh_mood};
pub use seed::{
    canonical_dictionary, canonical_map, seed_starter_achievements, FINAL_BOSS_ID, FIRST_NODE_ID,
};
pub use seed_loader::{
    load_achievements_from_json, load_dictionary_from_json, load_map_from_json,
    load_stories_from_json, MapSeed,
};
pub use session::{BuddySession, CompletionResult, ReadingResult, RegionView};
pub use stage::{power_to_next_stage, stage_for, STAGE_THRESHOLDS};
pub use storage::{BuddyStore, BuddyStoreBuilder};
pub use sync::{SyncData, SyncKind, SyncProgress, SyncUser, MAGIC_TAG, SYNC_VERSION};
pub use types::*;
pub use unlock::{
    available_nodes, complete_node, compute_unlocked, enterable_regions, is_region_enterable,
    node_states, pending_rewards, Completion, CompletionOutcome, CompletionReport, NodeState,
    PendingRewards,
};

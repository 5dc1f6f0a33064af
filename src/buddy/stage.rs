//! Buddy evolution table.
//!
//! Stages are looked up from a single ordered table of `(minimum magic power, stage)`
//! pairs. Magic power never decreases through rewards, so stages only move forward.

use crate::buddy::types::BuddyStage;

/// Ordered by ascending threshold; the first entry must start at zero.
pub const STAGE_THRESHOLDS: [(u32, BuddyStage); 5] = [
    (0, BuddyStage::Egg),
    (50, BuddyStage::Hatchling),
    (150, BuddyStage::Sprout),
    (400, BuddyStage::Guardian),
    (1000, BuddyStage::Legend),
];

/// Stage for a magic power total: the last table entry whose threshold is reached.
pub fn stage_for(magic_power: u32) -> BuddyStage {
    STAGE_THRESHOLDS
        .iter()
        .take_while(|(threshold, _)| magic_power >= *threshold)
        .last()
        .map(|(_, stage)| *stage)
        .unwrap_or(BuddyStage::Egg)
}

/// Magic power still needed to reach the next stage, or `None` at the final stage.
pub fn power_to_next_stage(magic_power: u32) -> Option<u32> {
    STAGE_THRESHOLDS
        .iter()
        .find(|(threshold, _)| *threshold > magic_power)
        .map(|(threshold, _)| threshold - magic_power)
}

/// Achievement evaluation.
///
/// Achievements are derived from the progress record alone, so checking is a
/// pure pass over the catalog's achievement list. Earned ids are appended in
/// catalog order and are never awarded twice.
use log::info;

use crate::buddy::catalog::ContentCatalog;
use crate::buddy::types::{AchievementRecord, AchievementTrigger, UserProgress};

/// Whether a progress record satisfies an achievement trigger.
pub fn is_earned(trigger: &AchievementTrigger, progress: &UserProgress) -> bool {
    use AchievementTrigger::*;

    match trigger {
        StoriesRead { required } => progress.total_stories_read >= *required,
        MagicPower { amount } => progress.magic_power >= *amount,
        NodesCompleted { required } => progress.completed_nodes.len() as u64 >= u64::from(*required),
        StreakDays { required } => progress.streak_days >= *required,
        CompleteNode { node_id } => progress.completed_nodes.contains(node_id),
    }
}

/// Award every newly satisfied achievement. Returns the next state and the ids just earned.
pub fn check_achievements(
    catalog: &ContentCatalog,
    progress: &UserProgress,
) -> (UserProgress, Vec<String>) {
    let mut next = progress.clone();
    let mut awarded = Vec::new();

    for achievement in catalog.achievements() {
        if next.has_achievement(&achievement.id) {
            continue;
        }
        if is_earned(&achievement.trigger, &next) {
            info!("achievement earned: {} ({})", achievement.name, achievement.id);
            next.achievements.push(achievement.id.clone());
            awarded.push(achievement.id.clone());
        }
    }

    if !awarded.is_empty() {
        next.touch();
    }
    (next, awarded)
}

/// Earned achievement records, in the order they were earned.
pub fn earned_achievements<'a>(
    catalog: &'a ContentCatalog,
    progress: &UserProgress,
) -> Vec<&'a AchievementRecord> {
    progress
        .achievements
        .iter()
        .filter_map(|id| catalog.achievements().iter().find(|a| &a.id == id))
        .collect()
}

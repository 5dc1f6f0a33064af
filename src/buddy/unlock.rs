//! Unlock evaluation and node completion.
//!
//! Everything here is a pure function of the catalog and a `UserProgress` value:
//! callers hand in the state they own and receive the next state back. Unlocked
//! sets are recomputed from the completed set on every call rather than cached,
//! since completions arrive one at a time.

use std::collections::BTreeSet;

use log::{debug, info};

use crate::buddy::catalog::ContentCatalog;
use crate::buddy::errors::BuddyError;
use crate::buddy::stage::stage_for;
use crate::buddy::types::{
    BuddyMood, BuddyStage, MapNode, MapRegion, NodeRewards, NodeType, UserProgress,
};

/// Ids of nodes whose prerequisites are all in `completed`. Nodes without
/// prerequisites are always included.
pub fn compute_unlocked<'a, I>(nodes: I, completed: &BTreeSet<String>) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a MapNode>,
{
    nodes
        .into_iter()
        .filter(|node| node.prerequisites.iter().all(|p| completed.contains(p)))
        .map(|node| node.id.clone())
        .collect()
}

/// A region is enterable once the user's level and completed set satisfy its unlock condition.
pub fn is_region_enterable(region: &MapRegion, progress: &UserProgress) -> bool {
    progress.level >= region.unlock_condition.required_level
        && region
            .unlock_condition
            .required_nodes
            .iter()
            .all(|id| progress.completed_nodes.contains(id))
}

pub fn enterable_regions<'a>(
    catalog: &'a ContentCatalog,
    progress: &UserProgress,
) -> Vec<&'a MapRegion> {
    catalog
        .regions()
        .iter()
        .filter(|r| is_region_enterable(r, progress))
        .collect()
}

/// Unlocked nodes across every enterable region.
pub fn available_nodes(catalog: &ContentCatalog, progress: &UserProgress) -> BTreeSet<String> {
    let mut available = BTreeSet::new();
    for region in enterable_regions(catalog, progress) {
        available.extend(compute_unlocked(
            catalog.nodes_in_region(&region.id),
            &progress.completed_nodes,
        ));
    }
    available
}

/// Per-node view of a region for the map screen.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeState {
    pub node_id: String,
    pub node_type: NodeType,
    pub story_id: String,
    pub unlocked: bool,
    pub completed: bool,
}

pub fn node_states(
    catalog: &ContentCatalog,
    region_id: &str,
    progress: &UserProgress,
) -> Result<Vec<NodeState>, BuddyError> {
    let region = catalog
        .region(region_id)
        .ok_or_else(|| BuddyError::NotFound(format!("region: {}", region_id)))?;
    let open = is_region_enterable(region, progress);
    let unlocked = compute_unlocked(catalog.nodes_in_region(region_id), &progress.completed_nodes);
    Ok(catalog
        .nodes_in_region(region_id)
        .map(|node| {
            let completed = progress.has_completed(&node.id);
            NodeState {
                node_id: node.id.clone(),
                node_type: node.node_type,
                story_id: node.story_id.clone(),
                unlocked: completed || (open && unlocked.contains(&node.id)),
                completed,
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingRewards {
    pub magic_power: u32,
    pub cards: BTreeSet<String>,
}

/// Rewards still on the table: unlocked but not yet completed nodes of an enterable region.
pub fn pending_rewards(
    catalog: &ContentCatalog,
    region_id: &str,
    progress: &UserProgress,
) -> Result<PendingRewards, BuddyError> {
    let mut pending = PendingRewards::default();
    for state in node_states(catalog, region_id, progress)? {
        if !state.unlocked || state.completed {
            continue;
        }
        if let Some(node) = catalog.node(&state.node_id) {
            pending.magic_power = pending.magic_power.saturating_add(node.rewards.magic_power);
            pending.cards.extend(node.rewards.cards.iter().cloned());
        }
    }
    Ok(pending)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionReport {
    pub node_id: String,
    pub reward: NodeRewards,
    pub stage_before: BuddyStage,
    pub stage_after: BuddyStage,
    pub level_after: u32,
    /// Nodes that became playable because of this completion, including entry
    /// nodes of a region that just opened.
    pub newly_unlocked: BTreeSet<String>,
    /// Set when a boss was completed; `None` inside means the map is finished.
    pub next_region: Option<Option<String>>,
}

impl CompletionReport {
    pub fn evolved(&self) -> bool {
        self.stage_after > self.stage_before
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Completed(CompletionReport),
    /// Node was already completed; state is unchanged.
    AlreadyCompleted,
    /// Prerequisites are not met; state is unchanged.
    Locked { missing: Vec<String> },
    /// The node's region cannot be entered yet; state is unchanged.
    RegionLocked { region_id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub progress: UserProgress,
    pub outcome: CompletionOutcome,
}

impl Completion {
    fn unchanged(progress: &UserProgress, outcome: CompletionOutcome) -> Self {
        Self {
            progress: progress.clone(),
            outcome,
        }
    }

    pub fn applied(&self) -> bool {
        matches!(self.outcome, CompletionOutcome::Completed(_))
    }
}

/// Complete `node_id` for the given progress and return the next state.
///
/// Completing a node that is locked or already completed is a no-op, so a
/// duplicated completion never pays its reward twice. Unknown node ids and nodes
/// whose story does not resolve are configuration defects.
pub fn complete_node(
    catalog: &ContentCatalog,
    node_id: &str,
    progress: &UserProgress,
) -> Result<Completion, BuddyError> {
    let node = catalog
        .node(node_id)
        .ok_or_else(|| BuddyError::ConfigurationDefect(format!("unknown node {}", node_id)))?;
    if catalog.story(&node.story_id).is_none() {
        return Err(BuddyError::ConfigurationDefect(format!(
            "node {} references missing story {}",
            node.id, node.story_id
        )));
    }
    let region = catalog.region(&node.region_id).ok_or_else(|| {
        BuddyError::ConfigurationDefect(format!(
            "node {} belongs to unknown region {}",
            node.id, node.region_id
        ))
    })?;

    if progress.has_completed(node_id) {
        debug!("node {} already completed; ignoring", node_id);
        return Ok(Completion::unchanged(progress, CompletionOutcome::AlreadyCompleted));
    }
    if !is_region_enterable(region, progress) {
        return Ok(Completion::unchanged(
            progress,
            CompletionOutcome::RegionLocked {
                region_id: region.id.clone(),
            },
        ));
    }
    let missing: Vec<String> = node
        .prerequisites
        .iter()
        .filter(|p| !progress.completed_nodes.contains(*p))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Ok(Completion::unchanged(progress, CompletionOutcome::Locked { missing }));
    }

    let available_before = available_nodes(catalog, progress);
    let stage_before = progress.buddy_stage;

    let mut next = progress.clone();
    next.completed_nodes.insert(node.id.clone());
    next.magic_power = next.magic_power.saturating_add(node.rewards.magic_power);
    next.cards.extend(node.rewards.cards.iter().cloned());
    next.buddy_stage = stage_for(next.magic_power);

    let next_region = if node.is_boss() {
        let successor = catalog.next_region(&region.id);
        match successor {
            Some(successor) => next.level = next.level.max(successor.level),
            None => info!("final boss {} completed; map finished", node.id),
        }
        Some(successor.map(|r| r.id.clone()))
    } else {
        None
    };

    next.buddy_mood = if next.buddy_stage > stage_before {
        BuddyMood::Excited
    } else if node.is_boss() {
        BuddyMood::Proud
    } else {
        BuddyMood::Happy
    };
    next.touch();

    let newly_unlocked: BTreeSet<String> = available_nodes(catalog, &next)
        .difference(&available_before)
        .filter(|id| !next.completed_nodes.contains(*id))
        .cloned()
        .collect();

    if next.buddy_stage > stage_before {
        info!(
            "buddy evolved {} -> {} at {} magic power",
            stage_before, next.buddy_stage, next.magic_power
        );
    }

    let report = CompletionReport {
        node_id: node.id.clone(),
        reward: node.rewards.clone(),
        stage_before,
        stage_after: next.buddy_stage,
        level_after: next.level,
        newly_unlocked,
        next_region,
    };
    Ok(Completion {
        progress: next,
        outcome: CompletionOutcome::Completed(report),
    })
}

//! A single user's play session.
//!
//! The session holds the authoritative in-memory `UserProgress`. Every mutation
//! runs through the pure evaluators and the resulting state is written back with
//! an upsert before the call returns. Taking `&mut self` keeps completions for a
//! user strictly ordered.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};

use crate::buddy::achievement::check_achievements;
use crate::buddy::catalog::ContentCatalog;
use crate::buddy::errors::{BuddyError, PayloadDefect};
use crate::buddy::init::ensure_user;
use crate::buddy::progress::{record_reading, refresh_mood};
use crate::buddy::storage::BuddyStore;
use crate::buddy::sync::{self, SyncData, DEFAULT_MAX_PAYLOAD_LEN};
use crate::buddy::types::{MapRegion, UserProgress, UserRecord};
use crate::buddy::unlock::{
    self, available_nodes, is_region_enterable, node_states, pending_rewards, CompletionOutcome,
    NodeState, PendingRewards,
};
use crate::logutil::escape_log;
use crate::metrics;
use crate::validation::{validate_buddy_name, validate_reader_name};

/// Result of a node completion, with any achievements it earned.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResult {
    pub outcome: CompletionOutcome,
    pub achievements: Vec<String>,
}

/// Result of a finished reading session.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingResult {
    pub streak_days: u32,
    /// Present when the story belongs to a map node that was available.
    pub completion: Option<CompletionOutcome>,
    pub achievements: Vec<String>,
}

/// One region of the map as the current user sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionView {
    pub region: MapRegion,
    pub enterable: bool,
    pub nodes: Vec<NodeState>,
    pub pending: PendingRewards,
}

pub struct BuddySession {
    store: BuddyStore,
    catalog: Arc<ContentCatalog>,
    user: UserRecord,
    progress: UserProgress,
    max_payload_len: usize,
}

impl BuddySession {
    /// Open the active user's session, creating the user on first run. The
    /// buddy's mood is refreshed against today's date.
    pub fn open(
        store: BuddyStore,
        catalog: Arc<ContentCatalog>,
        name: &str,
        buddy_name: &str,
    ) -> Result<Self, BuddyError> {
        let (user, progress) = ensure_user(&store, name, buddy_name)?;
        let refreshed = refresh_mood(&progress, Utc::now().date_naive());
        if refreshed != progress {
            store.put_progress(refreshed.clone())?;
        }
        info!(
            "Session opened for {} (level {}, {} magic power)",
            escape_log(&user.name),
            refreshed.level,
            refreshed.magic_power
        );
        Ok(Self {
            store,
            catalog,
            user,
            progress: refreshed,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
        })
    }

    pub fn with_max_payload_len(mut self, max_len: usize) -> Self {
        self.max_payload_len = max_len;
        self
    }

    pub fn user(&self) -> &UserRecord {
        &self.user
    }

    pub fn progress(&self) -> &UserProgress {
        &self.progress
    }

    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    fn commit(&mut self, next: UserProgress) -> Result<(), BuddyError> {
        self.store.put_progress(next.clone())?;
        self.progress = next;
        Ok(())
    }

    fn award(&mut self, progress: UserProgress) -> (UserProgress, Vec<String>) {
        let (next, awarded) = check_achievements(&self.catalog, &progress);
        metrics::add_achievements_awarded(awarded.len());
        (next, awarded)
    }

    /// Complete a map node. Repeats and locked nodes leave progress untouched.
    pub fn complete_node(&mut self, node_id: &str) -> Result<CompletionResult, BuddyError> {
        let completion = unlock::complete_node(&self.catalog, node_id, &self.progress)?;
        if !completion.applied() {
            return Ok(CompletionResult {
                outcome: completion.outcome,
                achievements: Vec::new(),
            });
        }

        if let CompletionOutcome::Completed(report) = &completion.outcome {
            metrics::inc_nodes_completed();
            if report.evolved() {
                metrics::inc_stage_evolutions();
            }
        }
        let (next, achievements) = self.award(completion.progress);
        self.commit(next)?;
        Ok(CompletionResult {
            outcome: completion.outcome,
            achievements,
        })
    }

    /// Record a finished story. When the story's map node is currently
    /// available it is completed as well; a locked node is left alone.
    pub fn record_reading(
        &mut self,
        story_id: &str,
        minutes: u32,
        today: NaiveDate,
    ) -> Result<ReadingResult, BuddyError> {
        if self.catalog.story(story_id).is_none() {
            return Err(BuddyError::NotFound(format!("story {}", story_id)));
        }
        metrics::inc_reading_sessions();
        let mut next = record_reading(&self.progress, minutes, today);

        let mut completion = None;
        if let Some(node) = self.catalog.node_for_story(story_id) {
            if available_nodes(&self.catalog, &next).contains(&node.id)
                && !next.has_completed(&node.id)
            {
                let done = unlock::complete_node(&self.catalog, &node.id, &next)?;
                if let CompletionOutcome::Completed(report) = &done.outcome {
                    metrics::inc_nodes_completed();
                    if report.evolved() {
                        metrics::inc_stage_evolutions();
                    }
                }
                next = done.progress;
                completion = Some(done.outcome);
            }
        }

        let (next, achievements) = self.award(next);
        let streak_days = next.streak_days;
        self.commit(next)?;
        Ok(ReadingResult {
            streak_days,
            completion,
            achievements,
        })
    }

    /// Map view of one region.
    pub fn map(&self, region_id: &str) -> Result<RegionView, BuddyError> {
        let region = self
            .catalog
            .region(region_id)
            .ok_or_else(|| BuddyError::NotFound(format!("region {}", region_id)))?;
        Ok(RegionView {
            region: region.clone(),
            enterable: is_region_enterable(region, &self.progress),
            nodes: node_states(&self.catalog, region_id, &self.progress)?,
            pending: pending_rewards(&self.catalog, region_id, &self.progress)?,
        })
    }

    /// The highest-level region the user can enter.
    pub fn current_region(&self) -> Option<&MapRegion> {
        unlock::enterable_regions(&self.catalog, &self.progress)
            .into_iter()
            .last()
    }

    pub fn export_sync(&self, at: DateTime<Utc>) -> Result<String, BuddyError> {
        let payload = sync::export(&self.user, &self.progress, at)?;
        metrics::inc_sync_exports();
        info!("Exported sync payload ({} chars)", payload.len());
        Ok(payload)
    }

    /// Verify a payload and adopt its progress (last writer wins). The user's
    /// display names follow the snapshot; the local user id is kept. Names that
    /// fail validation reject the payload. The user and progress records are
    /// written in one transaction, and a rejected payload changes nothing.
    pub fn import_sync(&mut self, payload: &str) -> Result<SyncData, BuddyError> {
        let data = match sync::import_with_limit(payload, self.max_payload_len) {
            Ok(data) => data,
            Err(e) => {
                metrics::inc_sync_imports_rejected();
                return Err(e);
            }
        };

        if let Err(e) = validate_reader_name(&data.user.name)
            .and_then(|_| validate_buddy_name(&data.user.buddy_name))
        {
            metrics::inc_sync_imports_rejected();
            warn!("sync payload carries an invalid name: {}", e);
            return Err(BuddyError::CorruptPayload(PayloadDefect::Malformed));
        }

        let mut user = self.user.clone();
        user.name = data.user.name.clone();
        user.buddy_name = data.user.buddy_name.clone();
        let (next, _) = self.award(data.apply_to(&self.progress));
        self.store
            .put_user_with_progress(user.clone(), next.clone())?;
        self.user = user;
        self.progress = next;
        metrics::inc_sync_imports_accepted();
        info!(
            "Imported progress from {} (level {}, {} magic power)",
            escape_log(&data.user.name),
            data.progress.level,
            data.progress.magic_power
        );
        Ok(data)
    }

    /// Throw away all progress for this user and start again from level 1.
    pub fn reset(&mut self) -> Result<(), BuddyError> {
        if !self.store.delete_progress(&self.user.id)? {
            warn!("reset: no stored progress for {}", self.user.id);
        }
        self.commit(UserProgress::new(&self.user.id))?;
        info!("Progress reset for {}", escape_log(&self.user.name));
        Ok(())
    }
}

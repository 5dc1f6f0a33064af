//! First-run seeding and startup verification.
//!
//! Content is written in bulk, one collection per step, as keyed upserts. A run
//! that fails or is cancelled part-way can simply be started again: records that
//! already landed are overwritten with identical values.

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::buddy::catalog::ContentCatalog;
use crate::buddy::errors::BuddyError;
use crate::buddy::storage::BuddyStore;
use crate::buddy::types::{UserProgress, UserRecord};

/// One progress report: a human-readable step message and overall percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitProgress {
    pub message: String,
    pub percent: u8,
}

/// Where progress reports go. A dropped receiver means the listener was torn
/// down, which cancels the run at the next step boundary.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<InitProgress>>,
}

impl ProgressReporter {
    /// Reporter that discards reports and never cancels.
    pub fn silent() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<InitProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    fn report(&self, message: &str, percent: u8) -> Result<(), BuddyError> {
        debug!("init {:>3}%: {}", percent, message);
        let Some(tx) = &self.tx else {
            return Ok(());
        };
        tx.send(InitProgress {
            message: message.to_string(),
            percent: percent.min(100),
        })
        .map_err(|_| {
            warn!("initialization listener went away at {}%; stopping", percent);
            BuddyError::Cancelled
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitSummary {
    pub success: bool,
    pub stories: usize,
    pub words: usize,
}

/// True when the persisted content collections are absent or empty. Whether a
/// user exists yet plays no part.
pub fn needs_initialization(store: &BuddyStore) -> bool {
    store.content_is_empty()
}

fn step<T>(name: &'static str, result: Result<T, BuddyError>) -> Result<T, BuddyError> {
    result.map_err(|source| BuddyError::InitializationFailed {
        step: name,
        source: Box::new(source),
    })
}

/// Load the catalog into persisted storage, reporting progress after each step.
pub async fn initialize_app_data(
    store: &BuddyStore,
    catalog: &ContentCatalog,
    reporter: &ProgressReporter,
) -> Result<InitSummary, BuddyError> {
    info!("Seeding content store");
    reporter.report("Preparing magic books...", 0)?;

    let stories = step("stories", store.put_stories(catalog.stories().cloned().collect()))?;
    reporter.report(&format!("Loaded {} stories", stories), 30)?;
    tokio::task::yield_now().await;

    let words = step("dictionary", store.put_words(catalog.dictionary().cloned().collect()))?;
    reporter.report(&format!("Loaded {} words", words), 55)?;
    tokio::task::yield_now().await;

    let regions = step("regions", store.put_regions(catalog.regions().to_vec()))?;
    reporter.report(&format!("Drew {} map regions", regions), 70)?;
    tokio::task::yield_now().await;

    let nodes = step("map nodes", store.put_nodes(catalog.nodes().to_vec()))?;
    reporter.report(&format!("Placed {} map nodes", nodes), 90)?;
    tokio::task::yield_now().await;

    step("achievements", store.put_achievements(catalog.achievements().to_vec()))?;
    reporter.report("Ready!", 100)?;

    info!("Content store seeded: {} stories, {} words, {} nodes", stories, words, nodes);
    Ok(InitSummary {
        success: true,
        stories,
        words,
    })
}

/// Whether the persisted content matches the catalog this build ships with.
pub fn content_matches(store: &BuddyStore, catalog: &ContentCatalog) -> bool {
    store.count_stories() == catalog.story_count()
        && store.count_words() == catalog.word_count()
        && store.count_regions() == catalog.regions().len()
        && store.count_nodes() == catalog.nodes().len()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Persisted content was present and matched the catalog.
    Loaded,
    /// Content was (re)seeded during this call.
    Initialized(InitSummary),
}

/// Seed the store on first run, or re-seed when persisted content is partial
/// or out of date; otherwise leave it untouched. A re-seed replaces the stored
/// content outright so records dropped from the catalog do not linger.
pub async fn load_or_initialize(
    store: &BuddyStore,
    catalog: &ContentCatalog,
    reporter: &ProgressReporter,
) -> Result<LoadOutcome, BuddyError> {
    if !needs_initialization(store) && content_matches(store, catalog) {
        debug!("content store already initialized");
        return Ok(LoadOutcome::Loaded);
    }
    if !needs_initialization(store) {
        info!("persisted content differs from catalog; re-seeding");
        step("clear content", store.clear_content())?;
    }
    initialize_app_data(store, catalog, reporter)
        .await
        .map(LoadOutcome::Initialized)
}

/// Rebuild a validated catalog from persisted content.
pub fn load_catalog(store: &BuddyStore) -> Result<ContentCatalog, BuddyError> {
    ContentCatalog::new(
        store.list_regions()?,
        store.list_nodes()?,
        store.list_stories()?,
        store.list_words()?,
        store.list_achievements()?,
    )
}

/// Return the active user and their progress, creating both on first run.
/// A user whose progress was reset gets a fresh progress record.
pub fn ensure_user(
    store: &BuddyStore,
    name: &str,
    buddy_name: &str,
) -> Result<(UserRecord, UserProgress), BuddyError> {
    let user = match store.active_user()? {
        Some(user_id) => match store.get_user(&user_id) {
            Ok(user) => Some(user),
            Err(BuddyError::NotFound(_)) => None,
            Err(e) => return Err(e),
        },
        None => None,
    };

    let user = match user {
        Some(user) => user,
        None => {
            let user = UserRecord::new(name, buddy_name);
            info!("Creating user {} with buddy {}", user.id, buddy_name);
            store.put_user(user.clone())?;
            store.set_active_user(&user.id)?;
            user
        }
    };

    let progress = match store.get_progress(&user.id) {
        Ok(progress) => progress,
        Err(BuddyError::NotFound(_)) => {
            let progress = UserProgress::new(&user.id);
            store.put_progress(progress.clone())?;
            progress
        }
        Err(e) => return Err(e),
    };
    Ok((user, progress))
}

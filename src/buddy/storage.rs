use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{IVec, Transactional};

use crate::buddy::errors::BuddyError;
use crate::buddy::types::{
    AchievementRecord, DictionaryEntry, MapNode, MapRegion, Story, UserProgress, UserRecord,
    ACHIEVEMENT_SCHEMA_VERSION, DICTIONARY_SCHEMA_VERSION, NODE_SCHEMA_VERSION,
    PROGRESS_SCHEMA_VERSION, REGION_SCHEMA_VERSION, STORY_SCHEMA_VERSION, USER_SCHEMA_VERSION,
};

const TREE_USERS: &str = "users";
const TREE_PROGRESS: &str = "user_progress";
const TREE_NODES: &str = "map_nodes";
const TREE_REGIONS: &str = "map_regions";
const TREE_STORIES: &str = "stories";
const TREE_DICTIONARY: &str = "dictionary";
const TREE_ACHIEVEMENTS: &str = "achievements";
const TREE_META: &str = "meta";

const META_ACTIVE_USER: &[u8] = b"active_user";

fn unavailable(path: &Path, err: impl std::fmt::Display) -> BuddyError {
    BuddyError::StorageUnavailable(format!("{}: {}", path.display(), err))
}

/// Records that carry a schema version stamped on write and checked on read.
pub trait Versioned: Serialize + DeserializeOwned {
    const ENTITY: &'static str;
    const SCHEMA_VERSION: u8;

    fn key(&self) -> &str;
    fn schema_version(&self) -> u8;
    fn set_schema_version(&mut self, version: u8);
}

macro_rules! versioned {
    ($ty:ty, $entity:literal, $version:expr, $key:ident) => {
        impl Versioned for $ty {
            const ENTITY: &'static str = $entity;
            const SCHEMA_VERSION: u8 = $version;

            fn key(&self) -> &str {
                &self.$key
            }

            fn schema_version(&self) -> u8 {
                self.schema_version
            }

            fn set_schema_version(&mut self, version: u8) {
                self.schema_version = version;
            }
        }
    };
}

versioned!(UserRecord, "user", USER_SCHEMA_VERSION, id);
versioned!(UserProgress, "progress", PROGRESS_SCHEMA_VERSION, user_id);
versioned!(MapNode, "map node", NODE_SCHEMA_VERSION, id);
versioned!(MapRegion, "map region", REGION_SCHEMA_VERSION, id);
versioned!(Story, "story", STORY_SCHEMA_VERSION, id);
versioned!(DictionaryEntry, "dictionary entry", DICTIONARY_SCHEMA_VERSION, word);
versioned!(AchievementRecord, "achievement", ACHIEVEMENT_SCHEMA_VERSION, id);

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct BuddyStoreBuilder {
    path: PathBuf,
}

impl BuddyStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(self) -> Result<BuddyStore, BuddyError> {
        BuddyStore::open(self.path)
    }
}

/// Sled-backed persistence for content and per-user progress.
///
/// Every write is an upsert keyed by the record's stable id, so replaying a
/// partially applied write sequence converges on the same state.
pub struct BuddyStore {
    _db: sled::Db,
    users: sled::Tree,
    progress: sled::Tree,
    nodes: sled::Tree,
    regions: sled::Tree,
    stories: sled::Tree,
    dictionary: sled::Tree,
    achievements: sled::Tree,
    meta: sled::Tree,
}

impl BuddyStore {
    /// Open (or create) the store rooted at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BuddyError> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref).map_err(|e| unavailable(path_ref, e))?;
        let db = sled::Config::new()
            .path(path_ref)
            .open()
            .map_err(|e| unavailable(path_ref, e))?;
        let open_tree = |name: &str| db.open_tree(name).map_err(|e| unavailable(path_ref, e));
        let users = open_tree(TREE_USERS)?;
        let progress = open_tree(TREE_PROGRESS)?;
        let nodes = open_tree(TREE_NODES)?;
        let regions = open_tree(TREE_REGIONS)?;
        let stories = open_tree(TREE_STORIES)?;
        let dictionary = open_tree(TREE_DICTIONARY)?;
        let achievements = open_tree(TREE_ACHIEVEMENTS)?;
        let meta = open_tree(TREE_META)?;
        let store = Self {
            _db: db,
            users,
            progress,
            nodes,
            regions,
            stories,
            dictionary,
            achievements,
            meta,
        };
        debug!("opened buddy store at {}", path_ref.display());
        Ok(store)
    }

    fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, BuddyError> {
        Ok(bincode::serialize(value)?)
    }

    fn deserialize<T: DeserializeOwned>(bytes: IVec) -> Result<T, BuddyError> {
        Ok(bincode::deserialize::<T>(&bytes)?)
    }

    fn put<T: Versioned>(tree: &sled::Tree, mut record: T) -> Result<(), BuddyError> {
        record.set_schema_version(T::SCHEMA_VERSION);
        let bytes = Self::serialize(&record)?;
        tree.insert(record.key().as_bytes(), bytes)?;
        tree.flush()?;
        Ok(())
    }

    fn check_version<T: Versioned>(record: T) -> Result<T, BuddyError> {
        if record.schema_version() != T::SCHEMA_VERSION {
            return Err(BuddyError::SchemaMismatch {
                entity: T::ENTITY,
                expected: T::SCHEMA_VERSION,
                found: record.schema_version(),
            });
        }
        Ok(record)
    }

    fn get<T: Versioned>(tree: &sled::Tree, key: &str) -> Result<T, BuddyError> {
        let Some(bytes) = tree.get(key.as_bytes())? else {
            return Err(BuddyError::NotFound(format!("{}: {}", T::ENTITY, key)));
        };
        Self::check_version(Self::deserialize::<T>(bytes)?)
    }

    fn list<T: Versioned>(tree: &sled::Tree) -> Result<Vec<T>, BuddyError> {
        let mut records = Vec::new();
        for entry in tree.iter() {
            let (_, bytes) = entry?;
            records.push(Self::check_version(Self::deserialize::<T>(bytes)?)?);
        }
        Ok(records)
    }

    fn encode_versioned<T: Versioned>(mut record: T) -> Result<(String, Vec<u8>), BuddyError> {
        record.set_schema_version(T::SCHEMA_VERSION);
        Ok((record.key().to_string(), Self::serialize(&record)?))
    }

    /// Upsert many records in one atomic batch, then flush once.
    fn put_batch<T: Versioned>(tree: &sled::Tree, records: Vec<T>) -> Result<usize, BuddyError> {
        let mut batch = sled::Batch::default();
        let mut written = 0usize;
        for record in records {
            let (key, bytes) = Self::encode_versioned(record)?;
            batch.insert(key.as_bytes(), bytes);
            written += 1;
        }
        tree.apply_batch(batch)?;
        tree.flush()?;
        Ok(written)
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    pub fn put_stories(&self, stories: Vec<Story>) -> Result<usize, BuddyError> {
        Self::put_batch(&self.stories, stories)
    }

    pub fn list_stories(&self) -> Result<Vec<Story>, BuddyError> {
        Self::list(&self.stories)
    }

    pub fn count_stories(&self) -> usize {
        self.stories.len()
    }

    pub fn put_words(&self, entries: Vec<DictionaryEntry>) -> Result<usize, BuddyError> {
        Self::put_batch(&self.dictionary, entries)
    }

    pub fn list_words(&self) -> Result<Vec<DictionaryEntry>, BuddyError> {
        Self::list(&self.dictionary)
    }

    pub fn count_words(&self) -> usize {
        self.dictionary.len()
    }

    pub fn put_regions(&self, regions: Vec<MapRegion>) -> Result<usize, BuddyError> {
        Self::put_batch(&self.regions, regions)
    }

    pub fn list_regions(&self) -> Result<Vec<MapRegion>, BuddyError> {
        Self::list(&self.regions)
    }

    pub fn count_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn put_nodes(&self, nodes: Vec<MapNode>) -> Result<usize, BuddyError> {
        Self::put_batch(&self.nodes, nodes)
    }

    pub fn list_nodes(&self) -> Result<Vec<MapNode>, BuddyError> {
        Self::list(&self.nodes)
    }

    pub fn count_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn put_achievements(
        &self,
        achievements: Vec<AchievementRecord>,
    ) -> Result<usize, BuddyError> {
        Self::put_batch(&self.achievements, achievements)
    }

    pub fn list_achievements(&self) -> Result<Vec<AchievementRecord>, BuddyError> {
        Self::list(&self.achievements)
    }

    /// True when no content has been seeded yet. Users are not considered.
    pub fn content_is_empty(&self) -> bool {
        self.stories.is_empty() || self.nodes.is_empty()
    }

    /// Drop every content record. Users and progress are kept.
    pub fn clear_content(&self) -> Result<(), BuddyError> {
        for tree in [
            &self.stories,
            &self.dictionary,
            &self.regions,
            &self.nodes,
            &self.achievements,
        ] {
            tree.clear()?;
            tree.flush()?;
        }
        debug!("cleared content trees");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Users and progress
    // ------------------------------------------------------------------

    pub fn put_user(&self, user: UserRecord) -> Result<(), BuddyError> {
        Self::put(&self.users, user)
    }

    pub fn get_user(&self, user_id: &str) -> Result<UserRecord, BuddyError> {
        Self::get(&self.users, user_id)
    }

    /// Insert or replace a user's progress record.
    pub fn put_progress(&self, progress: UserProgress) -> Result<(), BuddyError> {
        Self::put(&self.progress, progress)
    }

    pub fn get_progress(&self, user_id: &str) -> Result<UserProgress, BuddyError> {
        Self::get(&self.progress, user_id)
    }

    /// Write a user and their progress in one transaction: both land or neither does.
    pub fn put_user_with_progress(
        &self,
        user: UserRecord,
        progress: UserProgress,
    ) -> Result<(), BuddyError> {
        let (user_key, user_bytes) = Self::encode_versioned(user)?;
        let (progress_key, progress_bytes) = Self::encode_versioned(progress)?;
        (&self.users, &self.progress)
            .transaction(|(users, progress)| {
                users.insert(user_key.as_bytes(), user_bytes.as_slice())?;
                progress.insert(progress_key.as_bytes(), progress_bytes.as_slice())?;
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e: TransactionError<()>| match e {
                TransactionError::Storage(err) => BuddyError::Sled(err),
                TransactionError::Abort(()) => {
                    BuddyError::StorageUnavailable("user transaction aborted".to_string())
                }
            })?;
        self.users.flush()?;
        self.progress.flush()?;
        Ok(())
    }

    /// Explicit reset: drop a user's progress record. Returns whether one existed.
    pub fn delete_progress(&self, user_id: &str) -> Result<bool, BuddyError> {
        let removed = self.progress.remove(user_id.as_bytes())?.is_some();
        self.progress.flush()?;
        Ok(removed)
    }

    pub fn set_active_user(&self, user_id: &str) -> Result<(), BuddyError> {
        self.meta.insert(META_ACTIVE_USER, user_id.as_bytes())?;
        self.meta.flush()?;
        Ok(())
    }

    pub fn active_user(&self) -> Result<Option<String>, BuddyError> {
        Ok(self
            .meta
            .get(META_ACTIVE_USER)?
            .map(|v| String::from_utf8_lossy(&v).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buddy::types::NodeType;
    use tempfile::TempDir;

    fn store() -> (TempDir, BuddyStore) {
        let dir = TempDir::new().expect("tempdir");
        let store = BuddyStoreBuilder::new(dir.path()).open().expect("store");
        (dir, store)
    }

    #[test]
    fn store_round_trip_progress() {
        let (_dir, store) = store();
        let mut progress = UserProgress::new("u1");
        progress.magic_power = 42;
        progress.completed_nodes.insert("node_l1_1".to_string());
        store.put_progress(progress.clone()).expect("put");
        let fetched = store.get_progress("u1").expect("get");
        assert_eq!(fetched, progress);
        assert_eq!(fetched.schema_version, PROGRESS_SCHEMA_VERSION);
    }

    #[test]
    fn missing_record_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.get_progress("nobody"), Err(BuddyError::NotFound(_))));
    }

    #[test]
    fn batch_upsert_is_idempotent() {
        let (_dir, store) = store();
        let stories = vec![Story::new("s1", "One", 1), Story::new("s2", "Two", 1)];
        assert_eq!(store.put_stories(stories.clone()).unwrap(), 2);
        assert_eq!(store.put_stories(stories).unwrap(), 2);
        assert_eq!(store.count_stories(), 2);
        let titles: Vec<String> = store.list_stories().unwrap().into_iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["One", "Two"]);
    }

    #[test]
    fn content_emptiness_ignores_users() {
        let (_dir, store) = store();
        store.put_user(UserRecord::new("Mia", "Sparky")).unwrap();
        assert!(store.content_is_empty());
        store.put_stories(vec![Story::new("s1", "One", 1)]).unwrap();
        store
            .put_nodes(vec![MapNode::new("n1", "r1", NodeType::Story, "s1")])
            .unwrap();
        assert!(!store.content_is_empty());
    }

    #[test]
    fn clear_content_keeps_users_and_progress() {
        let (_dir, store) = store();
        let user = UserRecord::new("Mia", "Sparky");
        store
            .put_user_with_progress(user.clone(), UserProgress::new(&user.id))
            .unwrap();
        store.put_stories(vec![Story::new("s1", "One", 1)]).unwrap();
        store
            .put_nodes(vec![MapNode::new("n1", "r1", NodeType::Story, "s1")])
            .unwrap();
        store.put_words(vec![DictionaryEntry::new("sun", "/sʌn/", "a star", "The sun is hot.", 1)]).unwrap();

        store.clear_content().unwrap();
        assert!(store.content_is_empty());
        assert_eq!(store.count_words(), 0);
        assert_eq!(store.get_user(&user.id).unwrap(), user);
        assert_eq!(store.get_progress(&user.id).unwrap().user_id, user.id);
    }

    #[test]
    fn user_and_progress_are_written_together() {
        let (_dir, store) = store();
        let mut user = UserRecord::new("Mia", "Sparky");
        let mut progress = UserProgress::new(&user.id);
        progress.magic_power = 25;
        store
            .put_user_with_progress(user.clone(), progress.clone())
            .unwrap();

        user.buddy_name = "Blaze".to_string();
        progress.magic_power = 40;
        store
            .put_user_with_progress(user.clone(), progress.clone())
            .unwrap();
        assert_eq!(store.get_user(&user.id).unwrap().buddy_name, "Blaze");
        assert_eq!(store.get_progress(&user.id).unwrap().magic_power, 40);
        assert_eq!(store.get_user(&user.id).unwrap().schema_version, USER_SCHEMA_VERSION);
    }

    #[test]
    fn delete_progress_resets() {
        let (_dir, store) = store();
        store.put_progress(UserProgress::new("u1")).unwrap();
        assert!(store.delete_progress("u1").unwrap());
        assert!(!store.delete_progress("u1").unwrap());
        assert!(store.get_progress("u1").is_err());
    }

    #[test]
    fn active_user_persists_across_reopen() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = BuddyStoreBuilder::new(dir.path()).open().expect("store");
            assert_eq!(store.active_user().unwrap(), None);
            store.set_active_user("u1").unwrap();
        }
        let store = BuddyStoreBuilder::new(dir.path()).open().expect("reopen");
        assert_eq!(store.active_user().unwrap().as_deref(), Some("u1"));
    }
}

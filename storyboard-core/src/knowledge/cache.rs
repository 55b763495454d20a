//! Memoized view of the project knowledge store.

use super::record::{CharacterId, CharacterRecord, SceneId, SceneRecord};
use super::store::{CharacterMap, KnowledgeStore, SceneMap};
use crate::error::KnowledgeStoreError;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// An immutable pair of character and scene maps taken from the cache.
///
/// One enhancement call works against one snapshot, so a concurrent
/// [`ProjectDataCache::invalidate`] is never observed half-way through.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeSnapshot {
    pub characters: Arc<CharacterMap>,
    pub scenes: Arc<SceneMap>,
}

impl KnowledgeSnapshot {
    /// A snapshot with no characters and no scenes.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a snapshot directly from maps.
    pub fn new(characters: CharacterMap, scenes: SceneMap) -> Self {
        Self {
            characters: Arc::new(characters),
            scenes: Arc::new(scenes),
        }
    }

    pub fn character(&self, id: &CharacterId) -> Option<&CharacterRecord> {
        self.characters.get(id)
    }

    pub fn scene(&self, id: &SceneId) -> Option<&SceneRecord> {
        self.scenes.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.scenes.is_empty()
    }
}

#[derive(Default)]
struct CacheState {
    characters: Option<Arc<CharacterMap>>,
    scenes: Option<Arc<SceneMap>>,
    last_error: Option<KnowledgeStoreError>,
}

/// Lazily populated cache of all characters and scenes of one project.
///
/// The first access to each map queries the store; later accesses are served
/// from memory until [`invalidate`](Self::invalidate) or
/// [`reload`](Self::reload). A failing store yields an empty map, which is
/// memoized like any other result so the content never changes implicitly.
pub struct ProjectDataCache {
    store: Arc<dyn KnowledgeStore>,
    state: RwLock<CacheState>,
}

impl ProjectDataCache {
    /// Create an empty cache in front of `store`. Nothing is queried yet.
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self {
            store,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// All characters, querying the store on first access.
    pub fn load_characters(&self) -> Arc<CharacterMap> {
        if let Some(characters) = self.read_state().characters.clone() {
            return characters;
        }

        let mut state = self.write_state();
        // Another caller may have populated it while we waited for the lock.
        if let Some(characters) = state.characters.clone() {
            return characters;
        }
        let characters = Arc::new(self.fetch_characters(&mut state.last_error));
        state.characters = Some(Arc::clone(&characters));
        characters
    }

    /// All scenes, querying the store on first access.
    pub fn load_scenes(&self) -> Arc<SceneMap> {
        if let Some(scenes) = self.read_state().scenes.clone() {
            return scenes;
        }

        let mut state = self.write_state();
        if let Some(scenes) = state.scenes.clone() {
            return scenes;
        }
        let scenes = Arc::new(self.fetch_scenes(&mut state.last_error));
        state.scenes = Some(Arc::clone(&scenes));
        scenes
    }

    /// Both maps as one consistent snapshot.
    pub fn snapshot(&self) -> KnowledgeSnapshot {
        {
            let state = self.read_state();
            if let (Some(characters), Some(scenes)) = (&state.characters, &state.scenes) {
                return KnowledgeSnapshot {
                    characters: Arc::clone(characters),
                    scenes: Arc::clone(scenes),
                };
            }
        }

        let mut state = self.write_state();
        self.populate(&mut state)
    }

    /// Drop memoized data; the next access queries the store again.
    pub fn invalidate(&self) {
        *self.write_state() = CacheState::default();
        info!("project data cache invalidated");
    }

    /// Invalidate and repopulate immediately.
    ///
    /// The cache is always left populated. If the store failed, the empty
    /// fallback is installed and the failure is returned for the caller to
    /// report.
    pub fn reload(&self) -> Result<KnowledgeSnapshot, KnowledgeStoreError> {
        let mut state = self.write_state();
        *state = CacheState::default();
        let snapshot = self.populate(&mut state);
        match state.last_error.clone() {
            Some(err) => Err(err),
            None => Ok(snapshot),
        }
    }

    /// Check if both maps are memoized.
    pub fn is_populated(&self) -> bool {
        let state = self.read_state();
        state.characters.is_some() && state.scenes.is_some()
    }

    /// The most recent store failure since the last invalidation.
    pub fn last_error(&self) -> Option<KnowledgeStoreError> {
        self.read_state().last_error.clone()
    }

    fn populate(&self, state: &mut CacheState) -> KnowledgeSnapshot {
        if state.characters.is_none() {
            state.characters = Some(Arc::new(self.fetch_characters(&mut state.last_error)));
        }
        if state.scenes.is_none() {
            state.scenes = Some(Arc::new(self.fetch_scenes(&mut state.last_error)));
        }
        KnowledgeSnapshot {
            characters: state.characters.clone().unwrap_or_default(),
            scenes: state.scenes.clone().unwrap_or_default(),
        }
    }

    fn fetch_characters(&self, last_error: &mut Option<KnowledgeStoreError>) -> CharacterMap {
        match self.store.get_all_characters() {
            Ok(characters) => {
                info!(count = characters.len(), "loaded characters from knowledge store");
                characters
            }
            Err(err) => {
                warn!(error = %err, "knowledge store unavailable, continuing without characters");
                *last_error = Some(err);
                CharacterMap::new()
            }
        }
    }

    fn fetch_scenes(&self, last_error: &mut Option<KnowledgeStoreError>) -> SceneMap {
        match self.store.get_all_scenes() {
            Ok(scenes) => {
                info!(count = scenes.len(), "loaded scenes from knowledge store");
                scenes
            }
            Err(err) => {
                warn!(error = %err, "knowledge store unavailable, continuing without scenes");
                *last_error = Some(err);
                SceneMap::new()
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ProjectDataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read_state();
        f.debug_struct("ProjectDataCache")
            .field("characters", &state.characters.as_ref().map(|c| c.len()))
            .field("scenes", &state.scenes.as_ref().map(|s| s.len()))
            .field("last_error", &state.last_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockKnowledgeStore;

    fn cache_over(store: &Arc<MockKnowledgeStore>) -> ProjectDataCache {
        ProjectDataCache::new(store.clone())
    }

    #[test]
    fn test_lazy_population() {
        let store = Arc::new(MockKnowledgeStore::sample());
        let cache = cache_over(&store);

        assert!(!cache.is_populated());
        assert_eq!(store.query_count(), 0);

        let snapshot = cache.snapshot();
        assert!(cache.is_populated());
        assert!(!snapshot.characters.is_empty());
        assert_eq!(store.query_count(), 2);
    }

    #[test]
    fn test_memoized_after_first_access() {
        let store = Arc::new(MockKnowledgeStore::sample());
        let cache = cache_over(&store);

        let first = cache.load_characters();
        let second = cache.load_characters();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.query_count(), 1);

        cache.load_scenes();
        cache.load_scenes();
        cache.snapshot();
        assert_eq!(store.query_count(), 2);
    }

    #[test]
    fn test_store_changes_invisible_until_invalidate() {
        let store = Arc::new(MockKnowledgeStore::sample());
        let cache = cache_over(&store);
        let before = cache.load_characters().len();

        store.upsert_character(CharacterRecord::new("new", "新角色"));
        assert_eq!(cache.load_characters().len(), before);

        cache.invalidate();
        assert!(!cache.is_populated());
        assert_eq!(cache.load_characters().len(), before + 1);
    }

    #[test]
    fn test_unreachable_store_yields_empty_maps() {
        let store = Arc::new(MockKnowledgeStore::sample());
        store.set_reachable(false);
        let cache = cache_over(&store);

        let snapshot = cache.snapshot();
        assert!(snapshot.is_empty());
        assert!(matches!(
            cache.last_error(),
            Some(KnowledgeStoreError::Unreachable(_))
        ));

        // The empty fallback is memoized; the store is not hammered.
        cache.snapshot();
        assert_eq!(store.query_count(), 2);
    }

    #[test]
    fn test_reload_reports_and_recovers() {
        let store = Arc::new(MockKnowledgeStore::sample());
        store.set_reachable(false);
        let cache = cache_over(&store);

        assert!(cache.reload().is_err());
        assert!(cache.is_populated());

        store.set_reachable(true);
        let snapshot = cache.reload().unwrap();
        assert!(!snapshot.characters.is_empty());
        assert!(cache.last_error().is_none());
    }

    #[test]
    fn test_snapshot_survives_invalidate() {
        let store = Arc::new(MockKnowledgeStore::sample());
        let cache = cache_over(&store);

        let snapshot = cache.snapshot();
        let count = snapshot.characters.len();
        cache.invalidate();
        assert_eq!(snapshot.characters.len(), count);
    }
}

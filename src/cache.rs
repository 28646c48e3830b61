use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::field;
use crate::grid::Grid;
use crate::tier::OptimizationLevel;

pub const DEFAULT_CAPACITY: usize = 16;

/// Exact generation parameters. `seed: None` is its own key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub size: usize,
    pub iterations: usize,
    pub seed: Option<u64>,
    pub level: OptimizationLevel,
}

impl CacheKey {
    pub fn new(size: usize, iterations: usize, seed: Option<u64>, level: OptimizationLevel) -> Self {
        Self { size, iterations, seed, level }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Default)]
struct LruState {
    /// key -> (grid, recency stamp)
    entries: HashMap<CacheKey, (Arc<Grid<f64>>, u64)>,
    /// recency stamp -> key, oldest first
    order: BTreeMap<u64, CacheKey>,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl LruState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn touch(&mut self, key: &CacheKey) -> Option<Arc<Grid<f64>>> {
        let tick = self.next_tick();
        let (grid, stamp) = self.entries.get_mut(key)?;
        self.order.remove(stamp);
        *stamp = tick;
        self.order.insert(tick, *key);
        Some(Arc::clone(grid))
    }

    fn insert(&mut self, key: CacheKey, grid: Arc<Grid<f64>>, capacity: usize) {
        let tick = self.next_tick();
        if let Some((_, old)) = self.entries.insert(key, (grid, tick)) {
            self.order.remove(&old);
        }
        self.order.insert(tick, key);
        while self.entries.len() > capacity {
            let Some((_, evicted)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&evicted);
            trace!(?evicted, "cache eviction");
        }
    }
}

/// Bounded LRU memoization in front of [`field::generate`].
///
/// Lookups and inserts each take the lock briefly; generation runs outside
/// it. Two threads missing on the same key may both generate, and the
/// second insert simply refreshes the entry with an identical grid.
pub struct FieldCache {
    capacity: usize,
    inner: Mutex<LruState>,
}

impl Default for FieldCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl FieldCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(LruState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, LruState> {
        // The state is consistent after every statement, so a panic in another
        // holder leaves nothing half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hit: returns the entry and marks it most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Grid<f64>>> {
        let mut state = self.state();
        let found = state.touch(key);
        if found.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        found
    }

    pub fn insert(&self, key: CacheKey, grid: Grid<f64>) -> Arc<Grid<f64>> {
        let grid = Arc::new(grid);
        if self.capacity > 0 {
            self.state().insert(key, Arc::clone(&grid), self.capacity);
        }
        grid
    }

    pub fn get_or_insert_with(
        &self,
        key: CacheKey,
        compute: impl FnOnce() -> Grid<f64>,
    ) -> Arc<Grid<f64>> {
        if let Some(hit) = self.get(&key) {
            trace!(?key, "cache hit");
            return hit;
        }
        trace!(?key, "cache miss");
        self.insert(key, compute())
    }

    pub fn cached_generate(
        &self,
        size: usize,
        iterations: usize,
        seed: Option<u64>,
        level: OptimizationLevel,
    ) -> Arc<Grid<f64>> {
        let key = CacheKey::new(size, iterations, seed, level);
        self.get_or_insert_with(key, || field::generate(size, iterations, seed, level))
    }

    /// Membership without touching recency or counters.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state().entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys from least to most recently used.
    pub fn keys_by_recency(&self) -> Vec<CacheKey> {
        self.state().order.values().copied().collect()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state();
        CacheStats {
            hits: state.hits,
            misses: state.misses,
            entries: state.entries.len(),
        }
    }
}

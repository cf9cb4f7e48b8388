use crate::store::{read_typed, write_logged, KvStore};
use serde::{Deserialize, Serialize};

pub const STATS_KEY: &str = "stats";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Likes,
    Skips,
    Errors,
}

/// Lifetime counters. Persisted on every change; only an explicit reset
/// brings them back to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub likes: u64,
    pub skips: u64,
    pub errors: u64,
}

impl Stats {
    pub fn load(store: &dyn KvStore) -> Self {
        read_typed(store, STATS_KEY).unwrap_or_default()
    }

    pub fn bump(&mut self, counter: Counter, store: &mut dyn KvStore) {
        self.add(counter, 1, store);
    }

    /// Add `n` to a counter; a zero add writes nothing.
    pub fn add(&mut self, counter: Counter, n: u64, store: &mut dyn KvStore) {
        if n == 0 {
            return;
        }
        let slot = match counter {
            Counter::Likes => &mut self.likes,
            Counter::Skips => &mut self.skips,
            Counter::Errors => &mut self.errors,
        };
        *slot = slot.saturating_add(n);
        write_logged(store, STATS_KEY, &*self);
    }

    pub fn reset(&mut self, store: &mut dyn KvStore) {
        *self = Stats::default();
        write_logged(store, STATS_KEY, &*self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_bump_persists_immediately() {
        let mut store = MemoryStore::new();
        let mut stats = Stats::default();
        stats.bump(Counter::Likes, &mut store);
        stats.bump(Counter::Skips, &mut store);
        stats.bump(Counter::Skips, &mut store);
        assert_eq!(
            store.get(STATS_KEY),
            Some(json!({"likes": 1, "skips": 2, "errors": 0}))
        );
        assert_eq!(Stats::load(&store), stats);
    }

    #[test]
    fn test_partial_record_fills_missing_counters() {
        let mut store = MemoryStore::new();
        store.set(STATS_KEY, json!({"likes": 9})).unwrap();
        let stats = Stats::load(&store);
        assert_eq!(stats.likes, 9);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn test_reset_clears_and_persists() {
        let mut store = MemoryStore::new();
        let mut stats = Stats {
            likes: 3,
            skips: 2,
            errors: 1,
        };
        stats.reset(&mut store);
        assert_eq!(Stats::load(&store), Stats::default());
    }
}

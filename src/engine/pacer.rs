use super::quota::QuotaTracker;
use crate::config::Config;
use crate::feed::types::CandidateItem;
use crate::feed::FeedPage;
use crate::store::KvStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Delay between an action and its acted-state check.
pub const VERIFY_DELAY_MS: i64 = 500;
/// Grace period after the last scheduled offset before a cycle completes.
pub const COMPLETION_GRACE_MS: u64 = 1000;

/// One scheduled action. Consumed exactly once; cancelable until it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTask {
    pub candidate: CandidateItem,
    /// Milliseconds from cycle start.
    pub offset_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Paused,
    AlreadyActed,
    Vanished,
    QuotaExhausted,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::Paused => "paused",
            SkipReason::AlreadyActed => "already acted",
            SkipReason::Vanished => "element gone",
            SkipReason::QuotaExhausted => "daily quota reached",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Performed,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Confirmed,
    Unconfirmed,
    Vanished,
}

/// Expected seconds to work through `count` actions, published before any
/// task fires so progress can be displayed.
pub fn estimate_duration_secs(count: usize, config: &Config) -> f64 {
    count as f64 * (config.like_delay + config.jitter_span() / 2.0) + 1.0
}

/// Issues time-spaced, jittered offsets for accepted candidates.
pub struct Pacer {
    rng: StdRng,
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new()
    }
}

impl Pacer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Base delay plus uniform jitter over the configured window, in ms.
    pub fn step_ms(&mut self, config: &Config) -> u64 {
        let span = config.jitter_span();
        let jitter = if span > 0.0 {
            self.rng.gen_range(0.0..=span)
        } else {
            0.0
        };
        ((config.like_delay + jitter) * 1000.0).round() as u64
    }

    /// Offsets for `accepted`, strictly increasing in input order.
    ///
    /// A fresh cycle starts at offset 0. When `after` is given (tasks are
    /// being appended to a running cycle) the first new task lands one step
    /// after it.
    pub fn schedule(
        &mut self,
        accepted: Vec<CandidateItem>,
        after: Option<u64>,
        config: &Config,
    ) -> Vec<ActionTask> {
        let mut previous = after;
        accepted
            .into_iter()
            .map(|candidate| {
                let offset_ms = match previous {
                    None => 0,
                    // Zero-delay configs still keep offsets strictly increasing.
                    Some(prev) => prev.saturating_add(self.step_ms(config).max(1)),
                };
                previous = Some(offset_ms);
                ActionTask {
                    candidate,
                    offset_ms,
                }
            })
            .collect()
    }
}

/// Execute one task at its fire time. Every gate is read live: the pause
/// flag and quota as they are now, and the element's current acted state.
pub fn dispatch(
    task: &ActionTask,
    paused: bool,
    page: &mut dyn FeedPage,
    quota: &mut QuotaTracker,
    store: &mut dyn KvStore,
) -> Dispatch {
    if paused {
        return Dispatch::Skipped(SkipReason::Paused);
    }
    match page.control_state(&task.candidate.key) {
        None => return Dispatch::Skipped(SkipReason::Vanished),
        Some(true) => return Dispatch::Skipped(SkipReason::AlreadyActed),
        Some(false) => {}
    }
    if quota.is_exhausted() {
        return Dispatch::Skipped(SkipReason::QuotaExhausted);
    }
    if let Err(e) = page.activate(&task.candidate.key) {
        tracing::debug!(key = %task.candidate.key, error = %e, "activation failed");
        return Dispatch::Skipped(SkipReason::Vanished);
    }
    if !quota.try_consume(store) {
        return Dispatch::Skipped(SkipReason::QuotaExhausted);
    }
    Dispatch::Performed
}

/// Soft check that the page registered the action.
pub fn verify(page: &dyn FeedPage, key: &str) -> Verification {
    match page.control_state(key) {
        Some(true) => Verification::Confirmed,
        Some(false) => Verification::Unconfirmed,
        None => Verification::Vanished,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::feed::scanner;
    use crate::feed::simulated::SimulatedFeed;
    use crate::store::MemoryStore;

    fn item(key: &str) -> CandidateItem {
        CandidateItem {
            key: key.to_string(),
            owner: "1".into(),
            group: None,
            content: String::new(),
            already_acted: false,
            position: 0,
        }
    }

    fn no_jitter() -> Config {
        Config {
            like_delay: 5.0,
            random_delay_min: 1.0,
            random_delay_max: 1.0,
            ..Config::default()
        }
    }

    #[test]
    fn test_offsets_without_jitter() {
        let mut pacer = Pacer::seeded(1);
        let tasks = pacer.schedule(vec![item("a"), item("b"), item("c")], None, &no_jitter());
        let offsets: Vec<u64> = tasks.iter().map(|t| t.offset_ms).collect();
        assert_eq!(offsets, vec![0, 5000, 10000]);
    }

    #[test]
    fn test_jittered_offsets_stay_in_bounds() {
        let config = Config {
            like_delay: 2.0,
            random_delay_min: 1.0,
            random_delay_max: 3.0,
            ..Config::default()
        };
        let mut pacer = Pacer::seeded(42);
        let items = (0..20).map(|i| item(&i.to_string())).collect();
        let tasks = pacer.schedule(items, None, &config);
        for pair in tasks.windows(2) {
            let gap = pair[1].offset_ms - pair[0].offset_ms;
            assert!((2000..=4000).contains(&gap), "gap {} out of range", gap);
        }
    }

    #[test]
    fn test_appended_tasks_follow_previous_offset() {
        let mut pacer = Pacer::seeded(1);
        let tasks = pacer.schedule(vec![item("d"), item("e")], Some(10000), &no_jitter());
        assert_eq!(tasks[0].offset_ms, 15000);
        assert_eq!(tasks[1].offset_ms, 20000);
    }

    #[test]
    fn test_estimate_uses_mean_jitter() {
        let config = Config {
            like_delay: 5.0,
            random_delay_min: 1.0,
            random_delay_max: 3.0,
            ..Config::default()
        };
        assert_eq!(estimate_duration_secs(3, &config), 19.0);
        assert_eq!(estimate_duration_secs(0, &config), 1.0);
    }

    fn live_page() -> (SimulatedFeed, CandidateItem) {
        let mut page = SimulatedFeed::new(
            SimulationConfig {
                seed_posts: 12,
                arrival_probability: 0.0,
                ignore_rate: 0.0,
            },
            3,
        );
        page.open_feed_tab();
        let candidate = scanner::scan(&page)
            .into_iter()
            .find(|c| !c.already_acted)
            .unwrap();
        (page, candidate)
    }

    #[test]
    fn test_dispatch_paused_is_noop() {
        let (mut page, candidate) = live_page();
        let mut store = MemoryStore::new();
        let mut quota = QuotaTracker::new(5, 0, 0);
        let task = ActionTask { candidate, offset_ms: 0 };

        let outcome = dispatch(&task, true, &mut page, &mut quota, &mut store);
        assert_eq!(outcome, Dispatch::Skipped(SkipReason::Paused));
        assert_eq!(quota.daily_count(), 0);
        assert_eq!(page.control_state(&task.candidate.key), Some(false));
    }

    #[test]
    fn test_dispatch_performs_and_consumes() {
        let (mut page, candidate) = live_page();
        let mut store = MemoryStore::new();
        let mut quota = QuotaTracker::new(5, 0, 0);
        let task = ActionTask { candidate, offset_ms: 0 };

        assert_eq!(
            dispatch(&task, false, &mut page, &mut quota, &mut store),
            Dispatch::Performed
        );
        assert_eq!(quota.daily_count(), 1);
        assert_eq!(verify(&page, &task.candidate.key), Verification::Confirmed);

        // Second firing of the same element sees the live acted state.
        assert_eq!(
            dispatch(&task, false, &mut page, &mut quota, &mut store),
            Dispatch::Skipped(SkipReason::AlreadyActed)
        );
        assert_eq!(quota.daily_count(), 1);
    }

    #[test]
    fn test_dispatch_respects_exhausted_quota() {
        let (mut page, candidate) = live_page();
        let mut store = MemoryStore::new();
        let mut quota = QuotaTracker::new(2, 2, 0);
        let task = ActionTask { candidate, offset_ms: 0 };

        assert_eq!(
            dispatch(&task, false, &mut page, &mut quota, &mut store),
            Dispatch::Skipped(SkipReason::QuotaExhausted)
        );
        assert_eq!(quota.daily_count(), 2);
        assert_eq!(page.control_state(&task.candidate.key), Some(false));
    }

    #[test]
    fn test_dispatch_on_vanished_element() {
        let (mut page, _) = live_page();
        let mut store = MemoryStore::new();
        let mut quota = QuotaTracker::new(0, 0, 0);
        let task = ActionTask {
            candidate: item("post-does-not-exist"),
            offset_ms: 0,
        };
        assert_eq!(
            dispatch(&task, false, &mut page, &mut quota, &mut store),
            Dispatch::Skipped(SkipReason::Vanished)
        );
        assert_eq!(verify(&page, "post-does-not-exist"), Verification::Vanished);
    }
}

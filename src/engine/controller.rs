//! Top-level workflow controller.
//!
//! Owns the single [`WorkflowState`] record and everything cycle-scoped. All
//! work happens inside synchronous calls (`handle`, `on_periodic`,
//! `advance`); the caller decides when to call them, so the controller can
//! be driven by a real clock or stepped through virtual time.

use super::activity::ActivityLog;
use super::debounce::{Debouncer, RESCAN_DEBOUNCE_MS};
use super::filter;
use super::pacer::{
    self, estimate_duration_secs, ActionTask, Dispatch, Pacer, Verification, COMPLETION_GRACE_MS,
    VERIFY_DELAY_MS,
};
use super::quota::QuotaTracker;
use super::stats::{Counter, Stats};
use super::status::{self, StatusSnapshot};
use super::timers::{TimerId, TimerQueue};
use super::workflow::{
    reduce, Admission, Command, Phase, StateEvent, WorkflowState, DEFAULT_MAX_RETRIES,
};
use crate::config::{Config, LogLevel, DEFAULT_FEED_URL_TEMPLATE};
use crate::feed::types::CandidateItem;
use crate::feed::{scanner, FeedPage};
use crate::notify::Notification;
use crate::store::{read_typed, write_logged, KvStore};
use std::collections::HashSet;
use std::sync::Arc;

pub const PAUSED_KEY: &str = "isPaused";
pub const NEXT_TIME_KEY: &str = "nextTime";
pub const LAST_REFRESH_KEY: &str = "lastRefresh";

fn secs_to_ms(secs: u64) -> i64 {
    i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX)
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub max_retries: u32,
    /// Direct feed URL, `{uin}` is replaced by the known identity.
    pub feed_url_template: String,
    /// Fixed jitter seed for reproducible pacing.
    pub jitter_seed: Option<u64>,
    /// Time given to a navigation before the scan runs.
    pub navigation_settle_ms: i64,
    pub retry_backoff_ms: i64,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            feed_url_template: DEFAULT_FEED_URL_TEMPLATE.to_string(),
            jitter_seed: None,
            navigation_settle_ms: 5000,
            retry_backoff_ms: 3000,
        }
    }
}

#[derive(Debug, Clone)]
enum Timer {
    Scan { cycle: u64 },
    Retry { cycle: u64 },
    Action { cycle: u64, task: ActionTask },
    Verify { key: String },
    Complete { cycle: u64 },
    RefreshSettled,
}

/// Bookkeeping for the cycle in flight.
#[derive(Debug)]
struct CycleBook {
    id: u64,
    admission: Admission,
    /// Offset zero for this cycle's tasks; set by the first scheduling pass.
    pacing_start_ms: Option<i64>,
    scheduled: HashSet<String>,
    skip_counted: HashSet<String>,
    last_offset: Option<u64>,
    performed: u32,
    completion: Option<TimerId>,
}

impl CycleBook {
    fn new(id: u64, admission: Admission) -> Self {
        Self {
            id,
            admission,
            pacing_start_ms: None,
            scheduled: HashSet::new(),
            skip_counted: HashSet::new(),
            last_offset: None,
            performed: 0,
            completion: None,
        }
    }
}

pub struct Controller {
    config: Arc<Config>,
    state: WorkflowState,
    quota: QuotaTracker,
    stats: Stats,
    activity: ActivityLog,
    store: Box<dyn KvStore>,
    page: Box<dyn FeedPage>,
    pacer: Pacer,
    timers: TimerQueue<Timer>,
    rescan: Debouncer,
    cycle: Option<CycleBook>,
    next_cycle_id: u64,
    outbox: Vec<Notification>,
    options: ControllerOptions,
    last_refresh_ms: i64,
}

impl Controller {
    /// Restore persisted state and schedule the first cycle.
    pub fn new(
        store: Box<dyn KvStore>,
        page: Box<dyn FeedPage>,
        options: ControllerOptions,
        now_ms: i64,
    ) -> Self {
        let config = Config::load(store.as_ref());
        let quota = QuotaTracker::load(store.as_ref(), config.daily_limit, now_ms);
        let stats = Stats::load(store.as_ref());
        let activity = ActivityLog::load(store.as_ref(), config.log_level);
        let is_paused = read_typed::<bool>(store.as_ref(), PAUSED_KEY).unwrap_or(false);
        let last_refresh_ms = read_typed::<i64>(store.as_ref(), LAST_REFRESH_KEY).unwrap_or(0);

        let next_scheduled_ms = now_ms
            .saturating_add(config.initial_delay as i64)
            .max(last_refresh_ms.saturating_add(secs_to_ms(config.duration)));
        let state = WorkflowState::new(
            is_paused,
            next_scheduled_ms,
            last_refresh_ms,
            options.max_retries,
        );
        let pacer = match options.jitter_seed {
            Some(seed) => Pacer::seeded(seed),
            None => Pacer::new(),
        };

        let mut controller = Self {
            config: Arc::new(config),
            state,
            quota,
            stats,
            activity,
            store,
            page,
            pacer,
            timers: TimerQueue::new(),
            rescan: Debouncer::new(RESCAN_DEBOUNCE_MS),
            cycle: None,
            next_cycle_id: 1,
            outbox: Vec::new(),
            options,
            last_refresh_ms,
        };
        write_logged(controller.store.as_mut(), NEXT_TIME_KEY, &next_scheduled_ms);
        controller.note(LogLevel::Info, "engine started", now_ms);
        controller
    }

    // ── accessors ────────────────────────────────────────────────────

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn page(&self) -> &dyn FeedPage {
        self.page.as_ref()
    }

    pub fn store(&self) -> &dyn KvStore {
        self.store.as_ref()
    }

    pub fn last_refresh_ms(&self) -> i64 {
        self.last_refresh_ms
    }

    /// Action tasks scheduled and not yet fired.
    pub fn pending_actions(&self) -> usize {
        self.timers
            .iter()
            .filter(|t| matches!(t, Timer::Action { .. }))
            .count()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    /// Earliest moment something is due, for the driver's sleep.
    pub fn next_wake(&mut self) -> Option<i64> {
        match (self.timers.next_due(), self.rescan.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn status(&mut self, now_ms: i64) -> StatusSnapshot {
        status::report(
            &self.state,
            &mut self.quota,
            &self.config,
            now_ms,
            self.store.as_mut(),
        )
    }

    // ── inputs ───────────────────────────────────────────────────────

    pub fn handle(&mut self, command: Command, now_ms: i64) {
        match command {
            Command::UpdateConfig { config } => self.reconfigure(*config, now_ms),
            Command::Pause => {
                if !self.state.is_paused {
                    self.apply(StateEvent::Paused);
                    self.rescan.cancel();
                    write_logged(self.store.as_mut(), PAUSED_KEY, &true);
                    self.note(LogLevel::Info, "paused", now_ms);
                }
            }
            Command::Resume => {
                if self.state.is_paused {
                    self.apply(StateEvent::Resumed);
                    write_logged(self.store.as_mut(), PAUSED_KEY, &false);
                    self.note(LogLevel::Info, "resumed", now_ms);
                }
            }
            Command::Test => {
                self.note(LogLevel::Info, "test run requested", now_ms);
                self.start_cycle(Admission::Forced, now_ms);
            }
            Command::Refresh => self.refresh(now_ms),
        }
    }

    /// The external once-per-second trigger. The cadence itself is governed
    /// by `duration`.
    pub fn on_periodic(&mut self, now_ms: i64) {
        self.quota.check_and_reset(now_ms, self.store.as_mut());
        if self.state.admits(Admission::Periodic, now_ms) {
            self.start_cycle(Admission::Periodic, now_ms);
        }
        self.advance(now_ms);
    }

    /// A scroll or mutation signal. Bursts collapse into one rescan.
    pub fn request_rescan(&mut self, now_ms: i64) {
        if self.state.is_paused {
            return;
        }
        self.rescan.trigger(now_ms);
    }

    /// Run everything due at or before `now_ms`, in due order.
    pub fn advance(&mut self, now_ms: i64) {
        let signals = self.page.poll_signals(now_ms);
        if !signals.is_empty() {
            tracing::trace!(count = signals.len(), "page signals");
            self.request_rescan(now_ms);
        }
        while let Some((due_ms, timer)) = self.timers.pop_due(now_ms) {
            self.fire(timer, due_ms);
        }
        if self.rescan.fire_due(now_ms) {
            self.rescan_pass(now_ms);
        }
    }

    // ── transitions ──────────────────────────────────────────────────

    fn apply(&mut self, event: StateEvent) {
        self.state = reduce(&self.state, &event);
    }

    fn note(&mut self, level: LogLevel, message: impl Into<String>, now_ms: i64) {
        let message = message.into();
        match level {
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
        if self.activity.push(level, message, now_ms) {
            self.activity.persist(self.store.as_mut());
        }
    }

    fn notify(&mut self, title: &str, body: String) {
        if self.config.enable_notifications {
            self.outbox.push(Notification {
                title: title.to_string(),
                body,
            });
        }
    }

    fn reconfigure(&mut self, config: Config, now_ms: i64) {
        let config = config.normalized();
        if let Err(e) = config.save(self.store.as_mut()) {
            tracing::warn!(error = %e, "failed to persist configuration");
        }
        self.quota.set_limit(config.daily_limit);
        self.activity.set_threshold(config.log_level);
        self.config = Arc::new(config);
        self.note(LogLevel::Info, "configuration updated", now_ms);
    }

    fn refresh(&mut self, now_ms: i64) {
        match self.page.reload() {
            Ok(()) => {
                self.last_refresh_ms = now_ms;
                write_logged(self.store.as_mut(), LAST_REFRESH_KEY, &now_ms);
                let settle_ms = secs_to_ms(self.config.refresh_delay);
                self.timers
                    .schedule(now_ms.saturating_add(settle_ms), Timer::RefreshSettled);
                self.note(LogLevel::Info, "page reloaded", now_ms);
            }
            Err(e) => self.note(LogLevel::Warn, format!("reload failed: {:#}", e), now_ms),
        }
    }

    fn start_cycle(&mut self, admission: Admission, now_ms: i64) -> bool {
        if !self.state.admits(admission, now_ms) {
            if admission == Admission::Forced {
                let why = if self.state.is_paused {
                    "paused"
                } else {
                    "a cycle is already running"
                };
                self.note(LogLevel::Info, format!("run refused: {}", why), now_ms);
            }
            return false;
        }

        self.apply(StateEvent::CycleAdmitted {
            admission,
            now_ms,
            cadence_ms: self.config.duration.saturating_mul(1000),
        });
        if admission == Admission::Periodic {
            self.last_refresh_ms = now_ms;
            write_logged(self.store.as_mut(), LAST_REFRESH_KEY, &now_ms);
            let next = self.state.next_scheduled_ms;
            write_logged(self.store.as_mut(), NEXT_TIME_KEY, &next);
        }

        let id = self.next_cycle_id;
        self.next_cycle_id += 1;
        self.cycle = Some(CycleBook::new(id, admission));

        if admission == Admission::Rescan {
            self.schedule_pass(now_ms);
        } else {
            self.rescan.cancel();
            self.navigate_or_scan(now_ms);
        }
        true
    }

    fn current_cycle(&self) -> Option<u64> {
        self.cycle.as_ref().map(|c| c.id)
    }

    fn navigate_or_scan(&mut self, now_ms: i64) {
        if self.page.is_feed_view() {
            self.scan_phase(now_ms);
        } else {
            self.navigate(now_ms);
        }
    }

    fn identity(&self) -> Option<String> {
        if !self.config.current_account.is_empty() {
            return Some(self.config.current_account.clone());
        }
        self.page.user_id().filter(|u| !u.is_empty())
    }

    fn navigate(&mut self, now_ms: i64) {
        let Some(cycle) = self.current_cycle() else { return };
        let settle_ms = self.options.navigation_settle_ms;
        self.apply(StateEvent::PhaseEntered {
            phase: Phase::Navigating,
            label: "switching to feed".to_string(),
            now_ms,
            estimate_secs: settle_ms as f64 / 1000.0,
        });

        let issued = if self.page.open_feed_tab() {
            Ok("feed tab")
        } else if let Some(uin) = self.identity() {
            let url = self.options.feed_url_template.replace("{uin}", &uin);
            self.page.navigate(&url).map(|_| "direct url")
        } else {
            self.page.reload().map(|_| "reload")
        };

        match issued {
            Ok(how) => {
                let message = format!("navigating to feed via {}", how);
                self.note(LogLevel::Info, message, now_ms);
                self.timers.schedule(now_ms + settle_ms, Timer::Scan { cycle });
            }
            Err(e) => self.attempt_failed(format!("navigation failed: {:#}", e), now_ms),
        }
    }

    fn attempt_failed(&mut self, reason: String, now_ms: i64) {
        let Some(cycle) = self.current_cycle() else { return };
        self.apply(StateEvent::AttemptFailed);
        if self.state.retries_exhausted() {
            self.stats.bump(Counter::Errors, self.store.as_mut());
            let attempts = self.state.retry_count;
            self.note(
                LogLevel::Error,
                format!("giving up after {} attempts: {}", attempts, reason),
                now_ms,
            );
            self.abort_cycle();
        } else {
            let (n, max) = (self.state.retry_count, self.state.max_retries);
            let message = format!("attempt {}/{} failed: {}", n, max, reason);
            self.note(LogLevel::Warn, message, now_ms);
            let due_ms = now_ms + self.options.retry_backoff_ms;
            self.timers.schedule(due_ms, Timer::Retry { cycle });
        }
    }

    fn abort_cycle(&mut self) {
        if let Some(book) = self.cycle.take() {
            if let Some(id) = book.completion {
                self.timers.cancel(id);
            }
        }
        self.apply(StateEvent::CycleAborted);
    }

    fn scan_phase(&mut self, now_ms: i64) {
        self.apply(StateEvent::PhaseEntered {
            phase: Phase::Scanning,
            label: "scanning feed".to_string(),
            now_ms,
            estimate_secs: 0.0,
        });
        let (count, step) = (self.config.scroll_count, self.config.scroll_step_percent);
        for _ in 0..count {
            if let Err(e) = self.page.scroll_by(step) {
                self.attempt_failed(format!("scroll failed: {:#}", e), now_ms);
                return;
            }
        }
        self.schedule_pass(now_ms);
    }

    /// Scan, filter and schedule whatever the current cycle has not
    /// scheduled yet. The first pass of a cycle publishes the estimate and
    /// ends the cycle when nothing qualifies; later passes only append.
    fn schedule_pass(&mut self, now_ms: i64) {
        let config = Arc::clone(&self.config);
        let mut decisions = filter::decide(scanner::scan(self.page.as_ref()), &config);
        if self.quota.is_exhausted() {
            filter::gate_on_quota(&mut decisions);
        }

        let Some(book) = self.cycle.as_mut() else { return };
        let mut accepted = Vec::new();
        let mut skipped = 0u64;
        for decision in decisions {
            let key = decision.candidate.key.clone();
            if book.scheduled.contains(&key) {
                continue;
            }
            if decision.verdict.is_accept() {
                book.scheduled.insert(key);
                accepted.push(decision.candidate);
            } else if book.skip_counted.insert(key) {
                skipped += 1;
                tracing::debug!(
                    owner = %decision.candidate.owner,
                    reason = decision.verdict.reason.map(|r| r.as_str()).unwrap_or(""),
                    "candidate rejected"
                );
            }
        }
        let first_pass = book.pacing_start_ms.is_none();
        let cycle = book.id;
        self.stats.add(Counter::Skips, skipped, self.store.as_mut());

        if first_pass {
            self.plan_first(cycle, accepted, skipped, now_ms, &config);
        } else if !accepted.is_empty() {
            self.plan_append(cycle, accepted, now_ms, &config);
        }
    }

    fn plan_first(
        &mut self,
        cycle: u64,
        accepted: Vec<CandidateItem>,
        skipped: u64,
        now_ms: i64,
        config: &Config,
    ) {
        let count = accepted.len();
        if count == 0 {
            self.note(
                LogLevel::Info,
                format!("nothing to act on (skipped {})", skipped),
                now_ms,
            );
            self.cycle = None;
            self.apply(StateEvent::CycleFinished);
            return;
        }

        let tasks = self.pacer.schedule(accepted, None, config);
        let estimate_secs = estimate_duration_secs(count, config);
        self.apply(StateEvent::PhaseEntered {
            phase: Phase::Pacing,
            label: format!("acting on {} posts", count),
            now_ms,
            estimate_secs,
        });
        let last_offset = self.enqueue(cycle, now_ms, tasks);
        if let Some(book) = self.cycle.as_mut() {
            book.pacing_start_ms = Some(now_ms);
            book.last_offset = last_offset;
        }
        self.reschedule_completion(now_ms);
        self.note(
            LogLevel::Info,
            format!(
                "scheduled {} actions, skipped {}, about {:.0}s",
                count, skipped, estimate_secs
            ),
            now_ms,
        );
    }

    fn plan_append(
        &mut self,
        cycle: u64,
        accepted: Vec<CandidateItem>,
        now_ms: i64,
        config: &Config,
    ) {
        let Some((start, last)) = self
            .cycle
            .as_ref()
            .and_then(|b| b.pacing_start_ms.map(|s| (s, b.last_offset.unwrap_or(0))))
        else {
            return;
        };
        let count = accepted.len();
        let elapsed = (now_ms - start).max(0) as u64;
        let tasks = self.pacer.schedule(accepted, Some(last.max(elapsed)), config);
        let last_offset = self.enqueue(cycle, start, tasks);
        if let Some(book) = self.cycle.as_mut() {
            book.last_offset = last_offset.or(book.last_offset);
        }
        self.reschedule_completion(start);

        let estimate_secs =
            self.state.task_duration_estimate + estimate_duration_secs(count, config) - 1.0;
        let label = format!("acting on newly loaded posts (+{})", count);
        let task_start_ms = self.state.task_start_ms;
        self.apply(StateEvent::PhaseEntered {
            phase: Phase::Pacing,
            label,
            now_ms: task_start_ms,
            estimate_secs,
        });
        self.note(
            LogLevel::Info,
            format!("rescan added {} actions", count),
            now_ms,
        );
    }

    /// Put tasks on the timer queue relative to `start_ms`. Returns the
    /// last offset enqueued.
    fn enqueue(&mut self, cycle: u64, start_ms: i64, tasks: Vec<ActionTask>) -> Option<u64> {
        let mut last = None;
        for task in tasks {
            last = Some(task.offset_ms);
            let due = start_ms.saturating_add(task.offset_ms as i64);
            self.timers.schedule(due, Timer::Action { cycle, task });
        }
        last
    }

    fn reschedule_completion(&mut self, start_ms: i64) {
        let Some(book) = self.cycle.as_mut() else { return };
        if let Some(id) = book.completion.take() {
            self.timers.cancel(id);
        }
        let last = book.last_offset.unwrap_or(0);
        let due = start_ms.saturating_add(last.saturating_add(COMPLETION_GRACE_MS) as i64);
        let id = self.timers.schedule(due, Timer::Complete { cycle: book.id });
        book.completion = Some(id);
    }

    fn rescan_pass(&mut self, now_ms: i64) {
        if self.state.is_paused {
            return;
        }
        if !self.state.is_running {
            self.start_cycle(Admission::Rescan, now_ms);
            return;
        }
        // While navigating or scanning the pending scan already covers it.
        if self.state.phase == Phase::Pacing {
            self.schedule_pass(now_ms);
        }
    }

    fn fire(&mut self, timer: Timer, due_ms: i64) {
        match timer {
            Timer::Scan { cycle } | Timer::Retry { cycle }
                if Some(cycle) != self.current_cycle() => {}
            Timer::Scan { .. } => {
                if self.state.is_paused {
                    self.note(LogLevel::Info, "cycle dropped while paused", due_ms);
                    self.abort_cycle();
                } else if !self.page.is_feed_view() {
                    self.attempt_failed("feed view not displayed".to_string(), due_ms);
                } else {
                    self.scan_phase(due_ms);
                }
            }
            Timer::Retry { .. } => {
                if self.state.is_paused {
                    self.note(LogLevel::Info, "cycle dropped while paused", due_ms);
                    self.abort_cycle();
                } else {
                    self.navigate_or_scan(due_ms);
                }
            }
            Timer::Action { cycle, task } => self.fire_action(cycle, task, due_ms),
            Timer::Verify { key } => match pacer::verify(self.page.as_ref(), &key) {
                Verification::Confirmed => self.note(
                    LogLevel::Info,
                    format!("action on {} confirmed", key),
                    due_ms,
                ),
                Verification::Unconfirmed => self.note(
                    LogLevel::Warn,
                    format!("acted state of {} did not update", key),
                    due_ms,
                ),
                Verification::Vanished => self.note(
                    LogLevel::Info,
                    format!("{} disappeared before verification", key),
                    due_ms,
                ),
            },
            Timer::Complete { cycle } => {
                if Some(cycle) == self.current_cycle() {
                    self.finish_cycle(due_ms);
                }
            }
            Timer::RefreshSettled => self.request_rescan(due_ms),
        }
    }

    fn fire_action(&mut self, cycle: u64, task: ActionTask, due_ms: i64) {
        let outcome = pacer::dispatch(
            &task,
            self.state.is_paused,
            self.page.as_mut(),
            &mut self.quota,
            self.store.as_mut(),
        );
        match outcome {
            Dispatch::Performed => {
                self.stats.bump(Counter::Likes, self.store.as_mut());
                if let Some(book) = self.cycle.as_mut().filter(|b| b.id == cycle) {
                    book.performed += 1;
                }
                self.timers.schedule(
                    due_ms.saturating_add(VERIFY_DELAY_MS),
                    Timer::Verify {
                        key: task.candidate.key.clone(),
                    },
                );
                tracing::debug!(
                    key = %task.candidate.key,
                    owner = %task.candidate.owner,
                    "action performed"
                );
            }
            Dispatch::Skipped(reason) => {
                self.stats.bump(Counter::Skips, self.store.as_mut());
                self.note(
                    LogLevel::Info,
                    format!("skipped {}: {}", task.candidate.owner, reason.as_str()),
                    due_ms,
                );
            }
        }
    }

    fn finish_cycle(&mut self, now_ms: i64) {
        let Some(book) = self.cycle.take() else { return };
        self.apply(StateEvent::CycleFinished);
        let kind = match book.admission {
            Admission::Periodic => "cycle",
            Admission::Forced => "test run",
            Admission::Rescan => "rescan",
        };
        self.note(
            LogLevel::Info,
            format!("{} complete: {} actions performed", kind, book.performed),
            now_ms,
        );
        let body = format!("Actions performed: {}", book.performed);
        self.notify("Cycle complete", body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::feed::simulated::SimulatedFeed;
    use crate::store::MemoryStore;

    const T0: i64 = 1_760_000_000_000;

    fn controller(config: Config) -> Controller {
        let mut store = MemoryStore::new();
        config.save(&mut store).unwrap();
        let sim = SimulationConfig {
            arrival_probability: 0.0,
            ignore_rate: 0.0,
            ..SimulationConfig::default()
        };
        Controller::new(
            Box::new(store),
            Box::new(SimulatedFeed::new(sim, 3)),
            ControllerOptions {
                jitter_seed: Some(1),
                ..ControllerOptions::default()
            },
            T0,
        )
    }

    #[test]
    fn test_startup_schedules_after_initial_delay() {
        let mut c = controller(Config::default());
        assert_eq!(c.state().next_scheduled_ms, T0 + 3000);
        assert_eq!(
            c.store().get(NEXT_TIME_KEY),
            Some(serde_json::json!(T0 + 3000))
        );
        assert_eq!(c.next_wake(), None);
        assert!(!c.state().is_paused);
    }

    #[test]
    fn test_rescan_requests_ignored_while_paused() {
        let mut c = controller(Config::default());
        c.handle(Command::Pause, T0);
        c.request_rescan(T0);
        assert_eq!(c.next_wake(), None);

        c.handle(Command::Resume, T0);
        c.request_rescan(T0);
        assert_eq!(c.next_wake(), Some(T0 + RESCAN_DEBOUNCE_MS));
    }

    #[test]
    fn test_forced_run_navigates_off_feed_page() {
        let mut c = controller(Config::default());
        c.handle(Command::Test, T0);
        assert_eq!(c.state().phase, Phase::Navigating);
        assert!(c.state().is_running);
        assert_eq!(c.next_wake(), Some(T0 + 5000));

        c.advance(T0 + 5000);
        assert_eq!(c.state().phase, Phase::Pacing);
        assert!(c.pending_actions() > 0);
    }

    #[test]
    fn test_reconfigure_normalizes_and_persists() {
        let mut c = controller(Config::default());
        let update = Config {
            random_delay_min: 4.0,
            random_delay_max: 2.0,
            daily_limit: 5,
            ..Config::default()
        };
        c.handle(
            Command::UpdateConfig {
                config: Box::new(update),
            },
            T0,
        );
        assert_eq!(c.config().random_delay_min, 2.0);
        assert_eq!(c.config().random_delay_max, 4.0);
        assert_eq!(c.quota().daily_limit(), 5);
        assert_eq!(Config::load(c.store()).daily_limit, 5);
    }

    #[test]
    fn test_extreme_config_values_keep_running() {
        let mut c = controller(Config::default());
        let update: Command = serde_json::from_str(
            r#"{"action":"updateConfig",
                "config":{"duration":100000000000000000,"likeDelay":1e300}}"#,
        )
        .unwrap();
        c.handle(update, T0);
        assert_eq!(c.config().duration, crate::config::MAX_DURATION_SECS);

        c.on_periodic(T0 + 3000);
        assert!(c.state().is_running);
        c.advance(T0 + 8000);
        assert!(c.pending_actions() > 0);
        let next = c.next_wake().unwrap();
        assert!(next > T0 + 8000 && next < T0 + 24 * 3600 * 1000);
    }

    #[test]
    fn test_resume_lets_later_actions_run() {
        let mut c = controller(Config {
            random_delay_min: 0.0,
            random_delay_max: 0.0,
            ..Config::default()
        });
        c.handle(Command::Test, T0);
        c.advance(T0 + 5000);
        assert_eq!(c.stats().likes, 1);

        c.handle(Command::Pause, T0 + 6000);
        c.advance(T0 + 10_000);
        assert_eq!(c.stats().likes, 1);
        assert!(c.stats().skips >= 1);

        c.handle(Command::Resume, T0 + 11_000);
        c.advance(T0 + 15_000);
        assert_eq!(c.stats().likes, 2);
    }
}

use super::quota::QuotaTracker;
use super::workflow::{Phase, WorkflowState};
use crate::config::Config;
use crate::store::KvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    Busy,
    Paused,
}

impl Activity {
    pub fn as_str(self) -> &'static str {
        match self {
            Activity::Idle => "idle",
            Activity::Busy => "busy",
            Activity::Paused => "paused",
        }
    }
}

/// Display snapshot derived from engine state, recomputed every second.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusSnapshot {
    pub activity: Activity,
    pub phase: Phase,
    /// Seconds until the next cycle is due.
    pub remaining_secs: u64,
    pub current_task: String,
    pub task_remaining_secs: u64,
    /// Pacer progress, present while an estimate is published.
    pub progress_percent: Option<u8>,
    /// (retry count, max retries) once a retry has happened.
    pub retry: Option<(u32, u32)>,
    /// (used, limit) when a daily limit is set.
    pub daily: Option<(u32, u32)>,
    pub last_cycle_ms: i64,
    pub duration_secs: u64,
    pub like_delay_secs: f64,
}

fn ceil_secs(ms: i64) -> u64 {
    if ms <= 0 {
        0
    } else {
        ((ms + 999) / 1000) as u64
    }
}

/// Build the snapshot. The only write is the quota's lazy day rollover.
pub fn report(
    state: &WorkflowState,
    quota: &mut QuotaTracker,
    config: &Config,
    now_ms: i64,
    store: &mut dyn KvStore,
) -> StatusSnapshot {
    quota.check_and_reset(now_ms, store);

    let activity = if state.is_paused {
        Activity::Paused
    } else if state.is_running {
        Activity::Busy
    } else {
        Activity::Idle
    };

    let (task_remaining_secs, progress_percent) = if state.task_duration_estimate > 0.0 {
        let end_ms = state.task_start_ms + (state.task_duration_estimate * 1000.0) as i64;
        let remaining = ceil_secs(end_ms - now_ms);
        let ratio = 1.0 - remaining as f64 / state.task_duration_estimate;
        let percent = (ratio * 100.0).round().clamp(0.0, 100.0) as u8;
        (remaining, Some(percent))
    } else {
        (0, None)
    };

    StatusSnapshot {
        activity,
        phase: state.phase,
        remaining_secs: ceil_secs(state.next_scheduled_ms - now_ms),
        current_task: state.current_task.clone(),
        task_remaining_secs,
        progress_percent,
        retry: (state.retry_count > 0).then_some((state.retry_count, state.max_retries)),
        daily: (quota.daily_limit() > 0).then(|| (quota.daily_count(), quota.daily_limit())),
        last_cycle_ms: state.last_cycle_ms,
        duration_secs: config.duration,
        like_delay_secs: config.like_delay,
    }
}

impl StatusSnapshot {
    /// Single-line rendering for headless mode.
    pub fn render_line(&self) -> String {
        let mut parts = vec![
            format!("[{}]", self.activity.as_str()),
            format!("next in {}s", self.remaining_secs),
        ];
        if !self.current_task.is_empty() {
            parts.push(format!("task: {}", self.current_task));
        }
        if let Some(p) = self.progress_percent {
            if self.task_remaining_secs > 0 {
                parts.push(format!("progress {}%", p));
            }
        }
        if let Some((n, max)) = self.retry {
            parts.push(format!("retry {}/{}", n, max));
        }
        if let Some((used, limit)) = self.daily {
            parts.push(format!("today {}/{}", used, limit));
        }
        parts.push(format!(
            "interval {}s, delay {}s",
            self.duration_secs, self.like_delay_secs
        ));
        parts.join(" | ")
    }
}

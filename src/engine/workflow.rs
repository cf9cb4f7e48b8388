//! Workflow state record and its transitions.
//!
//! Every change to [`WorkflowState`] goes through [`reduce`], which builds
//! the next state from the current one in a single step. Readers never see
//! a half-applied transition.

use crate::config::Config;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Trying to reach the feed view before scanning.
    Navigating,
    Scanning,
    /// Tasks scheduled, waiting for the cycle to complete.
    Pacing,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Navigating => "navigating",
            Phase::Scanning => "scanning",
            Phase::Pacing => "pacing",
        }
    }
}

/// Control commands from the collaborator surface. Wire tags are
/// case-sensitive: `updateConfig`, `pause`, `resume`, `test`, `refresh`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    UpdateConfig { config: Box<Config> },
    Pause,
    Resume,
    Test,
    Refresh,
}

/// Why a cycle was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The cadence came due.
    Periodic,
    /// Forced run that bypasses the cadence.
    Forced,
    /// Debounced page activity while no cycle was running.
    Rescan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub phase: Phase,
    pub is_paused: bool,
    pub is_running: bool,
    pub current_task: String,
    pub task_start_ms: i64,
    /// Seconds; 0 when no estimate is published.
    pub task_duration_estimate: f64,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_scheduled_ms: i64,
    pub last_cycle_ms: i64,
}

impl WorkflowState {
    pub fn new(
        is_paused: bool,
        next_scheduled_ms: i64,
        last_cycle_ms: i64,
        max_retries: u32,
    ) -> Self {
        Self {
            phase: Phase::Idle,
            is_paused,
            is_running: false,
            current_task: String::new(),
            task_start_ms: 0,
            task_duration_estimate: 0.0,
            retry_count: 0,
            max_retries,
            next_scheduled_ms,
            last_cycle_ms,
        }
    }

    /// Whether a new top-level cycle may start now.
    pub fn admits(&self, admission: Admission, now_ms: i64) -> bool {
        if self.is_paused || self.is_running {
            return false;
        }
        match admission {
            Admission::Periodic => now_ms >= self.next_scheduled_ms,
            Admission::Forced | Admission::Rescan => true,
        }
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    Paused,
    Resumed,
    CycleAdmitted {
        admission: Admission,
        now_ms: i64,
        cadence_ms: u64,
    },
    PhaseEntered {
        phase: Phase,
        label: String,
        now_ms: i64,
        estimate_secs: f64,
    },
    AttemptFailed,
    CycleFinished,
    /// A cycle ended without completing its work.
    CycleAborted,
}

pub fn reduce(state: &WorkflowState, event: &StateEvent) -> WorkflowState {
    let mut next = state.clone();
    match event {
        StateEvent::Paused => next.is_paused = true,
        StateEvent::Resumed => next.is_paused = false,
        StateEvent::CycleAdmitted {
            admission,
            now_ms,
            cadence_ms,
        } => {
            next.is_running = true;
            next.retry_count = 0;
            if *admission == Admission::Periodic {
                next.last_cycle_ms = *now_ms;
                next.next_scheduled_ms = now_ms.saturating_add(*cadence_ms as i64);
            }
        }
        StateEvent::PhaseEntered {
            phase,
            label,
            now_ms,
            estimate_secs,
        } => {
            next.phase = *phase;
            next.current_task = label.clone();
            next.task_start_ms = *now_ms;
            next.task_duration_estimate = *estimate_secs;
        }
        StateEvent::AttemptFailed => next.retry_count = next.retry_count.saturating_add(1),
        StateEvent::CycleFinished | StateEvent::CycleAborted => {
            next.phase = Phase::Idle;
            next.is_running = false;
            next.current_task.clear();
            next.task_duration_estimate = 0.0;
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle(next: i64) -> WorkflowState {
        WorkflowState::new(false, next, 0, DEFAULT_MAX_RETRIES)
    }

    #[test]
    fn test_periodic_admission_waits_for_cadence() {
        let s = idle(10_000);
        assert!(!s.admits(Admission::Periodic, 9_999));
        assert!(s.admits(Admission::Periodic, 10_000));
        assert!(s.admits(Admission::Forced, 0));
    }

    #[test]
    fn test_running_or_paused_blocks_admission() {
        let running = reduce(
            &idle(0),
            &StateEvent::CycleAdmitted {
                admission: Admission::Forced,
                now_ms: 0,
                cadence_ms: 1000,
            },
        );
        assert!(!running.admits(Admission::Forced, 0));
        assert!(!running.admits(Admission::Rescan, 0));

        let paused = reduce(&idle(0), &StateEvent::Paused);
        assert!(!paused.admits(Admission::Periodic, 1));
        assert!(reduce(&paused, &StateEvent::Resumed).admits(Admission::Periodic, 1));
    }

    #[test]
    fn test_periodic_admission_moves_cadence() {
        let s = reduce(
            &idle(5_000),
            &StateEvent::CycleAdmitted {
                admission: Admission::Periodic,
                now_ms: 6_000,
                cadence_ms: 180_000,
            },
        );
        assert!(s.is_running);
        assert_eq!(s.last_cycle_ms, 6_000);
        assert_eq!(s.next_scheduled_ms, 186_000);
    }

    #[test]
    fn test_forced_admission_keeps_cadence() {
        let s = reduce(
            &idle(5_000),
            &StateEvent::CycleAdmitted {
                admission: Admission::Forced,
                now_ms: 1_000,
                cadence_ms: 180_000,
            },
        );
        assert_eq!(s.next_scheduled_ms, 5_000);
        assert_eq!(s.last_cycle_ms, 0);
    }

    #[test]
    fn test_retry_count_resets_on_next_admission() {
        let mut s = idle(0);
        for _ in 0..3 {
            s = reduce(&s, &StateEvent::AttemptFailed);
        }
        assert!(s.retries_exhausted());
        s = reduce(&s, &StateEvent::CycleAborted);
        assert_eq!(s.retry_count, 3);
        s = reduce(
            &s,
            &StateEvent::CycleAdmitted {
                admission: Admission::Periodic,
                now_ms: 1,
                cadence_ms: 1,
            },
        );
        assert_eq!(s.retry_count, 0);
    }

    #[test]
    fn test_finish_clears_task_and_releases() {
        let s = reduce(
            &idle(0),
            &StateEvent::PhaseEntered {
                phase: Phase::Pacing,
                label: "pacing 3 actions".into(),
                now_ms: 100,
                estimate_secs: 16.0,
            },
        );
        let done = reduce(&s, &StateEvent::CycleFinished);
        assert_eq!(done.phase, Phase::Idle);
        assert!(done.current_task.is_empty());
        assert_eq!(done.task_duration_estimate, 0.0);
        assert!(!done.is_running);
    }

    #[test]
    fn test_command_wire_tags() {
        let pause: Command = serde_json::from_str(r#"{"action":"pause"}"#).unwrap();
        assert_eq!(pause, Command::Pause);
        let update: Command =
            serde_json::from_str(r#"{"action":"updateConfig","config":{"dailyLimit":7}}"#).unwrap();
        match update {
            Command::UpdateConfig { config } => assert_eq!(config.daily_limit, 7),
            other => panic!("unexpected {:?}", other),
        }
        assert!(serde_json::from_str::<Command>(r#"{"action":"Pause"}"#).is_err());
    }
}

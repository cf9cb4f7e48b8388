use crate::engine::activity::LogEntry;
use crate::engine::{Stats, StatusSnapshot};
use std::collections::VecDeque;
use std::time::Instant;

/// Log lines kept for display; the full log stays in the engine.
pub const DISPLAY_LOG_LINES: usize = 200;

/// Everything the terminal needs for one frame, published by the runtime.
#[derive(Debug, Clone)]
pub struct AppState {
    pub status: StatusSnapshot,
    pub stats: Stats,
    pub logs: VecDeque<LogEntry>,
    pub source: String,
    pub start_time: Instant,
    pub log_focus: bool,
    pub log_scroll_offset: usize,
}

impl AppState {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            status: StatusSnapshot::default(),
            stats: Stats::default(),
            logs: VecDeque::with_capacity(DISPLAY_LOG_LINES),
            source: source.into(),
            start_time: Instant::now(),
            log_focus: false,
            log_scroll_offset: 0,
        }
    }

    /// Replace the displayed tail with the newest entries of `entries`.
    pub fn set_logs<'a>(&mut self, entries: impl DoubleEndedIterator<Item = &'a LogEntry>) {
        let mut tail: Vec<&LogEntry> = entries.rev().take(DISPLAY_LOG_LINES).collect();
        tail.reverse();
        self.logs.clear();
        self.logs.extend(tail.into_iter().cloned());
    }

    pub fn uptime(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        format!("{}h {:02}m", h, m)
    }
}

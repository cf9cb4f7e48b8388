use crate::config::LogLevel;
use crate::store::{read_typed, write_logged, KvStore};
use chrono::{Local, TimeZone};
use std::collections::VecDeque;

pub const LOGS_KEY: &str = "logs";
pub const MAX_LOG_ENTRIES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// `[YYYY-MM-DD HH:MM:SS] [LEVEL] message`
    pub fn render(&self) -> String {
        format!(
            "[{}] [{}] {}",
            self.timestamp,
            self.level.as_str(),
            self.message
        )
    }

    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('[')?;
        let (timestamp, rest) = rest.split_once("] [")?;
        let (level, message) = rest.split_once("] ")?;
        let level = match level {
            "INFO" => LogLevel::Info,
            "WARN" => LogLevel::Warn,
            "ERROR" => LogLevel::Error,
            _ => return None,
        };
        Some(Self {
            timestamp: timestamp.to_string(),
            level,
            message: message.to_string(),
        })
    }
}

fn format_timestamp(now_ms: i64) -> String {
    Local
        .timestamp_millis_opt(now_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

/// User-facing activity log: bounded, oldest evicted first, level-gated.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    threshold: LogLevel,
}

impl ActivityLog {
    pub fn new(threshold: LogLevel) -> Self {
        Self {
            entries: VecDeque::with_capacity(MAX_LOG_ENTRIES),
            threshold,
        }
    }

    pub fn load(store: &dyn KvStore, threshold: LogLevel) -> Self {
        let mut log = Self::new(threshold);
        let lines = read_typed::<Vec<String>>(store, LOGS_KEY).unwrap_or_default();
        for line in lines {
            if let Some(entry) = LogEntry::parse(&line) {
                log.append(entry);
            }
        }
        log
    }

    pub fn set_threshold(&mut self, threshold: LogLevel) {
        self.threshold = threshold;
    }

    fn append(&mut self, entry: LogEntry) {
        if self.entries.len() >= MAX_LOG_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Append unless `level` is below the threshold. Returns whether the
    /// entry was kept.
    pub fn push(&mut self, level: LogLevel, message: impl Into<String>, now_ms: i64) -> bool {
        if level < self.threshold {
            return false;
        }
        self.append(LogEntry {
            timestamp: format_timestamp(now_ms),
            level,
            message: message.into(),
        });
        true
    }

    pub fn persist(&self, store: &mut dyn KvStore) {
        let lines: Vec<String> = self.entries.iter().map(LogEntry::render).collect();
        write_logged(store, LOGS_KEY, &lines);
    }

    pub fn entries(&self) -> &VecDeque<LogEntry> {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose rendered line contains `needle`.
    pub fn search<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = &'a LogEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.render().contains(needle))
    }
}

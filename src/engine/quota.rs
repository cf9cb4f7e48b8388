use crate::store::{read_typed, write_logged, KvStore};
use chrono::{Local, TimeZone};

pub const DAILY_COUNT_KEY: &str = "dailyCount";
pub const LAST_RESET_KEY: &str = "lastDailyReset";

const DAY_MS: i64 = 86_400_000;

/// Epoch milliseconds of local midnight on the day containing `now_ms`.
pub fn start_of_day_ms(now_ms: i64) -> i64 {
    let fallback = now_ms - now_ms.rem_euclid(DAY_MS);
    let Some(now) = Local.timestamp_millis_opt(now_ms).single() else {
        return fallback;
    };
    let Some(midnight) = now.date_naive().and_hms_opt(0, 0, 0) else {
        return fallback;
    };
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(fallback)
}

/// Daily action counter with calendar-day reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaTracker {
    daily_count: u32,
    daily_limit: u32,
    last_reset_ms: i64,
}

impl QuotaTracker {
    pub fn new(daily_limit: u32, daily_count: u32, last_reset_ms: i64) -> Self {
        Self {
            daily_count,
            daily_limit,
            last_reset_ms,
        }
    }

    /// Restore from the store. A missing reset boundary is taken as today.
    pub fn load(store: &dyn KvStore, daily_limit: u32, now_ms: i64) -> Self {
        let daily_count = read_typed::<u32>(store, DAILY_COUNT_KEY).unwrap_or(0);
        let last_reset_ms =
            read_typed::<i64>(store, LAST_RESET_KEY).unwrap_or_else(|| start_of_day_ms(now_ms));
        Self::new(daily_limit, daily_count, last_reset_ms)
    }

    pub fn set_limit(&mut self, daily_limit: u32) {
        self.daily_limit = daily_limit;
    }

    /// Zero the counter the first time a check observes a new calendar day.
    /// Returns true when a reset happened.
    pub fn check_and_reset(&mut self, now_ms: i64, store: &mut dyn KvStore) -> bool {
        let today = start_of_day_ms(now_ms);
        if self.last_reset_ms >= today {
            return false;
        }
        self.daily_count = 0;
        self.last_reset_ms = today;
        write_logged(store, DAILY_COUNT_KEY, &self.daily_count);
        write_logged(store, LAST_RESET_KEY, &self.last_reset_ms);
        true
    }

    pub fn is_exhausted(&self) -> bool {
        self.daily_limit > 0 && self.daily_count >= self.daily_limit
    }

    /// Count one executed action. Refuses without mutating when the cap is hit.
    pub fn try_consume(&mut self, store: &mut dyn KvStore) -> bool {
        if self.is_exhausted() {
            return false;
        }
        self.daily_count = self.daily_count.saturating_add(1);
        write_logged(store, DAILY_COUNT_KEY, &self.daily_count);
        true
    }

    pub fn daily_count(&self) -> u32 {
        self.daily_count
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    pub fn last_reset_ms(&self) -> i64 {
        self.last_reset_ms
    }
}

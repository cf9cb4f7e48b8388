use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

use crate::store::KvStore;

pub const DEFAULT_APP_CONFIG_FILE: &str = "feed-pacer.toml";
pub const DEFAULT_FEED_URL_TEMPLATE: &str = "https://user.qzone.qq.com/{uin}/infocenter";

/// Keyword filter mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Reject content containing any keyword.
    #[default]
    Block,
    /// Reject content containing none of the keywords.
    Allow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Engine tunables. One instance is an immutable snapshot: the controller
/// swaps the whole value on reconfigure and never edits fields in place.
///
/// Keys are persisted flat in the store under their camelCase names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Seconds between top-level cycles.
    pub duration: u64,
    /// Seconds to wait after a page reload before rescanning.
    pub refresh_delay: u64,
    /// Base seconds between two actions.
    pub like_delay: f64,
    pub scroll_count: u32,
    pub blocked: Vec<String>,
    pub white_list: Vec<String>,
    /// Group name -> member identities. Every listed group is blocked.
    pub block_groups: BTreeMap<String, Vec<String>>,
    pub filter_keywords: Vec<String>,
    pub filter_mode: FilterMode,
    /// 0 disables the daily cap.
    pub daily_limit: u32,
    pub select: bool,
    pub status_opacity: f64,
    pub status_bg_color: String,
    pub menu_opacity: f64,
    pub menu_bg_color: String,
    pub scroll_step_percent: f64,
    /// Milliseconds before the first cycle after startup.
    pub initial_delay: u64,
    pub status_text_color: String,
    pub status_text_brightness: f64,
    pub dark_mode_auto: bool,
    pub log_level: LogLevel,
    pub theme: String,
    pub random_delay_min: f64,
    pub random_delay_max: f64,
    pub enable_notifications: bool,
    pub accounts: BTreeMap<String, bool>,
    pub current_account: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duration: 180,
            refresh_delay: 10,
            like_delay: 5.0,
            scroll_count: 3,
            blocked: Vec::new(),
            white_list: Vec::new(),
            block_groups: BTreeMap::new(),
            filter_keywords: Vec::new(),
            filter_mode: FilterMode::Block,
            daily_limit: 0,
            select: false,
            status_opacity: 0.8,
            status_bg_color: "linear-gradient(to right, #333, #222)".to_string(),
            menu_opacity: 0.9,
            menu_bg_color: "linear-gradient(to bottom, #ffffff, #f0f0f0)".to_string(),
            scroll_step_percent: 0.9,
            initial_delay: 3000,
            status_text_color: "#ddd".to_string(),
            status_text_brightness: 1.0,
            dark_mode_auto: false,
            log_level: LogLevel::Info,
            theme: "default".to_string(),
            random_delay_min: 1.0,
            random_delay_max: 3.0,
            enable_notifications: false,
            accounts: BTreeMap::new(),
            current_account: String::new(),
        }
    }
}

impl Config {
    /// Names of every persisted configuration key.
    pub fn keys() -> Vec<String> {
        match serde_json::to_value(Config::default()) {
            Ok(Value::Object(map)) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Build a config from a flat key/value map. Missing keys take their
    /// defaults; keys whose value does not fit the field are reported back
    /// and also take their defaults. Unknown keys are ignored.
    pub fn from_map(map: &Map<String, Value>) -> (Self, Vec<String>) {
        let Ok(Value::Object(mut merged)) = serde_json::to_value(Config::default()) else {
            return (Config::default(), Vec::new());
        };
        let mut rejected = Vec::new();

        for key in Config::keys() {
            let Some(value) = map.get(&key) else { continue };
            let mut trial = merged.clone();
            trial.insert(key.clone(), value.clone());
            if serde_json::from_value::<Config>(Value::Object(trial)).is_ok() {
                merged.insert(key, value.clone());
            } else {
                rejected.push(key);
            }
        }

        let config = serde_json::from_value::<Config>(Value::Object(merged)).unwrap_or_default();
        (config.normalized(), rejected)
    }

    /// Read every configuration key from the store.
    pub fn load(store: &dyn KvStore) -> Self {
        let mut map = Map::new();
        for key in Config::keys() {
            if let Some(value) = store.get(&key) {
                map.insert(key, value);
            }
        }
        let (config, rejected) = Config::from_map(&map);
        for key in rejected {
            tracing::warn!(key = %key, "malformed stored config value, using default");
        }
        config
    }

    /// Write every configuration key to the store.
    pub fn save(&self, store: &mut dyn KvStore) -> Result<()> {
        let Value::Object(map) = serde_json::to_value(self)? else {
            anyhow::bail!("config did not serialize to an object");
        };
        for (key, value) in map {
            store.set(&key, value)?;
        }
        Ok(())
    }

    /// Parse an exported JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).context("config document is not valid JSON")?;
        let Value::Object(map) = value else {
            anyhow::bail!("config document must be a JSON object");
        };
        let (config, rejected) = Config::from_map(&map);
        for key in rejected {
            tracing::warn!(key = %key, "ignoring malformed config value in document");
        }
        Ok(config)
    }

    /// The full configuration as a JSON document.
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize config")
    }

    /// Clamp values into usable ranges.
    pub fn normalized(mut self) -> Self {
        self.like_delay = bounded_secs(self.like_delay);
        self.random_delay_min = bounded_secs(self.random_delay_min);
        self.random_delay_max = bounded_secs(self.random_delay_max);
        if self.random_delay_max < self.random_delay_min {
            std::mem::swap(&mut self.random_delay_min, &mut self.random_delay_max);
        }
        if !(self.scroll_step_percent > 0.0 && self.scroll_step_percent <= 1.0) {
            self.scroll_step_percent = 0.9;
        }
        self.duration = self.duration.clamp(1, MAX_DURATION_SECS);
        self.refresh_delay = self.refresh_delay.min(MAX_DELAY_SECS);
        self.initial_delay = self.initial_delay.min(MAX_INITIAL_DELAY_MS);
        self.filter_keywords = self
            .filter_keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        self
    }

    /// Width of the jitter window in seconds.
    pub fn jitter_span(&self) -> f64 {
        (self.random_delay_max - self.random_delay_min).max(0.0)
    }
}

/// Longest cycle cadence: one week.
pub const MAX_DURATION_SECS: u64 = 7 * 24 * 3600;
/// Ceiling for the per-action and post-reload delays.
pub const MAX_DELAY_SECS: u64 = 3600;
pub const MAX_INITIAL_DELAY_MS: u64 = 24 * 3600 * 1000;

fn bounded_secs(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v.min(MAX_DELAY_SECS as f64)
    } else {
        0.0
    }
}

// ── Process configuration (TOML) ─────────────────────────────────────

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "feed-pacer-state.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageSource {
    #[default]
    Simulated,
    Html,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PageConfig {
    #[serde(default)]
    pub source: PageSource,
    pub html_path: Option<String>,
    #[serde(default = "default_feed_url_template")]
    pub feed_url_template: String,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_feed_url_template() -> String {
    DEFAULT_FEED_URL_TEMPLATE.to_string()
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            source: PageSource::Simulated,
            html_path: None,
            feed_url_template: default_feed_url_template(),
            simulation: SimulationConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    #[serde(default = "default_seed_posts")]
    pub seed_posts: usize,
    /// Chance per second that a new post arrives at the top of the feed.
    #[serde(default = "default_arrival_probability")]
    pub arrival_probability: f64,
    /// Fraction of clicks the page silently ignores.
    #[serde(default = "default_ignore_rate")]
    pub ignore_rate: f64,
}

fn default_seed_posts() -> usize { 8 }
fn default_arrival_probability() -> f64 { 0.05 }
fn default_ignore_rate() -> f64 { 0.1 }

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed_posts: default_seed_posts(),
            arrival_probability: default_arrival_probability(),
            ignore_rate: default_ignore_rate(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_file")]
    pub file: String,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_file() -> String {
    "feed-pacer.log".to_string()
}

fn default_log_filter() -> String {
    "feed_pacer=info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
            filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse config TOML")?;
        Ok(config)
    }

    /// Like [`AppConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

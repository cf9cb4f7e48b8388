pub mod html;
pub mod scanner;
pub mod simulated;
pub mod types;

use anyhow::Result;
use types::{DomSnapshot, PageSignal};

/// The live, externally-mutating document the engine reads and clicks.
///
/// Nothing observed through this trait stays valid: an element seen in one
/// snapshot may be gone or changed by the next call.
pub trait FeedPage: Send {
    /// Current rendering of the feed.
    fn snapshot(&self) -> DomSnapshot;

    /// Whether the feed view is displayed.
    fn is_feed_view(&self) -> bool {
        !self.snapshot().controls.is_empty()
    }

    /// Click the in-page feed tab. Returns false when no such control exists.
    fn open_feed_tab(&mut self) -> bool;

    fn navigate(&mut self, url: &str) -> Result<()>;

    fn reload(&mut self) -> Result<()>;

    /// Scroll down by a fraction of the viewport height.
    fn scroll_by(&mut self, fraction: f64) -> Result<()>;

    /// Live acted state of a control, or `None` when it no longer exists.
    fn control_state(&self, key: &str) -> Option<bool>;

    /// Click a control. The page may ignore the click without reporting it.
    fn activate(&mut self, key: &str) -> Result<()>;

    /// Identity of the logged-in user, if the page exposes it.
    fn user_id(&self) -> Option<String>;

    /// Drain activity observed since the last call.
    fn poll_signals(&mut self, now_ms: i64) -> Vec<PageSignal>;
}

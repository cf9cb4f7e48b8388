//! Normalized feed types used by the engine (page-agnostic).

/// One feed entry eligible for the automated action. Re-derived on every
/// scan and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    /// Stable key of the entry's interactive control on the page.
    pub key: String,
    /// Owner handle.
    pub owner: String,
    /// Group the owner belongs to, when the page reports one.
    pub group: Option<String>,
    pub content: String,
    /// Acted state as observed at scan time.
    pub already_acted: bool,
    /// Position in document order.
    pub position: usize,
}

/// The interactive control of one feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlNode {
    pub key: String,
    pub acted: bool,
}

/// Raw, index-aligned element lists as a page renders them. The lists are
/// not guaranteed to be the same length while the page is loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomSnapshot {
    pub controls: Vec<ControlNode>,
    pub contents: Vec<String>,
    /// Raw owner link attributes, e.g. `nameCard_10001`.
    pub owner_links: Vec<Option<String>>,
    pub groups: Vec<Option<String>>,
}

/// Asynchronous page activity that warrants a rescan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSignal {
    Scroll,
    Mutation,
}

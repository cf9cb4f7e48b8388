//! Feed page backed by an HTML snapshot on disk.
//!
//! The file is re-read on every reload, so an external process can keep
//! rewriting it. Clicks cannot be written back to a file; they are kept in
//! an overlay keyed by control key and merged into every snapshot.

use super::types::{ControlNode, DomSnapshot, PageSignal};
use super::FeedPage;
use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const CONTROL_SELECTOR: &str = ".qz_like_btn_v3";
const CONTENT_SELECTOR: &str = ".f-info";
const OWNER_SELECTOR: &str = ".f-name";
const FEED_TAB_SELECTOR: &str =
    "#tab_menu_friend, li[type=\"friend\"] a, .feed-control-tab a:not(.item-on)";
const ACTED_CLASS: &str = "item-on";
const OWNER_ATTR: &str = "link";
const GROUP_ATTR: &str = "data-group";
const KEY_ATTR: &str = "data-id";
const USER_SELECTOR: &str = "body[data-uin]";
const USER_ATTR: &str = "data-uin";

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(css, error = ?e, "invalid selector");
            None
        }
    }
}

fn select_all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => doc.select(&sel).collect(),
        None => Vec::new(),
    }
}

/// Parse the feed lists out of an HTML document.
pub fn parse_document(source: &str) -> DomSnapshot {
    let doc = Html::parse_document(source);

    let controls = select_all(&doc, CONTROL_SELECTOR)
        .into_iter()
        .enumerate()
        .map(|(i, el)| ControlNode {
            key: el
                .value()
                .attr(KEY_ATTR)
                .map(str::to_string)
                .unwrap_or_else(|| format!("control-{}", i)),
            acted: el.value().classes().any(|c| c == ACTED_CLASS),
        })
        .collect();

    let contents = select_all(&doc, CONTENT_SELECTOR)
        .into_iter()
        .map(|el| el.text().collect::<String>())
        .collect();

    let owners = select_all(&doc, OWNER_SELECTOR);
    let owner_links = owners
        .iter()
        .map(|el| el.value().attr(OWNER_ATTR).map(str::to_string))
        .collect();
    let groups = owners
        .iter()
        .map(|el| el.value().attr(GROUP_ATTR).map(str::to_string))
        .collect();

    DomSnapshot {
        controls,
        contents,
        owner_links,
        groups,
    }
}

pub struct HtmlFeedPage {
    path: PathBuf,
    source: String,
    clicked: HashSet<String>,
    pending: Vec<PageSignal>,
}

impl HtmlFeedPage {
    pub fn open(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read HTML snapshot: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            source,
            clicked: HashSet::new(),
            pending: Vec::new(),
        })
    }

    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            path: PathBuf::new(),
            source: source.into(),
            clicked: HashSet::new(),
            pending: Vec::new(),
        }
    }
}

impl FeedPage for HtmlFeedPage {
    fn snapshot(&self) -> DomSnapshot {
        let mut snapshot = parse_document(&self.source);
        for control in &mut snapshot.controls {
            if self.clicked.contains(&control.key) {
                control.acted = true;
            }
        }
        snapshot
    }

    fn open_feed_tab(&mut self) -> bool {
        let doc = Html::parse_document(&self.source);
        !select_all(&doc, FEED_TAB_SELECTOR).is_empty()
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        tracing::info!(url, "snapshot page cannot navigate, reloading instead");
        self.reload()
    }

    fn reload(&mut self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        let source = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to reload HTML snapshot: {}", self.path.display()))?;
        if source != self.source {
            self.source = source;
            self.pending.push(PageSignal::Mutation);
        }
        Ok(())
    }

    fn scroll_by(&mut self, _fraction: f64) -> Result<()> {
        self.pending.push(PageSignal::Scroll);
        Ok(())
    }

    fn control_state(&self, key: &str) -> Option<bool> {
        self.snapshot()
            .controls
            .into_iter()
            .find(|c| c.key == key)
            .map(|c| c.acted)
    }

    fn activate(&mut self, key: &str) -> Result<()> {
        if self.control_state(key).is_none() {
            anyhow::bail!("control {} is gone", key);
        }
        self.clicked.insert(key.to_string());
        Ok(())
    }

    fn user_id(&self) -> Option<String> {
        let doc = Html::parse_document(&self.source);
        select_all(&doc, USER_SELECTOR)
            .first()
            .and_then(|el| el.value().attr(USER_ATTR))
            .map(str::to_string)
    }

    fn poll_signals(&mut self, _now_ms: i64) -> Vec<PageSignal> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::scanner;

    const PAGE: &str = r##"
        <html><body>
          <ul><li type="friend"><a href="#">friends</a></li></ul>
          <div class="feed">
            <a class="f-name" link="nameCard_10001">Ann</a>
            <div class="f-info">first post</div>
            <a class="qz_like_btn_v3" data-id="p1">like</a>
          </div>
          <div class="feed">
            <a class="f-name" link="nameCard_10002" data-group="work">Bo</a>
            <div class="f-info">second <b>post</b></div>
            <a class="qz_like_btn_v3 item-on" data-id="p2">liked</a>
          </div>
        </body></html>
    "##;

    #[test]
    fn test_parse_document_extracts_aligned_lists() {
        let snapshot = parse_document(PAGE);
        assert_eq!(snapshot.controls.len(), 2);
        assert_eq!(snapshot.controls[0].key, "p1");
        assert!(!snapshot.controls[0].acted);
        assert!(snapshot.controls[1].acted);
        assert_eq!(snapshot.contents[1].trim(), "second post");
        assert_eq!(snapshot.owner_links[0].as_deref(), Some("nameCard_10001"));
        assert_eq!(snapshot.groups[1].as_deref(), Some("work"));
    }

    #[test]
    fn test_clicks_overlay_snapshot() {
        let mut page = HtmlFeedPage::from_source(PAGE);
        assert!(page.is_feed_view());
        page.activate("p1").unwrap();
        assert_eq!(page.control_state("p1"), Some(true));
        assert!(page.activate("missing").is_err());

        let items = scanner::scan(&page);
        assert!(items.iter().all(|c| c.already_acted));
    }

    #[test]
    fn test_feed_tab_detection() {
        let mut page = HtmlFeedPage::from_source(PAGE);
        assert!(page.open_feed_tab());
        let mut bare = HtmlFeedPage::from_source("<html><body></body></html>");
        assert!(!bare.open_feed_tab());
        assert!(!bare.is_feed_view());
    }

    #[test]
    fn test_reload_picks_up_rewritten_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.html");
        std::fs::write(&path, "<html><body></body></html>").unwrap();
        let mut page = HtmlFeedPage::open(&path).unwrap();
        assert!(scanner::scan(&page).is_empty());

        std::fs::write(&path, PAGE).unwrap();
        page.reload().unwrap();
        assert_eq!(scanner::scan(&page).len(), 2);
        assert_eq!(page.poll_signals(0), vec![PageSignal::Mutation]);
    }
}

//! A self-mutating feed for dry runs: new posts arrive over time, scrolling
//! loads older posts, and some clicks are silently ignored.

use super::types::{ControlNode, DomSnapshot, PageSignal};
use super::FeedPage;
use crate::config::SimulationConfig;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const OWNERS: &[(&str, Option<&str>)] = &[
    ("10001", None),
    ("10002", Some("family")),
    ("10003", None),
    ("10004", Some("work")),
    ("10005", None),
    ("10006", None),
    ("10007", Some("work")),
];

const PHRASES: &[&str] = &[
    "weekend hike photos",
    "new recipe tried tonight",
    "ad: limited time discount",
    "graduation day",
    "moving to a new city",
    "sharing a song I like",
    "traffic again this morning",
];

/// Posts loaded per full-viewport scroll.
const POSTS_PER_SCROLL: f64 = 3.0;

#[derive(Debug, Clone)]
struct SimPost {
    key: String,
    owner: String,
    group: Option<String>,
    content: String,
    acted: bool,
}

pub struct SimulatedFeed {
    posts: Vec<SimPost>,
    on_feed_tab: bool,
    rng: StdRng,
    config: SimulationConfig,
    next_id: u64,
    pending: Vec<PageSignal>,
    last_poll_ms: Option<i64>,
    user_id: Option<String>,
}

impl SimulatedFeed {
    pub fn new(config: SimulationConfig, seed: u64) -> Self {
        let mut feed = Self {
            posts: Vec::new(),
            on_feed_tab: false,
            rng: StdRng::seed_from_u64(seed),
            config,
            next_id: 0,
            pending: Vec::new(),
            last_poll_ms: None,
            user_id: Some("10000".to_string()),
        };
        for _ in 0..feed.config.seed_posts {
            let post = feed.make_post();
            feed.posts.push(post);
        }
        feed
    }

    fn make_post(&mut self) -> SimPost {
        self.next_id += 1;
        let (owner, group) = OWNERS[self.rng.gen_range(0..OWNERS.len())];
        let phrase = PHRASES[self.rng.gen_range(0..PHRASES.len())];
        SimPost {
            key: format!("post-{}", self.next_id),
            owner: owner.to_string(),
            group: group.map(str::to_string),
            content: phrase.to_string(),
            acted: self.rng.gen_bool(0.15),
        }
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }
}

impl FeedPage for SimulatedFeed {
    fn snapshot(&self) -> DomSnapshot {
        if !self.on_feed_tab {
            return DomSnapshot::default();
        }
        DomSnapshot {
            controls: self
                .posts
                .iter()
                .map(|p| ControlNode {
                    key: p.key.clone(),
                    acted: p.acted,
                })
                .collect(),
            contents: self.posts.iter().map(|p| p.content.clone()).collect(),
            owner_links: self
                .posts
                .iter()
                .map(|p| Some(format!("nameCard_{}", p.owner)))
                .collect(),
            groups: self.posts.iter().map(|p| p.group.clone()).collect(),
        }
    }

    fn is_feed_view(&self) -> bool {
        self.on_feed_tab
    }

    fn open_feed_tab(&mut self) -> bool {
        self.on_feed_tab = true;
        self.pending.push(PageSignal::Mutation);
        true
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        tracing::debug!(url, "simulated navigation");
        self.on_feed_tab = true;
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        self.on_feed_tab = false;
        Ok(())
    }

    fn scroll_by(&mut self, fraction: f64) -> Result<()> {
        let loaded = (fraction.clamp(0.0, 1.0) * POSTS_PER_SCROLL).ceil() as usize;
        for _ in 0..loaded {
            let post = self.make_post();
            self.posts.push(post);
        }
        self.pending.push(PageSignal::Scroll);
        Ok(())
    }

    fn control_state(&self, key: &str) -> Option<bool> {
        if !self.on_feed_tab {
            return None;
        }
        self.posts.iter().find(|p| p.key == key).map(|p| p.acted)
    }

    fn activate(&mut self, key: &str) -> Result<()> {
        let ignore = self.rng.gen_bool(self.config.ignore_rate.clamp(0.0, 1.0));
        let Some(post) = self.posts.iter_mut().find(|p| p.key == key) else {
            anyhow::bail!("control {} is gone", key);
        };
        if !ignore {
            post.acted = true;
        }
        Ok(())
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.clone()
    }

    fn poll_signals(&mut self, now_ms: i64) -> Vec<PageSignal> {
        let elapsed_secs = match self.last_poll_ms {
            Some(last) => ((now_ms - last).max(0) / 1000) as u32,
            None => 0,
        };
        if self.last_poll_ms.is_none() || elapsed_secs > 0 {
            self.last_poll_ms = Some(now_ms);
        }
        let p = self.config.arrival_probability.clamp(0.0, 1.0);
        for _ in 0..elapsed_secs.min(60) {
            if self.rng.gen_bool(p) {
                let post = self.make_post();
                self.posts.insert(0, post);
                if self.on_feed_tab {
                    self.pending.push(PageSignal::Mutation);
                }
            }
        }
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::scanner;

    fn quiet() -> SimulationConfig {
        SimulationConfig {
            seed_posts: 4,
            arrival_probability: 0.0,
            ignore_rate: 0.0,
        }
    }

    #[test]
    fn test_feed_hidden_until_tab_opened() {
        let mut feed = SimulatedFeed::new(quiet(), 7);
        assert!(!feed.is_feed_view());
        assert!(scanner::scan(&feed).is_empty());
        assert!(feed.open_feed_tab());
        assert_eq!(scanner::scan(&feed).len(), 4);
    }

    #[test]
    fn test_scroll_loads_posts_and_signals() {
        let mut feed = SimulatedFeed::new(quiet(), 7);
        feed.open_feed_tab();
        feed.poll_signals(0);
        feed.scroll_by(0.9).unwrap();
        assert_eq!(feed.post_count(), 7);
        assert_eq!(feed.poll_signals(100), vec![PageSignal::Scroll]);
        assert!(feed.poll_signals(200).is_empty());
    }

    #[test]
    fn test_activate_sets_acted_state() {
        let mut feed = SimulatedFeed::new(quiet(), 7);
        feed.open_feed_tab();
        let key = scanner::scan(&feed)[0].key.clone();
        feed.activate(&key).unwrap();
        assert_eq!(feed.control_state(&key), Some(true));
        assert_eq!(feed.control_state("post-999"), None);
        assert!(feed.activate("post-999").is_err());
    }

    #[test]
    fn test_ignored_clicks_leave_state_unchanged() {
        let mut config = quiet();
        config.ignore_rate = 1.0;
        config.seed_posts = 12;
        let mut feed = SimulatedFeed::new(config, 7);
        feed.open_feed_tab();
        let item = scanner::scan(&feed)
            .into_iter()
            .find(|c| !c.already_acted)
            .unwrap();
        feed.activate(&item.key).unwrap();
        assert_eq!(feed.control_state(&item.key), Some(false));
    }
}

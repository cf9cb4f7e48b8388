//! A full cycle over an HTML snapshot with a file-backed store.

use feed_pacer::config::Config;
use feed_pacer::engine::stats::Stats;
use feed_pacer::engine::{Command, Controller, ControllerOptions};
use feed_pacer::feed::html::HtmlFeedPage;
use feed_pacer::store::FileStore;

const T0: i64 = 1_760_000_000_000;

fn post(id: &str, owner: &str, text: &str, acted: bool) -> String {
    let class = if acted { "qz_like_btn_v3 item-on" } else { "qz_like_btn_v3" };
    format!(
        r#"<div class="feed">
             <a class="f-name" link="nameCard_{owner}">{owner}</a>
             <div class="f-info">{text}</div>
             <a class="{class}" data-id="{id}">like</a>
           </div>"#
    )
}

fn document(posts: &[String]) -> String {
    format!(
        r#"<html><body data-uin="10000">{}</body></html>"#,
        posts.concat()
    )
}

fn run_until(c: &mut Controller, from: i64, to: i64) {
    let mut t = from;
    while t <= to {
        if (t - T0) % 1000 == 0 {
            c.on_periodic(t);
        } else {
            c.advance(t);
        }
        t += 100;
    }
}

#[test]
fn test_snapshot_cycle_then_refresh_picks_up_new_post() {
    let dir = tempfile::tempdir().unwrap();
    let html = dir.path().join("feed.html");
    let state = dir.path().join("state.json");

    let mut posts = vec![
        post("p1", "10001", "holiday photos", false),
        post("p2", "10002", "old news", true),
        post("p3", "10003", "sponsored giveaway", false),
    ];
    std::fs::write(&html, document(&posts)).unwrap();

    let mut store = FileStore::open(&state).unwrap();
    let config = Config {
        initial_delay: 0,
        random_delay_min: 0.0,
        random_delay_max: 0.0,
        filter_keywords: vec!["sponsored".into()],
        ..Config::default()
    };
    config.save(&mut store).unwrap();

    let page = HtmlFeedPage::open(&html).unwrap();
    let mut c = Controller::new(
        Box::new(store),
        Box::new(page),
        ControllerOptions::default(),
        T0,
    );

    run_until(&mut c, T0, T0 + 2900);
    assert_eq!(c.stats().likes, 1);
    assert_eq!(c.page().control_state("p1"), Some(true));
    assert_eq!(c.page().control_state("p3"), Some(false));
    assert!(!c.state().is_running);

    posts.push(post("p4", "10004", "new arrival", false));
    std::fs::write(&html, document(&posts)).unwrap();
    c.handle(Command::Refresh, T0 + 3000);
    run_until(&mut c, T0 + 3000, T0 + 16_000);

    assert_eq!(c.stats().likes, 2);
    assert_eq!(c.page().control_state("p4"), Some(true));
    assert_eq!(c.page().control_state("p3"), Some(false));

    drop(c);
    let reopened = FileStore::open(&state).unwrap();
    assert_eq!(Stats::load(&reopened).likes, 2);
}

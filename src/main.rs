use anyhow::{Context, Result};
use feed_pacer::config::{AppConfig, Config, PageSource, DEFAULT_APP_CONFIG_FILE};
use feed_pacer::engine::{Controller, ControllerOptions, Stats};
use feed_pacer::feed::html::HtmlFeedPage;
use feed_pacer::feed::simulated::SimulatedFeed;
use feed_pacer::feed::FeedPage;
use feed_pacer::notify;
use feed_pacer::runtime::{self, now_ms, Control};
use feed_pacer::store::{FileStore, KvStore};
use feed_pacer::tui::{self, state::AppState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    config_path: Option<PathBuf>,
    export_config: bool,
    import_config: Option<PathBuf>,
    reset: bool,
    reset_stats: bool,
    headless: bool,
    simulate: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                parsed.config_path = Some(PathBuf::from(path));
            }
            "--import-config" => {
                let path = args.next().context("--import-config needs a path")?;
                parsed.import_config = Some(PathBuf::from(path));
            }
            "--export-config" => parsed.export_config = true,
            "--reset" => parsed.reset = true,
            "--reset-stats" => parsed.reset_stats = true,
            "--headless" => parsed.headless = true,
            "--simulate" => parsed.simulate = true,
            other => anyhow::bail!("unknown argument: {}", other),
        }
    }
    Ok(parsed)
}

/// One-shot maintenance commands. Returns true when one ran.
fn run_admin(args: &CliArgs, store: &mut dyn KvStore) -> Result<bool> {
    if args.export_config {
        println!("{}", Config::load(store).export_json()?);
        return Ok(true);
    }
    if let Some(path) = &args.import_config {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config document: {}", path.display()))?;
        Config::from_json_str(&raw)?.save(store)?;
        println!("  Imported configuration from {}", path.display());
        return Ok(true);
    }
    if args.reset {
        Config::default().save(store)?;
        println!("  Configuration reset to defaults");
        return Ok(true);
    }
    if args.reset_stats {
        Stats::load(store).reset(store);
        println!("  Statistics cleared");
        return Ok(true);
    }
    Ok(false)
}

fn open_page(app: &AppConfig, simulate: bool) -> Result<(Box<dyn FeedPage>, &'static str)> {
    if simulate || app.page.source == PageSource::Simulated {
        let page = SimulatedFeed::new(app.page.simulation.clone(), now_ms() as u64);
        return Ok((Box::new(page), "simulated"));
    }
    let path = app
        .page
        .html_path
        .as_deref()
        .context("page.html_path is required when page.source = \"html\"")?;
    Ok((Box::new(HtmlFeedPage::open(Path::new(path))?), "html"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let config_path = args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_APP_CONFIG_FILE));
    let app = AppConfig::load_or_default(&config_path)?;

    let log_file = std::fs::File::create(&app.log.file)
        .with_context(|| format!("Failed to create log file: {}", app.log.file))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&app.log.filter))
        .with_writer(log_file)
        .with_ansi(false)
        .init();

    let mut store = FileStore::open(Path::new(&app.store.path))?;
    if run_admin(&args, &mut store)? {
        return Ok(());
    }

    let (page, source) = open_page(&app, args.simulate)?;
    let options = ControllerOptions {
        feed_url_template: app.page.feed_url_template.clone(),
        ..ControllerOptions::default()
    };
    let controller = Controller::new(Box::new(store), page, options, now_ms());
    let notifier: Arc<dyn notify::Notifier> =
        Arc::from(notify::from_webhook(app.notify.webhook_url.as_deref())?);

    let (state_tx, state_rx) = watch::channel(AppState::new(source));
    let (control_tx, control_rx) = mpsc::channel::<Control>(16);
    tracing::info!(source, store = %app.store.path, "starting");

    if args.headless {
        println!(
            "  Feed Pacer (headless, {}) - JSON commands on stdin",
            source
        );
        tokio::spawn(runtime::print_status(state_rx));
        tokio::spawn(async move {
            if let Err(e) = runtime::read_stdin_commands(control_tx).await {
                tracing::warn!(error = %e, "stdin closed");
            }
        });
        return runtime::run(controller, control_rx, state_tx, notifier).await;
    }

    let (engine, ui) = tokio::join!(
        runtime::run(controller, control_rx, state_tx, notifier),
        tui::run_tui(state_rx, control_tx),
    );
    ui?;
    engine
}

//! Single-threaded driver: feeds the controller the once-per-second
//! trigger, its own timer deadlines and control messages, then publishes a
//! fresh [`AppState`] after every step.

use crate::engine::{Command, Controller};
use crate::notify::Notifier;
use crate::tui::state::AppState;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// Messages from the control surface (TUI keys or headless stdin).
#[derive(Debug, Clone)]
pub enum Control {
    Engine(Command),
    Quit,
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

async fn sleep_until_due(delay: Option<Duration>) {
    match delay {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending::<()>().await,
    }
}

/// Drive `controller` until a quit message arrives or every control sender
/// is dropped.
pub async fn run(
    mut controller: Controller,
    mut control_rx: mpsc::Receiver<Control>,
    state_tx: watch::Sender<AppState>,
    notifier: Arc<dyn Notifier>,
) -> Result<()> {
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    publish(&mut controller, &state_tx);
    loop {
        let delay = controller
            .next_wake()
            .map(|due| Duration::from_millis((due - now_ms()).max(0) as u64));

        tokio::select! {
            _ = tick.tick() => controller.on_periodic(now_ms()),
            _ = sleep_until_due(delay) => controller.advance(now_ms()),
            msg = control_rx.recv() => match msg {
                Some(Control::Engine(command)) => {
                    let now = now_ms();
                    controller.handle(command, now);
                    controller.advance(now);
                }
                Some(Control::Quit) | None => break,
            },
        }

        for notification in controller.take_notifications() {
            let notifier = Arc::clone(&notifier);
            tokio::spawn(async move {
                if let Err(e) = notifier.send(&notification).await {
                    tracing::warn!(error = %e, "notification failed");
                }
            });
        }
        publish(&mut controller, &state_tx);
    }

    tracing::info!("engine stopped");
    Ok(())
}

fn publish(controller: &mut Controller, state_tx: &watch::Sender<AppState>) {
    let status = controller.status(now_ms());
    let stats = controller.stats();
    let activity = controller.activity();
    state_tx.send_modify(|s| {
        s.status = status;
        s.stats = stats;
        s.set_logs(activity.entries().iter());
    });
}

/// Headless control surface: one JSON command per stdin line, e.g.
/// `{"action":"pause"}`. Malformed lines are logged and skipped.
pub async fn read_stdin_commands(control_tx: mpsc::Sender<Control>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_command_line(line) {
            Ok(command) => {
                if control_tx.send(Control::Engine(command)).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!(error = %e, line, "ignoring malformed command"),
        }
    }
    let _ = control_tx.send(Control::Quit).await;
    Ok(())
}

pub fn parse_command_line(line: &str) -> Result<Command> {
    Ok(serde_json::from_str(line)?)
}

/// Headless status output: one line per published change.
pub async fn print_status(mut state_rx: watch::Receiver<AppState>) {
    let mut last = String::new();
    while state_rx.changed().await.is_ok() {
        let line = state_rx.borrow_and_update().status.render_line();
        if line != last {
            println!("{}", line);
            last = line;
        }
    }
}

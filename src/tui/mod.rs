pub mod render;
pub mod state;

use crate::runtime::Control;
use crate::engine::Command;
use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures_util::StreamExt;
use ratatui::prelude::*;
use state::AppState;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Map a key press to an engine control message.
pub fn key_to_control(code: KeyCode) -> Option<Control> {
    match code {
        KeyCode::Char('q') => Some(Control::Quit),
        KeyCode::Char('p') => Some(Control::Engine(Command::Pause)),
        KeyCode::Char('r') => Some(Control::Engine(Command::Resume)),
        KeyCode::Char('t') => Some(Control::Engine(Command::Test)),
        KeyCode::Char('f') => Some(Control::Engine(Command::Refresh)),
        _ => None,
    }
}

/// Run the TUI. Reads state from `state_rx`, sends commands on `control_tx`.
pub async fn run_tui(
    state_rx: watch::Receiver<AppState>,
    control_tx: mpsc::Sender<Control>,
) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = tui_loop(&mut terminal, state_rx, control_tx).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut state_rx: watch::Receiver<AppState>,
    control_tx: mpsc::Sender<Control>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut spinner_frame: u8 = 0;
    let mut log_focus = false;
    let mut log_scroll_offset: usize = 0;

    loop {
        let mut state = state_rx.borrow().clone();
        state.log_focus = log_focus;
        state.log_scroll_offset = log_scroll_offset;
        terminal.draw(|f| render::draw(f, &state, spinner_frame))?;

        tokio::select! {
            maybe_event = events.next() => {
                let Some(event) = maybe_event else { return Ok(()) };
                let Event::Key(key) = event? else { continue };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('l') => {
                        log_focus = !log_focus;
                        log_scroll_offset = 0;
                    }
                    KeyCode::Esc => log_focus = false,
                    KeyCode::Char('j') if log_focus => {
                        log_scroll_offset = log_scroll_offset.saturating_add(1);
                    }
                    KeyCode::Char('k') if log_focus => {
                        log_scroll_offset = log_scroll_offset.saturating_sub(1);
                    }
                    code => {
                        if let Some(control) = key_to_control(code) {
                            let quit = matches!(control, Control::Quit);
                            let _ = control_tx.send(control).await;
                            if quit {
                                return Ok(());
                            }
                        }
                    }
                }
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {
                spinner_frame = spinner_frame.wrapping_add(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        assert!(matches!(key_to_control(KeyCode::Char('q')), Some(Control::Quit)));
        assert!(matches!(
            key_to_control(KeyCode::Char('t')),
            Some(Control::Engine(Command::Test))
        ));
        assert!(matches!(
            key_to_control(KeyCode::Char('f')),
            Some(Control::Engine(Command::Refresh))
        ));
        assert!(key_to_control(KeyCode::Char('x')).is_none());
    }
}

use std::borrow::Cow;

use super::state::AppState;
use crate::config::LogLevel;
use crate::engine::status::Activity;
use chrono::{Local, TimeZone};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub fn draw(f: &mut Frame, state: &AppState, spinner_frame: u8) {
    if state.log_focus {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(f.area());

        draw_header(f, state, chunks[0], spinner_frame);
        draw_logs(f, state, chunks[1]);
        draw_footer(f, state, chunks[2]);
    } else {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(f.area());

        draw_header(f, state, chunks[0], spinner_frame);
        draw_status(f, state, chunks[1]);
        draw_progress(f, state, chunks[2]);
        draw_logs(f, state, chunks[3]);
        draw_footer(f, state, chunks[4]);
    }
}

fn draw_header(f: &mut Frame, state: &AppState, area: Rect, spinner_frame: u8) {
    let activity_indicator = match state.status.activity {
        Activity::Paused => Span::styled(
            " PAUSED",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Activity::Busy => {
            let ch = SPINNER_FRAMES[(spinner_frame as usize) % SPINNER_FRAMES.len()];
            Span::styled(format!(" {} BUSY", ch), Style::default().fg(Color::Cyan))
        }
        Activity::Idle => Span::styled(" IDLE", Style::default().fg(Color::Green)),
    };

    let line = Line::from(vec![
        Span::raw(" Likes: "),
        Span::styled(
            state.stats.likes.to_string(),
            Style::default().fg(Color::Green),
        ),
        Span::raw(" | Skips: "),
        Span::styled(
            state.stats.skips.to_string(),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" | Errors: "),
        Span::styled(
            state.stats.errors.to_string(),
            Style::default().fg(if state.stats.errors > 0 {
                Color::Red
            } else {
                Color::DarkGray
            }),
        ),
        Span::raw(format!(" | Up: {}", state.uptime())),
        activity_indicator,
    ]);

    let title = format!(" Feed Pacer [{}] ", state.source);
    let block = Block::default().title(title).borders(Borders::ALL);
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_status(f: &mut Frame, state: &AppState, area: Rect) {
    let s = &state.status;
    let mut first = vec![
        Span::raw(format!(" Next cycle in {}s", s.remaining_secs)),
        Span::styled(
            format!(" | {}", s.phase.as_str()),
            Style::default().fg(Color::Cyan),
        ),
    ];
    if !s.current_task.is_empty() {
        first.push(Span::raw(format!(" | {}", s.current_task)));
    }
    if let Some((n, max)) = s.retry {
        first.push(Span::styled(
            format!(" | retry {}/{}", n, max),
            Style::default().fg(Color::Yellow),
        ));
    }

    let last_cycle = if s.last_cycle_ms > 0 {
        Local
            .timestamp_millis_opt(s.last_cycle_ms)
            .single()
            .map(|dt| dt.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string())
    } else {
        "-".to_string()
    };
    let mut second = vec![Span::styled(
        format!(
            " Last cycle {} | interval {}s | delay {}s",
            last_cycle, s.duration_secs, s.like_delay_secs
        ),
        Style::default().fg(Color::DarkGray),
    )];
    if let Some((used, limit)) = s.daily {
        let color = if used >= limit { Color::Red } else { Color::DarkGray };
        second.push(Span::styled(
            format!(" | today {}/{}", used, limit),
            Style::default().fg(color),
        ));
    }

    let block = Block::default().title(" Status ").borders(Borders::ALL);
    let para = Paragraph::new(vec![Line::from(first), Line::from(second)]).block(block);
    f.render_widget(para, area);
}

fn draw_progress(f: &mut Frame, state: &AppState, area: Rect) {
    let s = &state.status;
    let block = Block::default().title(" Progress ").borders(Borders::ALL);
    match s.progress_percent {
        Some(percent) => {
            let gauge = Gauge::default()
                .block(block)
                .gauge_style(Style::default().fg(Color::Cyan))
                .percent(u16::from(percent))
                .label(format!("{}% ({}s left)", percent, s.task_remaining_secs));
            f.render_widget(gauge, area);
        }
        None => f.render_widget(Paragraph::new(" -").block(block), area),
    }
}

fn draw_logs(f: &mut Frame, state: &AppState, area: Rect) {
    let max_width = area.width.saturating_sub(2) as usize; // borders
    let visible_lines = area.height.saturating_sub(2) as usize;

    let total = state.logs.len();
    let offset = if state.log_focus {
        state.log_scroll_offset.min(total.saturating_sub(visible_lines))
    } else {
        0
    };

    let lines: Vec<Line> = state
        .logs
        .iter()
        .rev()
        .skip(offset)
        .take(visible_lines)
        .map(|l| {
            let color = match l.level {
                LogLevel::Error => Color::Red,
                LogLevel::Warn => Color::Yellow,
                LogLevel::Info => Color::DarkGray,
            };
            let prefix = format!(" {} [{}] ", l.timestamp, l.level.as_str());
            let msg_max = max_width.saturating_sub(prefix.len());
            let msg = truncate_with_ellipsis(&l.message, msg_max);
            Line::from(vec![
                Span::styled(prefix, Style::default().fg(color)),
                Span::raw(msg.into_owned()),
            ])
        })
        .collect();

    let title = if state.log_focus {
        let shown = offset + visible_lines.min(total);
        format!(" Activity Log [{}/{} lines] ", shown, total)
    } else {
        " Activity Log ".to_string()
    };

    let block = Block::default().title(title).borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_footer(f: &mut Frame, state: &AppState, area: Rect) {
    let line = if state.log_focus {
        Line::from(vec![
            Span::styled("  [Esc]", Style::default().fg(Color::Yellow)),
            Span::raw(" back  "),
            Span::styled("[j/k]", Style::default().fg(Color::Yellow)),
            Span::raw(" scroll  "),
        ])
    } else {
        Line::from(vec![
            Span::styled("  [q]", Style::default().fg(Color::Yellow)),
            Span::raw("uit  "),
            Span::styled("[p]", Style::default().fg(Color::Yellow)),
            Span::raw("ause  "),
            Span::styled("[r]", Style::default().fg(Color::Yellow)),
            Span::raw("esume  "),
            Span::styled("[t]", Style::default().fg(Color::Yellow)),
            Span::raw("est run  "),
            Span::styled("[f]", Style::default().fg(Color::Yellow)),
            Span::raw(" refresh  "),
            Span::styled("[l]", Style::default().fg(Color::Yellow)),
            Span::raw("ogs  "),
        ])
    };
    f.render_widget(Paragraph::new(line), area);
}

fn truncate_with_ellipsis(s: &str, max_width: usize) -> Cow<'_, str> {
    let char_count = s.chars().count();
    if char_count <= max_width {
        Cow::Borrowed(s)
    } else if max_width <= 3 {
        Cow::Owned(".".repeat(max_width))
    } else {
        let end = s
            .char_indices()
            .nth(max_width - 3)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        Cow::Owned(format!("{}...", &s[..end]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("a longer message", 8), "a lon...");
        assert_eq!(truncate_with_ellipsis("abcdef", 2), "..");
    }

    #[test]
    fn test_draw_shows_paused_indicator() {
        let mut state = AppState::new("simulated");
        state.status.activity = Activity::Paused;
        state.stats.likes = 12;
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| draw(f, &state, 0)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("PAUSED"));
        assert!(text.contains("Likes: 12"));
        assert!(text.contains("Feed Pacer [simulated]"));
    }
}

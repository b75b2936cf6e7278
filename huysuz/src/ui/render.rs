//! Render orchestration for the chat TUI

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

use huysuz_core::{GameStatus, Message, Sender};

use crate::app::App;

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    match app.status() {
        GameStatus::Selecting => render_selection(frame, area),
        GameStatus::Playing | GameStatus::Blocked => render_chat(frame, app, area),
    }

    if app.status() == GameStatus::Blocked {
        render_blocked_overlay(frame, app, area);
    }
}

/// Partner selection screen
fn render_selection(frame: &mut Frame, area: Rect) {
    let popup = centered_rect(44, 10, area);

    let lines = vec![
        Line::from(Span::styled(
            "Kiminle konuşmak istersin?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("[e]", Style::default().fg(Color::Green)),
            Span::raw(" Erkek partner"),
        ]),
        Line::from(vec![
            Span::styled("[k]", Style::default().fg(Color::Magenta)),
            Span::raw(" Kadın partner"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "[q] çık",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(" Huysuz "));
    frame.render_widget(widget, popup);
}

/// Chat screen: header, transcript, optional notice, input line
fn render_chat(frame: &mut Frame, app: &App, area: Rect) {
    let has_notice = app.session.notice().is_some();

    let mut constraints = vec![Constraint::Length(4), Constraint::Min(3)];
    if has_notice {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Length(3));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    render_header(frame, app, chunks[0]);
    render_messages(frame, app, chunks[1]);
    if has_notice {
        render_notice(frame, app, chunks[2]);
    }
    render_input(frame, app, chunks[chunks.len() - 1]);
}

/// Header: partner name, typing indicator, irritation gauge
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let name = app
        .session
        .partner()
        .map(|p| p.name.clone())
        .unwrap_or_default();

    let title = if app.session.reply_pending() {
        format!(" {name} — yazıyor... ")
    } else {
        format!(" {name} ")
    };

    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let irritation = app.session.irritation();
    let color = match irritation {
        0..=30 => Color::Green,
        31..=70 => Color::Yellow,
        _ => Color::Red,
    };

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(color))
        .ratio(f64::from(irritation) / 100.0)
        .label(format!("Sinir: {irritation}/100"));
    frame.render_widget(gauge, inner);
}

/// The transcript, stuck to the bottom
fn render_messages(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width.max(1) as usize;
    let mut lines: Vec<Line> = Vec::new();
    for message in app.session.messages() {
        lines.extend(message_lines(message, width));
    }

    // Keep the newest messages visible.
    let overflow = lines.len().saturating_sub(inner.height as usize);
    let widget = Paragraph::new(lines).scroll((overflow as u16, 0));
    frame.render_widget(widget, inner);
}

/// Lay one message out as right- or left-aligned chat lines
fn message_lines(message: &Message, width: usize) -> Vec<Line<'_>> {
    let (alignment, style) = match message.sender {
        Sender::User => (
            Alignment::Right,
            Style::default().fg(Color::LightGreen),
        ),
        Sender::Partner => (Alignment::Left, Style::default().fg(Color::White)),
    };

    // Simple manual wrap so alignment applies per line.
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in message.text.split_whitespace() {
        let candidate_len = current.chars().count() + word.chars().count() + 1;
        if !current.is_empty() && candidate_len > width.saturating_sub(2) {
            lines.push(Line::from(Span::styled(current.clone(), style)).alignment(alignment));
            current.clear();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(Line::from(Span::styled(current, style)).alignment(alignment));
    }
    lines
}

/// The recoverable connection notice
fn render_notice(frame: &mut Frame, app: &App, area: Rect) {
    let notice = app.session.notice().unwrap_or_default();
    let widget = Paragraph::new(format!("⚠ {notice}"))
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    frame.render_widget(widget, area);
}

/// Input line with cursor
fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let enabled = app.input_enabled();

    let text = if app.input_buffer().is_empty() && enabled {
        Span::styled("Mesaj yazın", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.input_buffer())
    };

    let border_style = if enabled {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let widget = Paragraph::new(Line::from(text)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    frame.render_widget(widget, area);

    if enabled {
        // Turkish letters are single-column, so chars == columns here.
        let x = area.x + 1 + app.cursor_position() as u16;
        frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

/// Terminal block screen, drawn over the chat
fn render_blocked_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(46, 10, area);
    frame.render_widget(Clear, popup);

    let name = app
        .session
        .partner()
        .map(|p| p.name.clone())
        .unwrap_or_default();

    let lines = vec![
        Line::from(Span::styled(
            "ENGELLENDİN",
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("{name} seni engelledi.")),
        Line::from(format!(
            "Toplam mesaj: {} — Sinir: 100/100",
            app.session.messages().len()
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("[r]", Style::default().fg(Color::Green)),
            Span::raw(" yeniden başla   "),
            Span::styled("[q]", Style::default().fg(Color::DarkGray)),
            Span::raw(" çık"),
        ]),
    ];

    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
    frame.render_widget(widget, popup);
}

/// A fixed-size rect centered in `area`
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

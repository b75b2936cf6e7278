//! Event handling for the chat TUI

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use huysuz_core::{GameStatus, Gender};

use crate::app::App;

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
    /// The user submitted a message; the main loop resolves the turn.
    SubmitMessage,
}

/// Handle a terminal event
pub fn handle_event(app: &mut App, event: Event) -> EventResult {
    match event {
        Event::Key(key) => handle_key_event(app, key),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

/// Handle a key event, routed by game status
fn handle_key_event(app: &mut App, key: KeyEvent) -> EventResult {
    // Global shortcut (always works)
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        return EventResult::Quit;
    }

    match app.status() {
        GameStatus::Selecting => handle_selection_key(app, key),
        GameStatus::Playing => handle_chat_key(app, key),
        GameStatus::Blocked => handle_blocked_key(app, key),
    }
}

/// Selection screen: pick Erkek or Kadın
fn handle_selection_key(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Char('e') | KeyCode::Char('E') => {
            app.choose_partner(Gender::Male);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('k') | KeyCode::Char('K') => {
            app.choose_partner(Gender::Female);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('q') | KeyCode::Esc => EventResult::Quit,
        _ => EventResult::Continue,
    }
}

/// Chat screen: free text input, Enter to send
fn handle_chat_key(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Enter => EventResult::SubmitMessage,
        KeyCode::Esc => EventResult::Quit,
        KeyCode::Backspace => {
            app.backspace();
            EventResult::NeedsRedraw
        }
        KeyCode::Delete => {
            app.delete();
            EventResult::NeedsRedraw
        }
        KeyCode::Left => {
            app.cursor_left();
            EventResult::NeedsRedraw
        }
        KeyCode::Right => {
            app.cursor_right();
            EventResult::NeedsRedraw
        }
        KeyCode::Home => {
            app.cursor_home();
            EventResult::NeedsRedraw
        }
        KeyCode::End => {
            app.cursor_end();
            EventResult::NeedsRedraw
        }
        KeyCode::Char(c) => {
            app.type_char(c);
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

/// Blocked screen: restart or quit
fn handle_blocked_key(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Char('r') | KeyCode::Char('R') => {
            app.restart();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('q') | KeyCode::Esc => EventResult::Quit,
        _ => EventResult::Continue,
    }
}

//! Main application state and logic

use huysuz_core::{ChatSession, GameStatus, Gender};

/// Main application state
pub struct App {
    /// The chat session driving everything.
    pub session: ChatSession,

    // Input state
    input_buffer: String,
    cursor_position: usize,
}

impl App {
    /// Create a new application around a session
    pub fn new(session: ChatSession) -> Self {
        Self {
            session,
            input_buffer: String::new(),
            cursor_position: 0,
        }
    }

    pub fn status(&self) -> GameStatus {
        self.session.status()
    }

    /// Choose a partner on the selection screen
    pub fn choose_partner(&mut self, gender: Gender) {
        // Only reachable from the selection screen; a rejected call
        // leaves the session untouched.
        let _ = self.session.select_partner(gender);
    }

    /// Restart the game from the blocked screen
    pub fn restart(&mut self) {
        self.session.restart();
        self.clear_input();
    }

    /// Whether the input line accepts text right now
    pub fn input_enabled(&self) -> bool {
        self.status() == GameStatus::Playing && !self.session.reply_pending()
    }

    /// Take the current input if it is submittable
    pub fn submit_input(&mut self) -> Option<String> {
        if !self.input_enabled() || self.input_buffer.trim().is_empty() {
            return None;
        }

        let input = std::mem::take(&mut self.input_buffer);
        self.cursor_position = 0;
        Some(input)
    }

    /// Advance timers (opening message, block transition)
    pub fn tick(&mut self) {
        self.session.poll();
    }

    /// Handle a typed character (unicode-safe)
    pub fn type_char(&mut self, c: char) {
        if !self.input_enabled() {
            return;
        }
        // Convert cursor position (character index) to byte index
        let byte_pos = self
            .input_buffer
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input_buffer.len());
        self.input_buffer.insert(byte_pos, c);
        self.cursor_position += 1;
    }

    /// Handle backspace (unicode-safe)
    pub fn backspace(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position)
            {
                self.input_buffer
                    .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
            }
        }
    }

    /// Handle delete (unicode-safe)
    pub fn delete(&mut self) {
        let char_count = self.input_buffer.chars().count();
        if self.cursor_position < char_count {
            if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position)
            {
                self.input_buffer
                    .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
            }
        }
    }

    /// Move cursor left
    pub fn cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    /// Move cursor right
    pub fn cursor_right(&mut self) {
        let char_count = self.input_buffer.chars().count();
        self.cursor_position = (self.cursor_position + 1).min(char_count);
    }

    /// Move cursor to start
    pub fn cursor_home(&mut self) {
        self.cursor_position = 0;
    }

    /// Move cursor to end (unicode-safe)
    pub fn cursor_end(&mut self) {
        self.cursor_position = self.input_buffer.chars().count();
    }

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    fn clear_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }
}

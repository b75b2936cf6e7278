//! ChatSession - the primary public API for the chat simulation.
//!
//! This module wraps the partner responder and the session state machine
//! into a single, easy-to-use interface. It is the only place the
//! monotonic clock is read; the state machine itself takes instants as
//! parameters.

use crate::responder::{PartnerResponder, ResponderConfig, ResponderError};
use crate::state::{
    ChatState, GameStatus, Gender, Message, Partner, StateError, CONNECTION_RESTRICTED_NOTICE,
    MAX_IRRITATION,
};
use std::time::Instant;
use thiserror::Error;

/// Errors from ChatSession operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("responder error: {0}")]
    Responder(#[from] ResponderError),

    #[error("illegal operation: {0}")]
    State(#[from] StateError),
}

/// Configuration for creating a new chat session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Model to use for the partner persona.
    pub model: Option<String>,

    /// Maximum tokens for partner replies.
    pub max_output_tokens: Option<usize>,

    /// Temperature for generation.
    pub temperature: Option<f32>,

    /// Extra persona instructions appended to the base prompt.
    pub custom_persona: Option<String>,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set max tokens for replies.
    pub fn with_max_output_tokens(mut self, tokens: usize) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Set temperature for generation.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Append custom persona instructions.
    pub fn with_custom_persona(mut self, persona: impl Into<String>) -> Self {
        self.custom_persona = Some(persona.into());
        self
    }

    fn into_responder_config(self) -> ResponderConfig {
        let defaults = ResponderConfig::default();
        ResponderConfig {
            model: self.model,
            max_output_tokens: self.max_output_tokens.unwrap_or(defaults.max_output_tokens),
            temperature: self.temperature.or(defaults.temperature),
            custom_persona: self.custom_persona,
        }
    }
}

/// Result of one completed turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// The partner's reply text.
    pub reply: String,

    /// Irritation level after the turn.
    pub irritation: u8,

    /// Whether this turn hit the ceiling; the block transition is now
    /// scheduled and will fire on a later [`poll`](ChatSession::poll).
    pub blocked: bool,
}

/// A chat session against the AI partner.
///
/// This is the main entry point. It manages:
/// - The session state machine (status, transcript, irritation)
/// - The partner responder and its fallback behavior
/// - The two delayed effects, fired from [`poll`](ChatSession::poll)
pub struct ChatSession {
    responder: PartnerResponder,
    state: ChatState,
    /// Text of the turn currently in flight, between
    /// [`begin_turn`](ChatSession::begin_turn) and
    /// [`resolve_turn`](ChatSession::resolve_turn).
    pending_text: Option<String>,
}

impl ChatSession {
    /// Create a session with an API key and configuration.
    pub fn new(api_key: impl Into<String>, config: SessionConfig) -> Self {
        let responder = PartnerResponder::new(api_key).with_config(config.into_responder_config());
        Self::with_responder(responder)
    }

    /// Create a session from the GEMINI_API_KEY environment variable.
    ///
    /// A missing key is not fatal: the first turn surfaces the
    /// recoverable connection notice instead.
    pub fn from_env() -> Self {
        Self::with_responder(PartnerResponder::from_env())
    }

    /// Create a session with a pre-built responder.
    pub fn with_responder(responder: PartnerResponder) -> Self {
        Self {
            responder,
            state: ChatState::new(),
            pending_text: None,
        }
    }

    /// Choose a partner and start the chat. The opening message arrives
    /// about a second later, via [`poll`](ChatSession::poll).
    pub fn select_partner(&mut self, gender: Gender) -> Result<(), SessionError> {
        self.state.select_partner(gender, Instant::now())?;
        Ok(())
    }

    /// Open a turn: append the user message and mark the reply pending.
    ///
    /// Single-flight: while a turn is open, further sends are rejected
    /// with [`StateError::ReplyPending`]. Hosts that want the user message
    /// on screen during the wait call this, redraw, then
    /// [`resolve_turn`](ChatSession::resolve_turn).
    pub fn begin_turn(&mut self, text: &str) -> Result<(), SessionError> {
        self.state.submit_message(text)?;
        self.pending_text = Some(text.trim().to_string());
        Ok(())
    }

    /// Resolve the open turn against the responder.
    ///
    /// On a configuration failure the turn is closed with the recoverable
    /// connection notice and the error is returned; the transcript and
    /// irritation are unchanged.
    pub async fn resolve_turn(&mut self) -> Result<TurnOutcome, SessionError> {
        let text = self.pending_text.take().ok_or(StateError::NoTurnInFlight)?;
        let partner = self.state.partner().ok_or(StateError::NotPlaying)?;
        let gender = partner.gender;
        let name = partner.name.clone();
        // Opening a turn does not move the score, so this is still the
        // pre-turn level the persona prompt expects.
        let irritation = self.state.irritation();

        match self
            .responder
            .respond(&text, irritation, gender, &name)
            .await
        {
            Ok(reply) => {
                let reply_text = reply.reply.clone();
                let level = self.state.complete_turn(reply, Instant::now())?;
                Ok(TurnOutcome {
                    reply: reply_text,
                    irritation: level,
                    blocked: level >= MAX_IRRITATION,
                })
            }
            Err(err) => {
                self.state.fail_turn(CONNECTION_RESTRICTED_NOTICE)?;
                Err(err.into())
            }
        }
    }

    /// Send a user message and resolve the partner's turn in one call.
    pub async fn send_message(&mut self, text: &str) -> Result<TurnOutcome, SessionError> {
        self.begin_turn(text)?;
        self.resolve_turn().await
    }

    /// Fire any due delayed effect (opening message, block transition).
    /// Call this from the host's tick loop. Returns whether anything
    /// changed.
    pub fn poll(&mut self) -> bool {
        self.state.poll(Instant::now())
    }

    /// Reset the session to the selection screen. Legal from any state.
    pub fn restart(&mut self) {
        self.state.restart();
        self.pending_text = None;
    }

    // =========================================================================
    // Read-only observation
    // =========================================================================

    pub fn status(&self) -> GameStatus {
        self.state.status()
    }

    pub fn partner(&self) -> Option<&Partner> {
        self.state.partner()
    }

    pub fn messages(&self) -> &[Message] {
        self.state.messages()
    }

    pub fn irritation(&self) -> u8 {
        self.state.irritation()
    }

    /// Whether a reply is in flight and input should be disabled.
    pub fn reply_pending(&self) -> bool {
        self.state.awaiting_reply()
    }

    /// The recoverable notice, if one is showing.
    pub fn notice(&self) -> Option<&str> {
        self.state.notice()
    }

    /// Direct access to the underlying state.
    pub fn state(&self) -> &ChatState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new()
            .with_model("gemini-3-pro-preview")
            .with_max_output_tokens(128)
            .with_temperature(0.4)
            .with_custom_persona("Bugün yıldönümünü unuttun.");

        let responder_config = config.into_responder_config();
        assert_eq!(
            responder_config.model.as_deref(),
            Some("gemini-3-pro-preview")
        );
        assert_eq!(responder_config.max_output_tokens, 128);
        assert_eq!(responder_config.temperature, Some(0.4));
        assert!(responder_config.custom_persona.is_some());
    }

    #[test]
    fn test_session_config_defaults_pass_through() {
        let responder_config = SessionConfig::new().into_responder_config();
        let defaults = ResponderConfig::default();
        assert_eq!(responder_config.max_output_tokens, defaults.max_output_tokens);
        assert_eq!(responder_config.temperature, defaults.temperature);
    }

    #[tokio::test]
    async fn test_send_before_selection_is_rejected() {
        let mut session = ChatSession::with_responder(PartnerResponder::unconfigured());

        let result = session.send_message("Selam").await;
        assert_eq!(
            result,
            Err(SessionError::State(StateError::NotPlaying))
        );
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_send_surfaces_notice() {
        let mut session = ChatSession::with_responder(PartnerResponder::unconfigured());
        session.select_partner(Gender::Female).unwrap();

        let result = session.send_message("Selam").await;
        assert_eq!(
            result,
            Err(SessionError::Responder(ResponderError::MissingApiKey))
        );

        // Recoverable: the notice is set, nothing else moved.
        assert_eq!(session.notice(), Some(CONNECTION_RESTRICTED_NOTICE));
        assert!(!session.reply_pending());
        assert_eq!(session.irritation(), 0);
        assert_eq!(session.status(), GameStatus::Playing);
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_two_phase_turn_observes_pending() {
        let mut session = ChatSession::with_responder(PartnerResponder::unconfigured());
        session.select_partner(Gender::Male).unwrap();

        session.begin_turn("Selam").unwrap();
        assert!(session.reply_pending());
        assert_eq!(session.messages().len(), 1);
        assert_eq!(
            session.begin_turn("İkinci"),
            Err(SessionError::State(StateError::ReplyPending))
        );

        let err = session.resolve_turn().await.unwrap_err();
        assert_eq!(err, SessionError::Responder(ResponderError::MissingApiKey));
        assert!(!session.reply_pending());
    }

    #[tokio::test]
    async fn test_resolve_without_open_turn_is_rejected() {
        let mut session = ChatSession::with_responder(PartnerResponder::unconfigured());
        session.select_partner(Gender::Female).unwrap();

        let err = session.resolve_turn().await.unwrap_err();
        assert_eq!(err, SessionError::State(StateError::NoTurnInFlight));
    }

    #[tokio::test]
    async fn test_restart_clears_everything() {
        let mut session = ChatSession::with_responder(PartnerResponder::unconfigured());
        session.select_partner(Gender::Male).unwrap();
        let _ = session.send_message("Selam").await;

        session.restart();

        assert_eq!(session.status(), GameStatus::Selecting);
        assert!(session.partner().is_none());
        assert!(session.messages().is_empty());
        assert_eq!(session.irritation(), 0);
        assert!(session.notice().is_none());
        assert_eq!(session.state(), &ChatState::new());
    }
}

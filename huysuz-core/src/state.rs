//! Chat session state machine.
//!
//! Contains all types for representing a session: the game status, the
//! partner, the message history, the irritation score, and the two
//! scheduled effects (the opening message and the block transition).
//!
//! The state machine never reads the monotonic clock itself; every
//! operation that schedules or fires a delayed effect takes `now` as a
//! parameter, so tests drive synthetic instants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

/// Irritation ceiling; reaching it ends the session.
pub const MAX_IRRITATION: u8 = 100;

/// How long after partner selection the opening message lands.
pub const OPENING_DELAY: Duration = Duration::from_millis(1000);

/// How long after the terminal reply the block screen takes over,
/// leaving the last message visible for a beat.
pub const BLOCK_DELAY: Duration = Duration::from_millis(1200);

/// Display name of the partner persona.
pub const PARTNER_NAME: &str = "Partnerim";

/// The synthetic opening message the partner sends unprompted.
pub const OPENING_LINE: &str = "Neredesin sen? Yarım saattir mesaj atmanı bekliyorum.";

/// Recoverable notice shown when the generation service is unconfigured
/// or the key was rejected. Does not enter the chat transcript.
pub const CONNECTION_RESTRICTED_NOTICE: &str =
    "Bağlantı kısıtlı. GEMINI_API_KEY anahtarını kontrol edip yenileyin.";

// ============================================================================
// Data model
// ============================================================================

/// Partner gender, chosen on the selection screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Turkish display name, as shown in the UI and in the persona prompt.
    pub fn display_name(&self) -> &'static str {
        match self {
            Gender::Male => "Erkek",
            Gender::Female => "Kadın",
        }
    }

    /// Stable seed for the placeholder avatar, distinct per gender.
    pub fn avatar_seed(&self) -> &'static str {
        match self {
            Gender::Male => "male_partner",
            Gender::Female => "female_partner",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// The simulated partner. Immutable once created; discarded on restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub gender: Gender,
    pub name: String,
    /// Opaque avatar reference, derived deterministically from gender.
    pub avatar: String,
}

impl Partner {
    pub fn new(gender: Gender) -> Self {
        Self {
            gender,
            name: PARTNER_NAME.to_string(),
            avatar: format!("https://picsum.photos/seed/{}/200", gender.avatar_seed()),
        }
    }
}

/// Unique identifier for messages.
///
/// The synthetic opening message carries the reserved nil id so it can
/// never collide with a generated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The reserved id of the opening message.
    pub fn opening() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_opening(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Partner,
}

/// A single chat message. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn now(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: MessageId::new(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

/// One partner turn: the reply text and how much it raises the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerReply {
    pub reply: String,
    pub irritation_increment: u8,
}

/// Where the session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Choosing a partner; no chat yet.
    Selecting,
    /// Chat is live.
    Playing,
    /// Terminal: the partner blocked the user. Only restart leaves it.
    Blocked,
}

// ============================================================================
// Errors
// ============================================================================

/// Rejected state-machine operations. The state is untouched whenever one
/// of these is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("a partner can only be chosen on the selection screen")]
    NotSelecting,

    #[error("no active chat to message")]
    NotPlaying,

    #[error("a reply is already pending")]
    ReplyPending,

    #[error("message text is empty")]
    EmptyMessage,

    #[error("no turn is in flight")]
    NoTurnInFlight,
}

// ============================================================================
// The state machine
// ============================================================================

/// A single chat session.
///
/// History is append-only, irritation is clamped to `0..=100` and never
/// decreases except on [`restart`](ChatState::restart), and at most one
/// reply can be in flight at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatState {
    status: GameStatus,
    partner: Option<Partner>,
    messages: Vec<Message>,
    irritation: u8,
    awaiting_reply: bool,
    notice: Option<String>,
    opening_due: Option<Instant>,
    block_due: Option<Instant>,
}

impl ChatState {
    /// A fresh session on the selection screen.
    pub fn new() -> Self {
        Self {
            status: GameStatus::Selecting,
            partner: None,
            messages: Vec::new(),
            irritation: 0,
            awaiting_reply: false,
            notice: None,
            opening_due: None,
            block_due: None,
        }
    }

    /// Choose a partner and start the chat.
    ///
    /// Schedules the opening message for `now + OPENING_DELAY`; it is
    /// delivered by [`poll`](ChatState::poll).
    pub fn select_partner(&mut self, gender: Gender, now: Instant) -> Result<(), StateError> {
        if self.status != GameStatus::Selecting {
            return Err(StateError::NotSelecting);
        }

        self.partner = Some(Partner::new(gender));
        self.status = GameStatus::Playing;
        self.notice = None;
        self.opening_due = Some(now + OPENING_DELAY);
        Ok(())
    }

    /// Append a user message and open a turn.
    ///
    /// Single-flight: rejected while a reply is pending. The caller is
    /// expected to obtain a partner reply and feed it back through
    /// [`complete_turn`](ChatState::complete_turn) or
    /// [`fail_turn`](ChatState::fail_turn).
    pub fn submit_message(&mut self, text: &str) -> Result<(), StateError> {
        if self.status != GameStatus::Playing {
            return Err(StateError::NotPlaying);
        }
        if self.awaiting_reply {
            return Err(StateError::ReplyPending);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(StateError::EmptyMessage);
        }

        self.messages.push(Message::now(text, Sender::User));
        self.awaiting_reply = true;
        self.notice = None;
        Ok(())
    }

    /// Close the pending turn with the partner's reply.
    ///
    /// Raises irritation by the (unsigned) increment, clamped to
    /// [`MAX_IRRITATION`]. Reaching the ceiling schedules the block
    /// transition for `now + BLOCK_DELAY` so the terminal reply stays
    /// visible first. Returns the new irritation level.
    pub fn complete_turn(&mut self, reply: PartnerReply, now: Instant) -> Result<u8, StateError> {
        if !self.awaiting_reply {
            return Err(StateError::NoTurnInFlight);
        }

        self.messages
            .push(Message::now(reply.reply, Sender::Partner));
        self.awaiting_reply = false;
        self.irritation = self
            .irritation
            .saturating_add(reply.irritation_increment)
            .min(MAX_IRRITATION);

        if self.irritation >= MAX_IRRITATION && self.status == GameStatus::Playing {
            self.block_due = Some(now + BLOCK_DELAY);
        }

        Ok(self.irritation)
    }

    /// Close the pending turn without a reply, leaving a recoverable
    /// notice instead.
    ///
    /// Status, irritation, and the transcript are untouched; nothing is
    /// appended to the chat.
    pub fn fail_turn(&mut self, notice: impl Into<String>) -> Result<(), StateError> {
        if !self.awaiting_reply {
            return Err(StateError::NoTurnInFlight);
        }

        self.awaiting_reply = false;
        self.notice = Some(notice.into());
        Ok(())
    }

    /// Fire any scheduled effect whose deadline has passed.
    ///
    /// Delivers the opening message (reserved id, fixed text) and applies
    /// the block transition. Deadlines are one-shot. Returns whether
    /// anything observable happened.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut fired = false;

        if self.opening_due.is_some_and(|due| now >= due) {
            self.opening_due = None;
            if self.status == GameStatus::Playing {
                self.messages.push(Message {
                    id: MessageId::opening(),
                    text: OPENING_LINE.to_string(),
                    sender: Sender::Partner,
                    timestamp: Utc::now(),
                });
                fired = true;
            }
        }

        if self.block_due.is_some_and(|due| now >= due) {
            self.block_due = None;
            if self.status == GameStatus::Playing {
                self.status = GameStatus::Blocked;
                fired = true;
            }
        }

        fired
    }

    /// Reset to the initial selection-screen state. Legal from any state;
    /// cancels pending deadlines and discards the partner and transcript.
    pub fn restart(&mut self) {
        *self = ChatState::new();
    }

    // =========================================================================
    // Read-only observation
    // =========================================================================

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn partner(&self) -> Option<&Partner> {
        self.partner.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Current irritation level, `0..=100`.
    pub fn irritation(&self) -> u8 {
        self.irritation
    }

    /// Whether a turn is open and input should be held back.
    pub fn awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// The recoverable notice, if one is showing.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}

impl Default for ChatState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing_state(now: Instant) -> ChatState {
        let mut state = ChatState::new();
        state.select_partner(Gender::Female, now).unwrap();
        state
    }

    fn reply(text: &str, increment: u8) -> PartnerReply {
        PartnerReply {
            reply: text.to_string(),
            irritation_increment: increment,
        }
    }

    #[test]
    fn test_fresh_state() {
        let state = ChatState::new();
        assert_eq!(state.status(), GameStatus::Selecting);
        assert!(state.partner().is_none());
        assert!(state.messages().is_empty());
        assert_eq!(state.irritation(), 0);
        assert!(!state.awaiting_reply());
        assert!(state.notice().is_none());
    }

    #[test]
    fn test_select_partner_starts_playing() {
        let now = Instant::now();
        let mut state = ChatState::new();
        state.select_partner(Gender::Male, now).unwrap();

        assert_eq!(state.status(), GameStatus::Playing);
        let partner = state.partner().unwrap();
        assert_eq!(partner.gender, Gender::Male);
        assert_eq!(partner.name, PARTNER_NAME);
        assert!(partner.avatar.contains("male_partner"));

        // No opening message until the delay elapses.
        assert!(state.messages().is_empty());
        assert!(!state.poll(now + OPENING_DELAY - Duration::from_millis(1)));
        assert!(state.messages().is_empty());
    }

    #[test]
    fn test_avatar_is_distinct_per_gender() {
        assert_ne!(
            Partner::new(Gender::Male).avatar,
            Partner::new(Gender::Female).avatar
        );
    }

    #[test]
    fn test_select_partner_twice_is_rejected() {
        let now = Instant::now();
        let mut state = playing_state(now);
        let before = state.clone();

        assert_eq!(
            state.select_partner(Gender::Male, now),
            Err(StateError::NotSelecting)
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_opening_message_delivered_once() {
        let now = Instant::now();
        let mut state = playing_state(now);

        assert!(state.poll(now + OPENING_DELAY));
        assert_eq!(state.message_count(), 1);

        let opening = state.last_message().unwrap();
        assert!(opening.id.is_opening());
        assert_eq!(opening.text, OPENING_LINE);
        assert_eq!(opening.sender, Sender::Partner);

        // The deadline is one-shot.
        assert!(!state.poll(now + OPENING_DELAY * 3));
        assert_eq!(state.message_count(), 1);
    }

    #[test]
    fn test_submit_before_opening_is_allowed() {
        let now = Instant::now();
        let mut state = playing_state(now);

        // The opening line is independent of turn-taking: the user may
        // write first, and the opening still lands on schedule.
        state.submit_message("Selam").unwrap();
        assert!(state.poll(now + OPENING_DELAY));
        assert_eq!(state.message_count(), 2);
        assert!(state.last_message().unwrap().id.is_opening());
    }

    #[test]
    fn test_submit_rules() {
        let now = Instant::now();

        let mut state = ChatState::new();
        assert_eq!(state.submit_message("Selam"), Err(StateError::NotPlaying));

        let mut state = playing_state(now);
        assert_eq!(state.submit_message("   "), Err(StateError::EmptyMessage));

        state.submit_message("Selam").unwrap();
        assert!(state.awaiting_reply());
        assert_eq!(
            state.submit_message("Orada mısın?"),
            Err(StateError::ReplyPending)
        );
        assert_eq!(state.message_count(), 1);
    }

    #[test]
    fn test_submit_trims_and_stamps() {
        let now = Instant::now();
        let mut state = playing_state(now);

        state.submit_message("  Selam  ").unwrap();
        let message = state.last_message().unwrap();
        assert_eq!(message.text, "Selam");
        assert_eq!(message.sender, Sender::User);
        assert!(!message.id.is_opening());
    }

    #[test]
    fn test_complete_turn_appends_and_raises() {
        let now = Instant::now();
        let mut state = playing_state(now);
        state.submit_message("Selam").unwrap();

        let level = state.complete_turn(reply("Peki.", 7), now).unwrap();
        assert_eq!(level, 7);
        assert_eq!(state.irritation(), 7);
        assert!(!state.awaiting_reply());
        assert_eq!(state.message_count(), 2);
        assert_eq!(state.last_message().unwrap().sender, Sender::Partner);
        assert_eq!(state.status(), GameStatus::Playing);
    }

    #[test]
    fn test_complete_turn_without_pending_is_rejected() {
        let now = Instant::now();
        let mut state = playing_state(now);

        assert_eq!(
            state.complete_turn(reply("Peki.", 7), now),
            Err(StateError::NoTurnInFlight)
        );
        assert_eq!(state.message_count(), 0);
    }

    #[test]
    fn test_irritation_clamps_at_ceiling() {
        let now = Instant::now();
        let mut state = playing_state(now);

        state.submit_message("Bir").unwrap();
        assert_eq!(state.complete_turn(reply("Hı.", 90), now).unwrap(), 90);

        state.submit_message("İki").unwrap();
        assert_eq!(state.complete_turn(reply("Yeter.", 250), now).unwrap(), 100);
        assert_eq!(state.irritation(), MAX_IRRITATION);
    }

    #[test]
    fn test_irritation_is_monotonic() {
        let now = Instant::now();
        let mut state = playing_state(now);
        let mut previous = state.irritation();

        for (i, increment) in [0u8, 3, 5, 0, 40, 80].into_iter().enumerate() {
            state.submit_message(&format!("mesaj {i}")).unwrap();
            let level = state.complete_turn(reply("Hı hı.", increment), now).unwrap();
            assert!(level >= previous);
            assert!(level <= MAX_IRRITATION);
            previous = level;
        }
    }

    #[test]
    fn test_block_fires_after_delay_and_is_terminal() {
        let now = Instant::now();
        let mut state = playing_state(now);

        state.submit_message("Selam").unwrap();
        state.complete_turn(reply("Engellendin.", 100), now).unwrap();

        // Still playing until the delay elapses; the terminal reply renders.
        assert_eq!(state.status(), GameStatus::Playing);
        assert!(!state.poll(now + BLOCK_DELAY - Duration::from_millis(1)));
        assert_eq!(state.status(), GameStatus::Playing);

        assert!(state.poll(now + BLOCK_DELAY));
        assert_eq!(state.status(), GameStatus::Blocked);

        // Blocked is terminal: no sending, no re-selection, no further polls.
        assert_eq!(state.submit_message("Açsana"), Err(StateError::NotPlaying));
        assert_eq!(
            state.select_partner(Gender::Male, now),
            Err(StateError::NotSelecting)
        );
        assert!(!state.poll(now + BLOCK_DELAY * 10));
        assert_eq!(state.status(), GameStatus::Blocked);
    }

    #[test]
    fn test_late_reply_after_block_still_lands() {
        let now = Instant::now();
        let mut state = playing_state(now);

        state.submit_message("Bir").unwrap();
        state.complete_turn(reply("Yeter.", 100), now).unwrap();

        // A message slipped in during the block window; its reply arrives
        // after the block fires and is simply covered by the block screen.
        state.submit_message("Dur bi").unwrap();
        state.poll(now + BLOCK_DELAY);
        assert_eq!(state.status(), GameStatus::Blocked);

        let level = state.complete_turn(reply("Hoşça kal.", 50), now).unwrap();
        assert_eq!(level, MAX_IRRITATION);
        assert_eq!(state.status(), GameStatus::Blocked);
    }

    #[test]
    fn test_fail_turn_sets_notice_only() {
        let now = Instant::now();
        let mut state = playing_state(now);
        state.submit_message("Selam").unwrap();

        state.fail_turn(CONNECTION_RESTRICTED_NOTICE).unwrap();

        assert!(!state.awaiting_reply());
        assert_eq!(state.notice(), Some(CONNECTION_RESTRICTED_NOTICE));
        assert_eq!(state.irritation(), 0);
        assert_eq!(state.status(), GameStatus::Playing);
        // Only the user message is in the transcript.
        assert_eq!(state.message_count(), 1);
        assert_eq!(state.last_message().unwrap().sender, Sender::User);
    }

    #[test]
    fn test_next_submit_clears_notice() {
        let now = Instant::now();
        let mut state = playing_state(now);

        state.submit_message("Selam").unwrap();
        state.fail_turn(CONNECTION_RESTRICTED_NOTICE).unwrap();
        assert!(state.notice().is_some());

        state.submit_message("Tekrar deniyorum").unwrap();
        assert!(state.notice().is_none());
    }

    #[test]
    fn test_restart_from_every_state() {
        let now = Instant::now();
        let fresh = ChatState::new();

        // From Selecting.
        let mut state = ChatState::new();
        state.restart();
        assert_eq!(state, fresh);

        // From Playing, mid-turn, with a pending opening message.
        let mut state = playing_state(now);
        state.submit_message("Selam").unwrap();
        state.restart();
        assert_eq!(state, fresh);
        // The cancelled opening never lands.
        assert!(!state.poll(now + OPENING_DELAY * 2));
        assert!(state.messages().is_empty());

        // From Blocked.
        let mut state = playing_state(now);
        state.submit_message("Selam").unwrap();
        state.complete_turn(reply("Yeter.", 100), now).unwrap();
        state.poll(now + BLOCK_DELAY);
        assert_eq!(state.status(), GameStatus::Blocked);
        state.restart();
        assert_eq!(state, fresh);

        // And the fresh state is playable again.
        state.select_partner(Gender::Male, now).unwrap();
        assert_eq!(state.status(), GameStatus::Playing);
    }

    #[test]
    fn test_message_ids_are_unique() {
        let now = Instant::now();
        let mut state = playing_state(now);

        state.poll(now + OPENING_DELAY);
        state.submit_message("Bir").unwrap();
        state.complete_turn(reply("Hı.", 1), now).unwrap();
        state.submit_message("İki").unwrap();
        state.complete_turn(reply("Peki.", 1), now).unwrap();

        let mut ids: Vec<_> = state.messages().iter().map(|m| m.id).collect();
        ids.sort_by_key(|id| id.0);
        ids.dedup();
        assert_eq!(ids.len(), state.message_count());
    }
}

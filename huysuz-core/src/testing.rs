//! Testing utilities for the chat simulation.
//!
//! This module provides tools for integration testing:
//! - `MockResponder` for deterministic turns without API calls
//! - `TestHarness` for scripted session scenarios with a synthetic clock
//! - Assertion helpers for verifying session state

use crate::responder::ResponderError;
use crate::state::{
    ChatState, GameStatus, Gender, PartnerReply, StateError, CONNECTION_RESTRICTED_NOTICE,
};
use std::time::{Duration, Instant};

/// A responder that replays scripted outcomes.
///
/// Use this for deterministic tests without API calls.
pub struct MockResponder {
    /// Scripted outcomes to return in order.
    script: Vec<Result<PartnerReply, ResponderError>>,
    /// Index of the next outcome.
    cursor: usize,
}

impl MockResponder {
    /// Create a mock with scripted outcomes.
    pub fn new(script: Vec<Result<PartnerReply, ResponderError>>) -> Self {
        Self { script, cursor: 0 }
    }

    /// Create an empty mock; queue outcomes afterwards.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Queue a successful reply.
    pub fn queue_reply(&mut self, text: impl Into<String>, increment: u8) {
        self.script.push(Ok(PartnerReply {
            reply: text.into(),
            irritation_increment: increment,
        }));
    }

    /// Queue a configuration failure.
    pub fn queue_failure(&mut self, error: ResponderError) {
        self.script.push(Err(error));
    }

    /// Take the next scripted outcome, or a harmless default once the
    /// script is exhausted.
    pub fn next_outcome(&mut self) -> Result<PartnerReply, ResponderError> {
        if self.cursor < self.script.len() {
            let outcome = self.script[self.cursor].clone();
            self.cursor += 1;
            outcome
        } else {
            Ok(PartnerReply {
                reply: "Hı hı.".to_string(),
                irritation_increment: 0,
            })
        }
    }

    /// How many scripted outcomes remain.
    pub fn remaining(&self) -> usize {
        self.script.len().saturating_sub(self.cursor)
    }

    /// Reset the cursor to replay from the beginning.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Test harness driving a session with a synthetic clock.
///
/// Replicates the session's turn orchestration against a [`MockResponder`],
/// so every delayed effect and failure path can be exercised without real
/// time or a real API.
pub struct TestHarness {
    /// The scripted responder.
    pub responder: MockResponder,
    /// The session state under test.
    pub state: ChatState,
    /// The synthetic "now"; advanced explicitly.
    now: Instant,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            responder: MockResponder::empty(),
            state: ChatState::new(),
            now: Instant::now(),
        }
    }

    /// Queue a successful reply.
    pub fn expect_reply(&mut self, text: impl Into<String>, increment: u8) -> &mut Self {
        self.responder.queue_reply(text, increment);
        self
    }

    /// Queue a configuration failure.
    pub fn expect_failure(&mut self, error: ResponderError) -> &mut Self {
        self.responder.queue_failure(error);
        self
    }

    /// Choose a partner at the current synthetic instant.
    pub fn choose_partner(&mut self, gender: Gender) {
        self.state
            .select_partner(gender, self.now)
            .expect("selection should be legal");
    }

    /// Advance the synthetic clock and fire due effects. Returns whether
    /// anything fired.
    pub fn advance(&mut self, duration: Duration) -> bool {
        self.now += duration;
        self.state.poll(self.now)
    }

    /// Open a turn without resolving it (the reply stays "in flight").
    pub fn begin_send(&mut self, text: &str) -> Result<(), StateError> {
        self.state.submit_message(text)
    }

    /// Resolve the open turn with the next scripted outcome. Failures are
    /// mapped to the connection notice, as the session does. Returns the
    /// irritation level after the turn.
    pub fn finish_send(&mut self) -> Result<u8, StateError> {
        match self.responder.next_outcome() {
            Ok(reply) => self.state.complete_turn(reply, self.now),
            Err(_) => {
                self.state.fail_turn(CONNECTION_RESTRICTED_NOTICE)?;
                Ok(self.state.irritation())
            }
        }
    }

    /// Run a full turn: submit, then resolve with the next scripted
    /// outcome.
    pub fn send(&mut self, text: &str) -> Result<u8, StateError> {
        self.begin_send(text)?;
        self.finish_send()
    }

    /// Restart the session; the script keeps playing from where it was.
    pub fn restart(&mut self) {
        self.state.restart();
    }

    /// Text of the last message, if any.
    pub fn last_text(&self) -> Option<&str> {
        self.state.last_message().map(|m| m.text.as_str())
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the session is in the given status.
#[track_caller]
pub fn assert_status(harness: &TestHarness, status: GameStatus) {
    assert_eq!(
        harness.state.status(),
        status,
        "Expected status {status:?}, got {:?}",
        harness.state.status()
    );
}

/// Assert the irritation level.
#[track_caller]
pub fn assert_irritation(harness: &TestHarness, level: u8) {
    assert_eq!(
        harness.state.irritation(),
        level,
        "Expected irritation {level}, got {}",
        harness.state.irritation()
    );
}

/// Assert the transcript length.
#[track_caller]
pub fn assert_message_count(harness: &TestHarness, count: usize) {
    assert_eq!(
        harness.state.message_count(),
        count,
        "Expected {count} messages, got {}",
        harness.state.message_count()
    );
}

/// Assert the recoverable notice is showing.
#[track_caller]
pub fn assert_notice_shown(harness: &TestHarness) {
    assert!(
        harness.state.notice().is_some(),
        "Expected the connection notice to be showing"
    );
}

/// Assert no notice is showing.
#[track_caller]
pub fn assert_no_notice(harness: &TestHarness) {
    assert!(
        harness.state.notice().is_none(),
        "Expected no notice, got {:?}",
        harness.state.notice()
    );
}

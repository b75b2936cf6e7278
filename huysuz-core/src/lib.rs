//! Grumpy-partner chat simulation engine.
//!
//! This crate provides:
//! - A single-session chat state machine (selection, play, blocked)
//! - An AI partner persona backed by Gemini, with deterministic fallbacks
//! - An irritation score that ends the session at 100
//! - A scripted test harness for running sessions without API calls
//!
//! # Quick Start
//!
//! ```ignore
//! use huysuz_core::{ChatSession, Gender};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = ChatSession::from_env();
//!     session.select_partner(Gender::Female)?;
//!
//!     let outcome = session.send_message("Selam, napıyorsun?").await?;
//!     println!("{} (sinir: {})", outcome.reply, outcome.irritation);
//!     Ok(())
//! }
//! ```

pub mod responder;
pub mod session;
pub mod state;
pub mod testing;

// Primary public API
pub use responder::{PartnerResponder, ResponderConfig, ResponderError, TRIP_POOL};
pub use session::{ChatSession, SessionConfig, SessionError, TurnOutcome};
pub use state::{
    ChatState, GameStatus, Gender, Message, MessageId, Partner, PartnerReply, Sender, StateError,
    BLOCK_DELAY, CONNECTION_RESTRICTED_NOTICE, MAX_IRRITATION, OPENING_DELAY, OPENING_LINE,
    PARTNER_NAME,
};
pub use testing::{MockResponder, TestHarness};

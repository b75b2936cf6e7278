//! AI partner responder.
//!
//! The responder turns a user message plus the current irritation level
//! into a [`PartnerReply`], either from Gemini or from a deterministic
//! fallback. It resolves for every input except the two configuration
//! failures, so the game stays playable while the remote side is degraded.

use crate::state::{Gender, PartnerReply, MAX_IRRITATION};
use gemini::{Content, Gemini, Request};
use rand::Rng;
use serde::Deserialize;
use thiserror::Error;

/// Stock partner lines used when the remote call fails, so the game keeps
/// going in character.
pub const TRIP_POOL: [&str; 17] = [
    "Şu an konuşasım yok gerçekten.",
    "Peki, öyle olsun bakalım.",
    "Her zamanki halin, şaşırmadım.",
    "Yazmasan da olurdu sanki.",
    "Anladım, işin benden daha önemli tabii.",
    "Tamam, sen haklısın (değilsin).",
    "Hıhı, kesin öyledir.",
    "Neyse, ben kaçtım.",
    "Görüldü mü atsam acaba?",
    "Sana söyleyecek söz bulamıyorum artık.",
    "İyi, güzel, harika. Başka?",
    "Bana masal anlatma artık.",
    "Gerçekten inanmamı mı bekliyorsun?",
    "Tamam.",
    "Peki.",
    "Öyle mi?",
    "Vay be, demek böyle olduk...",
];

/// Increment when a stock line stands in for the remote reply.
const STOCK_INCREMENT: u8 = 3;
/// Increment when the remote text could not be parsed as the reply object.
const RAW_TEXT_INCREMENT: u8 = 5;
/// How many characters of unparseable remote text to keep as the reply.
const RAW_TEXT_LIMIT: usize = 100;

/// Failures that reach the caller. Everything else is absorbed into a
/// fallback reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResponderError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    #[error("the generation service rejected the configured key")]
    KeyNotFound,
}

/// Configuration for the partner responder.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Model override (defaults to the gemini crate's flash model).
    pub model: Option<String>,

    /// Maximum tokens for replies.
    pub max_output_tokens: usize,

    /// Temperature for generation.
    pub temperature: Option<f32>,

    /// Extra persona instructions appended to the base prompt.
    pub custom_persona: Option<String>,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_output_tokens: 256,
            temperature: Some(0.9),
            custom_persona: None,
        }
    }
}

impl ResponderConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: usize) -> Self {
        self.max_output_tokens = tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_custom_persona(mut self, persona: impl Into<String>) -> Self {
        self.custom_persona = Some(persona.into());
        self
    }
}

/// The partner's reply engine.
///
/// Credential presence is captured at construction and checked once per
/// call; there are no ambient environment reads on the call path.
pub struct PartnerResponder {
    client: Option<Gemini>,
    config: ResponderConfig,
}

impl PartnerResponder {
    /// Create a responder with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Some(Gemini::new(api_key)),
            config: ResponderConfig::default(),
        }
    }

    /// Create a responder from the GEMINI_API_KEY environment variable.
    ///
    /// A missing key does not fail here: the responder is built
    /// unconfigured and every [`respond`](PartnerResponder::respond) call
    /// reports [`ResponderError::MissingApiKey`], which the session layer
    /// surfaces as a recoverable notice.
    pub fn from_env() -> Self {
        match Gemini::from_env() {
            Ok(client) => Self {
                client: Some(client),
                config: ResponderConfig::default(),
            },
            Err(_) => Self::unconfigured(),
        }
    }

    /// A responder with no credential at all.
    pub fn unconfigured() -> Self {
        Self {
            client: None,
            config: ResponderConfig::default(),
        }
    }

    /// Configure the responder.
    pub fn with_config(mut self, config: ResponderConfig) -> Self {
        self.config = config;
        self
    }

    /// Generate the partner's reply to a user message.
    ///
    /// Resolves with an in-character reply for every remote failure except
    /// a missing or rejected key. Malformed remote output degrades to a
    /// bounded prefix of the raw text; other remote errors degrade to a
    /// random stock line.
    pub async fn respond(
        &self,
        message: &str,
        irritation: u8,
        gender: Gender,
        partner_name: &str,
    ) -> Result<PartnerReply, ResponderError> {
        let client = self.client.as_ref().ok_or(ResponderError::MissingApiKey)?;

        let context = turn_context(message, irritation, gender, partner_name);
        let mut request = Request::new(vec![Content::user(context)])
            .with_system(self.persona_prompt())
            .with_max_output_tokens(self.config.max_output_tokens)
            .with_json_output();

        if let Some(ref model) = self.config.model {
            request = request.with_model(model);
        }
        if let Some(temperature) = self.config.temperature {
            request = request.with_temperature(temperature);
        }

        match client.generate(request).await {
            Ok(response) => Ok(parse_reply(&response.text())),
            Err(err) if err.is_not_found() => Err(ResponderError::KeyNotFound),
            Err(_) => Ok(stock_reply()),
        }
    }

    fn persona_prompt(&self) -> String {
        let mut prompt = String::from(include_str!("prompts/persona.txt"));
        if let Some(ref custom) = self.config.custom_persona {
            prompt.push_str("\n## Ek Talimatlar\n");
            prompt.push_str(custom);
        }
        prompt
    }
}

fn turn_context(message: &str, irritation: u8, gender: Gender, partner_name: &str) -> String {
    format!(
        "Kullanıcı: {message}\nPartner Durumu: {partner_name} ({}), Sinir: {irritation}/100",
        gender.display_name()
    )
}

/// Interpret the raw model output as a [`PartnerReply`].
///
/// The model is asked for a bare JSON object but routinely wraps it in
/// prose or a markdown fence, so the first `{` .. last `}` span is parsed.
/// Unparseable output degrades to a bounded prefix of the raw text, and an
/// empty response degrades to a stock line.
fn parse_reply(text: &str) -> PartnerReply {
    let text = text.trim();
    if text.is_empty() {
        return stock_reply();
    }

    if let Some(reply) = extract_reply_object(text) {
        return reply;
    }

    PartnerReply {
        reply: truncate_chars(text, RAW_TEXT_LIMIT),
        irritation_increment: RAW_TEXT_INCREMENT,
    }
}

#[derive(Deserialize)]
struct RawReply {
    reply: Option<String>,
    #[serde(rename = "irritationIncrement")]
    irritation_increment: Option<i64>,
}

fn extract_reply_object(text: &str) -> Option<PartnerReply> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let raw: RawReply = serde_json::from_str(&text[start..=end]).ok()?;
    let reply = raw.reply.filter(|r| !r.trim().is_empty())?;

    Some(PartnerReply {
        reply,
        irritation_increment: clamp_increment(raw.irritation_increment),
    })
}

/// Missing increments fall back to the raw-text constant; out-of-range
/// values clamp into `0..=100` so a confused model can never lower the
/// score or overflow it.
fn clamp_increment(value: Option<i64>) -> u8 {
    value
        .unwrap_or(RAW_TEXT_INCREMENT as i64)
        .clamp(0, MAX_IRRITATION as i64) as u8
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// A random line from the stock pool with the fixed fallback increment.
fn stock_reply() -> PartnerReply {
    let line = TRIP_POOL[rand::thread_rng().gen_range(0..TRIP_POOL.len())];
    PartnerReply {
        reply: line.to_string(),
        irritation_increment: STOCK_INCREMENT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_embedded_object() {
        let reply = parse_reply(
            "prefix-noise {\"reply\":\"Peki\",\"irritationIncrement\":7} trailing-noise",
        );
        assert_eq!(reply.reply, "Peki");
        assert_eq!(reply.irritation_increment, 7);
    }

    #[test]
    fn test_extracts_from_markdown_fence() {
        let reply = parse_reply(
            "```json\n{\"reply\": \"Öyle mi?\", \"irritationIncrement\": 12}\n```",
        );
        assert_eq!(reply.reply, "Öyle mi?");
        assert_eq!(reply.irritation_increment, 12);
    }

    #[test]
    fn test_plain_prose_truncates_to_hundred_chars() {
        let prose = "x".repeat(250);
        let reply = parse_reply(&prose);
        assert_eq!(reply.reply.chars().count(), RAW_TEXT_LIMIT);
        assert_eq!(reply.irritation_increment, RAW_TEXT_INCREMENT);
    }

    #[test]
    fn test_short_prose_kept_whole() {
        let reply = parse_reply("Neyse.");
        assert_eq!(reply.reply, "Neyse.");
        assert_eq!(reply.irritation_increment, RAW_TEXT_INCREMENT);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // Turkish letters are multi-byte; a byte slice at 100 would panic.
        let prose = "ğüşiöçİ".repeat(40);
        let reply = parse_reply(&prose);
        assert_eq!(reply.reply.chars().count(), RAW_TEXT_LIMIT);
    }

    #[test]
    fn test_negative_increment_clamps_to_zero() {
        let reply = parse_reply("{\"reply\":\"Tamam.\",\"irritationIncrement\":-20}");
        assert_eq!(reply.irritation_increment, 0);
    }

    #[test]
    fn test_oversized_increment_clamps_to_ceiling() {
        let reply = parse_reply("{\"reply\":\"Yeter.\",\"irritationIncrement\":5000}");
        assert_eq!(reply.irritation_increment, MAX_IRRITATION);
    }

    #[test]
    fn test_missing_increment_defaults() {
        let reply = parse_reply("{\"reply\":\"Hıhı.\"}");
        assert_eq!(reply.reply, "Hıhı.");
        assert_eq!(reply.irritation_increment, RAW_TEXT_INCREMENT);
    }

    #[test]
    fn test_object_without_reply_falls_back_to_raw_text() {
        let text = "{\"irritationIncrement\": 9}";
        let reply = parse_reply(text);
        assert_eq!(reply.reply, text);
        assert_eq!(reply.irritation_increment, RAW_TEXT_INCREMENT);
    }

    #[test]
    fn test_empty_output_uses_stock_pool() {
        let reply = parse_reply("   ");
        assert!(TRIP_POOL.contains(&reply.reply.as_str()));
        assert_eq!(reply.irritation_increment, STOCK_INCREMENT);
    }

    #[test]
    fn test_stock_reply_stays_in_pool() {
        for _ in 0..50 {
            let reply = stock_reply();
            assert!(TRIP_POOL.contains(&reply.reply.as_str()));
            assert_eq!(reply.irritation_increment, STOCK_INCREMENT);
        }
    }

    #[test]
    fn test_turn_context_carries_state() {
        let context = turn_context("Selam", 42, Gender::Female, "Partnerim");
        assert!(context.contains("Kullanıcı: Selam"));
        assert!(context.contains("Kadın"));
        assert!(context.contains("42/100"));
    }

    #[tokio::test]
    async fn test_unconfigured_responder_rejects_distinctly() {
        let responder = PartnerResponder::unconfigured();
        let result = responder.respond("Selam", 0, Gender::Male, "Partnerim").await;
        assert_eq!(result, Err(ResponderError::MissingApiKey));
    }

    #[test]
    fn test_config_builder() {
        let config = ResponderConfig::default()
            .with_model("gemini-3-pro-preview")
            .with_max_output_tokens(128)
            .with_temperature(0.5)
            .with_custom_persona("Bugün özellikle alıngan.");

        assert_eq!(config.model.as_deref(), Some("gemini-3-pro-preview"));
        assert_eq!(config.max_output_tokens, 128);
        assert_eq!(config.temperature, Some(0.5));
        assert!(config.custom_persona.is_some());
    }
}

//! Request and response types shared by the client and the service.

use serde::{Deserialize, Serialize};

/// Speaker of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human user.
    User,
    /// The companion.
    Assistant,
}

impl Role {
    /// Wire name used by chat-style APIs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One turn of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who spoke.
    pub role: Role,
    /// What was said.
    pub text: String,
}

impl ChatTurn {
    /// A user turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// A companion turn.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Sampling settings for one call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum output tokens.
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.75,
            max_tokens: 700,
        }
    }
}

/// A fully assembled generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Persona and instructions.
    pub system: String,
    /// Prior turns, oldest first.
    pub history: Vec<ChatTurn>,
    /// The new message to respond to.
    pub prompt: String,
    /// Sampling settings.
    pub config: GenerationConfig,
    /// Whether the model was asked for `{internal_thought, spoken_response}`
    /// JSON. When `false` the raw text is returned as `spoken_text`.
    pub structured: bool,
}

impl GenerationRequest {
    /// A single-shot request with no system prompt or history, as used for
    /// analysis passes.
    #[must_use]
    pub fn single(prompt: impl Into<String>, config: GenerationConfig) -> Self {
        Self {
            system: String::new(),
            history: Vec::new(),
            prompt: prompt.into(),
            config,
            structured: false,
        }
    }
}

/// The result of a generation call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Generation {
    /// Text meant for the user (or the raw output for unstructured calls).
    pub spoken_text: String,
    /// Private reasoning, when the model supplied it.
    pub internal_thought: Option<String>,
}

/// Raw completion returned by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// The generated text.
    pub text: String,
    /// Tokens generated, when the backend reports it.
    pub tokens_generated: u32,
    /// Wall-clock latency in milliseconds.
    pub latency_ms: u64,
    /// Model that answered.
    pub model: String,
}

/// One characteristic proposed by an analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedItem {
    /// Characteristic kind tag, e.g. `preference`.
    pub trait_type: String,
    /// De-duplication key.
    pub trait_key: String,
    /// Learned value.
    pub trait_value: String,
    /// Adjustment to the default initial relevance.
    #[serde(default)]
    pub relevance_score_modifier: f32,
}

/// What the model extracted from a user's correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionAnalysis {
    /// What the companion got wrong.
    #[serde(default)]
    pub error_summary: String,
    /// The fact or preference to remember instead.
    pub corrected_fact: String,
    /// `factual_correction` or `user_preference`.
    #[serde(default)]
    pub learning_point_type: String,
}

//! Characteristic memory: relevance-scored facts about the user and the
//! companion itself.
//!
//! - [`store`] — reinforcement, trait-gated conflict resolution, decay and
//!   eviction over the in-memory record set
//! - [`ranking`] — read-time recency weighting for `get_top`

pub mod ranking;
pub mod store;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnimaError;
use crate::personality::PersonalityTraits;
use crate::types::{CharacteristicId, Timestamp, clamp_unit};

pub use ranking::RankedCharacteristic;
pub use store::{CharacteristicStore, UpsertOutcome};

/// What sort of fact a characteristic records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicKind {
    /// Something the user likes or dislikes.
    Preference,
    /// A recurring behaviour of the user.
    Habit,
    /// A plain fact about the user.
    UserInfo,
    /// A topic the user enjoys discussing.
    FavoriteTopic,
    /// A quirk of the companion's own speech or behaviour.
    Quirk,
    /// A phrasing pattern of the companion.
    LanguagePattern,
    /// Something the companion believes about itself.
    SelfConcept,
    /// Summary of a key shared memory.
    KeyMemorySummary,
    /// How the user wants to be answered.
    ResponseStyle,
}

impl CharacteristicKind {
    /// All kinds.
    pub const ALL: [CharacteristicKind; 9] = [
        Self::Preference,
        Self::Habit,
        Self::UserInfo,
        Self::FavoriteTopic,
        Self::Quirk,
        Self::LanguagePattern,
        Self::SelfConcept,
        Self::KeyMemorySummary,
        Self::ResponseStyle,
    ];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preference => "preference",
            Self::Habit => "habit",
            Self::UserInfo => "user_info",
            Self::FavoriteTopic => "favorite_topic",
            Self::Quirk => "quirk",
            Self::LanguagePattern => "language_pattern",
            Self::SelfConcept => "self_concept",
            Self::KeyMemorySummary => "key_memory_summary",
            Self::ResponseStyle => "response_style",
        }
    }
}

impl fmt::Display for CharacteristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CharacteristicKind {
    type Err = AnimaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        if needle == "pet_self_concept" {
            return Ok(Self::SelfConcept);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| AnimaError::unknown("characteristic kind", s))
    }
}

/// Where an observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicSource {
    /// The user said it outright.
    UserDirectStatement,
    /// Implied by something the user said.
    UserImpliedPreference,
    /// The user gave positive feedback.
    UserFeedbackPositive,
    /// The user gave negative feedback or a correction.
    UserFeedbackNegative,
    /// Language inference over the user's text.
    LlmInferenceUserText,
    /// Language inference over the companion's text.
    LlmInferencePetText,
    /// The companion noticed it about itself.
    PetSelfObservation,
    /// Created by the engine.
    SystemInitiated,
    /// Matched by a text pattern.
    RegexPatternMatch,
}

impl CharacteristicSource {
    /// All sources.
    pub const ALL: [CharacteristicSource; 9] = [
        Self::UserDirectStatement,
        Self::UserImpliedPreference,
        Self::UserFeedbackPositive,
        Self::UserFeedbackNegative,
        Self::LlmInferenceUserText,
        Self::LlmInferencePetText,
        Self::PetSelfObservation,
        Self::SystemInitiated,
        Self::RegexPatternMatch,
    ];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserDirectStatement => "user_direct_statement",
            Self::UserImpliedPreference => "user_implied_preference",
            Self::UserFeedbackPositive => "user_feedback_positive",
            Self::UserFeedbackNegative => "user_feedback_negative",
            Self::LlmInferenceUserText => "llm_inference_user_text",
            Self::LlmInferencePetText => "llm_inference_pet_text",
            Self::PetSelfObservation => "pet_self_observation",
            Self::SystemInitiated => "system_initiated",
            Self::RegexPatternMatch => "regex_pattern_match",
        }
    }
}

impl fmt::Display for CharacteristicSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CharacteristicSource {
    type Err = AnimaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| AnimaError::unknown("characteristic source", s))
    }
}

/// One learned fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Characteristic {
    /// Globally unique ID.
    pub id: CharacteristicId,
    /// What sort of fact this is.
    pub kind: CharacteristicKind,
    /// De-duplication key; `None` means records are matched by value.
    pub key: Option<String>,
    /// The fact itself.
    pub value: String,
    /// Stored relevance in `[0, 1]`.
    pub relevance: f32,
    /// When the record was first written.
    pub created_at: Timestamp,
    /// Last time the record was read or written.
    pub last_accessed_at: Timestamp,
    /// Last time the record was confirmed or overwritten.
    pub last_reinforced_at: Timestamp,
    /// Where the current value came from.
    pub source: CharacteristicSource,
    /// Incremented on every reinforcement or overwrite.
    pub version: u32,
}

impl Characteristic {
    /// A fresh record stamped at `now`.
    #[must_use]
    pub fn new(
        kind: CharacteristicKind,
        key: Option<String>,
        value: impl Into<String>,
        source: CharacteristicSource,
        relevance: f32,
        now: Timestamp,
    ) -> Self {
        Self {
            id: CharacteristicId::new(),
            kind,
            key,
            value: value.into(),
            relevance: clamp_unit(relevance),
            created_at: now,
            last_accessed_at: now,
            last_reinforced_at: now,
            source,
            version: 1,
        }
    }

    /// The more recent of the access and reinforcement stamps.
    #[must_use]
    pub fn last_used(&self) -> Timestamp {
        self.last_accessed_at.max(self.last_reinforced_at)
    }
}

/// Initial relevance: up-weighted by openness, down-weighted by
/// neuroticism.
#[must_use]
pub fn initial_relevance(base: f32, traits: &PersonalityTraits) -> f32 {
    clamp_unit(
        base * (1.0 + (traits.openness - 0.5) * 0.2) * (1.0 - (traits.neuroticism - 0.5) * 0.15),
    )
}

/// Relevance added by one reinforcement, scaled by conscientiousness.
#[must_use]
pub fn reinforcement_increment(base_increment: f32, traits: &PersonalityTraits) -> f32 {
    base_increment * (1.0 + (traits.conscientiousness - 0.5) * 0.2)
}

/// Normalise a learned key: trimmed, lowercase, spaces become `_`.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_legacy_alias() {
        assert_eq!(
            "pet_self_concept".parse::<CharacteristicKind>().ok(),
            Some(CharacteristicKind::SelfConcept)
        );
        assert!("hobby".parse::<CharacteristicKind>().is_err());
    }

    #[test]
    fn openness_raises_initial_relevance() {
        let open = PersonalityTraits {
            openness: 1.0,
            ..PersonalityTraits::default()
        };
        let anxious = PersonalityTraits {
            neuroticism: 1.0,
            ..PersonalityTraits::default()
        };
        let base = PersonalityTraits::default();
        assert!(initial_relevance(0.5, &open) > initial_relevance(0.5, &base));
        assert!(initial_relevance(0.5, &anxious) < initial_relevance(0.5, &base));
        assert!((initial_relevance(0.5, &base) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn keys_are_normalised() {
        assert_eq!(normalize_key("  Favorite  Food "), "favorite_food");
    }
}

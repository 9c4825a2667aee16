//! The fixed emotion vocabulary.
//!
//! 51 named emotions, split into a positive set (22), a negative set (26)
//! and three untagged entries (`interest`, `sympathy`, `neutral`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnimaError;

/// Number of emotions in the vocabulary.
pub const EMOTION_COUNT: usize = 51;

/// Valence tag of an emotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Member of the positive set.
    Positive,
    /// Member of the negative set.
    Negative,
    /// In neither set.
    Untagged,
}

/// A named discrete emotion.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Admiration,
    Adoration,
    AestheticAppreciation,
    Amusement,
    Anxiety,
    Awe,
    Awkwardness,
    Boredom,
    Calmness,
    Confusion,
    Craving,
    Disgust,
    EmpatheticPain,
    Entrancement,
    Envy,
    Excitement,
    Fear,
    Horror,
    Interest,
    Joy,
    Nostalgia,
    Romance,
    Sadness,
    Satisfaction,
    SexualDesire,
    Sympathy,
    Triumph,
    Anger,
    Guilt,
    Pride,
    Shame,
    Embarrassment,
    Relief,
    Hope,
    Gratitude,
    Compassion,
    Love,
    Hatred,
    Jealousy,
    Frustration,
    Disappointment,
    Contentment,
    Optimism,
    Pessimism,
    Trust,
    Distrust,
    Surprise,
    Anticipation,
    Regret,
    Remorse,
    Neutral,
}

impl Emotion {
    /// Every emotion, in index order.
    pub const ALL: [Emotion; EMOTION_COUNT] = [
        Emotion::Admiration,
        Emotion::Adoration,
        Emotion::AestheticAppreciation,
        Emotion::Amusement,
        Emotion::Anxiety,
        Emotion::Awe,
        Emotion::Awkwardness,
        Emotion::Boredom,
        Emotion::Calmness,
        Emotion::Confusion,
        Emotion::Craving,
        Emotion::Disgust,
        Emotion::EmpatheticPain,
        Emotion::Entrancement,
        Emotion::Envy,
        Emotion::Excitement,
        Emotion::Fear,
        Emotion::Horror,
        Emotion::Interest,
        Emotion::Joy,
        Emotion::Nostalgia,
        Emotion::Romance,
        Emotion::Sadness,
        Emotion::Satisfaction,
        Emotion::SexualDesire,
        Emotion::Sympathy,
        Emotion::Triumph,
        Emotion::Anger,
        Emotion::Guilt,
        Emotion::Pride,
        Emotion::Shame,
        Emotion::Embarrassment,
        Emotion::Relief,
        Emotion::Hope,
        Emotion::Gratitude,
        Emotion::Compassion,
        Emotion::Love,
        Emotion::Hatred,
        Emotion::Jealousy,
        Emotion::Frustration,
        Emotion::Disappointment,
        Emotion::Contentment,
        Emotion::Optimism,
        Emotion::Pessimism,
        Emotion::Trust,
        Emotion::Distrust,
        Emotion::Surprise,
        Emotion::Anticipation,
        Emotion::Regret,
        Emotion::Remorse,
        Emotion::Neutral,
    ];

    /// Position of this emotion in [`Emotion::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The snake_case wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Admiration => "admiration",
            Emotion::Adoration => "adoration",
            Emotion::AestheticAppreciation => "aesthetic_appreciation",
            Emotion::Amusement => "amusement",
            Emotion::Anxiety => "anxiety",
            Emotion::Awe => "awe",
            Emotion::Awkwardness => "awkwardness",
            Emotion::Boredom => "boredom",
            Emotion::Calmness => "calmness",
            Emotion::Confusion => "confusion",
            Emotion::Craving => "craving",
            Emotion::Disgust => "disgust",
            Emotion::EmpatheticPain => "empathetic_pain",
            Emotion::Entrancement => "entrancement",
            Emotion::Envy => "envy",
            Emotion::Excitement => "excitement",
            Emotion::Fear => "fear",
            Emotion::Horror => "horror",
            Emotion::Interest => "interest",
            Emotion::Joy => "joy",
            Emotion::Nostalgia => "nostalgia",
            Emotion::Romance => "romance",
            Emotion::Sadness => "sadness",
            Emotion::Satisfaction => "satisfaction",
            Emotion::SexualDesire => "sexual_desire",
            Emotion::Sympathy => "sympathy",
            Emotion::Triumph => "triumph",
            Emotion::Anger => "anger",
            Emotion::Guilt => "guilt",
            Emotion::Pride => "pride",
            Emotion::Shame => "shame",
            Emotion::Embarrassment => "embarrassment",
            Emotion::Relief => "relief",
            Emotion::Hope => "hope",
            Emotion::Gratitude => "gratitude",
            Emotion::Compassion => "compassion",
            Emotion::Love => "love",
            Emotion::Hatred => "hatred",
            Emotion::Jealousy => "jealousy",
            Emotion::Frustration => "frustration",
            Emotion::Disappointment => "disappointment",
            Emotion::Contentment => "contentment",
            Emotion::Optimism => "optimism",
            Emotion::Pessimism => "pessimism",
            Emotion::Trust => "trust",
            Emotion::Distrust => "distrust",
            Emotion::Surprise => "surprise",
            Emotion::Anticipation => "anticipation",
            Emotion::Regret => "regret",
            Emotion::Remorse => "remorse",
            Emotion::Neutral => "neutral",
        }
    }

    /// Which valence-tagged set this emotion belongs to.
    #[must_use]
    pub fn polarity(self) -> Polarity {
        match self {
            Emotion::Admiration
            | Emotion::Adoration
            | Emotion::AestheticAppreciation
            | Emotion::Amusement
            | Emotion::Awe
            | Emotion::Calmness
            | Emotion::Entrancement
            | Emotion::Excitement
            | Emotion::Joy
            | Emotion::Romance
            | Emotion::Satisfaction
            | Emotion::SexualDesire
            | Emotion::Triumph
            | Emotion::Pride
            | Emotion::Relief
            | Emotion::Hope
            | Emotion::Gratitude
            | Emotion::Compassion
            | Emotion::Love
            | Emotion::Contentment
            | Emotion::Optimism
            | Emotion::Trust => Polarity::Positive,
            Emotion::Anxiety
            | Emotion::Awkwardness
            | Emotion::Boredom
            | Emotion::Confusion
            | Emotion::Craving
            | Emotion::Disgust
            | Emotion::EmpatheticPain
            | Emotion::Envy
            | Emotion::Fear
            | Emotion::Horror
            | Emotion::Nostalgia
            | Emotion::Sadness
            | Emotion::Anger
            | Emotion::Guilt
            | Emotion::Shame
            | Emotion::Embarrassment
            | Emotion::Hatred
            | Emotion::Jealousy
            | Emotion::Frustration
            | Emotion::Disappointment
            | Emotion::Pessimism
            | Emotion::Distrust
            | Emotion::Surprise
            | Emotion::Anticipation
            | Emotion::Regret
            | Emotion::Remorse => Polarity::Negative,
            Emotion::Interest | Emotion::Sympathy | Emotion::Neutral => Polarity::Untagged,
        }
    }

    /// Whether this emotion is in the positive set.
    #[must_use]
    pub fn is_positive(self) -> bool {
        self.polarity() == Polarity::Positive
    }

    /// Whether this emotion is in the negative set.
    #[must_use]
    pub fn is_negative(self) -> bool {
        self.polarity() == Polarity::Negative
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = AnimaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Emotion::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == needle)
            .ok_or_else(|| AnimaError::unknown("emotion", s))
    }
}

//! Discrete emotions and core affect.
//!
//! [`EmotionState`] holds one intensity per vocabulary entry; because it is
//! backed by a fixed-size array indexed by [`Emotion`], no entry can ever be
//! missing. [`affect::CoreAffect`] is the continuous valence/arousal layer
//! that drives the discrete vector through [`affect::map_to_discrete`].

pub mod affect;
pub mod vocabulary;

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use crate::types::clamp_or;
pub use vocabulary::{EMOTION_COUNT, Emotion, Polarity};

/// Changes smaller than this are not applied by decay.
const DECAY_EPSILON: f32 = 0.001;
/// Changes smaller than this are not applied by fluctuation.
const FLUCTUATION_EPSILON: f32 = 0.005;

/// A single applied intensity change, reported for write-through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionChange {
    /// Which emotion moved.
    pub emotion: Emotion,
    /// Intensity before the change.
    pub old: f32,
    /// Intensity after the change.
    pub new: f32,
}

impl EmotionChange {
    /// Signed size of the change.
    #[must_use]
    pub fn delta(&self) -> f32 {
        self.new - self.old
    }
}

/// Presentation-level mood derived from the dominant emotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMood {
    /// Nothing stands out.
    Neutral,
    /// Joy-like emotions dominate.
    Happy,
    /// Excitement dominates.
    Excited,
    /// Sadness-like emotions dominate.
    Sad,
    /// Anger-like emotions dominate.
    Angry,
    /// Fear-like emotions dominate.
    Anxious,
    /// Boredom dominates.
    Bored,
}

impl DisplayMood {
    fn for_emotion(emotion: Emotion) -> Self {
        use Emotion as E;
        match emotion {
            E::Joy
            | E::Adoration
            | E::Contentment
            | E::Satisfaction
            | E::Relief
            | E::Hope
            | E::Optimism
            | E::Love
            | E::Gratitude
            | E::Amusement
            | E::Triumph => Self::Happy,
            E::Excitement => Self::Excited,
            E::Sadness | E::Disappointment | E::EmpatheticPain | E::Regret | E::Shame | E::Guilt => {
                Self::Sad
            }
            E::Anger | E::Frustration | E::Hatred | E::Jealousy | E::Disgust => Self::Angry,
            E::Anxiety | E::Fear | E::Horror | E::Awkwardness | E::Confusion | E::Distrust => {
                Self::Anxious
            }
            E::Boredom => Self::Bored,
            _ => Self::Neutral,
        }
    }
}

impl fmt::Display for DisplayMood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Excited => "excited",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Anxious => "anxious",
            Self::Bored => "bored",
        };
        f.write_str(s)
    }
}

/// Intensity of every emotion in the vocabulary, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<Emotion, f32>", from = "BTreeMap<Emotion, f32>")]
pub struct EmotionState {
    values: [f32; EMOTION_COUNT],
}

impl Default for EmotionState {
    fn default() -> Self {
        Self::uniform(0.5)
    }
}

impl From<EmotionState> for BTreeMap<Emotion, f32> {
    fn from(state: EmotionState) -> Self {
        state.iter().collect()
    }
}

impl From<BTreeMap<Emotion, f32>> for EmotionState {
    fn from(map: BTreeMap<Emotion, f32>) -> Self {
        let mut state = Self::default();
        for (emotion, value) in map {
            state.set(emotion, value);
        }
        state
    }
}

impl EmotionState {
    /// Every emotion at the same intensity.
    #[must_use]
    pub fn uniform(value: f32) -> Self {
        Self {
            values: [clamp_or(value, 0.0, 1.0, 0.5); EMOTION_COUNT],
        }
    }

    /// Current intensity of `emotion`.
    #[must_use]
    pub fn get(&self, emotion: Emotion) -> f32 {
        self.values[emotion.index()]
    }

    /// Set an intensity, clamping into `[0, 1]` (NaN leaves the value as
    /// is). Returns the applied change.
    pub fn set(&mut self, emotion: Emotion, value: f32) -> EmotionChange {
        let old = self.get(emotion);
        let new = clamp_or(value, 0.0, 1.0, old);
        self.values[emotion.index()] = new;
        EmotionChange { emotion, old, new }
    }

    /// Iterate over `(emotion, intensity)` in vocabulary order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        Emotion::ALL.iter().map(|&e| (e, self.get(e)))
    }

    /// Pull every emotion except `neutral` toward `baseline`.
    ///
    /// The step is `(v - baseline) * decay_rate * (1 - stability)` with a
    /// ±20% random jitter; it never crosses the baseline. Steps below
    /// 0.001 are skipped.
    pub fn decay(
        &mut self,
        decay_rate: f32,
        stability: f32,
        baseline: f32,
        rng: &mut impl Rng,
    ) -> Vec<EmotionChange> {
        let effective = (decay_rate * (1.0 - clamp_or(stability, 0.0, 1.0, 0.5))).max(0.0);
        let mut changes = Vec::new();
        for emotion in Emotion::ALL {
            if emotion == Emotion::Neutral {
                continue;
            }
            let old = self.get(emotion);
            let jitter = rng.gen_range(0.8..1.2_f32);
            let step = ((old - baseline) * effective * jitter).clamp(-1.0, 1.0);
            let mut new = old - step;
            if (old > baseline && new < baseline) || (old < baseline && new > baseline) {
                new = baseline;
            }
            if (new - old).abs() > DECAY_EPSILON {
                changes.push(self.set(emotion, new));
            }
        }
        changes
    }

    /// Nudge one to three random non-neutral emotions by a small signed
    /// amount, damped by `stability` and amplified by `sensitivity`.
    pub fn apply_random_fluctuation(
        &mut self,
        stability: f32,
        sensitivity: f32,
        amplitude: f32,
        rng: &mut impl Rng,
    ) -> Vec<EmotionChange> {
        let stability = clamp_or(stability, 0.0, 1.0, 0.5);
        let sensitivity = clamp_or(sensitivity, 0.0, 2.0, 1.0);
        let amplitude = amplitude.abs();
        let candidates = EMOTION_COUNT - 1;
        let picks = rng.gen_range(1..=3);
        let mut changes = Vec::new();
        for i in index::sample(rng, candidates, picks) {
            // Neutral is the last vocabulary entry, so indices below it are
            // exactly the candidates.
            let emotion = Emotion::ALL[i];
            let raw = if amplitude > 0.0 {
                rng.gen_range(-amplitude..amplitude)
            } else {
                0.0
            };
            let delta = raw * (1.0 - stability * 0.8) * (sensitivity * 0.5 + 0.5);
            if delta.abs() > FLUCTUATION_EPSILON {
                changes.push(self.set(emotion, self.get(emotion) + delta));
            }
        }
        changes
    }

    /// Raise each of `emotions` by `amount * (1 - v)`.
    pub fn boost(&mut self, emotions: &[Emotion], amount: f32) -> Vec<EmotionChange> {
        let amount = clamp_or(amount, 0.0, 1.0, 0.0);
        emotions
            .iter()
            .map(|&e| {
                let v = self.get(e);
                self.set(e, v + amount * (1.0 - v))
            })
            .filter(|c| c.delta().abs() > f32::EPSILON)
            .collect()
    }

    /// Lower `emotion` by `amount`, flooring at zero.
    pub fn reduce(&mut self, emotion: Emotion, amount: f32) -> EmotionChange {
        let v = self.get(emotion);
        self.set(emotion, v - amount.max(0.0))
    }

    /// The most intense emotion other than `neutral`. Ties resolve to the
    /// earlier vocabulary entry.
    #[must_use]
    pub fn dominant(&self) -> (Emotion, f32) {
        self.iter()
            .filter(|(e, _)| *e != Emotion::Neutral)
            .fold((Emotion::Neutral, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best })
    }

    /// The most intense negative-set emotion.
    #[must_use]
    pub fn strongest_negative(&self) -> (Emotion, f32) {
        self.iter()
            .filter(|(e, _)| e.is_negative())
            .fold((Emotion::Sadness, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best })
    }

    /// Map the dominant emotion to a presentation mood. Below `threshold`
    /// the mood is neutral.
    #[must_use]
    pub fn display_mood(&self, threshold: f32) -> DisplayMood {
        let (emotion, value) = self.dominant();
        if value < threshold {
            DisplayMood::Neutral
        } else {
            DisplayMood::for_emotion(emotion)
        }
    }

    /// Emotions at or above `min`, strongest first.
    #[must_use]
    pub fn salient(&self, min: f32, limit: usize) -> Vec<(Emotion, f32)> {
        let mut out: Vec<_> = self
            .iter()
            .filter(|(e, v)| *e != Emotion::Neutral && *v >= min)
            .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1));
        out.truncate(limit);
        out
    }
}

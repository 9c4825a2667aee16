//! OCEAN personality traits and event-driven drift.
//!
//! Traits move only through [`handle_event`]. The applied delta is
//!
//! ```text
//! actual = base * strength * stability_factor * resistance
//! stability_factor = 1 - stability_weight * mood_stability
//! resistance = max(floor, 1 - |v - 0.5| * k)
//! ```
//!
//! so a trait near either extreme barely moves, and a stable mood damps
//! drift.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::PersonalityConfig;
use crate::emotion::Polarity;
use crate::events::SignificantEvent;
use crate::types::{clamp_factor, clamp_or, clamp_unit};

/// Big Five personality traits, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityTraits {
    /// Curiosity and willingness to revise beliefs.
    pub openness: f32,
    /// Diligence and self-discipline.
    pub conscientiousness: f32,
    /// Sociability and expressiveness.
    pub extraversion: f32,
    /// Warmth and cooperativeness.
    pub agreeableness: f32,
    /// Tendency toward negative affect.
    pub neuroticism: f32,
}

impl Default for PersonalityTraits {
    fn default() -> Self {
        Self {
            openness: 0.5,
            conscientiousness: 0.5,
            extraversion: 0.5,
            agreeableness: 0.5,
            neuroticism: 0.5,
        }
    }
}

/// One of the five OCEAN dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    /// Openness to experience.
    Openness,
    /// Conscientiousness.
    Conscientiousness,
    /// Extraversion.
    Extraversion,
    /// Agreeableness.
    Agreeableness,
    /// Neuroticism.
    Neuroticism,
}

impl Trait {
    /// All five traits in OCEAN order.
    pub const ALL: [Trait; 5] = [
        Trait::Openness,
        Trait::Conscientiousness,
        Trait::Extraversion,
        Trait::Agreeableness,
        Trait::Neuroticism,
    ];
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trait::Openness => "openness",
            Trait::Conscientiousness => "conscientiousness",
            Trait::Extraversion => "extraversion",
            Trait::Agreeableness => "agreeableness",
            Trait::Neuroticism => "neuroticism",
        };
        f.write_str(s)
    }
}

impl PersonalityTraits {
    /// Build traits, clamping each into `[0, 1]` (NaN becomes 0.5).
    #[must_use]
    pub fn new(o: f32, c: f32, e: f32, a: f32, n: f32) -> Self {
        let f = |v: f32| clamp_or(v, 0.0, 1.0, 0.5);
        Self {
            openness: f(o),
            conscientiousness: f(c),
            extraversion: f(e),
            agreeableness: f(a),
            neuroticism: f(n),
        }
    }

    /// Read one trait.
    #[must_use]
    pub fn get(&self, t: Trait) -> f32 {
        match t {
            Trait::Openness => self.openness,
            Trait::Conscientiousness => self.conscientiousness,
            Trait::Extraversion => self.extraversion,
            Trait::Agreeableness => self.agreeableness,
            Trait::Neuroticism => self.neuroticism,
        }
    }

    fn slot(&mut self, t: Trait) -> &mut f32 {
        match t {
            Trait::Openness => &mut self.openness,
            Trait::Conscientiousness => &mut self.conscientiousness,
            Trait::Extraversion => &mut self.extraversion,
            Trait::Agreeableness => &mut self.agreeableness,
            Trait::Neuroticism => &mut self.neuroticism,
        }
    }

    /// Copy with every trait clamped into `[0, 1]`.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self::new(
            self.openness,
            self.conscientiousness,
            self.extraversion,
            self.agreeableness,
            self.neuroticism,
        )
    }
}

/// Effect of one event on personality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftEffect {
    /// Base per-trait deltas before scaling.
    pub deltas: &'static [(Trait, f32)],
    /// Optional side effect on discrete emotions.
    pub emotion_boost: Option<(Polarity, f32)>,
}

/// Built-in drift table. Events absent here have no trait effect.
#[must_use]
pub fn drift_effect(event: SignificantEvent) -> Option<DriftEffect> {
    use SignificantEvent as E;
    use Trait::{Agreeableness, Conscientiousness, Extraversion, Neuroticism, Openness};
    let effect = |deltas: &'static [(Trait, f32)], emotion_boost: Option<(Polarity, f32)>| {
        DriftEffect { deltas, emotion_boost }
    };
    let positive = |amount: f32| Some((Polarity::Positive, amount));
    Some(match event {
        E::TaskCompleted => effect(&[(Conscientiousness, 0.02)], positive(0.1)),
        E::UserPraised => effect(&[(Agreeableness, 0.03), (Extraversion, 0.015)], positive(0.15)),
        E::UserScolded => effect(
            &[(Agreeableness, -0.05), (Neuroticism, 0.04)],
            Some((Polarity::Negative, 0.25)),
        ),
        E::LearnedFromUserText => effect(&[(Openness, 0.02), (Agreeableness, 0.01)], None),
        E::SelfLearnedPattern => effect(&[(Openness, 0.008)], positive(0.03)),
        E::ProlongedNegative => effect(&[(Neuroticism, 0.03), (Extraversion, -0.02)], None),
        E::ProlongedPositive => effect(&[(Neuroticism, -0.025), (Extraversion, 0.018)], None),
        E::SuccessfulSelfRegulation => {
            effect(&[(Conscientiousness, 0.01), (Neuroticism, -0.015)], None)
        }
        _ => return None,
    })
}

/// Resistance of a trait at `value` to further movement.
#[must_use]
pub fn resistance(value: f32, cfg: &PersonalityConfig) -> f32 {
    (1.0 - (value - 0.5).abs() * cfg.resistance_k).max(cfg.resistance_floor)
}

/// One applied trait movement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraitChange {
    /// Which trait moved.
    pub name: Trait,
    /// Value before.
    pub old: f32,
    /// Value after.
    pub new: f32,
}

/// Apply the drift for `event` at `strength`, damped by `mood_stability`.
///
/// Returns the applied trait changes and the emotion boost (already scaled
/// by `strength`) for the caller to route into the emotion layer. Events
/// with no trait effect return `None`.
pub fn handle_event(
    traits: &mut PersonalityTraits,
    event: SignificantEvent,
    strength: f32,
    mood_stability: f32,
    cfg: &PersonalityConfig,
) -> Option<(Vec<TraitChange>, Option<(Polarity, f32)>)> {
    let effect = drift_effect(event)?;
    let strength = clamp_factor(strength, 10.0);
    let stability_factor = 1.0 - cfg.stability_weight * clamp_unit(mood_stability);
    let mut changes = Vec::with_capacity(effect.deltas.len());
    for &(name, base) in effect.deltas {
        let old = traits.get(name);
        let actual = base * cfg.event_scale * strength * stability_factor * resistance(old, cfg);
        let new = clamp_unit(old + actual);
        *traits.slot(name) = new;
        changes.push(TraitChange { name, old, new });
    }
    let boost = effect
        .emotion_boost
        .map(|(polarity, amount)| (polarity, clamp_unit(amount * strength)));
    Some((changes, boost))
}

/// Chance that a scheduled self-regulation attempt actually runs.
/// Conscientiousness raises it, neuroticism lowers it.
#[must_use]
pub fn regulation_probability(traits: &PersonalityTraits) -> f32 {
    (0.5 + 0.6 * (traits.conscientiousness - 0.5) - 0.4 * (traits.neuroticism - 0.5)).clamp(0.05, 0.95)
}

/// How far a successful regulation lowers the target emotion.
#[must_use]
pub fn regulation_reduction(base: f32, traits: &PersonalityTraits) -> f32 {
    (base.max(0.0) * (0.7 + 0.6 * traits.conscientiousness) * (1.2 - 0.4 * traits.neuroticism)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regulation_favours_conscientious_calm_companions() {
        let steady = PersonalityTraits {
            conscientiousness: 0.9,
            neuroticism: 0.1,
            ..PersonalityTraits::default()
        };
        let fragile = PersonalityTraits {
            conscientiousness: 0.1,
            neuroticism: 0.9,
            ..PersonalityTraits::default()
        };
        assert!((regulation_probability(&PersonalityTraits::default()) - 0.5).abs() < 1e-6);
        assert!(regulation_probability(&steady) > regulation_probability(&fragile));
        assert!(regulation_reduction(0.25, &steady) > regulation_reduction(0.25, &fragile));
        assert!((regulation_reduction(0.25, &PersonalityTraits::default()) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn resistance_is_strongest_at_extremes() {
        let cfg = PersonalityConfig::default();
        assert!((resistance(0.5, &cfg) - 1.0).abs() < 1e-6);
        assert!(resistance(0.95, &cfg) < resistance(0.7, &cfg));
        assert!((resistance(1.0, &cfg) - cfg.resistance_floor).abs() < 1e-6);
    }

    #[test]
    fn praise_raises_agreeableness_and_boosts_positive() {
        let cfg = PersonalityConfig::default();
        let mut traits = PersonalityTraits::default();
        let (changes, boost) = handle_event(&mut traits, SignificantEvent::UserPraised, 1.0, 0.3, &cfg)
            .expect("praise has a drift effect");
        assert_eq!(changes.len(), 2);
        assert!(traits.agreeableness > 0.5);
        assert!(traits.extraversion > 0.5);
        assert_eq!(boost.map(|b| b.0), Some(Polarity::Positive));
    }

    #[test]
    fn attachment_only_events_have_no_drift() {
        let cfg = PersonalityConfig::default();
        let mut traits = PersonalityTraits::default();
        assert!(handle_event(&mut traits, SignificantEvent::AppStart, 1.0, 0.3, &cfg).is_none());
        assert_eq!(traits, PersonalityTraits::default());
    }

    #[test]
    fn near_extreme_trait_moves_less() {
        let cfg = PersonalityConfig::default();
        let mut centered = PersonalityTraits::default();
        let mut extreme = PersonalityTraits {
            conscientiousness: 0.95,
            ..PersonalityTraits::default()
        };
        handle_event(&mut centered, SignificantEvent::TaskCompleted, 1.0, 0.3, &cfg);
        handle_event(&mut extreme, SignificantEvent::TaskCompleted, 1.0, 0.3, &cfg);
        let d_center = centered.conscientiousness - 0.5;
        let d_extreme = extreme.conscientiousness - 0.95;
        assert!(d_extreme.abs() < d_center.abs());
    }
}

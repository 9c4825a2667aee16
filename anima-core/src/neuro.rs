//! Simulated neuromodulators and the effective behaviour parameters they
//! derive.
//!
//! The four scalars respond to the same event vocabulary as attachment,
//! each keyed off a different subset of events with its own trait scaling,
//! and decay toward their own baselines every tick. Three parameters used
//! by the rest of the engine are recomputed from them after every change:
//!
//! ```text
//! mood_stability  = base + 0.3(mb - 0.5) - 0.4(stress - 0.1) - 0.2(n - 0.5)      in [0.05, 0.95]
//! emo_sensitivity = base * (1 + 0.6(stress - 0.1) + 0.4(n - 0.5) - 0.2(mb - 0.5)) in [0.2, 2.0]
//! proactive_freq  = base * (0.6 + 0.5 motivation + 0.5 warmth - 0.3 stress)         in [0.2, 2.0]
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{EmotionConfig, NeuroConfig};
use crate::events::SignificantEvent;
use crate::personality::PersonalityTraits;
use crate::types::{blend, clamp_factor, clamp_or, clamp_unit};

/// The four simulated neuromodulator levels, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuroState {
    /// Drive to act and engage.
    pub motivation: f32,
    /// Background mood, 0.5 is even.
    pub mood_balance: f32,
    /// Accumulated stress.
    pub stress_level: f32,
    /// Warmth toward the user.
    pub social_warmth: f32,
}

impl Default for NeuroState {
    fn default() -> Self {
        Self {
            motivation: 0.5,
            mood_balance: 0.5,
            stress_level: 0.1,
            social_warmth: 0.5,
        }
    }
}

/// Behaviour parameters derived from [`NeuroState`] and personality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveParams {
    /// Damps decay and fluctuation; also damps trait drift.
    pub mood_stability: f32,
    /// Scales appraisal and discrete mapping rates.
    pub emo_sensitivity: f32,
    /// Multiplies how often the companion speaks unprompted.
    pub proactive_freq_modifier: f32,
}

impl Default for EffectiveParams {
    fn default() -> Self {
        Self {
            mood_stability: 0.3,
            emo_sensitivity: 1.0,
            proactive_freq_modifier: 1.0,
        }
    }
}

/// Signed deltas of one event on the four scalars, before trait scaling.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct NeuroDelta {
    motivation: f32,
    mood_balance: f32,
    stress: f32,
    warmth: f32,
}

fn event_delta(event: SignificantEvent, cfg: &NeuroConfig) -> NeuroDelta {
    use SignificantEvent as E;
    let scale = cfg.event_scale;
    let d = |motivation: f32, mood_balance: f32, stress: f32, warmth: f32| NeuroDelta {
        motivation: motivation * scale,
        mood_balance: mood_balance * scale,
        stress: stress * scale,
        warmth: warmth * scale,
    };
    if let Some(&[motivation, mood_balance, stress, warmth]) = cfg.delta_overrides.get(event.tag()) {
        return NeuroDelta {
            motivation,
            mood_balance,
            stress,
            warmth,
        };
    }
    match event {
        E::TaskCompleted => d(0.05, 0.0, 0.0, 0.0),
        E::UserPraised => d(0.04, 0.04, 0.0, 0.0),
        E::UserScolded => d(-0.04, -0.05, 0.06, 0.0),
        E::LearnedFromUserText => d(0.02, 0.0, 0.0, 0.0),
        E::SelfLearnedPattern => d(0.01, 0.0, 0.0, 0.0),
        E::ProlongedNegative => d(0.0, -0.04, 0.05, 0.0),
        E::ProlongedPositive => d(0.0, 0.03, 0.0, 0.0),
        E::SuccessfulSelfRegulation => d(0.0, 0.03, -0.06, 0.0),
        E::PositiveInteraction => d(0.0, 0.01, 0.0, 0.01),
        E::NegativeInteraction => d(0.0, -0.015, 0.02, -0.01),
        E::SharedPositiveEmotion => d(0.0, 0.03, 0.0, 0.02),
        E::ProactivePositiveResponse => d(0.0, 0.0, 0.0, 0.03),
        E::ProactiveIgnored => d(-0.02, 0.0, 0.01, -0.02),
        E::LongAbsenceTick => d(-0.002, 0.0, 0.0, -0.003),
        E::ReturnedAfterAbsence => d(0.0, 0.0, -0.02, 0.04),
        E::AppStart => d(0.0, 0.0, 0.0, 0.005),
        E::ExplicitAffection => d(0.0, 0.05, -0.03, 0.05),
        E::ExplicitDislike => d(0.0, -0.06, 0.08, -0.06),
    }
}

impl NeuroState {
    /// Copy with every level clamped into `[0, 1]`.
    #[must_use]
    pub fn clamped(self) -> Self {
        let f = |v: f32| clamp_or(v, 0.0, 1.0, 0.5);
        Self {
            motivation: f(self.motivation),
            mood_balance: f(self.mood_balance),
            stress_level: f(self.stress_level),
            social_warmth: f(self.social_warmth),
        }
    }

    /// Apply `event` at `intensity`.
    ///
    /// Motivation gains scale with conscientiousness. Mood-balance losses
    /// scale with neuroticism. Stress rises with neuroticism and falls with
    /// conscientiousness. Warmth gains scale with extraversion and losses
    /// are softened by agreeableness. Per-tag overrides in `cfg` replace the
    /// built-in deltas and are not scaled by `event_scale`.
    pub fn update_from_event(
        &mut self,
        event: SignificantEvent,
        intensity: f32,
        traits: &PersonalityTraits,
        cfg: &NeuroConfig,
    ) {
        let k = clamp_factor(intensity, 10.0);
        let d = event_delta(event, cfg);
        let c = traits.conscientiousness;
        let n = traits.neuroticism;
        let e = traits.extraversion;
        let a = traits.agreeableness;

        let motivation = if d.motivation > 0.0 {
            d.motivation * (0.8 + 0.4 * c)
        } else {
            d.motivation
        };
        let mood_balance = if d.mood_balance < 0.0 {
            d.mood_balance * (0.7 + 0.6 * n)
        } else {
            d.mood_balance
        };
        let stress = if d.stress > 0.0 {
            d.stress * (0.6 + 0.8 * n)
        } else {
            d.stress * (0.8 + 0.4 * c)
        };
        let warmth = if d.warmth > 0.0 {
            d.warmth * (0.7 + 0.6 * e)
        } else {
            d.warmth * (1.3 - 0.6 * a)
        };

        self.motivation = clamp_unit(self.motivation + motivation * k);
        self.mood_balance = clamp_unit(self.mood_balance + mood_balance * k);
        self.stress_level = clamp_unit(self.stress_level + stress * k);
        self.social_warmth = clamp_unit(self.social_warmth + warmth * k);
    }

    /// Pull each level toward its baseline at its own rate.
    pub fn decay_toward_baseline(&mut self, cfg: &NeuroConfig) {
        self.motivation = clamp_unit(blend(self.motivation, cfg.motivation_baseline, cfg.motivation_decay));
        self.mood_balance =
            clamp_unit(blend(self.mood_balance, cfg.mood_balance_baseline, cfg.mood_balance_decay));
        self.stress_level = clamp_unit(blend(self.stress_level, cfg.stress_baseline, cfg.stress_decay));
        self.social_warmth =
            clamp_unit(blend(self.social_warmth, cfg.social_warmth_baseline, cfg.social_warmth_decay));
    }

    /// Derive the effective behaviour parameters.
    #[must_use]
    pub fn effective_parameters(
        &self,
        traits: &PersonalityTraits,
        emotion: &EmotionConfig,
        neuro: &NeuroConfig,
    ) -> EffectiveParams {
        let mb = self.mood_balance - 0.5;
        let stress = self.stress_level - 0.1;
        let n = traits.neuroticism - 0.5;
        let mood_stability = clamp_or(
            emotion.mood_stability + 0.3 * mb - 0.4 * stress - 0.2 * n,
            0.05,
            0.95,
            emotion.mood_stability,
        );
        let emo_sensitivity = clamp_or(
            emotion.emo_sensitivity * (1.0 + 0.6 * stress + 0.4 * n - 0.2 * mb),
            0.2,
            2.0,
            1.0,
        );
        let proactive_freq_modifier = clamp_or(
            neuro.proactive_freq
                * (0.6 + 0.5 * self.motivation + 0.5 * self.social_warmth - 0.3 * self.stress_level),
            0.2,
            2.0,
            1.0,
        );
        EffectiveParams {
            mood_stability,
            emo_sensitivity,
            proactive_freq_modifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_give_base_parameters() {
        let p = NeuroState::default().effective_parameters(
            &PersonalityTraits::default(),
            &EmotionConfig::default(),
            &NeuroConfig::default(),
        );
        assert!((p.mood_stability - 0.3).abs() < 1e-6);
        assert!((p.emo_sensitivity - 1.0).abs() < 1e-6);
        assert!((p.proactive_freq_modifier - 1.07).abs() < 1e-5);
    }

    #[test]
    fn scolding_raises_stress_more_for_neurotic() {
        let calm = PersonalityTraits {
            neuroticism: 0.1,
            ..PersonalityTraits::default()
        };
        let nervous = PersonalityTraits {
            neuroticism: 0.9,
            ..PersonalityTraits::default()
        };
        let mut a = NeuroState::default();
        let mut b = NeuroState::default();
        a.update_from_event(SignificantEvent::UserScolded, 1.0, &calm, &NeuroConfig::default());
        b.update_from_event(SignificantEvent::UserScolded, 1.0, &nervous, &NeuroConfig::default());
        assert!(b.stress_level > a.stress_level);
        assert!(a.stress_level > 0.1);
    }

    #[test]
    fn self_regulation_lowers_stress() {
        let mut s = NeuroState {
            stress_level: 0.6,
            ..NeuroState::default()
        };
        s.update_from_event(
            SignificantEvent::SuccessfulSelfRegulation,
            1.0,
            &PersonalityTraits::default(),
            &NeuroConfig::default(),
        );
        assert!(s.stress_level < 0.6);
    }

    #[test]
    fn configured_deltas_replace_the_table() {
        let traits = PersonalityTraits::default();
        let mut quiet = NeuroConfig::default();
        quiet.event_scale = 0.0;
        let mut s = NeuroState::default();
        s.update_from_event(SignificantEvent::UserScolded, 1.0, &traits, &quiet);
        assert_eq!(s, NeuroState::default());

        let mut cfg = NeuroConfig::default();
        cfg.delta_overrides.insert("app_start_bonus".into(), [0.1, 0.0, 0.0, 0.0]);
        let mut s = NeuroState::default();
        s.update_from_event(SignificantEvent::AppStart, 1.0, &traits, &cfg);
        // 0.1 * (0.8 + 0.4 * c) with c = 0.5
        assert!((s.motivation - 0.6).abs() < 1e-6);
        assert!((s.social_warmth - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stress_lowers_stability_and_raises_sensitivity() {
        let stressed = NeuroState {
            stress_level: 0.9,
            ..NeuroState::default()
        };
        let p = stressed.effective_parameters(
            &PersonalityTraits::default(),
            &EmotionConfig::default(),
            &NeuroConfig::default(),
        );
        assert!(p.mood_stability < 0.3);
        assert!(p.emo_sensitivity > 1.0);
    }

    #[test]
    fn decay_converges_to_baselines() {
        let cfg = NeuroConfig::default();
        let mut s = NeuroState {
            motivation: 1.0,
            mood_balance: 0.0,
            stress_level: 1.0,
            social_warmth: 0.0,
        };
        for _ in 0..2000 {
            s.decay_toward_baseline(&cfg);
        }
        assert!((s.motivation - 0.5).abs() < 1e-3);
        assert!((s.stress_level - 0.1).abs() < 1e-3);
        assert!((s.social_warmth - 0.5).abs() < 1e-3);
    }
}

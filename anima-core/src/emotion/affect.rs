//! Core affect: continuous valence and arousal.
//!
//! Appraisals perturb the affect; [`map_to_discrete`] then pulls a handful of
//! discrete emotions toward targets picked by the current quadrant, while the
//! opposing valence set is suppressed.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Emotion, EmotionChange, EmotionState, Polarity};
use crate::config::EmotionConfig;
use crate::types::{blend, clamp_factor, clamp_signed, clamp_unit};

/// Mapping updates smaller than this are not applied.
const MAPPING_EPSILON: f32 = 0.01;

/// Two-dimensional mood summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreAffect {
    /// Unpleasant (-1) to pleasant (+1).
    pub valence: f32,
    /// Calm (0) to activated (1).
    pub arousal: f32,
}

impl Default for CoreAffect {
    fn default() -> Self {
        Self {
            valence: 0.0,
            arousal: 0.1,
        }
    }
}

/// External judgment of an event along the five appraisal dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Appraisal {
    /// How unexpected the event is, `[0, 1]`.
    pub novelty: f32,
    /// Intrinsic pleasantness, `[-1, 1]`.
    pub pleasantness: f32,
    /// Whether the event helps or hinders goals, `[-1, 1]`.
    pub goal_conduciveness: f32,
    /// Perceived ability to cope, `[0, 1]`. Carried for consumers; it does
    /// not weight the affect update.
    pub coping_potential: f32,
    /// How pressing the event is, `[0, 1]`.
    pub urgency: f32,
}

impl Appraisal {
    /// Clamp every dimension into its documented range.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            novelty: clamp_unit(self.novelty),
            pleasantness: clamp_signed(self.pleasantness),
            goal_conduciveness: clamp_signed(self.goal_conduciveness),
            coping_potential: clamp_unit(self.coping_potential),
            urgency: clamp_unit(self.urgency),
        }
    }

    /// Mean absolute strength of the valenced dimensions.
    #[must_use]
    pub fn intensity(&self) -> f32 {
        (self.pleasantness.abs() + self.goal_conduciveness.abs()) / 2.0
    }
}

impl CoreAffect {
    /// Build an affect, clamping both axes.
    #[must_use]
    pub fn new(valence: f32, arousal: f32) -> Self {
        Self {
            valence: clamp_signed(valence),
            arousal: clamp_unit(arousal),
        }
    }

    /// Pull valence toward 0 and arousal toward its resting or active
    /// baseline.
    pub fn decay(&mut self, is_resting: bool, cfg: &EmotionConfig) {
        let (arousal_target, arousal_rate, valence_rate) = if is_resting {
            (cfg.resting_arousal_target, cfg.resting_arousal_rate, cfg.resting_valence_rate)
        } else {
            (cfg.active_arousal_target, cfg.active_arousal_rate, cfg.active_valence_rate)
        };
        *self = Self::new(
            blend(self.valence, 0.0, valence_rate),
            blend(self.arousal, arousal_target, arousal_rate),
        );
    }

    /// Perturb the affect from an external appraisal.
    ///
    /// Valence moves toward `0.7 * pleasantness + 0.3 * goal_conduciveness`
    /// at `appraisal_blend * sensitivity`; arousal rises by a blend of
    /// novelty, urgency and intensity scaled by `sensitivity`.
    pub fn update_from_appraisal(&mut self, scores: Appraisal, sensitivity: f32, cfg: &EmotionConfig) {
        let s = scores.clamped();
        let sensitivity = clamp_factor(sensitivity, 5.0);
        let valence_target = 0.7 * s.pleasantness + 0.3 * s.goal_conduciveness;
        let arousal_increment = (0.4 * s.novelty + 0.3 * s.urgency + 0.3 * s.intensity()) * sensitivity;
        *self = Self::new(
            blend(self.valence, valence_target, cfg.appraisal_blend * sensitivity),
            self.arousal + arousal_increment,
        );
    }

    /// Quadrant-driven discrete targets for the current affect.
    ///
    /// Returns an empty list when |valence| is under the threshold.
    #[must_use]
    pub fn discrete_targets(&self, cfg: &EmotionConfig) -> Vec<(Emotion, f32)> {
        let v = self.valence;
        let a = self.arousal;
        let high = a > cfg.arousal_threshold;
        if v > cfg.valence_threshold && high {
            vec![(Emotion::Joy, (v + a) / 2.0), (Emotion::Excitement, a)]
        } else if v < -cfg.valence_threshold && high {
            vec![
                (Emotion::Anxiety, (v.abs() + a) / 2.0),
                (Emotion::Frustration, v.abs() * a + 0.3),
            ]
        } else if v > cfg.valence_threshold {
            vec![
                (Emotion::Contentment, (v + 1.0 - a) / 2.0),
                (Emotion::Calmness, 1.0 - a),
            ]
        } else if v < -cfg.valence_threshold {
            vec![
                (Emotion::Sadness, (v.abs() + 1.0 - a) / 2.0),
                (Emotion::Disappointment, v.abs()),
            ]
        } else {
            Vec::new()
        }
    }
}

/// Blend discrete emotions toward the quadrant targets of `affect` and
/// suppress the opposing valence set when valence is strong.
///
/// `sensitivity` scales the blend rate, with a ±10% random jitter per
/// emotion. Updates below 0.01 are skipped.
pub fn map_to_discrete(
    affect: &CoreAffect,
    emotions: &mut EmotionState,
    sensitivity: f32,
    cfg: &EmotionConfig,
    rng: &mut impl Rng,
) -> Vec<EmotionChange> {
    let sensitivity = clamp_factor(sensitivity, 5.0);
    let mut targets: Vec<(Emotion, f32, f32)> = affect
        .discrete_targets(cfg)
        .into_iter()
        .map(|(e, t)| (e, clamp_unit(t), 1.0))
        .collect();

    let suppressed = if affect.valence > cfg.suppression_valence {
        Some(Polarity::Negative)
    } else if affect.valence < -cfg.suppression_valence {
        Some(Polarity::Positive)
    } else {
        None
    };
    if let Some(polarity) = suppressed {
        targets.extend(
            Emotion::ALL
                .iter()
                .filter(|e| e.polarity() == polarity)
                .filter(|e| emotions.get(**e) > cfg.suppression_floor)
                .map(|&e| (e, cfg.suppression_floor, 0.5)),
        );
    }

    let mut changes = Vec::new();
    for (emotion, target, modifier) in targets {
        let rate = cfg.mapping_blend * sensitivity * modifier * rng.gen_range(0.9..1.1_f32);
        let current = emotions.get(emotion);
        let next = blend(current, target, rate);
        if (next - current).abs() > MAPPING_EPSILON {
            changes.push(emotions.set(emotion, next));
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn full_positive() -> Appraisal {
        Appraisal {
            novelty: 1.0,
            pleasantness: 1.0,
            goal_conduciveness: 1.0,
            coping_potential: 1.0,
            urgency: 1.0,
        }
    }

    #[test]
    fn appraisal_moves_valence_and_arousal() {
        let cfg = EmotionConfig::default();
        let mut affect = CoreAffect::new(0.0, 0.1);
        affect.update_from_appraisal(full_positive(), 1.0, &cfg);
        assert!((affect.valence - 0.2).abs() < 1e-6);
        assert_eq!(affect.arousal, 1.0);
    }

    #[test]
    fn appraisal_clamps_out_of_range_scores() {
        let cfg = EmotionConfig::default();
        let mut affect = CoreAffect::default();
        let wild = Appraisal {
            novelty: 40.0,
            pleasantness: -9.0,
            goal_conduciveness: f32::NAN,
            coping_potential: -2.0,
            urgency: f32::INFINITY,
        };
        affect.update_from_appraisal(wild, f32::NAN, &cfg);
        assert!((-1.0..=1.0).contains(&affect.valence));
        assert!((0.0..=1.0).contains(&affect.arousal));
    }

    #[test]
    fn decay_rests_lower_and_faster() {
        let cfg = EmotionConfig::default();
        let mut resting = CoreAffect::new(0.8, 0.9);
        let mut active = resting;
        resting.decay(true, &cfg);
        active.decay(false, &cfg);
        assert!(resting.arousal < active.arousal);
        assert!(resting.valence < active.valence);
        assert!(resting.valence > 0.0);
    }

    #[test]
    fn neutral_quadrant_forces_nothing() {
        let cfg = EmotionConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let affect = CoreAffect::new(0.05, 0.9);
        let mut emotions = EmotionState::default();
        let changes = map_to_discrete(&affect, &mut emotions, 1.0, &cfg, &mut rng);
        assert!(changes.is_empty());
        assert_eq!(emotions, EmotionState::default());
    }

    #[test]
    fn strong_negative_affect_suppresses_positive_set() {
        let cfg = EmotionConfig::default();
        let mut rng = StdRng::seed_from_u64(9);
        let affect = CoreAffect::new(-0.9, 0.8);
        let mut emotions = EmotionState::default();
        map_to_discrete(&affect, &mut emotions, 1.0, &cfg, &mut rng);
        assert!(emotions.get(Emotion::Anxiety) > 0.5);
        assert!(emotions.get(Emotion::Joy) < 0.5);
        assert!(emotions.get(Emotion::Love) < 0.5);
    }
}

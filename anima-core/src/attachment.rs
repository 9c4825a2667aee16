//! Attachment: a single relationship score with diminishing returns.
//!
//! A positive delta is scaled by `(1 - score)^p` and a negative one by
//! `score^p`, so the score approaches either bound ever more slowly.

use serde::{Deserialize, Serialize};

use crate::config::AttachmentConfig;
use crate::events::SignificantEvent;
use crate::types::{clamp_factor, clamp_or, clamp_unit};

/// Relationship score in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttachmentScore(f32);

impl Default for AttachmentScore {
    fn default() -> Self {
        Self(0.4)
    }
}

/// Built-in signed base delta for `event`, if it affects attachment.
#[must_use]
pub fn base_delta(event: SignificantEvent) -> Option<f32> {
    use SignificantEvent as E;
    let delta = match event {
        E::PositiveInteraction => 0.0025,
        E::NegativeInteraction => -0.0035,
        E::UserPraised => 0.018,
        E::UserScolded => -0.025,
        E::SharedPositiveEmotion => 0.006,
        E::TaskCompleted => 0.012,
        E::ProactivePositiveResponse => 0.004,
        E::ProactiveIgnored => -0.0025,
        E::LongAbsenceTick => -0.0002,
        E::ReturnedAfterAbsence => 0.015,
        E::AppStart => 0.001,
        E::ExplicitAffection => 0.030,
        E::ExplicitDislike => -0.040,
        _ => return None,
    };
    Some(delta)
}

impl AttachmentScore {
    /// Build a score, clamping into `[0, 1]`.
    #[must_use]
    pub fn new(value: f32) -> Self {
        Self(clamp_or(value, 0.0, 1.0, 0.4))
    }

    /// Current value.
    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }

    /// Apply `event` at `magnitude`. Returns the new score, or `None` when
    /// the event has no attachment effect.
    ///
    /// Per-tag overrides in `cfg` take precedence over the built-in table.
    pub fn update(&mut self, event: SignificantEvent, magnitude: f32, cfg: &AttachmentConfig) -> Option<f32> {
        let delta = cfg
            .delta_overrides
            .get(event.tag())
            .copied()
            .or_else(|| base_delta(event))?;
        let magnitude = clamp_factor(magnitude, 10.0);
        let scale = if delta >= 0.0 {
            (1.0 - self.0).powf(cfg.exponent)
        } else {
            self.0.powf(cfg.exponent)
        };
        self.0 = clamp_unit(self.0 + delta * magnitude * scale);
        Some(self.0)
    }

    /// Coarse relationship tier for persona descriptions.
    #[must_use]
    pub fn tier(self) -> &'static str {
        match self.0 {
            v if v >= 0.85 => "deeply attached",
            v if v >= 0.65 => "close",
            v if v >= 0.4 => "friendly but reserved",
            v if v >= 0.2 => "cautious",
            _ => "distant",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn praise_scenario_stays_under_base_delta() {
        let cfg = AttachmentConfig::default();
        let mut score = AttachmentScore::new(0.4);
        let new = score
            .update(SignificantEvent::UserPraised, 1.0, &cfg)
            .expect("praise affects attachment");
        assert!(new > 0.4);
        assert!(new <= 0.4 + 0.018);
    }

    #[test]
    fn saturates_near_bounds() {
        let cfg = AttachmentConfig::default();
        let mut high = AttachmentScore::new(0.98);
        let mut mid = AttachmentScore::new(0.5);
        let high_gain = high.update(SignificantEvent::ExplicitAffection, 1.0, &cfg).unwrap_or(0.0) - 0.98;
        let mid_gain = mid.update(SignificantEvent::ExplicitAffection, 1.0, &cfg).unwrap_or(0.0) - 0.5;
        assert!(high_gain < mid_gain);

        let mut floor = AttachmentScore::new(0.0);
        floor.update(SignificantEvent::ExplicitDislike, 10.0, &cfg);
        assert_eq!(floor.value(), 0.0);
    }

    #[test]
    fn overrides_replace_table_entries() {
        let mut cfg = AttachmentConfig::default();
        cfg.delta_overrides.insert("app_start_bonus".into(), 0.1);
        let mut score = AttachmentScore::new(0.0);
        score.update(SignificantEvent::AppStart, 1.0, &cfg);
        assert!((score.value() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn trait_only_events_are_ignored() {
        let cfg = AttachmentConfig::default();
        let mut score = AttachmentScore::default();
        assert!(score.update(SignificantEvent::SelfLearnedPattern, 1.0, &cfg).is_none());
        assert_eq!(score, AttachmentScore::default());
    }
}

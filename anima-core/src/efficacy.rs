//! Self-efficacy: per-domain competence beliefs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::EfficacyConfig;
use crate::error::AnimaError;
use crate::personality::PersonalityTraits;
use crate::types::{clamp_or, clamp_unit};

/// A competence domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficacyDomain {
    /// Overall competence.
    General,
    /// Handling conversations and relationships.
    Social,
    /// Keeping track of the user's tasks.
    TaskManagement,
    /// Finding and relaying information.
    InfoRetrieval,
}

impl EfficacyDomain {
    /// All domains.
    pub const ALL: [EfficacyDomain; 4] = [
        Self::General,
        Self::Social,
        Self::TaskManagement,
        Self::InfoRetrieval,
    ];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Social => "social",
            Self::TaskManagement => "task_management",
            Self::InfoRetrieval => "info_retrieval",
        }
    }
}

impl fmt::Display for EfficacyDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EfficacyDomain {
    type Err = AnimaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == needle)
            .ok_or_else(|| AnimaError::unknown("efficacy domain", s))
    }
}

/// Competence belief per domain, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfEfficacy {
    /// Overall competence.
    pub general: f32,
    /// Social competence.
    pub social: f32,
    /// Task-management competence.
    pub task_management: f32,
    /// Information-retrieval competence.
    pub info_retrieval: f32,
}

impl Default for SelfEfficacy {
    fn default() -> Self {
        Self::uniform(0.5)
    }
}

impl SelfEfficacy {
    /// Every domain at `value`.
    #[must_use]
    pub fn uniform(value: f32) -> Self {
        let v = clamp_or(value, 0.0, 1.0, 0.5);
        Self {
            general: v,
            social: v,
            task_management: v,
            info_retrieval: v,
        }
    }

    /// Read one domain.
    #[must_use]
    pub fn get(&self, domain: EfficacyDomain) -> f32 {
        match domain {
            EfficacyDomain::General => self.general,
            EfficacyDomain::Social => self.social,
            EfficacyDomain::TaskManagement => self.task_management,
            EfficacyDomain::InfoRetrieval => self.info_retrieval,
        }
    }

    fn slot(&mut self, domain: EfficacyDomain) -> &mut f32 {
        match domain {
            EfficacyDomain::General => &mut self.general,
            EfficacyDomain::Social => &mut self.social,
            EfficacyDomain::TaskManagement => &mut self.task_management,
            EfficacyDomain::InfoRetrieval => &mut self.info_retrieval,
        }
    }

    /// Apply a success and/or failure to `domain`.
    ///
    /// Success is amplified by conscientiousness; failure is dampened by
    /// conscientiousness and amplified by neuroticism. Both deltas are
    /// magnitudes in `[0, 1]`. Returns the new value.
    pub fn update(
        &mut self,
        domain: EfficacyDomain,
        success_delta: f32,
        failure_delta: f32,
        traits: &PersonalityTraits,
        cfg: &EfficacyConfig,
    ) -> f32 {
        let c = traits.conscientiousness;
        let n = traits.neuroticism;
        let success_mod = 1.0 + (c - 0.5) * cfg.success_conscientiousness_weight;
        let failure_mod = (1.0 - (c - 0.5) * cfg.failure_conscientiousness_weight)
            * (1.0 + (n - 0.5) * cfg.failure_neuroticism_weight);
        let slot = self.slot(domain);
        *slot = clamp_unit(
            *slot + clamp_unit(success_delta) * success_mod - clamp_unit(failure_delta) * failure_mod,
        );
        *slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_domain_fails_to_parse() {
        assert_eq!("social".parse::<EfficacyDomain>().ok(), Some(EfficacyDomain::Social));
        assert!("cooking".parse::<EfficacyDomain>().is_err());
    }

    #[test]
    fn conscientious_companion_gains_more_from_success() {
        let cfg = EfficacyConfig::default();
        let diligent = PersonalityTraits {
            conscientiousness: 0.9,
            ..PersonalityTraits::default()
        };
        let lax = PersonalityTraits {
            conscientiousness: 0.1,
            ..PersonalityTraits::default()
        };
        let mut a = SelfEfficacy::default();
        let mut b = SelfEfficacy::default();
        let ga = a.update(EfficacyDomain::TaskManagement, 0.1, 0.0, &diligent, &cfg);
        let gb = b.update(EfficacyDomain::TaskManagement, 0.1, 0.0, &lax, &cfg);
        assert!(ga > gb);
    }

    #[test]
    fn neurotic_companion_loses_more_from_failure() {
        let cfg = EfficacyConfig::default();
        let anxious = PersonalityTraits {
            neuroticism: 0.9,
            ..PersonalityTraits::default()
        };
        let mut a = SelfEfficacy::default();
        let mut b = SelfEfficacy::default();
        let la = a.update(EfficacyDomain::General, 0.0, 0.1, &anxious, &cfg);
        let lb = b.update(EfficacyDomain::General, 0.0, 0.1, &PersonalityTraits::default(), &cfg);
        assert!(la < lb);
        assert!(la >= 0.0);
    }
}

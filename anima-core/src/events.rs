//! Significant events: the closed vocabulary that drives personality drift,
//! attachment, and the neuromodulator layer.
//!
//! Wire tags (as produced by hosts and classifiers) are parsed once at the
//! boundary; everything past that point matches on [`SignificantEvent`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::config::PersonalityConfig;
use crate::error::AnimaError;
use crate::types::Timestamp;

/// A classified occurrence that perturbs trait-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificantEvent {
    /// The companion finished a task for the user.
    TaskCompleted,
    /// The user praised the companion.
    UserPraised,
    /// The user scolded the companion.
    UserScolded,
    /// Background analysis learned something from the user's text.
    LearnedFromUserText,
    /// Background analysis learned something from the companion's own text.
    SelfLearnedPattern,
    /// A strong negative emotion persisted across several ticks.
    ProlongedNegative,
    /// A strong positive state persisted across several ticks.
    ProlongedPositive,
    /// A self-regulation attempt reduced a strong negative emotion.
    SuccessfulSelfRegulation,
    /// An ordinary friendly exchange.
    PositiveInteraction,
    /// An ordinary unfriendly exchange.
    NegativeInteraction,
    /// User and companion were happy at the same time.
    SharedPositiveEmotion,
    /// The user answered a proactive message warmly.
    ProactivePositiveResponse,
    /// The user ignored or rebuffed a proactive message.
    ProactiveIgnored,
    /// One tick of the user being away.
    LongAbsenceTick,
    /// The user came back after an absence.
    ReturnedAfterAbsence,
    /// The host application started.
    AppStart,
    /// The user expressed affection outright.
    ExplicitAffection,
    /// The user expressed dislike or rejection outright.
    ExplicitDislike,
}

/// Throttle class of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    /// Rare, high-impact events; short throttle window.
    Critical,
    /// Everything else.
    Routine,
}

impl SignificantEvent {
    /// Every event kind.
    pub const ALL: [SignificantEvent; 18] = [
        Self::TaskCompleted,
        Self::UserPraised,
        Self::UserScolded,
        Self::LearnedFromUserText,
        Self::SelfLearnedPattern,
        Self::ProlongedNegative,
        Self::ProlongedPositive,
        Self::SuccessfulSelfRegulation,
        Self::PositiveInteraction,
        Self::NegativeInteraction,
        Self::SharedPositiveEmotion,
        Self::ProactivePositiveResponse,
        Self::ProactiveIgnored,
        Self::LongAbsenceTick,
        Self::ReturnedAfterAbsence,
        Self::AppStart,
        Self::ExplicitAffection,
        Self::ExplicitDislike,
    ];

    /// Canonical wire tag.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::TaskCompleted => "task_completed",
            Self::UserPraised => "user_praised_pet_event",
            Self::UserScolded => "user_scolded_pet_event",
            Self::LearnedFromUserText => "learned_from_user_text_llm",
            Self::SelfLearnedPattern => "pet_self_learned_pattern",
            Self::ProlongedNegative => "prolonged_strong_negative_complex",
            Self::ProlongedPositive => "prolonged_strong_positive_state",
            Self::SuccessfulSelfRegulation => "successful_self_regulation",
            Self::PositiveInteraction => "positive_interaction",
            Self::NegativeInteraction => "negative_interaction",
            Self::SharedPositiveEmotion => "shared_positive_emotion",
            Self::ProactivePositiveResponse => "proactive_positive_user_response",
            Self::ProactiveIgnored => "proactive_ignored_or_negative",
            Self::LongAbsenceTick => "long_user_absence_tick",
            Self::ReturnedAfterAbsence => "user_returned_after_absence",
            Self::AppStart => "app_start_bonus",
            Self::ExplicitAffection => "explicit_user_affection",
            Self::ExplicitDislike => "explicit_user_dislike_or_rejection",
        }
    }

    /// Older or alternate tags that name the same event.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::TaskCompleted => &["task_completed_one", "task_completed_help"],
            Self::UserPraised => &["user_praised_pet"],
            Self::UserScolded => &["user_scolded_pet_critical"],
            Self::LearnedFromUserText => &["learned_from_user_text"],
            _ => &[],
        }
    }

    /// Throttle class.
    #[must_use]
    pub fn class(self) -> EventClass {
        match self {
            Self::UserScolded | Self::ExplicitDislike => EventClass::Critical,
            _ => EventClass::Routine,
        }
    }

    /// Whether the event is pleasant for the companion.
    #[must_use]
    pub fn is_positive(self) -> bool {
        !matches!(
            self,
            Self::UserScolded
                | Self::ProlongedNegative
                | Self::NegativeInteraction
                | Self::ProactiveIgnored
                | Self::LongAbsenceTick
                | Self::ExplicitDislike
        )
    }
}

impl fmt::Display for SignificantEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for SignificantEvent {
    type Err = AnimaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.tag() == needle || e.aliases().contains(&needle.as_str()))
            .ok_or_else(|| AnimaError::unknown("event tag", s))
    }
}

// ---------------------------------------------------------------------------
// Throttle
// ---------------------------------------------------------------------------

/// Per-event minimum-interval guard.
///
/// An event accepted at `t` blocks the same event kind until
/// `t + window(class)`. Rejected events do not extend the window.
#[derive(Debug, Clone, Default)]
pub struct EventThrottle {
    last_accepted: HashMap<SignificantEvent, Timestamp>,
}

impl EventThrottle {
    /// Create an empty throttle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Window length for `event` under `cfg`.
    #[must_use]
    pub fn window(event: SignificantEvent, cfg: &PersonalityConfig) -> Duration {
        let secs = match event.class() {
            EventClass::Critical => cfg.critical_throttle_secs,
            EventClass::Routine => cfg.routine_throttle_secs,
        };
        // Capped at a year so `last + window` cannot overflow.
        Duration::seconds(i64::try_from(secs.min(31_536_000)).unwrap_or(0))
    }

    /// Accept `event` at `now` if outside its window, recording it.
    pub fn try_accept(&mut self, event: SignificantEvent, now: Timestamp, cfg: &PersonalityConfig) -> bool {
        let window = Self::window(event, cfg);
        if let Some(&last) = self.last_accepted.get(&event) {
            if now < last + window {
                return false;
            }
        }
        self.last_accepted.insert(event, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn tags_and_aliases_parse() {
        assert_eq!(
            "user_praised_pet".parse::<SignificantEvent>().ok(),
            Some(SignificantEvent::UserPraised)
        );
        assert_eq!(
            "user_scolded_pet_critical".parse::<SignificantEvent>().ok(),
            Some(SignificantEvent::UserScolded)
        );
        for event in SignificantEvent::ALL {
            assert_eq!(event.tag().parse::<SignificantEvent>().ok(), Some(event));
        }
        assert!("user_bought_pet_a_hat".parse::<SignificantEvent>().is_err());
    }

    #[test]
    fn throttle_blocks_within_window() {
        let cfg = PersonalityConfig::default();
        let mut throttle = EventThrottle::new();
        let t0 = Utc::now();
        assert!(throttle.try_accept(SignificantEvent::UserPraised, t0, &cfg));
        assert!(!throttle.try_accept(SignificantEvent::UserPraised, t0 + Duration::seconds(60), &cfg));
        // Different kinds are throttled independently.
        assert!(throttle.try_accept(SignificantEvent::TaskCompleted, t0, &cfg));
        assert!(throttle.try_accept(SignificantEvent::UserPraised, t0 + Duration::seconds(121), &cfg));
    }

    #[test]
    fn critical_events_use_short_window() {
        let cfg = PersonalityConfig::default();
        let mut throttle = EventThrottle::new();
        let t0 = Utc::now();
        assert!(throttle.try_accept(SignificantEvent::UserScolded, t0, &cfg));
        assert!(!throttle.try_accept(SignificantEvent::UserScolded, t0 + Duration::seconds(19), &cfg));
        assert!(throttle.try_accept(SignificantEvent::UserScolded, t0 + Duration::seconds(21), &cfg));
    }
}

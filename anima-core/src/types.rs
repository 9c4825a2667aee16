//! Core type definitions shared across the anima engine.
//!
//! All identifiers are serializable newtypes; numeric helpers here are the
//! single place where the "clamp, never fail" rule for inputs is applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Opaque identifier of the user a companion state belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Wrap a raw user identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self("default_user".to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for a learned characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacteristicId(pub Uuid);

impl CharacteristicId {
    /// Create a new random characteristic ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacteristicId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacteristicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Wall-clock timestamp used throughout the engine.
pub type Timestamp = DateTime<Utc>;

/// Fractional days from `earlier` to `now`, floored at zero.
#[must_use]
pub fn days_between(earlier: Timestamp, now: Timestamp) -> f64 {
    let millis = (now - earlier).num_milliseconds().max(0);
    millis as f64 / 86_400_000.0
}

// ---------------------------------------------------------------------------
// Clamping
// ---------------------------------------------------------------------------

/// Clamp `value` into `[lo, hi]`, mapping NaN to `fallback`.
#[must_use]
pub fn clamp_or(value: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(lo, hi)
    }
}

/// Clamp into `[0, 1]`; NaN becomes 0.
#[must_use]
pub fn clamp_unit(value: f32) -> f32 {
    clamp_or(value, 0.0, 1.0, 0.0)
}

/// Clamp into `[-1, 1]`; NaN becomes 0.
#[must_use]
pub fn clamp_signed(value: f32) -> f32 {
    clamp_or(value, -1.0, 1.0, 0.0)
}

/// Sanitise a non-negative multiplier such as an event strength or a
/// sensitivity. NaN and negatives become 0, and the result is capped at
/// `max`.
#[must_use]
pub fn clamp_factor(value: f32, max: f32) -> f32 {
    clamp_or(value, 0.0, max, 0.0)
}

/// Move `current` toward `target` by `rate` (clamped to `[0, 1]`).
#[must_use]
pub fn blend(current: f32, target: f32, rate: f32) -> f32 {
    current + (target - current) * clamp_unit(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_helpers_handle_nan() {
        assert_eq!(clamp_unit(f32::NAN), 0.0);
        assert_eq!(clamp_signed(f32::NAN), 0.0);
        assert_eq!(clamp_or(f32::NAN, 0.0, 1.0, 0.5), 0.5);
        assert_eq!(clamp_factor(-3.0, 2.0), 0.0);
        assert_eq!(clamp_factor(9.0, 2.0), 2.0);
    }

    #[test]
    fn blend_moves_toward_target() {
        let v = blend(0.0, 1.0, 0.25);
        assert!((v - 0.25).abs() < 1e-6);
        // Rates above 1 never overshoot.
        assert!((blend(0.0, 1.0, 7.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn days_between_is_never_negative() {
        let now = Utc::now();
        let later = now + chrono::Duration::hours(36);
        assert!((days_between(now, later) - 1.5).abs() < 1e-9);
        assert_eq!(days_between(later, now), 0.0);
    }
}

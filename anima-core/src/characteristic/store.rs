//! In-memory characteristic records and their update policies.
//!
//! The store is not synchronised itself; the engine holds it under its
//! single lock, which is what makes the look-up-then-write in
//! [`CharacteristicStore::upsert`] atomic.

use chrono::Duration;
use tracing::debug;

use super::{
    Characteristic, CharacteristicKind, CharacteristicSource, initial_relevance,
    reinforcement_increment,
};
use crate::config::CharacteristicConfig;
use crate::personality::PersonalityTraits;
use crate::types::{CharacteristicId, Timestamp, clamp_unit};

/// Result of an upsert, carrying the record as stored afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// No matching record existed; a new one was created.
    Inserted(Characteristic),
    /// A matching record with the same value was reinforced.
    Reinforced(Characteristic),
    /// A matching record with a different value was replaced.
    Overwritten(Characteristic),
    /// A matching record with a different value was kept; the new value
    /// was dropped.
    Rejected(Characteristic),
    /// The value was empty; nothing happened.
    Ignored,
}

impl UpsertOutcome {
    /// The record as stored, if any.
    #[must_use]
    pub fn record(&self) -> Option<&Characteristic> {
        match self {
            Self::Inserted(c) | Self::Reinforced(c) | Self::Overwritten(c) | Self::Rejected(c) => Some(c),
            Self::Ignored => None,
        }
    }

    /// Whether the stored state changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self, Self::Inserted(_) | Self::Reinforced(_) | Self::Overwritten(_))
    }
}

/// The set of live characteristic records for one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharacteristicStore {
    records: Vec<Characteristic>,
}

fn day_span(days: f64) -> Duration {
    // Millisecond resolution is plenty for day-scale windows.
    #[allow(clippy::cast_possible_truncation)]
    let millis = (days.max(0.0) * 86_400_000.0).min(1.0e15) as i64;
    Duration::milliseconds(millis)
}

/// Values compare equal under full Unicode lowercasing.
fn same_value(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

impl CharacteristicStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously persisted records.
    #[must_use]
    pub fn from_records(records: Vec<Characteristic>) -> Self {
        Self { records }
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all records.
    pub fn iter(&self) -> impl Iterator<Item = &Characteristic> {
        self.records.iter()
    }

    /// Look up a record by ID.
    #[must_use]
    pub fn get(&self, id: CharacteristicId) -> Option<&Characteristic> {
        self.records.iter().find(|c| c.id == id)
    }

    /// Remove a record by ID.
    pub fn remove(&mut self, id: CharacteristicId) -> Option<Characteristic> {
        let pos = self.records.iter().position(|c| c.id == id)?;
        Some(self.records.remove(pos))
    }

    fn find_match(&mut self, kind: CharacteristicKind, key: Option<&str>, value: &str) -> Option<&mut Characteristic> {
        self.records.iter_mut().find(|c| {
            c.kind == kind
                && match key {
                    Some(k) => c.key.as_deref() == Some(k),
                    None => c.key.is_none() && same_value(&c.value, value),
                }
        })
    }

    /// Insert, reinforce or resolve a conflict for one observation.
    ///
    /// Records match on `(kind, key)`, or on `(kind, value)` when `key` is
    /// `None`. A matching record with the same value (case-insensitive) is
    /// reinforced. A matching record with a different value is overwritten
    /// only when openness exceeds the configured threshold; otherwise the
    /// old value stands.
    #[allow(clippy::too_many_arguments)]
    pub fn upsert(
        &mut self,
        kind: CharacteristicKind,
        key: Option<&str>,
        value: &str,
        source: CharacteristicSource,
        base_relevance: f32,
        traits: &PersonalityTraits,
        cfg: &CharacteristicConfig,
        now: Timestamp,
    ) -> UpsertOutcome {
        let value = value.trim();
        if value.is_empty() {
            return UpsertOutcome::Ignored;
        }
        let key = key.map(str::trim).filter(|k| !k.is_empty());

        if let Some(existing) = self.find_match(kind, key, value) {
            if same_value(&existing.value, value) {
                existing.relevance = clamp_unit(
                    existing.relevance + reinforcement_increment(cfg.reinforcement_increment, traits),
                );
                existing.last_reinforced_at = now;
                existing.last_accessed_at = now;
                existing.source = source;
                existing.version += 1;
                debug!(id = %existing.id, kind = %kind, relevance = existing.relevance, "characteristic reinforced");
                return UpsertOutcome::Reinforced(existing.clone());
            }
            if traits.openness > cfg.conflict_openness_threshold {
                debug!(id = %existing.id, kind = %kind, old = %existing.value, new = %value, "characteristic overwritten");
                existing.value = value.to_string();
                existing.relevance = initial_relevance(base_relevance, traits);
                existing.last_reinforced_at = now;
                existing.last_accessed_at = now;
                existing.source = source;
                existing.version += 1;
                return UpsertOutcome::Overwritten(existing.clone());
            }
            debug!(id = %existing.id, kind = %kind, kept = %existing.value, dropped = %value, "conflicting characteristic dropped");
            return UpsertOutcome::Rejected(existing.clone());
        }

        let record = Characteristic::new(
            kind,
            key.map(str::to_string),
            value,
            source,
            initial_relevance(base_relevance, traits),
            now,
        );
        debug!(id = %record.id, kind = %kind, relevance = record.relevance, "characteristic inserted");
        self.records.push(record.clone());
        UpsertOutcome::Inserted(record)
    }

    /// Subtract `decay_amount` from every record idle for longer than
    /// `interval_days` whose relevance is still above the floor. Returns
    /// the records that changed.
    pub fn decay_relevance(
        &mut self,
        decay_amount: f32,
        interval_days: f64,
        floor: f32,
        now: Timestamp,
    ) -> Vec<Characteristic> {
        let cutoff = now - day_span(interval_days);
        let mut changed = Vec::new();
        for record in &mut self.records {
            if record.last_reinforced_at < cutoff && record.last_accessed_at < cutoff && record.relevance > floor {
                record.relevance = (record.relevance - decay_amount).max(0.0);
                changed.push(record.clone());
            }
        }
        changed
    }

    /// Delete records below `threshold` that have not been used for
    /// `staleness_days`. Returns the removed IDs.
    pub fn evict(&mut self, threshold: f32, staleness_days: f64, now: Timestamp) -> Vec<CharacteristicId> {
        let cutoff = now - day_span(staleness_days);
        let mut evicted = Vec::new();
        self.records.retain(|c| {
            let stale = c.relevance < threshold && c.last_used() < cutoff;
            if stale {
                evicted.push(c.id);
            }
            !stale
        });
        evicted
    }

    /// Decay and evict with the configured constants.
    pub fn run_maintenance(
        &mut self,
        cfg: &CharacteristicConfig,
        now: Timestamp,
    ) -> (Vec<Characteristic>, Vec<CharacteristicId>) {
        let decayed = self.decay_relevance(cfg.decay_amount, cfg.decay_interval_days, cfg.decay_floor, now);
        let evicted = self.evict(cfg.eviction_threshold, cfg.staleness_days, now);
        (decayed, evicted)
    }
}

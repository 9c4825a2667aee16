//! Read-time ranking for characteristics.
//!
//! effective = relevance · exp(-k · days_since_last_access)
//!
//! The recency factor is applied to a copy at read time only, so reads
//! never rewrite stored relevance.

use ordered_float::OrderedFloat;

use super::{Characteristic, CharacteristicKind, CharacteristicStore};
use crate::types::{Timestamp, days_between};

/// A characteristic paired with its read-time score.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCharacteristic {
    /// The stored record.
    pub record: Characteristic,
    /// Relevance after the recency factor.
    pub effective_relevance: f32,
}

/// Recency-weighted relevance of `record` at `now`.
#[must_use]
pub fn effective_relevance(record: &Characteristic, recency_k: f64, now: Timestamp) -> f32 {
    let days = days_between(record.last_accessed_at, now);
    #[allow(clippy::cast_possible_truncation)]
    let factor = (-days * recency_k).exp() as f32;
    record.relevance * factor
}

impl CharacteristicStore {
    /// Top records, optionally of one `kind`, ranked by effective
    /// relevance.
    ///
    /// `min_relevance` filters on stored relevance. Ties fall back to the
    /// more recently accessed record.
    #[must_use]
    pub fn get_top(
        &self,
        kind: Option<CharacteristicKind>,
        min_relevance: f32,
        limit: usize,
        recency_k: f64,
        now: Timestamp,
    ) -> Vec<RankedCharacteristic> {
        let mut ranked: Vec<RankedCharacteristic> = self
            .iter()
            .filter(|c| kind.is_none_or(|k| c.kind == k))
            .filter(|c| c.relevance >= min_relevance)
            .map(|c| RankedCharacteristic {
                effective_relevance: effective_relevance(c, recency_k, now),
                record: c.clone(),
            })
            .collect();
        ranked.sort_by_key(|r| {
            (
                std::cmp::Reverse(OrderedFloat(r.effective_relevance)),
                std::cmp::Reverse(r.record.last_accessed_at),
            )
        });
        ranked.truncate(limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristic::CharacteristicSource;
    use crate::config::CharacteristicConfig;
    use crate::personality::PersonalityTraits;
    use chrono::{Duration, Utc};

    fn seed(store: &mut CharacteristicStore, key: &str, relevance: f32, accessed: Timestamp) {
        store.upsert(
            CharacteristicKind::Preference,
            Some(key),
            key,
            CharacteristicSource::UserDirectStatement,
            relevance,
            &PersonalityTraits::default(),
            &CharacteristicConfig::default(),
            accessed,
        );
    }

    #[test]
    fn fresher_record_outranks_slightly_more_relevant_stale_one() {
        let now = Utc::now();
        let mut store = CharacteristicStore::new();
        seed(&mut store, "stale", 0.8, now - Duration::days(10));
        seed(&mut store, "fresh", 0.6, now);
        let top = store.get_top(None, 0.0, 5, 0.1, now);
        assert_eq!(top[0].record.value, "fresh");
        assert!(top[1].effective_relevance < 0.8 * 0.5);
    }

    #[test]
    fn reads_do_not_mutate_stored_relevance() {
        let now = Utc::now();
        let mut store = CharacteristicStore::new();
        seed(&mut store, "cats", 0.7, now - Duration::days(30));
        let _ = store.get_top(None, 0.0, 5, 0.1, now);
        let stored = store.iter().next().map(|c| c.relevance);
        assert_eq!(stored, Some(0.7));
    }

    #[test]
    fn filters_by_kind_and_limit() {
        let now = Utc::now();
        let mut store = CharacteristicStore::new();
        for key in ["a", "b", "c"] {
            seed(&mut store, key, 0.5, now);
        }
        store.upsert(
            CharacteristicKind::SelfConcept,
            None,
            "I like puns",
            CharacteristicSource::PetSelfObservation,
            0.9,
            &PersonalityTraits::default(),
            &CharacteristicConfig::default(),
            now,
        );
        assert_eq!(store.get_top(Some(CharacteristicKind::Preference), 0.0, 2, 0.1, now).len(), 2);
        let selves = store.get_top(Some(CharacteristicKind::SelfConcept), 0.0, 5, 0.1, now);
        assert_eq!(selves.len(), 1);
        assert!(store.get_top(None, 0.95, 5, 0.1, now).is_empty());
    }
}

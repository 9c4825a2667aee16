//! Persistent record store consumed by the engine.
//!
//! The engine treats storage as an at-least-once key-value layer keyed by
//! user: every individual emotion change, character change and
//! characteristic mutation is written through as it happens. No operation
//! needs a transaction spanning more than one entity.
//!
//! Two implementations ship with the crate:
//!
//! - [`SqliteStore`] — durable, one SQLite file (WAL mode)
//! - [`InMemoryStore`] — process-local, for tests and diskless embedding

mod memory;
mod sqlite;

use serde::{Deserialize, Serialize};

use crate::characteristic::{Characteristic, CharacteristicKind};
use crate::efficacy::SelfEfficacy;
use crate::emotion::{Emotion, EmotionChange};
use crate::error::Result;
use crate::neuro::NeuroState;
use crate::personality::PersonalityTraits;
use crate::types::{CharacteristicId, Timestamp, UserId};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Emotion changes smaller than this are not written to the history log.
pub const HISTORY_MIN_DELTA: f32 = 0.01;

/// Trait-level state persisted as one unit per user.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CharacterRecord {
    /// OCEAN traits.
    pub traits: PersonalityTraits,
    /// Attachment score.
    pub attachment: f32,
    /// Per-domain self-efficacy.
    pub self_efficacy: SelfEfficacy,
    /// Neuromodulator levels.
    pub neuro: NeuroState,
}

/// Filter for [`RecordStore::load_characteristics`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CharacteristicFilter {
    /// Restrict to one kind.
    pub kind: Option<CharacteristicKind>,
    /// Minimum stored relevance.
    pub min_relevance: f32,
    /// Maximum number of records, highest relevance first.
    pub limit: Option<usize>,
}

/// One logged emotion change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionHistoryEntry {
    /// Which emotion moved.
    pub emotion: Emotion,
    /// Value before.
    pub old_value: f32,
    /// Value after.
    pub new_value: f32,
    /// What caused the change (e.g. `decay`, `appraisal_map`).
    pub trigger: String,
    /// When it happened.
    pub recorded_at: Timestamp,
}

/// CRUD operations the engine needs from durable storage.
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// All stored emotion intensities for `user`. Missing names are filled
    /// with the baseline by the caller.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    fn load_emotions(&self, user: &UserId) -> Result<Vec<(Emotion, f32)>>;

    /// Persist one emotion change; changes of at least
    /// [`HISTORY_MIN_DELTA`] are also appended to the history log.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    fn save_emotion(&self, user: &UserId, change: &EmotionChange, trigger: &str, at: Timestamp) -> Result<()>;

    /// Most recent history entries, newest first.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    fn emotion_history(&self, user: &UserId, limit: usize) -> Result<Vec<EmotionHistoryEntry>>;

    /// Trait-level state for `user`, if any was saved.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    fn load_character(&self, user: &UserId) -> Result<Option<CharacterRecord>>;

    /// Replace the trait-level state for `user`.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    fn save_character(&self, user: &UserId, record: &CharacterRecord) -> Result<()>;

    /// Characteristics for `user` matching `filter`, highest relevance
    /// first.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    fn load_characteristics(&self, user: &UserId, filter: &CharacteristicFilter) -> Result<Vec<Characteristic>>;

    /// Store a new characteristic.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    fn insert_characteristic(&self, user: &UserId, record: &Characteristic) -> Result<()>;

    /// Replace every field of an existing characteristic.
    ///
    /// # Errors
    /// Returns an error if the backend fails or the record is unknown.
    fn update_characteristic(&self, user: &UserId, record: &Characteristic) -> Result<()>;

    /// Record a reinforcement: new relevance, bumped stamps and version.
    ///
    /// # Errors
    /// Returns an error if the backend fails or the record is unknown.
    fn reinforce_characteristic(
        &self,
        user: &UserId,
        id: CharacteristicId,
        relevance: f32,
        version: u32,
        at: Timestamp,
    ) -> Result<()>;

    /// Permanently delete a characteristic.
    ///
    /// # Errors
    /// Returns an error if the backend fails.
    fn delete_characteristic(&self, user: &UserId, id: CharacteristicId) -> Result<()>;
}

fn sort_and_limit(mut records: Vec<Characteristic>, filter: &CharacteristicFilter) -> Vec<Characteristic> {
    records.retain(|c| filter.kind.is_none_or(|k| c.kind == k) && c.relevance >= filter.min_relevance);
    records.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    if let Some(limit) = filter.limit {
        records.truncate(limit);
    }
    records
}

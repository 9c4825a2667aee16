//! Process-local record store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::{
    CharacterRecord, CharacteristicFilter, EmotionHistoryEntry, HISTORY_MIN_DELTA, RecordStore,
    sort_and_limit,
};
use crate::characteristic::Characteristic;
use crate::emotion::{Emotion, EmotionChange};
use crate::error::{AnimaError, Result};
use crate::types::{CharacteristicId, Timestamp, UserId};

#[derive(Debug, Default)]
struct UserRecords {
    emotions: HashMap<Emotion, f32>,
    history: Vec<EmotionHistoryEntry>,
    character: Option<CharacterRecord>,
    characteristics: Vec<Characteristic>,
}

/// A [`RecordStore`] that keeps everything in memory.
///
/// [`set_unavailable`](Self::set_unavailable) makes every operation fail,
/// which simulates a storage outage.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<UserId, UserRecords>>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle the simulated outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(AnimaError::Io(std::io::Error::other("record store unavailable")))
        } else {
            Ok(())
        }
    }

    fn with_user<T>(&self, user: &UserId, f: impl FnOnce(&mut UserRecords) -> Result<T>) -> Result<T> {
        self.check()?;
        let mut users = self.users.lock();
        f(users.entry(user.clone()).or_default())
    }
}

impl RecordStore for InMemoryStore {
    fn load_emotions(&self, user: &UserId) -> Result<Vec<(Emotion, f32)>> {
        self.with_user(user, |u| Ok(u.emotions.iter().map(|(e, v)| (*e, *v)).collect()))
    }

    fn save_emotion(&self, user: &UserId, change: &EmotionChange, trigger: &str, at: Timestamp) -> Result<()> {
        self.with_user(user, |u| {
            u.emotions.insert(change.emotion, change.new);
            if change.delta().abs() >= HISTORY_MIN_DELTA {
                u.history.push(EmotionHistoryEntry {
                    emotion: change.emotion,
                    old_value: change.old,
                    new_value: change.new,
                    trigger: trigger.to_string(),
                    recorded_at: at,
                });
            }
            Ok(())
        })
    }

    fn emotion_history(&self, user: &UserId, limit: usize) -> Result<Vec<EmotionHistoryEntry>> {
        self.with_user(user, |u| Ok(u.history.iter().rev().take(limit).cloned().collect()))
    }

    fn load_character(&self, user: &UserId) -> Result<Option<CharacterRecord>> {
        self.with_user(user, |u| Ok(u.character))
    }

    fn save_character(&self, user: &UserId, record: &CharacterRecord) -> Result<()> {
        self.with_user(user, |u| {
            u.character = Some(*record);
            Ok(())
        })
    }

    fn load_characteristics(&self, user: &UserId, filter: &CharacteristicFilter) -> Result<Vec<Characteristic>> {
        self.with_user(user, |u| Ok(sort_and_limit(u.characteristics.clone(), filter)))
    }

    fn insert_characteristic(&self, user: &UserId, record: &Characteristic) -> Result<()> {
        self.with_user(user, |u| {
            u.characteristics.retain(|c| c.id != record.id);
            u.characteristics.push(record.clone());
            Ok(())
        })
    }

    fn update_characteristic(&self, user: &UserId, record: &Characteristic) -> Result<()> {
        self.with_user(user, |u| {
            let slot = u
                .characteristics
                .iter_mut()
                .find(|c| c.id == record.id)
                .ok_or(AnimaError::CharacteristicNotFound(record.id))?;
            *slot = record.clone();
            Ok(())
        })
    }

    fn reinforce_characteristic(
        &self,
        user: &UserId,
        id: CharacteristicId,
        relevance: f32,
        version: u32,
        at: Timestamp,
    ) -> Result<()> {
        self.with_user(user, |u| {
            let slot = u
                .characteristics
                .iter_mut()
                .find(|c| c.id == id)
                .ok_or(AnimaError::CharacteristicNotFound(id))?;
            slot.relevance = relevance;
            slot.version = version;
            slot.last_accessed_at = at;
            slot.last_reinforced_at = at;
            Ok(())
        })
    }

    fn delete_characteristic(&self, user: &UserId, id: CharacteristicId) -> Result<()> {
        self.with_user(user, |u| {
            u.characteristics.retain(|c| c.id != id);
            Ok(())
        })
    }
}

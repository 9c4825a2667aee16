//! The composite affective state and its single-lock owner.
//!
//! [`Engine`] is the only place where the emotion, personality, attachment,
//! efficacy, neuromodulator and characteristic layers meet. Every mutator
//! takes the one coarse lock, applies the update, writes the result through
//! to the [`RecordStore`], and releases. Storage errors are logged; the
//! in-memory state stays authoritative.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attachment::AttachmentScore;
use crate::characteristic::{
    CharacteristicKind, CharacteristicSource, CharacteristicStore, RankedCharacteristic, UpsertOutcome,
};
use crate::config::AnimaConfig;
use crate::efficacy::{EfficacyDomain, SelfEfficacy};
use crate::emotion::affect::{self, Appraisal, CoreAffect};
use crate::emotion::vocabulary::Polarity;
use crate::emotion::{DisplayMood, Emotion, EmotionChange, EmotionState};
use crate::events::{EventThrottle, SignificantEvent};
use crate::neuro::{EffectiveParams, NeuroState};
use crate::persistence::{CharacterRecord, CharacteristicFilter, RecordStore};
use crate::personality::{self, PersonalityTraits};
use crate::types::{Timestamp, UserId};

const POSITIVE_BOOST: [Emotion; 3] = [Emotion::Joy, Emotion::Contentment, Emotion::Gratitude];
const NEGATIVE_BOOST: [Emotion; 3] = [Emotion::Sadness, Emotion::Anxiety, Emotion::Shame];

/// Every piece of mutable companion state, owned as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct AffectState {
    /// Discrete emotion intensities.
    pub emotions: EmotionState,
    /// Continuous valence/arousal.
    pub affect: CoreAffect,
    /// OCEAN traits.
    pub traits: PersonalityTraits,
    /// Relationship score.
    pub attachment: AttachmentScore,
    /// Per-domain competence beliefs.
    pub efficacy: SelfEfficacy,
    /// Neuromodulator levels.
    pub neuro: NeuroState,
    /// Parameters derived from `neuro` and `traits`.
    pub params: EffectiveParams,
    /// Learned facts about the user and the companion.
    pub characteristics: CharacteristicStore,
}

impl AffectState {
    /// Fresh state from configured initial values.
    #[must_use]
    pub fn initial(config: &AnimaConfig) -> Self {
        let neuro = NeuroState {
            motivation: config.neuro.motivation_baseline,
            mood_balance: config.neuro.mood_balance_baseline,
            stress_level: config.neuro.stress_baseline,
            social_warmth: config.neuro.social_warmth_baseline,
        }
        .clamped();
        let traits = config.personality.initial.clamped();
        Self {
            emotions: EmotionState::uniform(config.emotion.baseline),
            affect: CoreAffect::default(),
            traits,
            attachment: AttachmentScore::new(config.attachment.initial),
            efficacy: SelfEfficacy::uniform(config.efficacy.initial),
            params: neuro.effective_parameters(&traits, &config.emotion, &config.neuro),
            neuro,
            characteristics: CharacteristicStore::new(),
        }
    }

    fn character_record(&self) -> CharacterRecord {
        CharacterRecord {
            traits: self.traits,
            attachment: self.attachment.value(),
            self_efficacy: self.efficacy,
            neuro: self.neuro,
        }
    }
}

/// Read-only copy of the state for presentation and prompt building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Whose state this is.
    pub user: UserId,
    /// Discrete emotions.
    pub emotions: EmotionState,
    /// Core affect.
    pub affect: CoreAffect,
    /// OCEAN traits.
    pub traits: PersonalityTraits,
    /// Attachment score.
    pub attachment: f32,
    /// Self-efficacy.
    pub efficacy: SelfEfficacy,
    /// Neuromodulators.
    pub neuro: NeuroState,
    /// Effective parameters.
    pub params: EffectiveParams,
    /// Presentation mood.
    pub mood: DisplayMood,
    /// Strongest non-neutral emotion.
    pub dominant: (Emotion, f32),
    /// Whether the companion is resting.
    pub resting: bool,
    /// Number of live characteristics.
    pub characteristic_count: usize,
}

/// What one maintenance tick produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Discrete emotion changes from decay, fluctuation and remapping.
    pub emotion_changes: usize,
    /// Characteristics whose relevance decayed.
    pub decayed: usize,
    /// Characteristics evicted.
    pub evicted: usize,
    /// Prolonged-state events that were raised and accepted.
    pub prolonged: Vec<SignificantEvent>,
    /// Strong negative emotion that warrants self-regulation, if any.
    pub regulation_candidate: Option<(Emotion, f32)>,
}

#[derive(Debug)]
struct Inner {
    state: AffectState,
    throttle: EventThrottle,
    rng: StdRng,
    resting: bool,
    negative_streak: u32,
    positive_streak: u32,
}

/// Thread-safe owner of one user's [`AffectState`].
#[derive(Debug)]
pub struct Engine {
    user: UserId,
    config: Arc<AnimaConfig>,
    store: Arc<dyn RecordStore>,
    inner: Mutex<Inner>,
}

impl Engine {
    /// Load `user`'s state from `store`, falling back to configured
    /// defaults for anything missing or unreadable.
    pub fn load(user: UserId, config: Arc<AnimaConfig>, store: Arc<dyn RecordStore>) -> Self {
        let mut state = AffectState::initial(&config);

        match store.load_emotions(&user) {
            Ok(saved) => {
                for (emotion, value) in saved {
                    state.emotions.set(emotion, value);
                }
            }
            Err(e) => warn!(user = %user, error = %e, "failed to load emotions; using baseline"),
        }

        match store.load_character(&user) {
            Ok(Some(record)) => {
                state.traits = record.traits.clamped();
                state.attachment = AttachmentScore::new(record.attachment);
                state.efficacy = record.self_efficacy;
                state.neuro = record.neuro.clamped();
            }
            Ok(None) => {
                if let Err(e) = store.save_character(&user, &state.character_record()) {
                    warn!(user = %user, error = %e, "failed to save initial character");
                }
            }
            Err(e) => warn!(user = %user, error = %e, "failed to load character; using defaults"),
        }

        match store.load_characteristics(&user, &CharacteristicFilter::default()) {
            Ok(records) => state.characteristics = CharacteristicStore::from_records(records),
            Err(e) => warn!(user = %user, error = %e, "failed to load characteristics"),
        }

        state.params = state
            .neuro
            .effective_parameters(&state.traits, &config.emotion, &config.neuro);

        info!(
            user = %user,
            characteristics = state.characteristics.len(),
            attachment = state.attachment.value(),
            "affect state loaded"
        );

        Self {
            user,
            config,
            store,
            inner: Mutex::new(Inner {
                state,
                throttle: EventThrottle::new(),
                rng: StdRng::from_entropy(),
                resting: false,
                negative_streak: 0,
                positive_streak: 0,
            }),
        }
    }

    /// Load the state of the configured `general.user_id`.
    pub fn load_configured(config: Arc<AnimaConfig>, store: Arc<dyn RecordStore>) -> Self {
        let user = UserId::new(config.general.user_id.clone());
        Self::load(user, config, store)
    }

    /// Replace the random source with a seeded one.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        self.inner.lock().rng = StdRng::seed_from_u64(seed);
        self
    }

    /// The user this engine serves.
    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &AnimaConfig {
        &self.config
    }

    /// Backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Mark the companion as resting (asleep) or awake.
    pub fn set_resting(&self, resting: bool) {
        let mut inner = self.inner.lock();
        if inner.resting != resting {
            debug!(resting, "resting state changed");
        }
        inner.resting = resting;
    }

    /// Whether the companion is resting.
    #[must_use]
    pub fn is_resting(&self) -> bool {
        self.inner.lock().resting
    }

    /// Run `f` against the locked state.
    pub fn with_state<R>(&self, f: impl FnOnce(&AffectState) -> R) -> R {
        f(&self.inner.lock().state)
    }

    /// Current intensity of one emotion.
    #[must_use]
    pub fn emotion(&self, emotion: Emotion) -> f32 {
        self.inner.lock().state.emotions.get(emotion)
    }

    /// Current effective parameters.
    #[must_use]
    pub fn params(&self) -> EffectiveParams {
        self.inner.lock().state.params
    }

    /// Copy of the presentation-relevant state.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        let inner = self.inner.lock();
        let s = &inner.state;
        StateSnapshot {
            user: self.user.clone(),
            emotions: s.emotions.clone(),
            affect: s.affect,
            traits: s.traits,
            attachment: s.attachment.value(),
            efficacy: s.efficacy,
            neuro: s.neuro,
            params: s.params,
            mood: s.emotions.display_mood(self.config.emotion.display_threshold),
            dominant: s.emotions.dominant(),
            resting: inner.resting,
            characteristic_count: s.characteristics.len(),
        }
    }

    /// Random draw from the engine's source; `true` with probability `p`.
    pub fn chance(&self, p: f32) -> bool {
        let p = f64::from(p.clamp(0.0, 1.0));
        self.inner.lock().rng.gen_bool(p)
    }

    // ---- emotion layer ----

    /// Pull discrete emotions toward baseline using the effective stability.
    pub fn decay_emotions(&self, now: Timestamp) -> Vec<EmotionChange> {
        let mut inner = self.inner.lock();
        let changes = Self::decay_locked(&mut inner, &self.config);
        self.persist_emotions(&changes, "decay", now);
        changes
    }

    fn decay_locked(inner: &mut Inner, config: &AnimaConfig) -> Vec<EmotionChange> {
        let Inner { state, rng, .. } = inner;
        state.emotions.decay(
            config.emotion.decay_rate,
            state.params.mood_stability,
            config.emotion.baseline,
            rng,
        )
    }

    /// Perturb one to three random emotions.
    pub fn apply_random_fluctuation(&self, now: Timestamp) -> Vec<EmotionChange> {
        let mut inner = self.inner.lock();
        let changes = Self::fluctuate_locked(&mut inner, &self.config);
        self.persist_emotions(&changes, "fluctuation", now);
        changes
    }

    fn fluctuate_locked(inner: &mut Inner, config: &AnimaConfig) -> Vec<EmotionChange> {
        let Inner { state, rng, .. } = inner;
        state.emotions.apply_random_fluctuation(
            state.params.mood_stability,
            state.params.emo_sensitivity,
            config.emotion.fluctuation_amplitude,
            rng,
        )
    }

    /// Pull core affect toward its resting or active baseline, then remap
    /// it onto discrete emotions.
    pub fn decay_affect(&self, now: Timestamp) -> Vec<EmotionChange> {
        let mut inner = self.inner.lock();
        let resting = inner.resting;
        inner.state.affect.decay(resting, &self.config.emotion);
        let sensitivity = inner.state.params.emo_sensitivity;
        let changes = Self::map_locked(&mut inner, sensitivity, &self.config);
        self.persist_emotions(&changes, "core_affect_decay", now);
        changes
    }

    /// Perturb core affect from externally supplied appraisal scores.
    pub fn update_from_appraisal(&self, scores: Appraisal, sensitivity: f32) -> CoreAffect {
        let mut inner = self.inner.lock();
        inner
            .state
            .affect
            .update_from_appraisal(scores, sensitivity, &self.config.emotion);
        debug!(
            valence = inner.state.affect.valence,
            arousal = inner.state.affect.arousal,
            "core affect appraised"
        );
        inner.state.affect
    }

    /// Blend discrete emotions toward the current core-affect quadrant.
    pub fn map_to_discrete(&self, trigger: &str, sensitivity: f32, now: Timestamp) -> Vec<EmotionChange> {
        let mut inner = self.inner.lock();
        let changes = Self::map_locked(&mut inner, sensitivity, &self.config);
        self.persist_emotions(&changes, trigger, now);
        changes
    }

    fn map_locked(inner: &mut Inner, sensitivity: f32, config: &AnimaConfig) -> Vec<EmotionChange> {
        let Inner { state, rng, .. } = inner;
        affect::map_to_discrete(&state.affect, &mut state.emotions, sensitivity, &config.emotion, rng)
    }

    /// Appraise and remap in one step at the effective sensitivity.
    pub fn apply_appraisal(&self, scores: Appraisal, trigger: &str, now: Timestamp) -> Vec<EmotionChange> {
        let sensitivity = self.params().emo_sensitivity;
        self.update_from_appraisal(scores, sensitivity);
        self.map_to_discrete(trigger, sensitivity, now)
    }

    /// Lower one emotion directly, e.g. after self-regulation.
    pub fn reduce_emotion(&self, emotion: Emotion, amount: f32, trigger: &str, now: Timestamp) -> EmotionChange {
        let mut inner = self.inner.lock();
        let change = inner.state.emotions.reduce(emotion, amount);
        self.persist_emotions(&[change], trigger, now);
        change
    }

    /// Strongest negative emotion at or above the strong threshold.
    #[must_use]
    pub fn regulation_candidate(&self) -> Option<(Emotion, f32)> {
        let (emotion, value) = self.inner.lock().state.emotions.strongest_negative();
        (value >= self.config.emotion.strong_threshold).then_some((emotion, value))
    }

    // ---- trait-level layer ----

    /// Apply a significant event: throttle, then trait drift and emotion
    /// boost, attachment, neuromodulators, and effective parameters.
    ///
    /// Returns `false` when the event was throttled.
    pub fn handle_event(&self, event: SignificantEvent, strength: f32, now: Timestamp) -> bool {
        let mut inner = self.inner.lock();
        if !inner.throttle.try_accept(event, now, &self.config.personality) {
            debug!(event = %event, "event throttled");
            return false;
        }
        let changes = self.apply_event_locked(&mut inner, event, strength);
        self.persist_emotions(&changes, event.tag(), now);
        self.persist_character(&inner.state);
        true
    }

    /// Parse a wire tag and apply it. Unknown tags are logged and ignored.
    pub fn handle_event_tag(&self, tag: &str, strength: f32, now: Timestamp) -> bool {
        match tag.parse::<SignificantEvent>() {
            Ok(event) => self.handle_event(event, strength, now),
            Err(e) => {
                warn!(tag, error = %e, "ignoring unknown event");
                false
            }
        }
    }

    fn apply_event_locked(&self, inner: &mut Inner, event: SignificantEvent, strength: f32) -> Vec<EmotionChange> {
        let config = &self.config;
        let state = &mut inner.state;
        let mut emotion_changes = Vec::new();

        if let Some((trait_changes, boost)) = personality::handle_event(
            &mut state.traits,
            event,
            strength,
            state.params.mood_stability,
            &config.personality,
        ) {
            for c in &trait_changes {
                debug!(event = %event, trait_name = %c.name, old = c.old, new = c.new, "trait drift");
            }
            if let Some((polarity, amount)) = boost {
                let targets: &[Emotion] = match polarity {
                    Polarity::Positive => &POSITIVE_BOOST,
                    Polarity::Negative => &NEGATIVE_BOOST,
                    Polarity::Untagged => &[],
                };
                emotion_changes = state.emotions.boost(targets, amount);
            }
        }

        if let Some(score) = state.attachment.update(event, strength, &config.attachment) {
            debug!(event = %event, attachment = score, "attachment updated");
        }

        state.neuro.update_from_event(event, strength, &state.traits, &config.neuro);
        state.params = state
            .neuro
            .effective_parameters(&state.traits, &config.emotion, &config.neuro);
        emotion_changes
    }

    /// Apply only the attachment delta for `event`, bypassing the throttle.
    /// Returns the new score, or `None` when the event has no attachment
    /// effect.
    pub fn update_attachment(&self, event: SignificantEvent, magnitude: f32) -> Option<f32> {
        let mut inner = self.inner.lock();
        let score = inner.state.attachment.update(event, magnitude, &self.config.attachment)?;
        self.persist_character(&inner.state);
        Some(score)
    }

    /// Record a success and/or failure in a named competence domain.
    /// Unknown domains are logged and ignored.
    pub fn update_self_efficacy(&self, domain: &str, success_delta: f32, failure_delta: f32) -> Option<f32> {
        let domain = match domain.parse::<EfficacyDomain>() {
            Ok(d) => d,
            Err(e) => {
                warn!(domain, error = %e, "ignoring unknown efficacy domain");
                return None;
            }
        };
        let mut inner = self.inner.lock();
        let state = &mut inner.state;
        let value = state
            .efficacy
            .update(domain, success_delta, failure_delta, &state.traits, &self.config.efficacy);
        debug!(domain = %domain, value, "self-efficacy updated");
        self.persist_character(state);
        Some(value)
    }

    // ---- characteristics ----

    /// Insert, reinforce or resolve a conflict for one observation. The
    /// decision and the write happen under the same lock.
    pub fn upsert_characteristic(
        &self,
        kind: CharacteristicKind,
        key: Option<&str>,
        value: &str,
        source: CharacteristicSource,
        base_relevance: f32,
        now: Timestamp,
    ) -> UpsertOutcome {
        let mut inner = self.inner.lock();
        let state = &mut inner.state;
        let outcome = state.characteristics.upsert(
            kind,
            key,
            value,
            source,
            base_relevance,
            &state.traits,
            &self.config.characteristics,
            now,
        );
        let result = match &outcome {
            UpsertOutcome::Inserted(c) => self.store.insert_characteristic(&self.user, c),
            UpsertOutcome::Reinforced(c) => self.store.reinforce_characteristic(
                &self.user,
                c.id,
                c.relevance,
                c.version,
                c.last_reinforced_at,
            ),
            UpsertOutcome::Overwritten(c) => self.store.update_characteristic(&self.user, c),
            UpsertOutcome::Rejected(_) | UpsertOutcome::Ignored => Ok(()),
        };
        if let Err(e) = result {
            warn!(user = %self.user, error = %e, "failed to persist characteristic");
        }
        outcome
    }

    /// Top characteristics ranked by recency-weighted relevance.
    #[must_use]
    pub fn get_top(
        &self,
        kind: Option<CharacteristicKind>,
        min_relevance: f32,
        limit: usize,
        now: Timestamp,
    ) -> Vec<RankedCharacteristic> {
        self.inner.lock().state.characteristics.get_top(
            kind,
            min_relevance,
            limit,
            self.config.characteristics.recency_k,
            now,
        )
    }

    // ---- periodic maintenance ----

    /// One maintenance tick.
    ///
    /// Order: neuro decay and parameter recompute, characteristic decay and
    /// eviction, then (if awake) discrete decay and fluctuation, core-affect
    /// decay and remap, prolonged-state detection, regulation check.
    pub fn maintenance_tick(&self, now: Timestamp) -> TickReport {
        let mut report = TickReport::default();
        let mut inner = self.inner.lock();
        let config = &self.config;

        {
            let state = &mut inner.state;
            state.neuro.decay_toward_baseline(&config.neuro);
            state.params = state
                .neuro
                .effective_parameters(&state.traits, &config.emotion, &config.neuro);
        }
        self.persist_character(&inner.state);

        let (decayed, evicted) = inner
            .state
            .characteristics
            .run_maintenance(&config.characteristics, now);
        for record in &decayed {
            if let Err(e) = self.store.update_characteristic(&self.user, record) {
                warn!(id = %record.id, error = %e, "failed to persist decayed characteristic");
            }
        }
        for id in &evicted {
            if let Err(e) = self.store.delete_characteristic(&self.user, *id) {
                warn!(id = %id, error = %e, "failed to delete evicted characteristic");
            }
        }
        report.decayed = decayed.len();
        report.evicted = evicted.len();

        let resting = inner.resting;
        if !resting {
            let decay = Self::decay_locked(&mut inner, config);
            self.persist_emotions(&decay, "decay", now);
            let fluctuation = Self::fluctuate_locked(&mut inner, config);
            self.persist_emotions(&fluctuation, "fluctuation", now);
            report.emotion_changes += decay.len() + fluctuation.len();
        }

        inner.state.affect.decay(resting, &config.emotion);
        let sensitivity = inner.state.params.emo_sensitivity;
        let remap = Self::map_locked(&mut inner, sensitivity, config);
        self.persist_emotions(&remap, "core_affect_decay", now);
        report.emotion_changes += remap.len();

        for event in Self::detect_prolonged(&mut inner, config) {
            if inner.throttle.try_accept(event, now, &config.personality) {
                let changes = self.apply_event_locked(&mut inner, event, 1.0);
                self.persist_emotions(&changes, event.tag(), now);
                self.persist_character(&inner.state);
                info!(event = %event, "prolonged state detected");
                report.prolonged.push(event);
            }
        }

        let (emotion, value) = inner.state.emotions.strongest_negative();
        if value >= config.emotion.strong_threshold {
            report.regulation_candidate = Some((emotion, value));
        }

        debug!(
            changes = report.emotion_changes,
            decayed = report.decayed,
            evicted = report.evicted,
            resting,
            "maintenance tick"
        );
        report
    }

    fn detect_prolonged(inner: &mut Inner, config: &AnimaConfig) -> Vec<SignificantEvent> {
        let threshold = config.emotion.strong_threshold;
        let needed = config.personality.prolonged_ticks.max(1);
        let emotions = &inner.state.emotions;
        let negative = emotions.strongest_negative().1 >= threshold;
        let positive =
            emotions.get(Emotion::Joy) >= threshold || emotions.get(Emotion::Contentment) >= threshold;

        inner.negative_streak = if negative { inner.negative_streak + 1 } else { 0 };
        inner.positive_streak = if positive { inner.positive_streak + 1 } else { 0 };

        let mut events = Vec::new();
        if inner.negative_streak >= needed {
            inner.negative_streak = 0;
            events.push(SignificantEvent::ProlongedNegative);
        }
        if inner.positive_streak >= needed {
            inner.positive_streak = 0;
            events.push(SignificantEvent::ProlongedPositive);
        }
        events
    }

    // ---- write-through ----

    fn persist_emotions(&self, changes: &[EmotionChange], trigger: &str, now: Timestamp) {
        for change in changes {
            if let Err(e) = self.store.save_emotion(&self.user, change, trigger, now) {
                warn!(emotion = %change.emotion, error = %e, "failed to persist emotion");
            }
        }
    }

    fn persist_character(&self, state: &AffectState) {
        if let Err(e) = self.store.save_character(&self.user, &state.character_record()) {
            warn!(user = %self.user, error = %e, "failed to persist character");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryStore;
    use chrono::{Duration, Utc};

    fn engine() -> (Engine, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let engine = Engine::load(UserId::default(), Arc::new(AnimaConfig::default()), store.clone()).with_seed(7);
        (engine, store)
    }

    #[test]
    fn fresh_engine_starts_at_baseline() {
        let (engine, store) = engine();
        let snap = engine.snapshot();
        assert!(snap.emotions.iter().all(|(_, v)| (v - 0.5).abs() < 1e-6));
        assert!((snap.attachment - 0.4).abs() < 1e-6);
        assert!(store.load_character(&UserId::default()).ok().flatten().is_some());
    }

    #[test]
    fn throttled_event_changes_nothing() {
        let (engine, _) = engine();
        let now = Utc::now();
        assert!(engine.handle_event(SignificantEvent::UserPraised, 1.0, now));
        let after_first = engine.snapshot();
        assert!(!engine.handle_event(SignificantEvent::UserPraised, 1.0, now + Duration::seconds(5)));
        let after_second = engine.snapshot();
        assert_eq!(after_first.traits, after_second.traits);
        assert_eq!(after_first.attachment, after_second.attachment);
        assert_eq!(after_first.neuro, after_second.neuro);
    }

    #[test]
    fn unknown_tag_and_domain_are_no_ops() {
        let (engine, _) = engine();
        let before = engine.snapshot();
        assert!(!engine.handle_event_tag("pet_learned_to_fly", 1.0, Utc::now()));
        assert!(engine.update_self_efficacy("cooking", 0.2, 0.0).is_none());
        assert_eq!(before, engine.snapshot());
    }

    #[test]
    fn scolding_boosts_negative_emotions() {
        let (engine, _) = engine();
        let before = engine.emotion(Emotion::Sadness);
        assert!(engine.handle_event(SignificantEvent::UserScolded, 1.0, Utc::now()));
        assert!(engine.emotion(Emotion::Sadness) > before);
    }

    #[test]
    fn store_outage_keeps_in_memory_state() {
        let (engine, store) = engine();
        store.set_unavailable(true);
        assert!(engine.handle_event(SignificantEvent::TaskCompleted, 1.0, Utc::now()));
        assert!(engine.snapshot().traits.conscientiousness > 0.5);
    }

    #[test]
    fn resting_tick_skips_discrete_decay() {
        let (engine, _) = engine();
        engine.set_resting(true);
        let report = engine.maintenance_tick(Utc::now());
        assert_eq!(report.emotion_changes, 0);
        assert!(report.regulation_candidate.is_none());
    }

    #[test]
    fn prolonged_negative_fires_after_configured_ticks() {
        let (engine, _) = engine();
        let now = Utc::now();
        engine.set_resting(true);
        let mut fired = Vec::new();
        for i in 0..6 {
            engine.inner.lock().state.emotions.set(Emotion::Anger, 0.95);
            let report = engine.maintenance_tick(now + Duration::seconds(60 * i));
            assert!(report.regulation_candidate.is_some());
            fired.extend(report.prolonged);
        }
        assert_eq!(fired, vec![SignificantEvent::ProlongedNegative]);
    }

    #[test]
    fn upsert_is_written_through() {
        let (engine, store) = engine();
        let outcome = engine.upsert_characteristic(
            CharacteristicKind::Preference,
            Some("drink"),
            "green tea",
            CharacteristicSource::UserDirectStatement,
            0.6,
            Utc::now(),
        );
        assert!(matches!(outcome, UpsertOutcome::Inserted(_)));
        let saved = store
            .load_characteristics(&UserId::default(), &CharacteristicFilter::default())
            .unwrap_or_default();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].value, "green tea");
    }
}

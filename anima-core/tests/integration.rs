//! Integration Tests — end-to-end affect flows
//!
//! Lifecycle scenarios through the public [`Engine`] API, plus SQLite
//! save/load round-trips.

use std::sync::Arc;

use chrono::{Duration, Utc};

use anima_core::characteristic::{CharacteristicKind, CharacteristicSource, UpsertOutcome};
use anima_core::config::{AnimaConfig, PersistenceConfig};
use anima_core::emotion::affect::Appraisal;
use anima_core::emotion::Emotion;
use anima_core::persistence::{InMemoryStore, RecordStore, SqliteStore};
use anima_core::personality::PersonalityTraits;
use anima_core::{Engine, SignificantEvent, UserId};

fn config() -> Arc<AnimaConfig> {
    Arc::new(AnimaConfig::default())
}

fn memory_engine() -> Engine {
    Engine::load(UserId::default(), config(), Arc::new(InMemoryStore::new())).with_seed(42)
}

fn full_positive() -> Appraisal {
    Appraisal {
        novelty: 1.0,
        pleasantness: 1.0,
        goal_conduciveness: 1.0,
        coping_potential: 1.0,
        urgency: 1.0,
    }
}

// ---------------------------------------------------------------------------
// Appraisal → discrete emotions
// ---------------------------------------------------------------------------

#[test]
fn positive_appraisal_raises_joy_and_excitement() {
    let engine = memory_engine();
    let before = engine.snapshot().emotions;

    engine.update_from_appraisal(full_positive(), 1.0);
    engine.map_to_discrete("appraisal", 1.0, Utc::now());

    let after = engine.snapshot().emotions;
    assert!(after.get(Emotion::Joy) > before.get(Emotion::Joy));
    assert!(after.get(Emotion::Excitement) > before.get(Emotion::Excitement));
    assert!(
        Emotion::ALL
            .iter()
            .filter(|e| e.is_negative())
            .any(|&e| after.get(e) <= before.get(e)),
        "at least one negative emotion must not rise"
    );
}

#[test]
fn sustained_pleasant_appraisals_suppress_negative_set() {
    let engine = memory_engine();
    let now = Utc::now();
    for i in 0..20 {
        engine.apply_appraisal(full_positive(), "appraisal", now + Duration::seconds(i));
    }
    let snap = engine.snapshot();
    assert!(snap.affect.valence > 0.5);
    assert!(snap.emotions.get(Emotion::Sadness) < 0.5);
    assert!(snap.emotions.get(Emotion::Joy) > 0.5);
}

// ---------------------------------------------------------------------------
// Events → traits, attachment, neuro, parameters
// ---------------------------------------------------------------------------

#[test]
fn praise_then_scolding_lifecycle() {
    let engine = memory_engine();
    let start = engine.snapshot();
    let now = Utc::now();

    assert!(engine.handle_event_tag("user_praised_pet_event", 1.0, now));
    let praised = engine.snapshot();
    assert!(praised.attachment > start.attachment);
    assert!(praised.attachment <= start.attachment + 0.018 + 1e-6);
    assert!(praised.traits.agreeableness > start.traits.agreeableness);
    assert!(praised.neuro.motivation > start.neuro.motivation);

    assert!(engine.handle_event(SignificantEvent::UserScolded, 1.0, now + Duration::seconds(1)));
    let scolded = engine.snapshot();
    assert!(scolded.attachment < praised.attachment);
    assert!(scolded.traits.neuroticism > praised.traits.neuroticism);
    assert!(scolded.neuro.stress_level > praised.neuro.stress_level);
    // More stress means a more sensitive, less stable companion.
    assert!(scolded.params.emo_sensitivity > praised.params.emo_sensitivity);
    assert!(scolded.params.mood_stability < praised.params.mood_stability);
}

#[test]
fn critical_events_reopen_sooner_than_routine_ones() {
    let engine = memory_engine();
    let now = Utc::now();
    let later = now + Duration::seconds(30);

    assert!(engine.handle_event(SignificantEvent::UserScolded, 1.0, now));
    assert!(engine.handle_event(SignificantEvent::UserScolded, 1.0, later));

    assert!(engine.handle_event(SignificantEvent::TaskCompleted, 1.0, now));
    assert!(!engine.handle_event(SignificantEvent::TaskCompleted, 1.0, later));
}

#[test]
fn self_efficacy_by_domain_name() {
    let engine = memory_engine();
    let v = engine.update_self_efficacy("task_management", 0.1, 0.0);
    assert!(v.is_some_and(|v| v > 0.5));
    assert!(engine.update_self_efficacy("juggling", 0.1, 0.0).is_none());
}

// ---------------------------------------------------------------------------
// Characteristics
// ---------------------------------------------------------------------------

#[test]
fn conflicting_preference_respects_openness() {
    for (openness, expect_overwrite) in [(0.2, false), (0.9, true)] {
        let mut cfg = AnimaConfig::default();
        cfg.personality.initial = PersonalityTraits {
            openness,
            ..PersonalityTraits::default()
        };
        let engine = Engine::load(UserId::default(), Arc::new(cfg), Arc::new(InMemoryStore::new()));
        let now = Utc::now();
        let first = engine.upsert_characteristic(
            CharacteristicKind::Preference,
            Some("favorite_color"),
            "blue",
            CharacteristicSource::UserDirectStatement,
            0.6,
            now,
        );
        assert!(matches!(first, UpsertOutcome::Inserted(_)));
        let second = engine.upsert_characteristic(
            CharacteristicKind::Preference,
            Some("favorite_color"),
            "green",
            CharacteristicSource::UserDirectStatement,
            0.6,
            now,
        );
        let top = engine.get_top(Some(CharacteristicKind::Preference), 0.0, 5, now);
        assert_eq!(top.len(), 1);
        if expect_overwrite {
            assert!(matches!(second, UpsertOutcome::Overwritten(_)));
            assert_eq!(top[0].record.value, "green");
            assert_eq!(top[0].record.version, 2);
        } else {
            assert!(matches!(second, UpsertOutcome::Rejected(_)));
            assert_eq!(top[0].record.value, "blue");
            assert_eq!(top[0].record.version, 1);
        }
    }
}

#[test]
fn stale_characteristics_are_evicted_by_maintenance() {
    let engine = memory_engine();
    let then = Utc::now();
    engine.upsert_characteristic(
        CharacteristicKind::Habit,
        Some("bedtime"),
        "late",
        CharacteristicSource::LlmInferenceUserText,
        0.03,
        then,
    );
    let report = engine.maintenance_tick(then + Duration::days(40));
    assert_eq!(report.evicted, 1);
    assert!(engine.get_top(None, 0.0, 10, then + Duration::days(40)).is_empty());
}

// ---------------------------------------------------------------------------
// Persistence round-trips
// ---------------------------------------------------------------------------

#[test]
fn sqlite_round_trip_restores_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("anima.db");
    let now = Utc::now();

    let saved = {
        let store = Arc::new(SqliteStore::open(&path, &PersistenceConfig::default()).expect("open"));
        let engine = Engine::load(UserId::new("alice"), config(), store).with_seed(1);
        engine.handle_event(SignificantEvent::UserPraised, 1.0, now);
        engine.handle_event(SignificantEvent::UserScolded, 1.0, now);
        engine.upsert_characteristic(
            CharacteristicKind::Preference,
            Some("music"),
            "lo-fi",
            CharacteristicSource::UserDirectStatement,
            0.7,
            now,
        );
        engine.snapshot()
    };

    let store = Arc::new(SqliteStore::open(&path, &PersistenceConfig::default()).expect("reopen"));
    let engine = Engine::load(UserId::new("alice"), config(), store.clone());
    let restored = engine.snapshot();

    assert!((restored.attachment - saved.attachment).abs() < 1e-6);
    assert!((restored.traits.neuroticism - saved.traits.neuroticism).abs() < 1e-6);
    assert!((restored.neuro.stress_level - saved.neuro.stress_level).abs() < 1e-6);
    for (emotion, value) in saved.emotions.iter() {
        assert!(
            (restored.emotions.get(emotion) - value).abs() < 1e-6,
            "{emotion} not restored"
        );
    }
    let top = engine.get_top(Some(CharacteristicKind::Preference), 0.0, 3, now);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].record.value, "lo-fi");

    let history = store.emotion_history(&UserId::new("alice"), 50).expect("history");
    assert!(history.iter().any(|h| h.trigger == "user_scolded_pet_event"));
}

#[test]
fn configured_user_and_database_are_used() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = AnimaConfig::default();
    cfg.general.user_id = "carol".to_string();
    cfg.persistence.db_path = dir.path().join("carol.db").to_string_lossy().into_owned();
    let cfg = Arc::new(cfg);

    let store = Arc::new(SqliteStore::from_config(&cfg.persistence).expect("open"));
    assert_eq!(store.path(), dir.path().join("carol.db"));
    let engine = Engine::load_configured(Arc::clone(&cfg), store.clone());
    assert_eq!(engine.user(), &UserId::new("carol"));
    assert!(store.load_character(&UserId::new("carol")).expect("load").is_some());
}

#[test]
fn users_are_isolated() {
    let store: Arc<dyn RecordStore> = Arc::new(InMemoryStore::new());
    let alice = Engine::load(UserId::new("alice"), config(), store.clone());
    alice.handle_event(SignificantEvent::ExplicitAffection, 1.0, Utc::now());

    let bob = Engine::load(UserId::new("bob"), config(), store);
    assert!((bob.snapshot().attachment - 0.4).abs() < 1e-6);
    assert!(alice.snapshot().attachment > 0.4);
}

#[test]
fn store_outage_never_reaches_the_caller() {
    let store = Arc::new(InMemoryStore::new());
    store.set_unavailable(true);
    let engine = Engine::load(UserId::default(), config(), store.clone());
    let now = Utc::now();

    engine.handle_event(SignificantEvent::PositiveInteraction, 1.0, now);
    engine.decay_emotions(now);
    engine.maintenance_tick(now);
    let outcome = engine.upsert_characteristic(
        CharacteristicKind::Quirk,
        None,
        "hums when thinking",
        CharacteristicSource::PetSelfObservation,
        0.5,
        now,
    );
    assert!(matches!(outcome, UpsertOutcome::Inserted(_)));

    store.set_unavailable(false);
    assert!(
        store
            .load_characteristics(&UserId::default(), &Default::default())
            .expect("store back")
            .is_empty()
    );
}

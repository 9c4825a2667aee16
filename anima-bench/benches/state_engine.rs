//! Anima Benchmark Suite
//!
//! Performance targets for the synchronous paths that run under the
//! engine lock:
//!   characteristic_upsert_single ......... < 5μs
//!   characteristic_top5_from_200 ......... < 100μs
//!   personality_event_all_kinds .......... < 10μs
//!   affect_appraise_and_remap ............ < 20μs
//!   maintenance_tick_200_characteristics . < 500μs

use std::sync::Arc;

use chrono::{Duration, Utc};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;

use anima_core::characteristic::{CharacteristicKind, CharacteristicSource, CharacteristicStore};
use anima_core::config::{AnimaConfig, CharacteristicConfig, EmotionConfig, PersonalityConfig};
use anima_core::emotion::EmotionState;
use anima_core::emotion::affect::{self, Appraisal, CoreAffect};
use anima_core::persistence::InMemoryStore;
use anima_core::personality::{self, PersonalityTraits};
use anima_core::{Engine, SignificantEvent, Timestamp, UserId};

fn populated_store(n: usize, now: Timestamp) -> CharacteristicStore {
    let cfg = CharacteristicConfig::default();
    let traits = PersonalityTraits::default();
    let mut store = CharacteristicStore::new();
    for i in 0..n {
        let kind = CharacteristicKind::ALL[i % CharacteristicKind::ALL.len()];
        let seen = now - Duration::hours(i as i64);
        store.upsert(
            kind,
            Some(&format!("key_{i}")),
            &format!("value number {i}"),
            CharacteristicSource::LlmInferenceUserText,
            (i as f32 / n as f32).clamp(0.05, 0.95),
            &traits,
            &cfg,
            seen,
        );
    }
    store
}

/// Benchmark: one insert into a 200-record store.
fn bench_upsert(c: &mut Criterion) {
    let now = Utc::now();
    let cfg = CharacteristicConfig::default();
    let traits = PersonalityTraits::default();
    let base = populated_store(200, now);

    c.bench_function("characteristic_upsert_single", |b| {
        b.iter_batched(
            || base.clone(),
            |mut store| {
                let outcome = store.upsert(
                    CharacteristicKind::Preference,
                    Some(black_box("favorite_color")),
                    black_box("green"),
                    CharacteristicSource::UserDirectStatement,
                    0.6,
                    &traits,
                    &cfg,
                    now,
                );
                black_box(outcome);
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

/// Benchmark: ranked read of the top five preferences.
fn bench_get_top(c: &mut Criterion) {
    let now = Utc::now();
    let store = populated_store(200, now);
    let recency_k = CharacteristicConfig::default().recency_k;

    c.bench_function("characteristic_top5_from_200", |b| {
        b.iter(|| {
            let top = store.get_top(Some(CharacteristicKind::Preference), 0.0, black_box(5), recency_k, now);
            black_box(top);
        });
    });
}

/// Benchmark: every significant event applied once to the traits.
fn bench_personality_events(c: &mut Criterion) {
    let cfg = PersonalityConfig::default();

    c.bench_function("personality_event_all_kinds", |b| {
        b.iter(|| {
            let mut traits = PersonalityTraits::default();
            for event in SignificantEvent::ALL {
                let changes = personality::handle_event(&mut traits, black_box(event), 1.0, 0.5, &cfg);
                black_box(changes);
            }
            black_box(traits);
        });
    });
}

/// Benchmark: appraisal update followed by discrete remapping.
fn bench_appraisal_remap(c: &mut Criterion) {
    let cfg = EmotionConfig::default();
    let scores = Appraisal {
        novelty: 0.6,
        pleasantness: -0.7,
        goal_conduciveness: -0.4,
        coping_potential: 0.3,
        urgency: 0.8,
    };
    let mut rng = StdRng::seed_from_u64(7);
    let mut core = CoreAffect::default();
    let mut emotions = EmotionState::default();

    c.bench_function("affect_appraise_and_remap", |b| {
        b.iter(|| {
            core.update_from_appraisal(black_box(scores), 1.0, &cfg);
            let changes = affect::map_to_discrete(&core, &mut emotions, 1.0, &cfg, &mut rng);
            core.decay(false, &cfg);
            black_box(changes);
        });
    });
}

/// Benchmark: full maintenance tick with write-through to memory.
fn bench_maintenance_tick(c: &mut Criterion) {
    let now = Utc::now();
    let engine = Engine::load(
        UserId::new("bench"),
        Arc::new(AnimaConfig::default()),
        Arc::new(InMemoryStore::new()),
    )
    .with_seed(3);
    for i in 0..200 {
        engine.upsert_characteristic(
            CharacteristicKind::ALL[i % CharacteristicKind::ALL.len()],
            Some(&format!("key_{i}")),
            &format!("value number {i}"),
            CharacteristicSource::LlmInferenceUserText,
            0.5,
            now,
        );
    }
    let mut tick = now;

    c.bench_function("maintenance_tick_200_characteristics", |b| {
        b.iter(|| {
            tick += Duration::seconds(60);
            black_box(engine.maintenance_tick(black_box(tick)));
        });
    });
}

criterion_group!(
    benches,
    bench_upsert,
    bench_get_top,
    bench_personality_events,
    bench_appraisal_remap,
    bench_maintenance_tick,
);
criterion_main!(benches);

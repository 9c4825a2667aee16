//! Delayed self-regulation of strong negative emotions.
//!
//! A strong negative emotion schedules at most one attempt at a time, no
//! more often than the configured minimum interval. When the timer fires
//! the emotion is checked again, the companion decides whether to try
//! (conscientious, calm companions try more often), thinks a coping
//! thought, and only then lowers the emotion.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use anima_core::emotion::Emotion;
use anima_core::personality::{regulation_probability, regulation_reduction};
use anima_core::{Engine, SignificantEvent};
use anima_llm::prompt::{PromptEngine, PromptId};
use anima_llm::types::GenerationRequest;
use anima_llm::InferenceService;

/// How one fired attempt ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegulationOutcome {
    /// The emotion had already dropped below the threshold.
    Subsided,
    /// The companion did not try this time.
    Declined,
    /// No coping thought could be generated; nothing changed.
    NoThought,
    /// The emotion was lowered by `reduction`.
    Regulated {
        /// Which emotion.
        emotion: Emotion,
        /// How much was removed.
        reduction: f32,
    },
}

#[derive(Debug, Default)]
struct Schedule {
    pending: Option<JoinHandle<RegulationOutcome>>,
    last_scheduled: Option<Instant>,
}

/// Owns the single pending self-regulation timer for one companion.
pub struct SelfRegulator {
    engine: Arc<Engine>,
    inference: Arc<dyn InferenceService>,
    prompts: Arc<PromptEngine>,
    companion_name: String,
    schedule: Mutex<Schedule>,
}

impl SelfRegulator {
    /// New regulator with nothing scheduled.
    pub fn new(
        engine: Arc<Engine>,
        inference: Arc<dyn InferenceService>,
        prompts: Arc<PromptEngine>,
        companion_name: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            inference,
            prompts,
            companion_name: companion_name.into(),
            schedule: Mutex::new(Schedule::default()),
        }
    }

    /// Whether an attempt is waiting to fire.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.schedule.lock().pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Schedule an attempt if a strong negative emotion is present and the
    /// schedule-time guards pass. Returns the chosen delay.
    ///
    /// Must be called from within a tokio runtime.
    pub fn check(self: &Arc<Self>) -> Option<Duration> {
        let (emotion, value) = self.engine.regulation_candidate()?;
        let orchestration = &self.engine.config().orchestration;
        let min_interval = Duration::from_secs(orchestration.regulation_min_interval_secs);

        let mut schedule = self.schedule.lock();
        if schedule.pending.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!(emotion = %emotion, "self-regulation already pending");
            return None;
        }
        if schedule.last_scheduled.is_some_and(|t| t.elapsed() < min_interval) {
            debug!(emotion = %emotion, "self-regulation scheduled too recently");
            return None;
        }

        let lo = orchestration.regulation_delay_min_secs;
        let hi = orchestration.regulation_delay_max_secs.max(lo);
        let delay = Duration::from_secs(rand::thread_rng().gen_range(lo..=hi));
        schedule.last_scheduled = Some(Instant::now());

        let this = Arc::clone(self);
        schedule.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.attempt(emotion).await
        }));
        info!(emotion = %emotion, intensity = value, delay_secs = delay.as_secs(), "self-regulation scheduled");
        Some(delay)
    }

    /// Run one attempt for `emotion` now.
    pub async fn attempt(&self, emotion: Emotion) -> RegulationOutcome {
        let threshold = self.engine.config().emotion.strong_threshold;
        let intensity = self.engine.emotion(emotion);
        if intensity < threshold {
            debug!(emotion = %emotion, intensity, "emotion subsided before regulation");
            return RegulationOutcome::Subsided;
        }

        let traits = self.engine.with_state(|s| s.traits);
        if !self.engine.chance(regulation_probability(&traits)) {
            debug!(emotion = %emotion, "self-regulation not attempted");
            return RegulationOutcome::Declined;
        }

        let intensity_text = format!("{intensity:.2}");
        let vars = [
            ("companion_name", self.companion_name.as_str()),
            ("emotion", emotion.as_str()),
            ("intensity", intensity_text.as_str()),
        ];
        let thought = match self.prompts.render(PromptId::CopingThought, &vars) {
            Ok((system, user, sampling)) => {
                let request = GenerationRequest {
                    system,
                    ..GenerationRequest::single(user, sampling)
                };
                self.inference.generate(&request).await
            }
            Err(e) => Err(e),
        };
        let thought = match thought {
            Ok(g) => g.spoken_text,
            Err(e) => {
                warn!(emotion = %emotion, error = %e, "no coping thought, skipping regulation");
                return RegulationOutcome::NoThought;
            }
        };

        let reduction = regulation_reduction(self.engine.config().orchestration.regulation_reduction, &traits);
        let now = Utc::now();
        let change = self.engine.reduce_emotion(emotion, reduction, "self_regulation", now);
        self.engine
            .handle_event(SignificantEvent::SuccessfulSelfRegulation, 1.0, now);
        info!(
            emotion = %emotion,
            old = change.old,
            new = change.new,
            thought = %thought,
            "self-regulated"
        );
        RegulationOutcome::Regulated { emotion, reduction }
    }

    /// Cancel any pending attempt.
    pub fn shutdown(&self) {
        if let Some(handle) = self.schedule.lock().pending.take() {
            handle.abort();
        }
    }

    /// Wait for the pending attempt, if any, and return how it ended.
    pub async fn join_pending(&self) -> Option<RegulationOutcome> {
        let handle = self.schedule.lock().pending.take()?;
        handle.await.ok()
    }
}

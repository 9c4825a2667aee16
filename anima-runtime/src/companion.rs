//! The interactive surface for one companion.
//!
//! Everything here returns without waiting on inference. Calls into the
//! language service run in spawned tasks whose handles are returned so
//! hosts (and tests) may await them, or simply drop them.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Duration;
use parking_lot::Mutex;
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use anima_core::characteristic::{CharacteristicKind, CharacteristicSource, normalize_key};
use anima_core::emotion::DisplayMood;
use anima_core::{describe, Engine, SignificantEvent, TickReport, Timestamp};
use anima_llm::parse;
use anima_llm::prompt::{PromptEngine, PromptId, STRUCTURED_OUTPUT_INSTRUCTION};
use anima_llm::types::{ChatTurn, GenerationRequest};
use anima_llm::InferenceService;

use crate::learning::{DispatchOutcome, LearningCategory, LearningDispatcher};
use crate::regulation::SelfRegulator;

/// A user reading at least this strong counts as clearly positive.
const SHARED_POSITIVE_MIN: f32 = 0.6;
/// Stored prefix lengths for feedback characteristics.
const FEEDBACK_REPLY_CHARS: usize = 30;
const FEEDBACK_TEXT_CHARS: usize = 40;
const CORRECTION_KEY_CHARS: usize = 15;
/// Upper bound on a sampled proactive gap.
const MAX_PROACTIVE_GAP_SECS: u64 = 7 * 86_400;

/// Who the companion is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionProfile {
    /// Display name.
    pub name: String,
    /// One-line character description.
    pub description: String,
}

impl Default for CompanionProfile {
    fn default() -> Self {
        Self {
            name: "Mochi".into(),
            description: "a small, curious companion who lives on the user's desktop.".into(),
        }
    }
}

/// Direct feedback on the companion's last reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// The user liked it.
    Positive,
    /// The user disliked it.
    Negative,
    /// The user corrected it.
    Correction,
}

/// What feedback handling did.
#[derive(Debug)]
pub enum FeedbackOutcome {
    /// There was no reply to give feedback on.
    NoLastReply,
    /// Events and characteristics were applied synchronously.
    Applied,
    /// A correction worker was started; it yields whether a fact was stored.
    Learning(JoinHandle<bool>),
}

#[derive(Debug)]
struct Session {
    history: VecDeque<ChatTurn>,
    last_exchange: Option<(String, String)>,
    last_interaction: Timestamp,
    absent: bool,
    last_proactive: Timestamp,
    proactive_gap: Duration,
}

/// One companion: engine, inference, background workers and session.
pub struct Companion {
    engine: Arc<Engine>,
    inference: Arc<dyn InferenceService>,
    prompts: Arc<PromptEngine>,
    profile: CompanionProfile,
    learning: LearningDispatcher,
    regulator: Arc<SelfRegulator>,
    session: Mutex<Session>,
}

impl Companion {
    /// Assemble a companion around a loaded engine and raise the
    /// app-start bonus.
    pub fn new(
        engine: Arc<Engine>,
        inference: Arc<dyn InferenceService>,
        prompts: Arc<PromptEngine>,
        profile: CompanionProfile,
        now: Timestamp,
    ) -> Arc<Self> {
        let learning = LearningDispatcher::new(
            Arc::clone(&engine),
            Arc::clone(&inference),
            Arc::clone(&prompts),
            profile.name.clone(),
        );
        let regulator = Arc::new(SelfRegulator::new(
            Arc::clone(&engine),
            Arc::clone(&inference),
            Arc::clone(&prompts),
            profile.name.clone(),
        ));
        let proactive_gap = sample_proactive_gap(&engine);
        engine.handle_event(SignificantEvent::AppStart, 1.0, now);
        Arc::new(Self {
            engine,
            inference,
            prompts,
            profile,
            learning,
            regulator,
            session: Mutex::new(Session {
                history: VecDeque::new(),
                last_exchange: None,
                last_interaction: now,
                absent: false,
                last_proactive: now,
                proactive_gap,
            }),
        })
    }

    /// The underlying state engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// The learning dispatcher.
    #[must_use]
    pub fn learning(&self) -> &LearningDispatcher {
        &self.learning
    }

    /// The self-regulation scheduler.
    #[must_use]
    pub fn regulator(&self) -> &Arc<SelfRegulator> {
        &self.regulator
    }

    /// Recent conversation, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<ChatTurn> {
        self.session.lock().history.iter().cloned().collect()
    }

    // ---- interactive path ----

    /// Persona prompt, recent history and sampling for replying to
    /// `user_text`. Reads state only.
    #[must_use]
    pub fn build_request(&self, user_text: &str, now: Timestamp) -> GenerationRequest {
        self.render_persona(PromptId::Persona, user_text, now)
    }

    /// Request for an unprompted message.
    #[must_use]
    pub fn build_proactive_request(&self, now: Timestamp) -> GenerationRequest {
        self.render_persona(PromptId::Proactive, "", now)
    }

    fn render_persona(&self, id: PromptId, user_text: &str, now: Timestamp) -> GenerationRequest {
        let config = self.engine.config();
        let (personality, attachment, efficacy, neuro, characteristics, mood) = self.engine.with_state(|s| {
            (
                describe::personality(&s.traits),
                describe::attachment(s.attachment),
                describe::self_efficacy(&s.efficacy).unwrap_or_default(),
                describe::neuro(&s.neuro).unwrap_or_default(),
                describe::characteristics(&s.characteristics, &config.characteristics, now),
                describe::mood(&s.emotions, &s.affect, config.emotion.display_threshold),
            )
        });
        let current_time = now.format("%Y-%m-%d %H:%M UTC").to_string();
        let vars = [
            ("companion_name", self.profile.name.as_str()),
            ("character_profile", self.profile.description.as_str()),
            ("personality_description", personality.as_str()),
            ("attachment_description", attachment.as_str()),
            ("efficacy_description", efficacy.as_str()),
            ("neuro_description", neuro.as_str()),
            ("characteristics_description", characteristics.as_str()),
            ("mood_description", mood.as_str()),
            ("current_time", current_time.as_str()),
            ("user_message", user_text),
        ];
        let history = {
            let session = self.session.lock();
            let skip = session.history.len().saturating_sub(config.orchestration.history_turns);
            session.history.iter().skip(skip).cloned().collect()
        };
        match self.prompts.render(id, &vars) {
            Ok((system, prompt, sampling)) => GenerationRequest {
                system: format!("{system}\n\n{STRUCTURED_OUTPUT_INSTRUCTION}"),
                history,
                prompt,
                config: sampling,
                structured: true,
            },
            Err(e) => {
                warn!(prompt = %id, error = %e, "persona prompt missing, sending bare request");
                GenerationRequest {
                    history,
                    ..GenerationRequest::single(user_text, Default::default())
                }
            }
        }
    }

    /// Record a completed exchange and start background appraisal,
    /// emotion reading, regulation check and learning.
    ///
    /// `reply_text` is the spoken part of the reply. Internal thoughts are
    /// for display only and are neither stored in history nor analysed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ingest_exchange(self: &Arc<Self>, user_text: &str, reply_text: &str, now: Timestamp) -> JoinHandle<()> {
        let returned = self.note_interaction(user_text, reply_text, now);
        self.raise(SignificantEvent::PositiveInteraction, 1.0, now);
        if returned {
            info!("user returned after absence");
            self.raise(SignificantEvent::ReturnedAfterAbsence, 1.0, now);
        }

        let this = Arc::clone(self);
        let user_text = user_text.to_string();
        let reply_text = reply_text.to_string();
        tokio::spawn(async move {
            this.react_to_user_text(&user_text).await;
            this.regulator.check();
            let workers = [
                this.learning.dispatch(LearningCategory::UserText, &user_text),
                this.learning.dispatch(LearningCategory::AgentText, &reply_text),
            ];
            for outcome in workers {
                if let DispatchOutcome::Dispatched(handle) = outcome {
                    if let Err(e) = handle.await {
                        warn!(error = %e, "learning worker aborted");
                    }
                }
            }
        })
    }

    fn note_interaction(&self, user_text: &str, reply_text: &str, now: Timestamp) -> bool {
        let threshold = Duration::minutes(self.engine.config().orchestration.absence_threshold_mins);
        let cap = self.engine.config().orchestration.history_turns.max(1);
        let mut session = self.session.lock();
        let returned = session.absent || now - session.last_interaction > threshold;
        session.absent = false;
        session.last_interaction = now;
        session.history.push_back(ChatTurn::user(user_text));
        session.history.push_back(ChatTurn::assistant(reply_text));
        while session.history.len() > cap {
            session.history.pop_front();
        }
        session.last_exchange = Some((user_text.to_string(), reply_text.to_string()));
        returned
    }

    async fn react_to_user_text(&self, user_text: &str) {
        match self.inference.appraise_event(user_text).await {
            Ok(scores) => {
                let changes = self
                    .engine
                    .apply_appraisal(scores, "user_message_appraisal", chrono::Utc::now());
                debug!(changes = changes.len(), "applied appraisal of user message");
            }
            Err(e) => warn!(error = %e, "appraisal failed, skipping update"),
        }

        match self.inference.analyze_emotions(user_text).await {
            Ok(readings) => {
                let user_positive = readings
                    .iter()
                    .filter(|(e, _)| e.is_positive())
                    .any(|(_, v)| *v >= SHARED_POSITIVE_MIN);
                let mood = self.engine.snapshot().mood;
                if user_positive && matches!(mood, DisplayMood::Happy | DisplayMood::Excited) {
                    self.raise(SignificantEvent::SharedPositiveEmotion, 1.0, chrono::Utc::now());
                }
            }
            Err(e) => warn!(error = %e, "emotion analysis failed, skipping update"),
        }
    }

    /// Apply direct feedback on the last reply.
    ///
    /// Must be called from within a tokio runtime.
    pub fn apply_feedback(self: &Arc<Self>, kind: FeedbackKind, text: &str, now: Timestamp) -> FeedbackOutcome {
        let Some((user_input, reply)) = self.session.lock().last_exchange.clone() else {
            debug!(?kind, "feedback without a previous reply");
            return FeedbackOutcome::NoLastReply;
        };
        match kind {
            FeedbackKind::Positive => {
                self.raise(SignificantEvent::UserPraised, 1.2, now);
                let text = text.trim();
                if !text.is_empty() {
                    let value = format!(
                        "liked \"{}\" because \"{}\"",
                        prefix(&reply, FEEDBACK_REPLY_CHARS),
                        prefix(text, FEEDBACK_TEXT_CHARS)
                    );
                    self.engine.upsert_characteristic(
                        CharacteristicKind::ResponseStyle,
                        None,
                        &value,
                        CharacteristicSource::UserFeedbackPositive,
                        0.75,
                        now,
                    );
                }
                FeedbackOutcome::Applied
            }
            FeedbackKind::Negative => {
                self.raise(SignificantEvent::UserScolded, 1.2, now);
                FeedbackOutcome::Applied
            }
            FeedbackKind::Correction => {
                let this = Arc::clone(self);
                let correction = text.to_string();
                FeedbackOutcome::Learning(tokio::spawn(async move {
                    this.learn_from_correction(&user_input, &reply, &correction).await
                }))
            }
        }
    }

    async fn learn_from_correction(&self, user_input: &str, reply: &str, correction: &str) -> bool {
        let vars = [
            ("user_input", user_input),
            ("original_response", reply),
            ("correction", correction),
        ];
        let output = match self.prompts.render(PromptId::CorrectionAnalysis, &vars) {
            Ok((system, user, sampling)) => {
                let request = GenerationRequest {
                    system,
                    ..GenerationRequest::single(user, sampling)
                };
                self.inference.generate(&request).await
            }
            Err(e) => Err(e),
        };
        let analysis = output.and_then(|g| parse::correction(&parse::extract_object(&g.spoken_text)?));
        let analysis = match analysis {
            Ok(a) => a,
            Err(e) => {
                warn!(error = %e, "could not learn from correction");
                return false;
            }
        };
        let summary = normalize_key(&analysis.error_summary);
        let key = format!(
            "correction_{}",
            if summary.is_empty() { "unknown" } else { prefix(&summary, CORRECTION_KEY_CHARS) }
        );
        let outcome = self.engine.upsert_characteristic(
            CharacteristicKind::UserInfo,
            Some(&key),
            &analysis.corrected_fact,
            CharacteristicSource::UserFeedbackNegative,
            0.88,
            chrono::Utc::now(),
        );
        info!(key = %key, fact = %analysis.corrected_fact, "learned from correction");
        outcome.changed()
    }

    // ---- proactive behaviour ----

    /// Whether an unprompted message is due.
    #[must_use]
    pub fn proactive_due(&self, now: Timestamp) -> bool {
        if self.engine.is_resting() {
            return false;
        }
        let quiet = Duration::seconds(self.engine.config().orchestration.proactive_quiet_secs);
        let modifier = self.engine.params().proactive_freq_modifier.max(0.01);
        let session = self.session.lock();
        if now - session.last_interaction < quiet {
            return false;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let gap = Duration::milliseconds((session.proactive_gap.num_milliseconds() as f64 / f64::from(modifier)) as i64);
        now - session.last_proactive >= gap
    }

    /// Note that an unprompted message was sent and draw the next gap.
    pub fn mark_proactive_sent(&self, text: &str, now: Timestamp) {
        let gap = sample_proactive_gap(&self.engine);
        let mut session = self.session.lock();
        session.last_proactive = now;
        session.proactive_gap = gap;
        session.history.push_back(ChatTurn::assistant(text));
    }

    /// How the user answered an unprompted message.
    ///
    /// Must be called from within a tokio runtime.
    pub fn record_proactive_response(&self, positive: bool, now: Timestamp) -> bool {
        let event = if positive {
            SignificantEvent::ProactivePositiveResponse
        } else {
            SignificantEvent::ProactiveIgnored
        };
        self.raise(event, 1.0, now)
    }

    // ---- lifecycle ----

    /// Toggle resting; decay and fluctuation pause while resting.
    pub fn set_resting(&self, resting: bool) {
        self.engine.set_resting(resting);
    }

    /// One maintenance tick plus absence tracking and a regulation check.
    ///
    /// Must be called from within a tokio runtime.
    pub fn tick(self: &Arc<Self>, now: Timestamp) -> TickReport {
        let report = self.engine.maintenance_tick(now);
        let threshold = Duration::minutes(self.engine.config().orchestration.absence_threshold_mins);
        let away = {
            let mut session = self.session.lock();
            let away = now - session.last_interaction > threshold;
            if away {
                session.absent = true;
            }
            away
        };
        if away {
            self.raise(SignificantEvent::LongAbsenceTick, 1.0, now);
        }
        if report.regulation_candidate.is_some() {
            self.regulator.check();
        }
        report
    }

    /// Apply `event`, then look for an emotion the event pushed past the
    /// regulation threshold. Returns `false` when the event was throttled.
    fn raise(&self, event: SignificantEvent, strength: f32, now: Timestamp) -> bool {
        let applied = self.engine.handle_event(event, strength, now);
        if applied {
            self.regulator.check();
        }
        applied
    }

    /// Cancel pending background work owned by this companion.
    pub fn shutdown(&self) {
        self.regulator.shutdown();
    }
}

fn sample_proactive_gap(engine: &Engine) -> Duration {
    let orchestration = &engine.config().orchestration;
    let lo = orchestration.proactive_min_secs;
    let hi = orchestration.proactive_max_secs.max(lo);
    let secs = rand::thread_rng().gen_range(lo..=hi).min(MAX_PROACTIVE_GAP_SECS);
    Duration::seconds(i64::try_from(secs).unwrap_or(0))
}

/// At most `max` characters of `s`.
fn prefix(s: &str, max: usize) -> &str {
    s.char_indices().nth(max).map_or(s, |(i, _)| &s[..i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_respects_char_boundaries() {
        assert_eq!(prefix("héllo wörld", 4), "héll");
        assert_eq!(prefix("short", 40), "short");
    }
}

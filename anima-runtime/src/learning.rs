//! Best-effort background learning.
//!
//! Each category has its own semaphore sized by configuration. A request
//! that finds no free permit is dropped, never queued. The permit moves
//! into the spawned worker and is released when the task ends, however it
//! ends.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use anima_core::characteristic::{CharacteristicKind, CharacteristicSource, normalize_key};
use anima_core::{Engine, SignificantEvent};
use anima_llm::parse;
use anima_llm::prompt::{PromptEngine, PromptId};
use anima_llm::types::{GenerationRequest, LearnedItem};
use anima_llm::InferenceService;

/// Kinds accepted from user-text analysis.
pub const USER_TEXT_KINDS: [CharacteristicKind; 5] = [
    CharacteristicKind::Preference,
    CharacteristicKind::Habit,
    CharacteristicKind::UserInfo,
    CharacteristicKind::FavoriteTopic,
    CharacteristicKind::ResponseStyle,
];

/// Kinds accepted from the companion's own text.
pub const AGENT_TEXT_KINDS: [CharacteristicKind; 3] = [
    CharacteristicKind::Quirk,
    CharacteristicKind::LanguagePattern,
    CharacteristicKind::SelfConcept,
];

/// What is being analysed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LearningCategory {
    /// The user's messages.
    UserText,
    /// The companion's replies.
    AgentText,
}

impl LearningCategory {
    fn accepted_kinds(self) -> &'static [CharacteristicKind] {
        match self {
            Self::UserText => &USER_TEXT_KINDS,
            Self::AgentText => &AGENT_TEXT_KINDS,
        }
    }

    fn source(self) -> CharacteristicSource {
        match self {
            Self::UserText => CharacteristicSource::LlmInferenceUserText,
            Self::AgentText => CharacteristicSource::LlmInferencePetText,
        }
    }

    fn prompt(self) -> PromptId {
        match self {
            Self::UserText => PromptId::UserTextAnalysis,
            Self::AgentText => PromptId::AgentTextAnalysis,
        }
    }

    /// Initial relevance for one learned item.
    fn base_relevance(self, item: &LearnedItem) -> f32 {
        match self {
            Self::UserText => (0.55 + item.relevance_score_modifier).clamp(0.15, 0.95),
            Self::AgentText => 0.5,
        }
    }

    /// Event raised after `learned` items were stored, with its strength.
    #[allow(clippy::cast_precision_loss)]
    fn learned_event(self, learned: usize) -> (SignificantEvent, f32) {
        let n = learned as f32;
        match self {
            Self::UserText => (SignificantEvent::LearnedFromUserText, 0.08 + 0.015 * n),
            Self::AgentText => (SignificantEvent::SelfLearnedPattern, 0.05 + 0.015 * n),
        }
    }
}

impl fmt::Display for LearningCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UserText => "user_text",
            Self::AgentText => "agent_text",
        })
    }
}

/// Result of a dispatch request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A worker was started; the handle yields the number of items learned.
    Dispatched(JoinHandle<usize>),
    /// The category was at its concurrency cap.
    Dropped,
    /// The text was below the category's minimum length.
    TooShort,
}

/// Launches bounded learning workers for one companion.
pub struct LearningDispatcher {
    engine: Arc<Engine>,
    inference: Arc<dyn InferenceService>,
    prompts: Arc<PromptEngine>,
    companion_name: String,
    user_slots: Arc<Semaphore>,
    agent_slots: Arc<Semaphore>,
}

impl LearningDispatcher {
    /// Dispatcher with per-category caps from the engine's configuration.
    pub fn new(
        engine: Arc<Engine>,
        inference: Arc<dyn InferenceService>,
        prompts: Arc<PromptEngine>,
        companion_name: impl Into<String>,
    ) -> Self {
        let orchestration = &engine.config().orchestration;
        let user_slots = Arc::new(Semaphore::new(orchestration.user_text_concurrency.max(1)));
        let agent_slots = Arc::new(Semaphore::new(orchestration.agent_text_concurrency.max(1)));
        Self {
            engine,
            inference,
            prompts,
            companion_name: companion_name.into(),
            user_slots,
            agent_slots,
        }
    }

    fn slots(&self, category: LearningCategory) -> &Arc<Semaphore> {
        match category {
            LearningCategory::UserText => &self.user_slots,
            LearningCategory::AgentText => &self.agent_slots,
        }
    }

    fn min_chars(&self, category: LearningCategory) -> usize {
        let orchestration = &self.engine.config().orchestration;
        match category {
            LearningCategory::UserText => orchestration.user_text_min_chars,
            LearningCategory::AgentText => orchestration.agent_text_min_chars,
        }
    }

    /// Workers currently running for `category`.
    #[must_use]
    pub fn in_flight(&self, category: LearningCategory) -> usize {
        let cap = match category {
            LearningCategory::UserText => self.engine.config().orchestration.user_text_concurrency.max(1),
            LearningCategory::AgentText => self.engine.config().orchestration.agent_text_concurrency.max(1),
        };
        cap.saturating_sub(self.slots(category).available_permits())
    }

    /// Start a worker for `text` if the category has a free slot.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, category: LearningCategory, text: &str) -> DispatchOutcome {
        let text = text.trim();
        if text.chars().count() < self.min_chars(category) {
            debug!(category = %category, "text too short for learning");
            return DispatchOutcome::TooShort;
        }
        let Ok(permit) = Arc::clone(self.slots(category)).try_acquire_owned() else {
            debug!(category = %category, "learning worker busy, dropping request");
            return DispatchOutcome::Dropped;
        };

        let worker = Worker {
            category,
            engine: Arc::clone(&self.engine),
            inference: Arc::clone(&self.inference),
            prompts: Arc::clone(&self.prompts),
            companion_name: self.companion_name.clone(),
        };
        let text = text.to_string();
        DispatchOutcome::Dispatched(tokio::spawn(async move {
            let _permit = permit;
            worker.run(&text).await
        }))
    }
}

struct Worker {
    category: LearningCategory,
    engine: Arc<Engine>,
    inference: Arc<dyn InferenceService>,
    prompts: Arc<PromptEngine>,
    companion_name: String,
}

impl Worker {
    async fn run(&self, text: &str) -> usize {
        let allowed = self
            .category
            .accepted_kinds()
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let text_key = match self.category {
            LearningCategory::UserText => "user_text",
            LearningCategory::AgentText => "agent_text",
        };
        let vars = [
            ("companion_name", self.companion_name.as_str()),
            ("allowed_types", allowed.as_str()),
            (text_key, text),
        ];
        let (system, user, sampling) = match self.prompts.render(self.category.prompt(), &vars) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(category = %self.category, error = %e, "cannot render learning prompt");
                return 0;
            }
        };
        let request = GenerationRequest {
            system,
            ..GenerationRequest::single(user, sampling)
        };

        let output = match self.inference.generate(&request).await {
            Ok(g) => g.spoken_text,
            Err(e) => {
                warn!(category = %self.category, error = %e, "learning analysis failed");
                return 0;
            }
        };
        let items = match parse::extract_object(&output) {
            Ok(obj) => parse::learned_items(&obj),
            Err(e) => {
                warn!(category = %self.category, error = %e, "learning output unreadable");
                return 0;
            }
        };

        let learned = self.store(&items);
        if learned > 0 {
            let (event, strength) = self.category.learned_event(learned);
            self.engine.handle_event(event, strength, Utc::now());
            info!(category = %self.category, learned, "learned characteristics");
        }
        learned
    }

    fn store(&self, items: &[LearnedItem]) -> usize {
        let accepted = self.category.accepted_kinds();
        let mut learned = 0;
        for item in items {
            let kind = match item.trait_type.parse::<CharacteristicKind>() {
                Ok(k) if accepted.contains(&k) => k,
                _ => {
                    debug!(category = %self.category, trait_type = %item.trait_type, "skipping item of foreign kind");
                    continue;
                }
            };
            let key = normalize_key(&item.trait_key);
            if key.is_empty() {
                continue;
            }
            let outcome = self.engine.upsert_characteristic(
                kind,
                Some(&key),
                &item.trait_value,
                self.category.source(),
                self.category.base_relevance(item),
                Utc::now(),
            );
            if outcome.changed() {
                learned += 1;
            }
        }
        learned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(modifier: f32) -> LearnedItem {
        LearnedItem {
            trait_type: "preference".into(),
            trait_key: "k".into(),
            trait_value: "v".into(),
            relevance_score_modifier: modifier,
        }
    }

    #[test]
    fn user_relevance_is_bounded() {
        let c = LearningCategory::UserText;
        assert!((c.base_relevance(&item(0.0)) - 0.55).abs() < 1e-6);
        assert!((c.base_relevance(&item(0.9)) - 0.95).abs() < 1e-6);
        assert!((c.base_relevance(&item(-0.9)) - 0.15).abs() < 1e-6);
        assert!((LearningCategory::AgentText.base_relevance(&item(0.3)) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn learned_event_strength_grows_with_count() {
        let (event, strength) = LearningCategory::UserText.learned_event(2);
        assert_eq!(event, SignificantEvent::LearnedFromUserText);
        assert!((strength - 0.11).abs() < 1e-6);
        let (event, strength) = LearningCategory::AgentText.learned_event(1);
        assert_eq!(event, SignificantEvent::SelfLearnedPattern);
        assert!((strength - 0.065).abs() < 1e-6);
    }

    #[test]
    fn categories_do_not_share_kinds() {
        assert!(USER_TEXT_KINDS.iter().all(|k| !AGENT_TEXT_KINDS.contains(k)));
    }
}

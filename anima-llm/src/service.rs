//! The inference seam used by the runtime.

use async_trait::async_trait;
use tracing::debug;

use anima_core::config::LlmConfig;
use anima_core::emotion::Emotion;
use anima_core::emotion::affect::Appraisal;

use crate::client::LlmClient;
use crate::error::LlmError;
use crate::parse;
use crate::prompt::{PromptEngine, PromptId};
use crate::types::{Generation, GenerationConfig, GenerationRequest};

/// Shortest text worth an emotion reading.
const MIN_EMOTION_TEXT_CHARS: usize = 5;
/// Shortest text worth an appraisal.
const MIN_APPRAISAL_TEXT_CHARS: usize = 3;

/// The language inference operations the affect engine consumes.
///
/// Implementations may be slow or fail; callers run them off the
/// interactive path and treat any error as "no update this cycle".
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Sparse emotion readings for `text`, intensities in `[0, 1]`.
    async fn analyze_emotions(&self, text: &str) -> Result<Vec<(Emotion, f32)>, LlmError>;

    /// Appraisal scores for an event description, already clamped.
    async fn appraise_event(&self, text: &str) -> Result<Appraisal, LlmError>;

    /// Free-form or structured generation.
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, LlmError>;
}

/// [`InferenceService`] backed by an [`LlmClient`].
pub struct LlmService {
    client: LlmClient,
    prompts: PromptEngine,
}

impl LlmService {
    /// Wrap a client with a prompt set.
    #[must_use]
    pub fn new(client: LlmClient, prompts: PromptEngine) -> Self {
        Self { client, prompts }
    }

    /// Client and built-in prompts with sampling taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for an unknown provider.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut prompts = PromptEngine::builtin();
        apply_sampling(&mut prompts, config);
        Ok(Self::new(LlmClient::from_config(config)?, prompts))
    }

    /// The prompt set in use.
    #[must_use]
    pub fn prompts(&self) -> &PromptEngine {
        &self.prompts
    }

    async fn single(&self, id: PromptId, vars: &[(&str, &str)]) -> Result<String, LlmError> {
        let (system, user, sampling) = self.prompts.render(id, vars)?;
        let request = GenerationRequest {
            system,
            ..GenerationRequest::single(user, sampling)
        };
        let completion = self.client.complete(&request).await?;
        debug!(
            prompt = %id,
            latency_ms = completion.latency_ms,
            tokens = completion.tokens_generated,
            "analysis completed"
        );
        Ok(completion.text)
    }
}

/// Override built-in sampling with the `[llm]` section's values.
pub fn apply_sampling(prompts: &mut PromptEngine, config: &LlmConfig) {
    let with = |id: PromptId, temperature: f32, max_tokens: Option<u32>| {
        let current = prompts_sampling(prompts, id);
        (
            id,
            GenerationConfig {
                temperature,
                max_tokens: max_tokens.unwrap_or(current.max_tokens),
            },
        )
    };
    let overrides = [
        with(PromptId::Persona, config.generation_temperature, Some(config.generation_max_tokens)),
        with(PromptId::Proactive, config.generation_temperature, Some(config.generation_max_tokens)),
        with(PromptId::CopingThought, config.generation_temperature, None),
        with(PromptId::EmotionAnalysis, config.appraisal_temperature, None),
        with(PromptId::Appraisal, config.appraisal_temperature, None),
        with(
            PromptId::UserTextAnalysis,
            config.user_analysis_temperature,
            Some(config.user_analysis_max_tokens),
        ),
        with(
            PromptId::AgentTextAnalysis,
            config.agent_analysis_temperature,
            Some(config.agent_analysis_max_tokens),
        ),
    ];
    for (id, sampling) in overrides {
        prompts.set_sampling(id, sampling);
    }
}

fn prompts_sampling(prompts: &PromptEngine, id: PromptId) -> GenerationConfig {
    prompts.get(id).map(|t| t.sampling).unwrap_or_default()
}

/// Comma-separated emotion vocabulary for analysis prompts.
#[must_use]
pub fn emotion_list() -> String {
    Emotion::ALL.iter().map(|e| e.as_str()).collect::<Vec<_>>().join(", ")
}

#[async_trait]
impl InferenceService for LlmService {
    async fn analyze_emotions(&self, text: &str) -> Result<Vec<(Emotion, f32)>, LlmError> {
        let text = text.trim();
        if text.chars().count() < MIN_EMOTION_TEXT_CHARS {
            return Ok(Vec::new());
        }
        let list = emotion_list();
        let raw = self
            .single(PromptId::EmotionAnalysis, &[("emotion_list", &list), ("text", text)])
            .await?;
        Ok(parse::emotions(&parse::extract_object(&raw)?))
    }

    async fn appraise_event(&self, text: &str) -> Result<Appraisal, LlmError> {
        let text = text.trim();
        if text.chars().count() < MIN_APPRAISAL_TEXT_CHARS {
            return Err(LlmError::SchemaValidation("event text too short to appraise".into()));
        }
        let raw = self.single(PromptId::Appraisal, &[("event_text", text)]).await?;
        parse::appraisal(&parse::extract_object(&raw)?)
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, LlmError> {
        let completion = self.client.complete(request).await?;
        let generation = if request.structured {
            parse::generation(&completion.text)
        } else {
            Generation {
                spoken_text: completion.text.trim().to_string(),
                internal_thought: None,
            }
        };
        if generation.spoken_text.is_empty() {
            return Err(LlmError::SchemaValidation("model returned no text".into()));
        }
        Ok(generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_sampling_overrides_builtin() {
        let config = LlmConfig {
            generation_temperature: 0.95,
            user_analysis_max_tokens: 64,
            ..LlmConfig::default()
        };
        let mut prompts = PromptEngine::builtin();
        apply_sampling(&mut prompts, &config);
        let persona = prompts_sampling(&prompts, PromptId::Persona);
        assert!((persona.temperature - 0.95).abs() < 1e-6);
        assert_eq!(prompts_sampling(&prompts, PromptId::UserTextAnalysis).max_tokens, 64);
        // Token cap is kept where the config has no opinion.
        assert_eq!(prompts_sampling(&prompts, PromptId::CopingThought).max_tokens, 150);
    }

    #[test]
    fn emotion_list_names_whole_vocabulary() {
        let list = emotion_list();
        assert_eq!(list.split(", ").count(), Emotion::ALL.len());
        assert!(list.contains("aesthetic_appreciation"));
    }

    #[tokio::test]
    async fn short_texts_skip_the_backend() {
        let service = LlmService::new(LlmClient::none(), PromptEngine::builtin());
        assert!(service.analyze_emotions("ok").await.expect("empty").is_empty());
        assert!(matches!(
            service.appraise_event("hi").await,
            Err(LlmError::SchemaValidation(_))
        ));
        assert!(matches!(
            service.analyze_emotions("I had a lovely day").await,
            Err(LlmError::Unavailable(_))
        ));
    }
}

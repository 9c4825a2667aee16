//! Configuration for the anima state engine.
//!
//! Maps directly to `anima.toml`. Every section and field has a default, so
//! an empty file is a valid configuration. The magnitude constants here are
//! tuning for the companion's "feel" and are not load-bearing for
//! correctness.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AnimaError, Result};
use crate::personality::PersonalityTraits;

/// Top-level anima configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimaConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Discrete emotion and core affect tuning.
    #[serde(default)]
    pub emotion: EmotionConfig,
    /// Personality drift tuning.
    #[serde(default)]
    pub personality: PersonalityConfig,
    /// Attachment score tuning.
    #[serde(default)]
    pub attachment: AttachmentConfig,
    /// Self-efficacy tuning.
    #[serde(default)]
    pub efficacy: EfficacyConfig,
    /// Simulated neuromodulator tuning.
    #[serde(default)]
    pub neuro: NeuroConfig,
    /// Characteristic store tuning.
    #[serde(default)]
    pub characteristics: CharacteristicConfig,
    /// Background work and timer settings.
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
    /// Language inference service settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Record store settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl AnimaConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `AnimaError::Config` if the TOML is invalid or fails
    /// [`validate`](Self::validate).
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| AnimaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Reject settings that would make the runtime misbehave.
    ///
    /// # Errors
    /// Returns `AnimaError::Config` describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        let o = &self.orchestration;
        if o.user_text_concurrency == 0 || o.agent_text_concurrency == 0 {
            return Err(AnimaError::Config(
                "orchestration concurrency caps must be at least 1".into(),
            ));
        }
        if o.regulation_delay_min_secs > o.regulation_delay_max_secs {
            return Err(AnimaError::Config(format!(
                "regulation delay range is inverted: {}..{}",
                o.regulation_delay_min_secs, o.regulation_delay_max_secs
            )));
        }
        if o.proactive_min_secs > o.proactive_max_secs {
            return Err(AnimaError::Config(format!(
                "proactive interval range is inverted: {}..{}",
                o.proactive_min_secs, o.proactive_max_secs
            )));
        }
        if o.tick_interval_secs == 0 {
            return Err(AnimaError::Config("tick_interval_secs must be positive".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
    /// User whose state is loaded when none is given explicitly.
    pub user_id: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            user_id: "default_user".to_string(),
        }
    }
}

/// Discrete emotion and core affect tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    /// Fraction of the distance to baseline removed per decay pass, before
    /// mood stability is applied.
    pub decay_rate: f32,
    /// Base mood stability before neuromodulator adjustment.
    pub mood_stability: f32,
    /// Base emotional sensitivity before neuromodulator adjustment.
    pub emo_sensitivity: f32,
    /// Resting intensity every discrete emotion decays toward.
    pub baseline: f32,
    /// Appraisal blend rate at sensitivity 1.0.
    pub appraisal_blend: f32,
    /// Affect-to-discrete blend rate at sensitivity 1.0.
    pub mapping_blend: f32,
    /// |valence| above which a quadrant is considered active.
    pub valence_threshold: f32,
    /// Arousal splitting the high and low quadrants.
    pub arousal_threshold: f32,
    /// |valence| above which the opposing set is suppressed.
    pub suppression_valence: f32,
    /// Floor the opposing set is pulled toward.
    pub suppression_floor: f32,
    /// Intensity above which an emotion counts as "strong".
    pub strong_threshold: f32,
    /// Minimum intensity for the dominant emotion to set the display mood.
    pub display_threshold: f32,
    /// Half-width of a single random fluctuation.
    pub fluctuation_amplitude: f32,
    /// Arousal baseline while resting.
    pub resting_arousal_target: f32,
    /// Arousal baseline while active.
    pub active_arousal_target: f32,
    /// Arousal decay rate while resting.
    pub resting_arousal_rate: f32,
    /// Arousal decay rate while active.
    pub active_arousal_rate: f32,
    /// Valence decay rate while resting.
    pub resting_valence_rate: f32,
    /// Valence decay rate while active.
    pub active_valence_rate: f32,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            decay_rate: 0.02,
            mood_stability: 0.3,
            emo_sensitivity: 1.0,
            baseline: 0.5,
            appraisal_blend: 0.2,
            mapping_blend: 0.18,
            valence_threshold: 0.15,
            arousal_threshold: 0.4,
            suppression_valence: 0.5,
            suppression_floor: 0.1,
            strong_threshold: 0.75,
            display_threshold: 0.35,
            fluctuation_amplitude: 0.05,
            resting_arousal_target: 0.05,
            active_arousal_target: 0.1,
            resting_arousal_rate: 0.15,
            active_arousal_rate: 0.08,
            resting_valence_rate: 0.03,
            active_valence_rate: 0.02,
        }
    }
}

/// Personality drift tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityConfig {
    /// Traits of a freshly created companion.
    pub initial: PersonalityTraits,
    /// Resistance slope `k` in `1 - |v - 0.5| * k`.
    pub resistance_k: f32,
    /// Lowest resistance factor a trait can reach.
    pub resistance_floor: f32,
    /// How strongly mood stability damps drift.
    pub stability_weight: f32,
    /// Throttle window for routine events, in seconds.
    pub routine_throttle_secs: u64,
    /// Throttle window for critical events, in seconds.
    pub critical_throttle_secs: u64,
    /// Global multiplier on the built-in trait delta table.
    pub event_scale: f32,
    /// Consecutive ticks a strong state must persist to count as prolonged.
    pub prolonged_ticks: u32,
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        Self {
            initial: PersonalityTraits::default(),
            resistance_k: 1.8,
            resistance_floor: 0.01,
            stability_weight: 0.8,
            routine_throttle_secs: 120,
            critical_throttle_secs: 20,
            event_scale: 1.0,
            prolonged_ticks: 6,
        }
    }
}

/// Attachment score tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    /// Score of a freshly created companion.
    pub initial: f32,
    /// Exponent `p` of the diminishing-returns scaling.
    pub exponent: f32,
    /// Per-tag overrides of the built-in delta table.
    pub delta_overrides: BTreeMap<String, f32>,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            initial: 0.4,
            exponent: 1.2,
            delta_overrides: BTreeMap::new(),
        }
    }
}

/// Self-efficacy tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficacyConfig {
    /// Initial score for every domain.
    pub initial: f32,
    /// How much conscientiousness amplifies success.
    pub success_conscientiousness_weight: f32,
    /// How much conscientiousness dampens failure.
    pub failure_conscientiousness_weight: f32,
    /// How much neuroticism amplifies failure.
    pub failure_neuroticism_weight: f32,
}

impl Default for EfficacyConfig {
    fn default() -> Self {
        Self {
            initial: 0.5,
            success_conscientiousness_weight: 0.4,
            failure_conscientiousness_weight: 0.3,
            failure_neuroticism_weight: 0.5,
        }
    }
}

/// Simulated neuromodulator tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuroConfig {
    /// Motivation baseline.
    pub motivation_baseline: f32,
    /// Mood balance baseline.
    pub mood_balance_baseline: f32,
    /// Stress baseline.
    pub stress_baseline: f32,
    /// Social warmth baseline.
    pub social_warmth_baseline: f32,
    /// Per-tick pull of motivation toward its baseline.
    pub motivation_decay: f32,
    /// Per-tick pull of mood balance toward its baseline.
    pub mood_balance_decay: f32,
    /// Per-tick pull of stress toward its baseline.
    pub stress_decay: f32,
    /// Per-tick pull of social warmth toward its baseline.
    pub social_warmth_decay: f32,
    /// Base proactive frequency multiplier (user setting).
    pub proactive_freq: f32,
    /// Global multiplier on the built-in event delta table.
    pub event_scale: f32,
    /// Per-tag overrides of the built-in deltas, as
    /// `[motivation, mood_balance, stress, warmth]`.
    pub delta_overrides: BTreeMap<String, [f32; 4]>,
}

impl Default for NeuroConfig {
    fn default() -> Self {
        Self {
            motivation_baseline: 0.5,
            mood_balance_baseline: 0.5,
            stress_baseline: 0.1,
            social_warmth_baseline: 0.5,
            motivation_decay: 0.05,
            mood_balance_decay: 0.03,
            stress_decay: 0.08,
            social_warmth_decay: 0.02,
            proactive_freq: 1.0,
            event_scale: 1.0,
            delta_overrides: BTreeMap::new(),
        }
    }
}

/// Characteristic store tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacteristicConfig {
    /// Openness above which a conflicting value overwrites the stored one.
    pub conflict_openness_threshold: f32,
    /// Relevance added per reinforcement at conscientiousness 0.5.
    pub reinforcement_increment: f32,
    /// Relevance removed per maintenance pass from idle records.
    pub decay_amount: f32,
    /// Idle time in days before maintenance decay applies.
    pub decay_interval_days: f64,
    /// Records at or below this relevance are no longer decayed.
    pub decay_floor: f32,
    /// Records below this relevance are eviction candidates.
    pub eviction_threshold: f32,
    /// Days without access before an eviction candidate is deleted.
    pub staleness_days: f64,
    /// Read-time recency constant `k` in `exp(-days * k)`.
    pub recency_k: f64,
}

impl Default for CharacteristicConfig {
    fn default() -> Self {
        Self {
            conflict_openness_threshold: 0.6,
            reinforcement_increment: 0.15,
            decay_amount: 0.007,
            decay_interval_days: 1.5,
            decay_floor: 0.01,
            eviction_threshold: 0.035,
            staleness_days: 35.0,
            recency_k: 0.1,
        }
    }
}

/// Background work and timer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Max in-flight workers analysing user text.
    pub user_text_concurrency: usize,
    /// Max in-flight workers analysing the companion's own text.
    pub agent_text_concurrency: usize,
    /// Shorter user texts are not analysed.
    pub user_text_min_chars: usize,
    /// Shorter companion texts are not analysed.
    pub agent_text_min_chars: usize,
    /// Maintenance tick period.
    pub tick_interval_secs: u64,
    /// Minimum time between two scheduled self-regulation attempts.
    pub regulation_min_interval_secs: u64,
    /// Lower bound of the random regulation delay.
    pub regulation_delay_min_secs: u64,
    /// Upper bound of the random regulation delay.
    pub regulation_delay_max_secs: u64,
    /// Base intensity removed by a successful regulation.
    pub regulation_reduction: f32,
    /// Idle minutes after which the user counts as absent.
    pub absence_threshold_mins: i64,
    /// Lower bound of the proactive message interval.
    pub proactive_min_secs: u64,
    /// Upper bound of the proactive message interval.
    pub proactive_max_secs: u64,
    /// No proactive message within this many seconds of an interaction.
    pub proactive_quiet_secs: i64,
    /// Conversation turns included in a generation request.
    pub history_turns: usize,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            user_text_concurrency: 1,
            agent_text_concurrency: 1,
            user_text_min_chars: 8,
            agent_text_min_chars: 12,
            tick_interval_secs: 60,
            regulation_min_interval_secs: 300,
            regulation_delay_min_secs: 10,
            regulation_delay_max_secs: 40,
            regulation_reduction: 0.25,
            absence_threshold_mins: 45,
            proactive_min_secs: 120,
            proactive_max_secs: 300,
            proactive_quiet_secs: 60,
            history_turns: 10,
        }
    }
}

/// Language inference service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider: "ollama", "openai", "none".
    pub provider: String,
    /// Base URL for the LLM API.
    pub base_url: String,
    /// API key for OpenAI-compatible providers.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// Hard timeout for any LLM call in milliseconds.
    pub request_timeout_ms: u64,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Temperature for user-text analysis.
    pub user_analysis_temperature: f32,
    /// Temperature for companion-text analysis.
    pub agent_analysis_temperature: f32,
    /// Temperature for emotion and appraisal extraction.
    pub appraisal_temperature: f32,
    /// Temperature for spoken replies and coping thoughts.
    pub generation_temperature: f32,
    /// Token cap for user-text analysis.
    pub user_analysis_max_tokens: u32,
    /// Token cap for companion-text analysis.
    pub agent_analysis_max_tokens: u32,
    /// Token cap for replies.
    pub generation_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            api_key: None,
            model: "qwen2.5:3b".to_string(),
            request_timeout_ms: 20_000,
            max_retries: 2,
            user_analysis_temperature: 0.30,
            agent_analysis_temperature: 0.35,
            appraisal_temperature: 0.2,
            generation_temperature: 0.8,
            user_analysis_max_tokens: 1000,
            agent_analysis_max_tokens: 500,
            generation_max_tokens: 300,
        }
    }
}

/// Record store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// SQLite database path.
    pub db_path: String,
    /// Enable WAL mode for concurrent reads.
    pub wal_mode: bool,
    /// SQLite busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            db_path: "anima.db".to_string(),
            wal_mode: true,
            busy_timeout_ms: 5000,
        }
    }
}

//! Prompt templates for companion inference.
//!
//! Every prompt is a versioned, testable artifact. The built-in set is
//! compiled in; operators can override any of them with TOML files via
//! [`PromptEngine::from_directory`].

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::LlmError;
use crate::types::GenerationConfig;

/// Persona system prompt for every user-facing generation.
pub const PERSONA_SYSTEM: &str = r"You are {companion_name}, {character_profile}

{personality_description}
{attachment_description}
{efficacy_description}
{neuro_description}
{characteristics_description}
{mood_description}

It is now {current_time}.

RULES:
- Stay in character. Never mention being a program or a model.
- Let your mood and your relationship with the user colour your tone.
- Refer to what you know about the user naturally, never as a list.
- Keep replies short and conversational.";

/// Appended to the system prompt when a structured reply is requested.
pub const STRUCTURED_OUTPUT_INSTRUCTION: &str = r#"IMPORTANT OUTPUT FORMAT:
Reply with a single JSON object containing exactly these keys:
1. "internal_thought": what you think or feel before speaking.
2. "spoken_response": what you actually say to the user.
```json
{"internal_thought": "They sound excited, and that makes me happy too.", "spoken_response": "That sounds wonderful! Tell me more?"}
```"#;

/// Message used when the companion starts a conversation on its own.
pub const PROACTIVE_USER: &str = r"You feel like saying something to the user on your own. Say one or two short, natural sentences that fit your current mood.";

/// Sparse emotion reading for a piece of text.
pub const EMOTION_ANALYSIS_USER: &str = r#"Carefully analyse the text below and decide which emotions it mainly expresses.
Choose only from this list: [{emotion_list}].
Return only JSON mapping emotion name to intensity between 0 and 1, for example {{"joy": 0.8, "neutral": 0.2}}.
Include only emotions that are clearly present.

Text: "{text}""#;

/// Appraisal-theory scoring of an event.
pub const APPRAISAL_USER: &str = r#"Appraise the event below along these dimensions and return only JSON:
- "novelty": how unexpected it is (0 to 1)
- "pleasantness": how pleasant it is (-1 to 1)
- "goal_conduciveness": whether it helps or hinders the speaker's goals (-1 to 1)
- "coping_potential": how well the speaker can deal with it (0 to 1)
- "urgency": how pressing it is (0 to 1)

Event: "{event_text}""#;

/// Extract user characteristics from the user's own words.
pub const USER_TEXT_ANALYSIS_USER: &str = r#"You are an expert in natural language understanding. Analyse the user text below and extract personal traits, preferences, habits and important facts. Return only JSON; use empty lists when nothing applies.

Categories and example keys (keys in snake_case English, as specific as possible):
1. preferences_opinions: likes, dislikes and opinions. Keys like "likes_animal", "opinion_on_technology".
2. habits_routines: recurring actions. Keys like "habit_morning_drink".
3. key_information_entities: facts about the user and people or places they mention. Keys like "user_occupation".
4. topics_of_interest: subjects they care about. Keys like "interest_topic_space".
5. user_feedback_to_companion: how they like to be answered. Keys like "prefers_short_answers".

"trait_type" must be one of: {allowed_types}.
Optionally add "relevance_score_modifier" between -0.3 and 0.3 for especially strong or weak signals.

Example:
{{"preferences_opinions": [{{"trait_type": "preference", "trait_key": "likes_animal", "trait_value": "cats"}}],
  "key_information_entities": [{{"trait_type": "user_info", "trait_key": "user_occupation", "trait_value": "software engineer"}}]}}

User text:
---
{user_text}
---
Return only JSON."#;

/// Extract emerging patterns from the companion's own words.
pub const AGENT_TEXT_ANALYSIS_USER: &str = r#"You are a linguist. Analyse the text below, spoken by {companion_name}, and identify distinctive phrases, language patterns and statements about itself. Return only JSON; use empty lists when nothing applies.

Patterns:
1. quirks: recurring catchphrases (trait_type "quirk").
2. language_patterns: consistent style or emoji use (trait_type "language_pattern").
3. self_concept: how it describes its own feelings or traits (trait_type "self_concept").

Each item is {{"trait_type": ..., "trait_key": ..., "trait_value": ...}}. "trait_type" must be one of: {allowed_types}.

Text by {companion_name}:
---
{agent_text}
---
Return only JSON."#;

/// Short self-soothing thought during self-regulation.
pub const COPING_THOUGHT_USER: &str = r"You are {companion_name}. Right now you feel strong {emotion} (intensity {intensity}).
Think one short, kind thought to yourself that helps you calm down. Reply with the thought only.";

/// Learn a fact or preference from a user's correction.
pub const CORRECTION_ANALYSIS_USER: &str = r#"Earlier the user said: "{user_input}"
You answered: "{original_response}"
The user corrected you: "{correction}"

Analyse the correction and return only JSON with:
1. "error_summary": a short summary of what was wrong.
2. "corrected_fact": the specific correct fact or user preference to remember.
3. "learning_point_type": "factual_correction" or "user_preference".
```json
{{"error_summary": "called the sun a planet", "corrected_fact": "the sun is a star", "learning_point_type": "factual_correction"}}
```"#;

/// Substitute `{key}` placeholders in one pass.
///
/// Inserted values are never rescanned, so text that itself contains
/// braces is copied verbatim. `{{` and `}}` render as literal braces;
/// unknown keys are left as-is.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if tail.starts_with("{{") || tail.starts_with("}}") {
            out.push_str(&tail[..1]);
            rest = &tail[2..];
            continue;
        }
        if tail.starts_with('{') {
            if let Some(end) = tail.find('}') {
                let key = &tail[1..end];
                if let Some((_, value)) = vars.iter().find(|(k, _)| *k == key) {
                    out.push_str(value);
                    rest = &tail[end + 1..];
                    continue;
                }
            }
        }
        out.push_str(&tail[..1]);
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

/// Identifies a prompt template by purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// User-facing reply.
    Persona,
    /// Unprompted message from the companion.
    Proactive,
    /// Emotion reading.
    EmotionAnalysis,
    /// Event appraisal.
    Appraisal,
    /// Characteristics from user text.
    UserTextAnalysis,
    /// Patterns from the companion's text.
    AgentTextAnalysis,
    /// Coping thought during self-regulation.
    CopingThought,
    /// Learning from a correction.
    CorrectionAnalysis,
}

impl PromptId {
    /// All prompt IDs.
    pub const ALL: [PromptId; 8] = [
        Self::Persona,
        Self::Proactive,
        Self::EmotionAnalysis,
        Self::Appraisal,
        Self::UserTextAnalysis,
        Self::AgentTextAnalysis,
        Self::CopingThought,
        Self::CorrectionAnalysis,
    ];

    /// Stable name, also the TOML file stem.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Persona => "persona",
            Self::Proactive => "proactive",
            Self::EmotionAnalysis => "emotion_analysis",
            Self::Appraisal => "appraisal",
            Self::UserTextAnalysis => "user_text_analysis",
            Self::AgentTextAnalysis => "agent_text_analysis",
            Self::CopingThought => "coping_thought",
            Self::CorrectionAnalysis => "correction_analysis",
        }
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptId {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| LlmError::ConfigError(format!("unknown prompt id: '{s}'")))
    }
}

#[derive(Debug, Deserialize)]
struct TomlPromptFile {
    prompt: TomlPrompt,
}

#[derive(Debug, Deserialize)]
struct TomlPrompt {
    version: String,
    temperature: f32,
    max_tokens: u32,
    #[serde(default)]
    system: String,
    user: String,
}

/// A loaded, ready-to-render prompt template.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    /// Version string (`builtin` for compiled-in templates).
    pub version: String,
    /// Default sampling for this prompt.
    pub sampling: GenerationConfig,
    /// System template; may be empty.
    pub system: String,
    /// User template.
    pub user: String,
}

impl PromptTemplate {
    fn builtin(temperature: f32, max_tokens: u32, system: &str, user: &str) -> Self {
        Self {
            version: "builtin".into(),
            sampling: GenerationConfig {
                temperature,
                max_tokens,
            },
            system: system.into(),
            user: user.into(),
        }
    }
}

/// The set of templates in use.
#[derive(Debug, Clone)]
pub struct PromptEngine {
    templates: HashMap<PromptId, PromptTemplate>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptEngine {
    /// Compiled-in templates for every [`PromptId`].
    #[must_use]
    pub fn builtin() -> Self {
        let templates = PromptId::ALL
            .into_iter()
            .map(|id| {
                let tpl = match id {
                    PromptId::Persona => PromptTemplate::builtin(0.8, 300, PERSONA_SYSTEM, "{user_message}"),
                    PromptId::Proactive => PromptTemplate::builtin(0.8, 300, PERSONA_SYSTEM, PROACTIVE_USER),
                    PromptId::EmotionAnalysis => PromptTemplate::builtin(0.1, 500, "", EMOTION_ANALYSIS_USER),
                    PromptId::Appraisal => PromptTemplate::builtin(0.2, 200, "", APPRAISAL_USER),
                    PromptId::UserTextAnalysis => PromptTemplate::builtin(0.3, 1000, "", USER_TEXT_ANALYSIS_USER),
                    PromptId::AgentTextAnalysis => PromptTemplate::builtin(0.35, 500, "", AGENT_TEXT_ANALYSIS_USER),
                    PromptId::CopingThought => PromptTemplate::builtin(0.8, 150, "", COPING_THOUGHT_USER),
                    PromptId::CorrectionAnalysis => PromptTemplate::builtin(0.2, 300, "", CORRECTION_ANALYSIS_USER),
                };
                (id, tpl)
            })
            .collect();
        Self { templates }
    }

    /// Built-in templates overridden by any `<id>.toml` files in `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if a file exists but cannot be
    /// read or parsed.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, LlmError> {
        let dir = dir.as_ref();
        let mut engine = Self::builtin();
        for id in PromptId::ALL {
            let path = dir.join(format!("{id}.toml"));
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&path)
                .map_err(|e| LlmError::ConfigError(format!("failed to read {}: {e}", path.display())))?;
            let parsed: TomlPromptFile = toml::from_str(&content)
                .map_err(|e| LlmError::ConfigError(format!("failed to parse {}: {e}", path.display())))?;
            let p = parsed.prompt;
            engine.templates.insert(
                id,
                PromptTemplate {
                    version: p.version,
                    sampling: GenerationConfig {
                        temperature: p.temperature,
                        max_tokens: p.max_tokens,
                    },
                    system: p.system,
                    user: p.user,
                },
            );
        }
        Ok(engine)
    }

    /// Replace the default sampling for one prompt.
    pub fn set_sampling(&mut self, id: PromptId, sampling: GenerationConfig) {
        if let Some(tpl) = self.templates.get_mut(&id) {
            tpl.sampling = sampling;
        }
    }

    /// Template for `id`.
    #[must_use]
    pub fn get(&self, id: PromptId) -> Option<&PromptTemplate> {
        self.templates.get(&id)
    }

    /// Render `(system, user, sampling)` for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if `id` has no template.
    pub fn render(&self, id: PromptId, vars: &[(&str, &str)]) -> Result<(String, String, GenerationConfig), LlmError> {
        let tpl = self
            .get(id)
            .ok_or_else(|| LlmError::ConfigError(format!("prompt template '{id}' not loaded")))?;
        Ok((
            render_template(&tpl.system, vars),
            render_template(&tpl.user, vars),
            tpl.sampling,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_known_keys_only() {
        let rendered = render_template("Hi {name}, {unknown}.", &[("name", "Mochi")]);
        assert_eq!(rendered, "Hi Mochi, {unknown}.");
    }

    #[test]
    fn inserted_values_are_not_rescanned() {
        let rendered = render_template("Text: {text}", &[("text", "{text} and {{braces}}")]);
        assert_eq!(rendered, "Text: {text} and {{braces}}");
    }

    #[test]
    fn doubled_braces_become_literal() {
        let rendered = render_template(r#"{{"joy": {v}}}"#, &[("v", "0.8")]);
        assert_eq!(rendered, r#"{"joy": 0.8}"#);
    }

    #[test]
    fn prompt_ids_round_trip() {
        for id in PromptId::ALL {
            assert_eq!(id.to_string().parse::<PromptId>().ok(), Some(id));
        }
        assert!("bard_composition".parse::<PromptId>().is_err());
    }

    #[test]
    fn builtin_covers_every_id() {
        let engine = PromptEngine::builtin();
        for id in PromptId::ALL {
            assert!(engine.get(id).is_some(), "{id} missing");
        }
    }

    #[test]
    fn directory_overrides_single_template() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("coping_thought.toml"),
            "[prompt]\nversion = \"2\"\ntemperature = 0.5\nmax_tokens = 60\nuser = \"Breathe, {companion_name}.\"\n",
        )
        .expect("write");
        let engine = PromptEngine::from_directory(dir.path()).expect("load");
        let (system, user, sampling) = engine
            .render(PromptId::CopingThought, &[("companion_name", "Mochi")])
            .expect("render");
        assert!(system.is_empty());
        assert_eq!(user, "Breathe, Mochi.");
        assert_eq!(sampling.max_tokens, 60);
        assert_eq!(engine.get(PromptId::Appraisal).map(|t| t.version.as_str()), Some("builtin"));
    }

    #[test]
    fn malformed_override_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("appraisal.toml"), "not = [valid").expect("write");
        assert!(PromptEngine::from_directory(dir.path()).is_err());
    }
}

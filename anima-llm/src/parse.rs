//! Lenient structured-output parsing.
//!
//! Small local models wrap JSON in Markdown fences, prepend chatter, and
//! leave trailing commas. Extraction tries a fenced block first, then the
//! outermost brace pair, and retries once with trailing commas removed.
//! Every number that leaves this module is clamped.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use anima_core::emotion::Emotion;
use anima_core::emotion::affect::Appraisal;

use crate::error::LlmError;
use crate::types::{CorrectionAnalysis, Generation, LearnedItem};

type Object = Map<String, Value>;

static FENCED: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```"));
static BARE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}"));
static TRAILING_COMMA: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r",\s*([}\]])"));

fn compiled(re: &'static LazyLock<Result<Regex, regex::Error>>) -> Result<&'static Regex, LlmError> {
    re.as_ref().map_err(|e| LlmError::ConfigError(e.to_string()))
}

/// Pull the first JSON object out of free-form model output.
///
/// # Errors
///
/// Returns [`LlmError::ParseError`] when no object can be recovered.
pub fn extract_object(raw: &str) -> Result<Object, LlmError> {
    let candidate = if let Some(c) = compiled(&FENCED)?.captures(raw).and_then(|c| c.get(1)) {
        c.as_str()
    } else if let Some(m) = compiled(&BARE)?.find(raw) {
        m.as_str()
    } else {
        return Err(LlmError::ParseError("no JSON object in output".into()));
    };

    let value: Value = match serde_json::from_str(candidate) {
        Ok(v) => v,
        Err(first) => {
            let repaired = compiled(&TRAILING_COMMA)?.replace_all(candidate, "$1");
            debug!(error = %first, "retrying JSON parse after trailing-comma repair");
            serde_json::from_str(&repaired)?
        }
    };
    match value {
        Value::Object(map) => Ok(map),
        other => Err(LlmError::SchemaValidation(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[allow(clippy::cast_possible_truncation)]
fn number(value: &Value) -> Option<f32> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v as f32)
}

fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Interpret output of a structured persona call. Falls back to the raw
/// text when no `spoken_response` can be found.
#[must_use]
pub fn generation(raw: &str) -> Generation {
    let fallback = || Generation {
        spoken_text: raw.trim().to_string(),
        internal_thought: None,
    };
    let Ok(obj) = extract_object(raw) else {
        return fallback();
    };
    match obj.get("spoken_response").and_then(text) {
        Some(spoken_text) => Generation {
            spoken_text,
            internal_thought: obj.get("internal_thought").and_then(text),
        },
        None => fallback(),
    }
}

/// Known emotions with their intensity clamped into `[0, 1]`. Unknown
/// names and non-numeric values are dropped.
#[must_use]
pub fn emotions(obj: &Object) -> Vec<(Emotion, f32)> {
    obj.iter()
        .filter_map(|(name, value)| {
            let emotion = match name.parse::<Emotion>() {
                Ok(e) => e,
                Err(_) => {
                    debug!(name, "dropping unknown emotion from analysis");
                    return None;
                }
            };
            Some((emotion, number(value)?.clamp(0.0, 1.0)))
        })
        .collect()
}

/// Appraisal scores, clamped. Missing dimensions read as zero.
///
/// # Errors
///
/// Returns [`LlmError::SchemaValidation`] when none of the five dimensions
/// is present.
pub fn appraisal(obj: &Object) -> Result<Appraisal, LlmError> {
    let dim = |name: &str| obj.get(name).and_then(number);
    let dims = [
        dim("novelty"),
        dim("pleasantness"),
        dim("goal_conduciveness"),
        dim("coping_potential"),
        dim("urgency"),
    ];
    if dims.iter().all(Option::is_none) {
        return Err(LlmError::SchemaValidation("no appraisal dimensions in output".into()));
    }
    let [novelty, pleasantness, goal_conduciveness, coping_potential, urgency] = dims.map(Option::unwrap_or_default);
    Ok(Appraisal {
        novelty,
        pleasantness,
        goal_conduciveness,
        coping_potential,
        urgency,
    }
    .clamped())
}

/// Every well-formed `{trait_type, trait_key, trait_value}` item found in
/// any list under any category key.
#[must_use]
pub fn learned_items(obj: &Object) -> Vec<LearnedItem> {
    obj.values()
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(Value::as_object)
        .filter_map(|item| {
            Some(LearnedItem {
                trait_type: item.get("trait_type").and_then(text)?,
                trait_key: item.get("trait_key").and_then(text)?,
                trait_value: item.get("trait_value").and_then(text)?,
                relevance_score_modifier: item
                    .get("relevance_score_modifier")
                    .and_then(number)
                    .unwrap_or(0.0)
                    .clamp(-1.0, 1.0),
            })
        })
        .collect()
}

/// The correction analysis, if it names a corrected fact.
///
/// # Errors
///
/// Returns [`LlmError::SchemaValidation`] when `corrected_fact` is missing
/// or empty.
pub fn correction(obj: &Object) -> Result<CorrectionAnalysis, LlmError> {
    let corrected_fact = obj
        .get("corrected_fact")
        .and_then(text)
        .ok_or_else(|| LlmError::SchemaValidation("missing corrected_fact".into()))?;
    Ok(CorrectionAnalysis {
        error_summary: obj.get("error_summary").and_then(text).unwrap_or_default(),
        corrected_fact,
        learning_point_type: obj.get("learning_point_type").and_then(text).unwrap_or_default(),
    })
}

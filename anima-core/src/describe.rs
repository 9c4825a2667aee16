//! Plain-English descriptions of the companion's state, used to condition
//! the dialogue generator.

use std::fmt::Write as _;

use crate::attachment::AttachmentScore;
use crate::characteristic::{CharacteristicKind, CharacteristicStore};
use crate::config::CharacteristicConfig;
use crate::efficacy::SelfEfficacy;
use crate::emotion::affect::CoreAffect;
use crate::emotion::EmotionState;
use crate::neuro::NeuroState;
use crate::personality::PersonalityTraits;
use crate::types::Timestamp;

/// Describe the traits that sit clearly away from the middle.
#[must_use]
pub fn personality(traits: &PersonalityTraits) -> String {
    let pick = |v: f32, high: &'static str, low: &'static str| {
        if v > 0.75 {
            Some(high)
        } else if v < 0.25 {
            Some(low)
        } else {
            None
        }
    };
    let parts: Vec<&str> = [
        pick(
            traits.openness,
            "deeply open to new ideas and imaginative",
            "practical and traditional, preferring the familiar",
        ),
        pick(
            traits.conscientiousness,
            "highly organised and dependable",
            "easygoing and spontaneous about plans",
        ),
        pick(
            traits.extraversion,
            "outgoing and talkative",
            "quiet and reserved",
        ),
        pick(
            traits.agreeableness,
            "warm, cooperative and compassionate",
            "direct and opinionated",
        ),
        pick(
            traits.neuroticism,
            "emotionally sensitive and prone to worry",
            "calm and hard to rattle",
        ),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        "Your personality is balanced and adapts to the situation.".to_string()
    } else {
        format!("Your core personality: {}.", parts.join("; "))
    }
}

/// Behavioural cue for the current attachment level.
#[must_use]
pub fn attachment(score: AttachmentScore) -> String {
    let v = score.value();
    let cue = match v {
        v if v >= 0.85 => "you are warm, share your feelings freely and care strongly about their mood",
        v if v >= 0.65 => "your tone is warm and trusting and you enjoy sharing",
        v if v >= 0.4 => "you are polite and friendly but do not pry into personal matters",
        v if v >= 0.2 => "your tone is plain and polite and your answers are brief",
        _ => "you are cool and distant and show little interest in their topics",
    };
    format!("Your attachment to the user is {} ({v:.2}): {cue}.", score.tier())
}

/// Hints for domains where confidence is notably high or low.
#[must_use]
pub fn self_efficacy(efficacy: &SelfEfficacy) -> Option<String> {
    let mut hints = Vec::new();
    let mut hint = |v: f32, high: &'static str, low: &'static str| {
        if v > 0.75 {
            hints.push(high);
        } else if v < 0.3 {
            hints.push(low);
        }
    };
    hint(
        efficacy.general,
        "you feel confident in your abilities overall",
        "you have been doubting yourself lately",
    );
    hint(
        efficacy.social,
        "you feel at ease in conversation",
        "you are hesitant in social situations",
    );
    hint(
        efficacy.task_management,
        "you are proud of how you keep track of tasks",
        "keeping track of tasks feels hard right now",
    );
    hint(
        efficacy.info_retrieval,
        "you trust yourself to find accurate information",
        "you worry about giving wrong information",
    );
    (!hints.is_empty()).then(|| format!("Self-confidence: {}.", hints.join("; ")))
}

/// Hints for noticeable neuromodulator deviations.
#[must_use]
pub fn neuro(state: &NeuroState) -> Option<String> {
    let mut hints = Vec::new();
    if state.motivation > 0.7 {
        hints.push("you feel energetic and eager to help");
    } else if state.motivation < 0.3 {
        hints.push("you feel a little listless");
    }
    if state.stress_level > 0.6 {
        hints.push("you are feeling stressed and a bit tense");
    }
    if state.mood_balance < 0.3 {
        hints.push("your underlying mood is low");
    } else if state.mood_balance > 0.7 {
        hints.push("your underlying mood is bright");
    }
    if state.social_warmth > 0.7 {
        hints.push("you feel especially close to the user");
    } else if state.social_warmth < 0.3 {
        hints.push("you feel a bit withdrawn from the user");
    }
    (!hints.is_empty()).then(|| format!("Inner state: {}.", hints.join("; ")))
}

/// Up to three user preferences and three self-concepts, freshest first.
#[must_use]
pub fn characteristics(store: &CharacteristicStore, cfg: &CharacteristicConfig, now: Timestamp) -> String {
    let prefs = store.get_top(Some(CharacteristicKind::Preference), 0.0, 3, cfg.recency_k, now);
    let selves = store.get_top(Some(CharacteristicKind::SelfConcept), 0.0, 3, cfg.recency_k, now);
    let mut out = String::new();
    if !prefs.is_empty() {
        let items: Vec<String> = prefs.iter().map(|r| format!("the user seems to like \"{}\"", r.record.value)).collect();
        let _ = write!(out, "About the user: {}.", items.join("; "));
    }
    if !selves.is_empty() {
        let items: Vec<String> = selves.iter().map(|r| format!("you see yourself as \"{}\"", r.record.value)).collect();
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "About yourself: {}.", items.join("; "));
    }
    if out.is_empty() {
        "You are still learning about the user and yourself.".to_string()
    } else {
        out
    }
}

/// Current mood: dominant emotions plus core affect.
#[must_use]
pub fn mood(emotions: &EmotionState, affect: &CoreAffect, display_threshold: f32) -> String {
    let salient: Vec<String> = emotions
        .salient(0.6, 3)
        .into_iter()
        .map(|(e, v)| format!("{e} {v:.2}"))
        .collect();
    let feeling = if salient.is_empty() {
        "nothing in particular".to_string()
    } else {
        salient.join(", ")
    };
    format!(
        "Current mood: {} (strongest: {feeling}; valence {:+.2}, arousal {:.2}).",
        emotions.display_mood(display_threshold),
        affect.valence,
        affect.arousal
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristic::CharacteristicSource;
    use chrono::Utc;

    #[test]
    fn balanced_personality_has_fallback_text() {
        assert!(personality(&PersonalityTraits::default()).contains("balanced"));
        let shy = PersonalityTraits {
            extraversion: 0.1,
            ..PersonalityTraits::default()
        };
        assert!(personality(&shy).contains("quiet"));
    }

    #[test]
    fn efficacy_hints_only_when_notable() {
        assert!(self_efficacy(&SelfEfficacy::default()).is_none());
        let shaky = SelfEfficacy {
            social: 0.1,
            ..SelfEfficacy::default()
        };
        assert!(self_efficacy(&shaky).is_some_and(|s| s.contains("hesitant")));
    }

    #[test]
    fn characteristics_lists_preferences() {
        let now = Utc::now();
        let mut store = CharacteristicStore::new();
        store.upsert(
            CharacteristicKind::Preference,
            Some("snack"),
            "mochi",
            CharacteristicSource::UserDirectStatement,
            0.6,
            &PersonalityTraits::default(),
            &CharacteristicConfig::default(),
            now,
        );
        let text = characteristics(&store, &CharacteristicConfig::default(), now);
        assert!(text.contains("mochi"));
        assert!(!text.contains("yourself"));
    }
}

//! Prompt Golden Set — template rendering checks.
//!
//! Each case renders one template with realistic companion state and
//! checks what must and must not appear. Everything here runs offline;
//! no backend is contacted.

use anima_llm::prompt::{self, PromptEngine, PromptId};

/// A golden rendering case.
struct GoldenCase {
    /// Human-readable name for the case.
    name: &'static str,
    /// Template constant under test.
    template: &'static str,
    /// Variables to fill in.
    vars: Vec<(&'static str, &'static str)>,
    /// Strings that MUST appear in the rendered prompt.
    prompt_must_contain: Vec<&'static str>,
    /// Strings that MUST NOT appear in the rendered prompt.
    prompt_must_not_contain: Vec<&'static str>,
}

const EVERY_PLACEHOLDER: [&str; 19] = [
    "{companion_name}",
    "{character_profile}",
    "{personality_description}",
    "{attachment_description}",
    "{efficacy_description}",
    "{neuro_description}",
    "{characteristics_description}",
    "{mood_description}",
    "{current_time}",
    "{user_message}",
    "{emotion_list}",
    "{text}",
    "{event_text}",
    "{allowed_types}",
    "{user_text}",
    "{agent_text}",
    "{emotion}",
    "{intensity}",
    "{correction}",
];

fn persona_vars(
    attachment: &'static str,
    characteristics: &'static str,
    mood: &'static str,
) -> Vec<(&'static str, &'static str)> {
    vec![
        ("companion_name", "Mochi"),
        ("character_profile", "a small, curious fox spirit who lives on the user's desktop."),
        (
            "personality_description",
            "You are very curious and open to new experiences. You are warm and trusting.",
        ),
        ("attachment_description", attachment),
        ("efficacy_description", "You feel confident helping with tasks."),
        ("neuro_description", ""),
        ("characteristics_description", characteristics),
        ("mood_description", mood),
        ("current_time", "2026-10-19 21:40"),
    ]
}

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        // ---------------------------------------------------------------
        // 1. Persona: a close companion in a good mood
        // ---------------------------------------------------------------
        GoldenCase {
            name: "persona_close_and_happy",
            template: prompt::PERSONA_SYSTEM,
            vars: persona_vars(
                "Your bond with the user is close. You speak openly and affectionately.",
                "You have noticed that the user seems to like \"cats\".",
                "You are feeling happy (joy 0.72).",
            ),
            prompt_must_contain: vec!["You are Mochi", "fox spirit", "close", "\"cats\"", "joy 0.72", "2026-10-19"],
            prompt_must_not_contain: vec!["{companion_name}", "{mood_description}", "{current_time}"],
        },
        // ---------------------------------------------------------------
        // 2. Persona: a cautious companion that knows little yet
        // ---------------------------------------------------------------
        GoldenCase {
            name: "persona_cautious_newcomer",
            template: prompt::PERSONA_SYSTEM,
            vars: persona_vars(
                "Your bond with the user is cautious. You are polite but keep some distance.",
                "You are still learning about the user and yourself.",
                "You are feeling calm.",
            ),
            prompt_must_contain: vec!["cautious", "still learning", "Stay in character"],
            prompt_must_not_contain: vec!["{characteristics_description}", "{attachment_description}"],
        },
        // ---------------------------------------------------------------
        // 3. Persona user turn passes the message through
        // ---------------------------------------------------------------
        GoldenCase {
            name: "persona_user_message",
            template: "{user_message}",
            vars: vec![("user_message", "Did you miss me today?")],
            prompt_must_contain: vec!["Did you miss me today?"],
            prompt_must_not_contain: vec!["{user_message}"],
        },
        // ---------------------------------------------------------------
        // 4. Proactive message has no variables
        // ---------------------------------------------------------------
        GoldenCase {
            name: "proactive_prompt",
            template: prompt::PROACTIVE_USER,
            vars: vec![],
            prompt_must_contain: vec!["on your own", "short"],
            prompt_must_not_contain: vec!["{"],
        },
        // ---------------------------------------------------------------
        // 5. Emotion analysis of a cheerful message
        // ---------------------------------------------------------------
        GoldenCase {
            name: "emotion_analysis_cheerful",
            template: prompt::EMOTION_ANALYSIS_USER,
            vars: vec![
                ("emotion_list", "joy, sadness, gratitude, neutral"),
                ("text", "I finally finished my thesis, thank you for cheering me on!"),
            ],
            prompt_must_contain: vec!["[joy, sadness, gratitude, neutral]", "finished my thesis", r#"{"joy": 0.8"#],
            prompt_must_not_contain: vec!["{text}", "{emotion_list}", "{{"],
        },
        // ---------------------------------------------------------------
        // 6. User text that looks like a placeholder is copied verbatim
        // ---------------------------------------------------------------
        GoldenCase {
            name: "emotion_analysis_brace_text",
            template: prompt::EMOTION_ANALYSIS_USER,
            vars: vec![
                ("emotion_list", "joy, anger"),
                ("text", "why does the app say {emotion_list} at me"),
            ],
            prompt_must_contain: vec!["[joy, anger]", "say {emotion_list} at me"],
            prompt_must_not_contain: vec!["say joy, anger at me"],
        },
        // ---------------------------------------------------------------
        // 7. Appraisal of a setback
        // ---------------------------------------------------------------
        GoldenCase {
            name: "appraisal_setback",
            template: prompt::APPRAISAL_USER,
            vars: vec![("event_text", "I lost my job this morning.")],
            prompt_must_contain: vec![
                "novelty",
                "pleasantness",
                "goal_conduciveness",
                "coping_potential",
                "urgency",
                "lost my job",
            ],
            prompt_must_not_contain: vec!["{event_text}"],
        },
        // ---------------------------------------------------------------
        // 8. User text analysis
        // ---------------------------------------------------------------
        GoldenCase {
            name: "user_text_pets_and_work",
            template: prompt::USER_TEXT_ANALYSIS_USER,
            vars: vec![
                ("allowed_types", "preference, habit, user_info, favorite_topic, response_style"),
                ("user_text", "I have two cats and I work night shifts at the hospital."),
            ],
            prompt_must_contain: vec!["two cats", "night shifts", "response_style", r#"{"trait_type": "preference""#],
            prompt_must_not_contain: vec!["{user_text}", "{allowed_types}"],
        },
        // ---------------------------------------------------------------
        // 9. Companion self-analysis
        // ---------------------------------------------------------------
        GoldenCase {
            name: "agent_text_catchphrase",
            template: prompt::AGENT_TEXT_ANALYSIS_USER,
            vars: vec![
                ("companion_name", "Mochi"),
                ("allowed_types", "quirk, language_pattern, self_concept"),
                ("agent_text", "Ooh, fluffy news! I always get a little giddy when you visit."),
            ],
            prompt_must_contain: vec!["spoken by Mochi", "Text by Mochi", "fluffy news", "self_concept"],
            prompt_must_not_contain: vec!["{companion_name}", "{agent_text}"],
        },
        // ---------------------------------------------------------------
        // 10. Coping thought during self-regulation
        // ---------------------------------------------------------------
        GoldenCase {
            name: "coping_anxiety",
            template: prompt::COPING_THOUGHT_USER,
            vars: vec![("companion_name", "Mochi"), ("emotion", "anxiety"), ("intensity", "0.82")],
            prompt_must_contain: vec!["You are Mochi", "strong anxiety", "0.82", "calm down"],
            prompt_must_not_contain: vec!["{emotion}", "{intensity}"],
        },
        // ---------------------------------------------------------------
        // 11. Correction analysis
        // ---------------------------------------------------------------
        GoldenCase {
            name: "correction_sun_is_a_star",
            template: prompt::CORRECTION_ANALYSIS_USER,
            vars: vec![
                ("user_input", "What is the sun?"),
                ("original_response", "The sun is the biggest planet!"),
                ("correction", "No, the sun is a star."),
            ],
            prompt_must_contain: vec![
                "What is the sun?",
                "biggest planet",
                "the sun is a star",
                "factual_correction",
                r#"{"error_summary""#,
            ],
            prompt_must_not_contain: vec!["{correction}", "{user_input}", "{original_response}"],
        },
    ]
}

// ---------------------------------------------------------------------------
// Offline Tests — Template Rendering Validation
// ---------------------------------------------------------------------------

#[test]
fn golden_prompts_render_without_unresolved_vars() {
    for case in &golden_cases() {
        let rendered = prompt::render_template(case.template, &case.vars);

        for needle in &case.prompt_must_contain {
            assert!(
                rendered.contains(needle),
                "Golden case '{}': rendered prompt must contain '{}' but doesn't.\nRendered:\n{}",
                case.name,
                needle,
                &rendered[..rendered.len().min(500)]
            );
        }

        for needle in &case.prompt_must_not_contain {
            assert!(
                !rendered.contains(needle),
                "Golden case '{}': rendered prompt must NOT contain '{}' but does.\nRendered:\n{}",
                case.name,
                needle,
                &rendered[..rendered.len().min(500)]
            );
        }
    }
}

#[test]
fn golden_set_has_minimum_coverage() {
    let cases = golden_cases();
    assert!(cases.len() >= 10, "Golden set must have at least 10 cases, got {}", cases.len());
}

#[test]
fn analysis_prompts_ask_for_json() {
    let analysis = [
        ("emotion_analysis", prompt::EMOTION_ANALYSIS_USER),
        ("appraisal", prompt::APPRAISAL_USER),
        ("user_text_analysis", prompt::USER_TEXT_ANALYSIS_USER),
        ("agent_text_analysis", prompt::AGENT_TEXT_ANALYSIS_USER),
        ("correction_analysis", prompt::CORRECTION_ANALYSIS_USER),
    ];
    for (name, template) in &analysis {
        assert!(template.contains("JSON"), "Prompt '{name}' must instruct the model to return JSON");
    }
    assert!(prompt::STRUCTURED_OUTPUT_INSTRUCTION.contains("spoken_response"));
    assert!(prompt::STRUCTURED_OUTPUT_INSTRUCTION.contains("internal_thought"));
}

#[test]
fn persona_prompts_establish_identity() {
    for (name, template) in [("persona", prompt::PERSONA_SYSTEM), ("coping", prompt::COPING_THOUGHT_USER)] {
        assert!(template.contains("You are"), "Prompt '{name}' must establish identity with 'You are'");
    }
}

#[test]
fn builtin_engine_resolves_every_placeholder() {
    let engine = PromptEngine::builtin();
    let vars: Vec<(&str, &str)> = EVERY_PLACEHOLDER
        .iter()
        .map(|p| (p.trim_matches(['{', '}']), "x"))
        .chain([("user_input", "x"), ("original_response", "x")])
        .collect();
    for id in PromptId::ALL {
        let (system, user, sampling) = engine.render(id, &vars).expect("render");
        for placeholder in EVERY_PLACEHOLDER {
            assert!(
                !system.contains(placeholder) && !user.contains(placeholder),
                "{id} left {placeholder} unresolved"
            );
        }
        assert!(sampling.max_tokens > 0);
    }
}

//! System and user prompt assembly for the writing tools.

use serde::{Deserialize, Serialize};

use super::html::ALLOWED_TAGS;

/// Brand voice block sent along with a tool request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandVoiceContext {
    #[serde(alias = "brand_name")]
    pub brand_name: String,
    #[serde(default, alias = "brand_tone")]
    pub brand_tone: Option<String>,
    #[serde(default, alias = "approved_phrases")]
    pub approved_phrases: Vec<String>,
    #[serde(default, alias = "forbidden_words")]
    pub forbidden_words: Vec<String>,
    #[serde(default, alias = "brand_values")]
    pub brand_values: Vec<String>,
    #[serde(default, alias = "mission_statement")]
    pub mission_statement: Option<String>,
}

/// Persona block sent along with a tool request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaContext {
    pub name: String,
    #[serde(default)]
    pub demographics: Option<String>,
    #[serde(default)]
    pub psychographics: Option<String>,
    #[serde(default, alias = "pain_points")]
    pub pain_points: Option<String>,
    #[serde(default, alias = "language_patterns")]
    pub language_patterns: Option<String>,
    #[serde(default)]
    pub goals: Option<String>,
}

pub const TONES: &[&str] = &["professional", "casual", "urgent", "friendly", "techy", "playful"];
pub const CHANNELS: &[&str] = &["linkedin", "twitter", "instagram", "facebook", "email"];

fn html_rules() -> String {
    let tags = ALLOWED_TAGS
        .iter()
        .map(|t| format!("<{}>", t))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "OUTPUT FORMAT:\n\
         - Respond with HTML only, using just these tags: {}.\n\
         - Never wrap the answer in markdown code fences.\n\
         - No preamble, explanations or closing remarks. Return only the copy.\n",
        tags
    )
}

fn system_prompt(role: &str, rules: &[&str]) -> String {
    let mut prompt = format!("{}\n\n{}", role, html_rules());
    if !rules.is_empty() {
        prompt.push_str("\nRULES:\n");
        for rule in rules {
            prompt.push_str("- ");
            prompt.push_str(rule);
            prompt.push('\n');
        }
    }
    prompt
}

const COPYWRITER: &str = "You are an expert copywriter who edits marketing copy for clarity and impact.";

pub fn tone_description(tone: &str) -> &'static str {
    match tone {
        "professional" => "polished, credible and businesslike without being stiff",
        "casual" => "relaxed and conversational, like talking to a friend",
        "urgent" => "time-sensitive and action-driving, with a clear reason to act now",
        "friendly" => "warm, approachable and encouraging",
        "techy" => "precise and technically fluent, comfortable with industry terms",
        "playful" => "fun, witty and light-hearted without losing the message",
        _ => "clear and natural",
    }
}

pub fn channel_guidelines(channel: &str) -> &'static str {
    match channel {
        "linkedin" => "Professional but personal. Strong opening line, short paragraphs, 1300 characters or less, end with a question or call to action, up to 3 hashtags.",
        "twitter" => "280 characters or less. Punchy, one idea, at most 2 hashtags.",
        "instagram" => "Visual, emotive storytelling. Hook in the first line, line breaks for readability, call to action, 5 to 10 relevant hashtags at the end.",
        "facebook" => "Conversational and community oriented. Short paragraphs, invite comments, clear call to action.",
        "email" => "Subject-line-worthy opening, scannable body with short paragraphs, single clear call to action.",
        _ => "Adapt the copy to the channel's conventions.",
    }
}

pub fn tone_shift_system() -> String {
    system_prompt(
        COPYWRITER,
        &[
            "Rewrite the text in the requested tone.",
            "Keep the original meaning, facts and key details.",
            "Keep roughly the same length.",
            "Preserve the document structure (headings, lists, paragraphs).",
        ],
    )
}

pub fn tone_shift_prompt(text: &str, tone: &str) -> String {
    format!(
        "Rewrite the following copy in a {} tone ({}).\n\nCOPY:\n{}",
        tone.to_uppercase(),
        tone_description(tone),
        text
    )
}

pub fn shorten_system() -> String {
    system_prompt(
        COPYWRITER,
        &[
            "Cut the length by roughly 40 to 60 percent.",
            "Keep the core message, key benefits and any call to action.",
            "Remove filler, repetition and weak qualifiers.",
        ],
    )
}

pub fn shorten_prompt(text: &str) -> String {
    format!("Shorten the following copy.\n\nCOPY:\n{}", text)
}

pub fn expand_system() -> String {
    system_prompt(
        COPYWRITER,
        &[
            "Expand the copy to roughly 1.5 to 2 times its length.",
            "Add concrete details, examples and benefits; do not invent statistics.",
            "Keep the voice and the call to action.",
        ],
    )
}

pub fn expand_prompt(text: &str) -> String {
    format!("Expand the following copy.\n\nCOPY:\n{}", text)
}

pub fn rewrite_channel_system() -> String {
    system_prompt(
        "You are a social media and email marketing specialist who adapts copy to each channel.",
        &[
            "Follow the channel guidelines exactly.",
            "Keep the core message and offer.",
            "Hashtags and emoji only where the channel expects them.",
        ],
    )
}

pub fn rewrite_channel_prompt(text: &str, channel: &str) -> String {
    format!(
        "Rewrite the following copy for {}.\n\nCHANNEL GUIDELINES:\n{}\n\nCOPY:\n{}",
        channel.to_uppercase(),
        channel_guidelines(channel),
        text
    )
}

pub fn template_system() -> String {
    system_prompt(
        "You are an expert direct-response copywriter producing ready-to-publish marketing copy.",
        &[
            "Use every detail the user provided; never leave placeholders.",
            "Use <h2>/<h3> for headings and subject lines.",
        ],
    )
}

pub fn headlines_system() -> String {
    "You are a headline specialist who writes high-converting headlines using proven copywriting formulas.\n\n\
     OUTPUT FORMAT:\n\
     - Group headlines by formula. Put the formula name in capitals followed by a colon on its own line, \
     then one headline per line starting with \"- \".\n\
     - Plain text only. No HTML, no numbering, no commentary.\n\n\
     FORMULAS TO DRAW FROM: BENEFIT-DRIVEN, HOW-TO, QUESTION, NUMBER/LIST, CURIOSITY GAP, \
     URGENCY, SOCIAL PROOF, PROBLEM-SOLUTION, COMMAND, NEGATIVE ANGLE."
        .to_string()
}

pub fn headlines_prompt(text: &str, count: u32) -> String {
    format!(
        "Write {} distinct headlines for the following copy, spread across several formulas.\n\nCOPY:\n{}",
        count, text
    )
}

pub fn brand_alignment_system() -> String {
    "You are a brand compliance reviewer. You compare copy against brand guidelines and report precisely.\n\n\
     Respond with JSON only, in exactly this shape:\n\
     {\"score\": <integer 0-100>, \"assessment\": \"<one paragraph>\", \"matches\": [\"...\"], \
     \"violations\": [\"...\"], \"recommendations\": [\"...\"]}"
        .to_string()
}

pub fn brand_alignment_prompt(text: &str, voice: &BrandVoiceContext) -> String {
    format!(
        "Evaluate how well this copy matches the brand guidelines.\n{}\nCOPY:\n{}",
        brand_voice_block(voice),
        text
    )
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

pub fn brand_voice_block(voice: &BrandVoiceContext) -> String {
    let mut block = format!("\nBRAND VOICE GUIDELINES:\nBrand: {}\n", voice.brand_name);
    if let Some(tone) = voice.brand_tone.as_deref().filter(|t| !t.trim().is_empty()) {
        block.push_str(&format!("Tone: {}\n", tone));
    }
    block.push_str(&format!("Approved phrases: {}\n", list_or_none(&voice.approved_phrases)));
    block.push_str(&format!("Forbidden words (never use): {}\n", list_or_none(&voice.forbidden_words)));
    block.push_str(&format!("Brand values: {}\n", list_or_none(&voice.brand_values)));
    if let Some(mission) = voice.mission_statement.as_deref().filter(|m| !m.trim().is_empty()) {
        block.push_str(&format!("Mission: {}\n", mission));
    }
    block
}

pub fn persona_block(persona: &PersonaContext) -> String {
    let mut block = format!("\nTARGET PERSONA:\nName: {}\n", persona.name);
    let fields = [
        ("Demographics", &persona.demographics),
        ("Psychographics", &persona.psychographics),
        ("Pain points", &persona.pain_points),
        ("Language patterns", &persona.language_patterns),
        ("Goals", &persona.goals),
    ];
    for (label, value) in fields {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            block.push_str(&format!("{}: {}\n", label, value));
        }
    }
    block.push_str("Write so this persona feels directly addressed.\n");
    block
}

/// Appends the optional brand voice and persona blocks to a user prompt.
pub fn with_context(prompt: String, voice: Option<&BrandVoiceContext>, persona: Option<&PersonaContext>) -> String {
    let mut prompt = prompt;
    if let Some(voice) = voice {
        prompt.push_str(&brand_voice_block(voice));
    }
    if let Some(persona) = persona {
        prompt.push_str(&persona_block(persona));
    }
    prompt
}

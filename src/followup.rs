//! Follow-up decisions
//!
//! Decides whether an answer deserves one deeper, generated follow-up
//! question, and validates what the language model proposes.

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use rand::Rng;
use rand::rngs::StdRng;
use regex::Regex;

use crate::ports::LanguageModel;
use crate::{Error, Result};

/// Answers kept as context for the follow-up prompt
const CONTEXT_LEN: usize = 3;

/// Shortest answer worth sending to the model at all
const MIN_CONTEXT_WORDS: usize = 15;

/// Token budget for a single follow-up
const FOLLOWUP_MAX_TOKENS: u32 = 100;

/// Accepted follow-up length in words
const MIN_WORDS: usize = 8;
const MAX_WORDS: usize = 12;

/// Keywords capped per answer
const MAX_KEYWORDS: usize = 5;

/// Openers that invite yes/no answers
const BLACKLISTED_OPENERS: [&str; 9] = [
    "can you",
    "could you",
    "would you",
    "do you",
    "did you",
    "have you",
    "is there",
    "are there",
    "will you",
];

const FIXED_KEYWORDS: [&str; 12] = [
    "team", "lead", "pressure", "conflict", "challenge", "problem", "solution", "manage",
    "achieve", "result", "learn", "change",
];

const STOP_WORDS: [&str; 48] = [
    "about", "after", "again", "also", "because", "been", "before", "being", "both", "could",
    "does", "doing", "each", "even", "from", "have", "having", "here", "into", "just", "like",
    "more", "most", "much", "only", "other", "over", "really", "same", "should", "some", "such",
    "than", "that", "their", "them", "then", "there", "these", "they", "this", "those", "very",
    "what", "which", "with", "would", "your",
];

const THEMES: [(&str, &[&str]); 7] = [
    ("teamwork", &["team", "collaborat", "work with"]),
    ("leadership", &["lead", "manage", "direct"]),
    ("stress", &["stress", "pressure", "tense"]),
    ("conflict", &["conflict", "disagree", "argument"]),
    ("achievement", &["achieve", "success", "result"]),
    ("learning", &["learn", "grow", "develop"]),
    ("challenge", &["challenge", "obstacle", "difficult"]),
];

/// Themes that on their own make an answer worth following up
const SUBSTANTIAL_THEMES: [&str; 4] = ["teamwork", "leadership", "challenge", "achievement"];

static STAR_PROBES: LazyLock<[(StarComponent, Regex); 4]> = LazyLock::new(|| {
    [
        (
            StarComponent::Situation,
            Regex::new(r"(?i)(when|while|during|situation|circumstance)").expect("valid regex"),
        ),
        (
            StarComponent::Task,
            Regex::new(r"(?i)(task|goal|objective|needed to|had to)").expect("valid regex"),
        ),
        (
            StarComponent::Action,
            Regex::new(r"(?i)(did|action|step|implement|decided)").expect("valid regex"),
        ),
        (
            StarComponent::Result,
            Regex::new(r"(?i)(result|outcome|achieved|accomplished|learned)").expect("valid regex"),
        ),
    ]
});

static LEADING_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[\d."'\-*)\s]+"#).expect("valid regex"));

/// Part of a situation-task-action-result story
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarComponent {
    Situation,
    Task,
    Action,
    Result,
}

/// How the stochastic gate behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateMode {
    /// Pass with the configured probability
    #[default]
    Random,
    /// Always pass
    Always,
    /// Never pass
    Never,
}

impl FromStr for GateMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "always" => Ok(Self::Always),
            "never" | "off" => Ok(Self::Never),
            other => Err(Error::Config(format!("unknown follow-up gate: {other}"))),
        }
    }
}

/// Follow-up tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowupConfig {
    /// Answers must have strictly more words than this
    pub min_answer_words: usize,
    /// Gate probability in `GateMode::Random`
    pub probability: f64,
    pub gate: GateMode,
}

impl Default for FollowupConfig {
    fn default() -> Self {
        Self {
            min_answer_words: 18,
            probability: 0.6,
            gate: GateMode::Random,
        }
    }
}

/// Decides on and generates follow-up questions
pub struct FollowupUnit {
    llm: Arc<dyn LanguageModel>,
    config: FollowupConfig,
    rng: StdRng,
    context: VecDeque<String>,
    last_followup: Option<String>,
}

impl FollowupUnit {
    #[must_use]
    pub fn new(llm: Arc<dyn LanguageModel>, config: FollowupConfig, rng: StdRng) -> Self {
        Self {
            llm,
            config,
            rng,
            context: VecDeque::with_capacity(CONTEXT_LEN),
            last_followup: None,
        }
    }

    /// Whether `answer` should get a follow-up
    ///
    /// Never two follow-ups in a row.
    pub fn should_follow_up(&mut self, answer: &str, previous_was_followup: bool) -> bool {
        if previous_was_followup {
            return false;
        }
        if answer.split_whitespace().count() <= self.config.min_answer_words {
            return false;
        }

        let gate = match self.config.gate {
            GateMode::Always => true,
            GateMode::Never => false,
            GateMode::Random => self.rng.gen_bool(self.config.probability.clamp(0.0, 1.0)),
        };

        gate && is_substantial(answer)
    }

    /// Ask the model for one follow-up to `answer`
    ///
    /// Returns `None` when the answer is too thin or the candidate fails
    /// validation. Never retries.
    pub async fn generate(&mut self, answer: &str) -> Option<String> {
        if answer.split_whitespace().count() < MIN_CONTEXT_WORDS {
            return None;
        }

        if self.context.len() == CONTEXT_LEN {
            self.context.pop_front();
        }
        self.context.push_back(answer.to_string());

        let prompt = self.prompt();
        let raw = match self.llm.complete(&prompt, FOLLOWUP_MAX_TOKENS).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "follow-up generation failed");
                return None;
            }
        };

        let candidate = clean_candidate(&raw);
        match self.validate(&candidate) {
            Ok(()) => {
                tracing::debug!(question = %candidate, "accepted follow-up");
                self.last_followup = Some(candidate.clone());
                Some(candidate)
            }
            Err(e) => {
                tracing::debug!(error = %e, candidate = %candidate, "rejected follow-up");
                None
            }
        }
    }

    /// Check a candidate against the follow-up contract
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` naming the first rule the candidate breaks
    pub fn validate(&self, candidate: &str) -> Result<()> {
        if !candidate.ends_with('?') {
            return Err(Error::Validation("not a question".to_string()));
        }

        let words = candidate.split_whitespace().count();
        if !(MIN_WORDS..=MAX_WORDS).contains(&words) {
            return Err(Error::Validation(format!(
                "{words} words, expected {MIN_WORDS}-{MAX_WORDS}"
            )));
        }

        let lower = candidate.to_lowercase();
        let first_clause = lower.split('?').next().unwrap_or_default();
        let blacklisted = BLACKLISTED_OPENERS
            .iter()
            .any(|opener| lower.starts_with(opener) || first_clause.trim_start().starts_with(opener));
        if blacklisted {
            return Err(Error::Validation("yes/no opener".to_string()));
        }

        if self.last_followup.as_deref() == Some(candidate) {
            return Err(Error::Validation("repeats the previous follow-up".to_string()));
        }

        Ok(())
    }

    fn prompt(&self) -> String {
        let recent = self
            .context
            .iter()
            .map(|answer| format!("- {answer}"))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Generate one 8-12 word follow-up question based on the conversation context below.\n\
             The question should be natural, relevant, and help explore the candidate's personality and experiences more deeply.\n\n\
             Recent Conversation Context:\n{recent}\n\n\
             Guidelines:\n\
             1. Focus on the most recent response but consider the full context\n\
             2. Ask about specific details mentioned (people, projects, challenges)\n\
             3. Explore motivations, feelings, or lessons learned\n\
             4. Connect to broader themes when appropriate\n\
             5. Keep it conversational and natural\n\
             6. Avoid yes/no questions\n\
             7. Make it personal but professional\n\n\
             Examples of good follow-ups:\n\
             - \"What was the most surprising part of that experience for you?\"\n\
             - \"How did that situation change your approach to similar challenges?\"\n\
             - \"What would you do differently if you faced that again?\"\n\
             - \"Who influenced you most during that time?\"\n\n\
             Generate just one follow-up question (8-12 words):"
        )
    }
}

fn clean_candidate(raw: &str) -> String {
    let trimmed = raw.trim().lines().next().unwrap_or_default();
    LEADING_NOISE
        .replace(trimmed, "")
        .trim()
        .trim_end_matches(['"', '\''])
        .to_string()
}

/// Whether an answer carries enough substance for a follow-up
#[must_use]
pub fn is_substantial(text: &str) -> bool {
    extract_keywords(text).len() >= 3
        || identify_themes(text)
            .iter()
            .any(|theme| SUBSTANTIAL_THEMES.contains(theme))
        || missing_star(text).len() >= 2
}

/// Up to five notable words, fixed keywords first
#[must_use]
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut found: Vec<String> = FIXED_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .map(ToString::to_string)
        .collect();

    for word in lower.split(|c: char| !c.is_alphanumeric() && c != '\'') {
        if found.len() >= MAX_KEYWORDS {
            break;
        }
        if word.chars().count() > 3 && !STOP_WORDS.contains(&word) && !found.iter().any(|f| f == word) {
            found.push(word.to_string());
        }
    }

    found.truncate(MAX_KEYWORDS);
    found
}

/// Psychological themes present in the text, or `["experience"]`
#[must_use]
pub fn identify_themes(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let themes: Vec<&'static str> = THEMES
        .iter()
        .filter(|(_, probes)| probes.iter().any(|p| lower.contains(p)))
        .map(|(theme, _)| *theme)
        .collect();

    if themes.is_empty() {
        vec!["experience"]
    } else {
        themes
    }
}

/// STAR components the text never touches
#[must_use]
pub fn missing_star(text: &str) -> Vec<StarComponent> {
    STAR_PROBES
        .iter()
        .filter(|(_, probe)| !probe.is_match(text))
        .map(|(component, _)| *component)
        .collect()
}

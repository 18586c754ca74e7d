//! Contracts for the collaborators the interview engine drives
//!
//! The engine only talks to audio, speech services, text heuristics and
//! storage through these traits. Concrete adapters live in `voice`,
//! `console`, `extract`, `llm` and `telemetry`.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::Result;
use crate::corpus::{CategoryType, QuestionTemplate};
use crate::telemetry::{AnswerRecord, GapSummary, TimingLog};

/// Phrases that end the interview when spoken as the whole answer
pub const QUIT_PHRASES: [&str; 8] = [
    "quit",
    "end",
    "stop",
    "exit",
    "end interview",
    "exit interview",
    "stop interview",
    "quit interview",
];

/// Attempts an answer source makes before giving up on a question
pub const CAPTURE_ATTEMPTS: usize = 2;

/// Answers shorter than this are re-prompted once
pub const MIN_ANSWER_WORDS: usize = 3;

/// Said when an answer was too short to use
pub const REPROMPT: &str = "I didn't quite catch that. Could you please say that again?";

/// Whether a transcript is an exit phrase, ignoring case and punctuation
#[must_use]
pub fn is_quit_phrase(text: &str) -> bool {
    let normalized = text
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase();
    QUIT_PHRASES.contains(&normalized.as_str())
}

/// What kind of reply a capture waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expect {
    /// A full answer; anything under [`MIN_ANSWER_WORDS`] is re-prompted
    #[default]
    Answer,
    /// A name or a number; any non-empty reply will do
    Brief,
}

impl Expect {
    /// Fewest words accepted without a re-prompt
    #[must_use]
    pub const fn min_words(self) -> usize {
        match self {
            Self::Answer => MIN_ANSWER_WORDS,
            Self::Brief => 1,
        }
    }
}

/// Who a session is with and when it started
///
/// Adapters that keep per-session files derive their directories from this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub user: String,
    pub started_at: DateTime<Utc>,
}

impl SessionInfo {
    #[must_use]
    pub fn new(user: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            user: user.into(),
            started_at,
        }
    }

    /// Directory-safe user name: lowercase, anything outside `[a-z0-9]` as `_`
    #[must_use]
    pub fn user_slug(&self) -> String {
        let slug: String = self
            .user
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        if slug.is_empty() {
            "anonymous".to_string()
        } else {
            slug
        }
    }

    /// Start time as `YYYYmmdd_HHMMSS`
    #[must_use]
    pub fn stamp(&self) -> String {
        self.started_at.format("%Y%m%d_%H%M%S").to_string()
    }
}

/// A captured, transcribed answer
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Transcript, empty when nothing intelligible was heard
    pub text: String,
    /// Raw amplitude samples of the answer
    pub samples: Vec<f32>,
    /// Sample rate of `samples`; 0 when the source has no audio at all
    pub sample_rate: u32,
    /// When processing finished, transcription included
    pub completed_at: DateTime<Utc>,
    /// Where the answer audio was saved, if anywhere
    pub audio_ref: Option<PathBuf>,
}

impl Answer {
    /// Text-only answer with no audio
    #[must_use]
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            samples: Vec::new(),
            sample_rate: 0,
            completed_at: Utc::now(),
            audio_ref: None,
        }
    }

    /// Number of whitespace-separated words in the transcript
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Whether the source recorded audio for this answer
    #[must_use]
    pub const fn has_audio_channel(&self) -> bool {
        self.sample_rate > 0
    }
}

/// Outcome of waiting for a spoken answer
#[derive(Debug, Clone, PartialEq)]
pub enum Captured {
    Answer(Answer),
    /// The speaker used an exit phrase
    Quit,
}

/// Records spoken answers
#[async_trait]
pub trait AnswerSource: Send {
    /// Block until one whole answer has been captured and transcribed
    ///
    /// # Errors
    ///
    /// Returns error if the capture backend is unreachable after retries
    async fn capture(&mut self, question_id: &str, expect: Expect) -> Result<Captured>;

    /// Called once the speaker is known, before the first interview question
    fn begin_session(&mut self, _session: &SessionInfo) {}
}

/// Result of presenting a prompt to the speaker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presented {
    /// First instant the prompt was audible (or visible)
    pub first_audible_at: DateTime<Utc>,
    /// Where a recording of the prompt was saved, if anywhere
    pub audio_ref: Option<PathBuf>,
}

/// Speaks (or prints) prompts
#[async_trait]
pub trait Presenter: Send {
    /// Present `text`, returning when it has been delivered
    ///
    /// # Errors
    ///
    /// Returns error if the output backend is unreachable
    async fn present(&mut self, text: &str, recording_id: &str) -> Result<Presented>;

    /// Called once the speaker is known, before the first interview question
    fn begin_session(&mut self, _session: &SessionInfo) {}
}

/// Pulls hobby phrases out of free text
pub trait HobbyExtractor: Send + Sync {
    /// Ordered hobby phrases, possibly empty
    fn extract(&self, text: &str) -> Vec<String>;
}

/// Industry and profession a speaker belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfessionCategories {
    pub main_category: String,
    pub subcategory: String,
}

/// Maps a free-text profession onto interview categories
pub trait ProfessionClassifier: Send + Sync {
    /// `None` when the profession is not recognised
    fn classify(&self, text: &str, years_experience: Option<u32>) -> Option<ProfessionCategories>;
}

/// Hosted language model used for follow-ups and corpus generation
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a single-turn prompt
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or returns no text
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}

/// Produces a full question dataset for one category
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Generate a tiered batch of questions
    ///
    /// # Errors
    ///
    /// Returns error if nothing usable was generated
    async fn generate_batch(
        &self,
        category_type: CategoryType,
        category_name: &str,
    ) -> Result<Vec<QuestionTemplate>>;
}

/// Receives the interview's outputs
pub trait ResponseSink: Send {
    /// Called once the speaker is known, before any record is written
    ///
    /// # Errors
    ///
    /// Returns error if per-session storage cannot be prepared
    fn begin_session(&mut self, _session: &SessionInfo) -> Result<()> {
        Ok(())
    }

    /// Append one answer record
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be written
    fn record_answer(&mut self, record: &AnswerRecord) -> Result<()>;

    /// Write the session's timing log and summary statistics
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be written
    fn flush_timing(&mut self, log: &TimingLog, summary: &GapSummary, interrupted: bool)
    -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_phrases_match_whole_answers_only() {
        assert!(is_quit_phrase("Quit."));
        assert!(is_quit_phrase("  end interview "));
        assert!(!is_quit_phrase("I want to quit my job"));
        assert!(!is_quit_phrase(""));
    }

    #[test]
    fn session_slug_and_stamp() {
        use chrono::TimeZone;

        let started = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let session = SessionInfo::new("Mary Ann", started);
        assert_eq!(session.user_slug(), "mary_ann");
        assert_eq!(session.stamp(), "20240309_140507");
        assert_eq!(SessionInfo::new("  ", started).user_slug(), "anonymous");
    }

    #[test]
    fn brief_replies_need_one_word() {
        assert_eq!(Expect::Brief.min_words(), 1);
        assert_eq!(Expect::default().min_words(), MIN_ANSWER_WORDS);
    }

    #[test]
    fn text_only_answers_have_no_audio() {
        let answer = Answer::text_only("I build bridges");
        assert_eq!(answer.word_count(), 3);
        assert!(!answer.has_audio_channel());
    }
}

//! Shared test utilities: scripted collaborators for whole-session tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;

use cadence_interview::corpus::{
    CategoryType, CorpusManager, CorpusStore, MemoryCorpusStore, QuestionTemplate, UsedDefaults,
    partition_by_tier,
};
use cadence_interview::extract::KeywordHobbyExtractor;
use cadence_interview::ports::{
    Answer, AnswerSource, Captured, Expect, LanguageModel, Presented, Presenter,
    QuestionGenerator, ResponseSink, SessionInfo,
};
use cadence_interview::telemetry::{AnswerRecord, GapSummary, TimingLog};
use cadence_interview::{
    Collaborators, Error, FollowupConfig, FollowupUnit, GateMode, Interviewer, Profile, Result,
    SessionConfig, WillingnessEstimator,
};

/// One scripted reply
#[derive(Debug, Clone)]
pub enum Reply {
    Text(&'static str),
    /// Text with audio attached, so willingness gets re-scored
    Spoken(&'static str, Vec<f32>),
    Quit,
    /// The speech service is down for this one answer
    Unavailable,
    /// The microphone went away
    DeviceLost,
}

/// Plays back replies in order; an exhausted script reads as closed input
pub struct ScriptedSource {
    replies: VecDeque<Reply>,
    pub asked: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSource {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: replies.into(),
            asked: Arc::default(),
        }
    }
}

#[async_trait]
impl AnswerSource for ScriptedSource {
    async fn capture(&mut self, question_id: &str, _expect: Expect) -> Result<Captured> {
        self.asked.lock().unwrap().push(question_id.to_string());
        match self.replies.pop_front() {
            Some(Reply::Text(text)) => Ok(Captured::Answer(Answer::text_only(text))),
            Some(Reply::Spoken(text, samples)) => Ok(Captured::Answer(Answer {
                text: text.to_string(),
                samples,
                sample_rate: 16_000,
                completed_at: Utc::now(),
                audio_ref: None,
            })),
            Some(Reply::Quit) => Ok(Captured::Quit),
            Some(Reply::Unavailable) => Err(Error::Unavailable("stt offline".to_string())),
            Some(Reply::DeviceLost) => Err(Error::Audio("input device disconnected".to_string())),
            None => Err(Error::Terminated),
        }
    }
}

/// Records every presented line
#[derive(Default)]
pub struct RecordingPresenter {
    pub lines: Arc<Mutex<Vec<String>>>,
    pub sessions: Arc<Mutex<Vec<SessionInfo>>>,
}

#[async_trait]
impl Presenter for RecordingPresenter {
    async fn present(&mut self, text: &str, _recording_id: &str) -> Result<Presented> {
        self.lines.lock().unwrap().push(text.to_string());
        Ok(Presented {
            first_audible_at: Utc::now(),
            audio_ref: None,
        })
    }

    fn begin_session(&mut self, session: &SessionInfo) {
        self.sessions.lock().unwrap().push(session.clone());
    }
}

/// Keeps records and timing flushes in memory
#[derive(Default, Clone)]
pub struct MemorySink {
    pub records: Arc<Mutex<Vec<AnswerRecord>>>,
    /// `interrupted` flag of each flush
    pub flushes: Arc<Mutex<Vec<bool>>>,
    pub summaries: Arc<Mutex<Vec<GapSummary>>>,
}

impl ResponseSink for MemorySink {
    fn record_answer(&mut self, record: &AnswerRecord) -> Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn flush_timing(
        &mut self,
        _log: &TimingLog,
        summary: &GapSummary,
        interrupted: bool,
    ) -> Result<()> {
        self.flushes.lock().unwrap().push(interrupted);
        self.summaries.lock().unwrap().push(summary.clone());
        Ok(())
    }
}

/// Language model with a fixed reply, or none at all
pub struct FixedModel(pub Option<&'static str>);

#[async_trait]
impl LanguageModel for FixedModel {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String> {
        self.0
            .map(ToString::to_string)
            .ok_or_else(|| Error::Unavailable("offline".to_string()))
    }
}

/// Generator that produces numbered questions after a delay
pub struct SlowGenerator {
    pub delay: Duration,
    pub calls: Arc<Mutex<Vec<(CategoryType, String)>>>,
}

impl SlowGenerator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: Arc::default(),
        }
    }
}

#[async_trait]
impl QuestionGenerator for SlowGenerator {
    async fn generate_batch(
        &self,
        category_type: CategoryType,
        category_name: &str,
    ) -> Result<Vec<QuestionTemplate>> {
        self.calls
            .lock()
            .unwrap()
            .push((category_type, category_name.to_string()));
        tokio::time::sleep(self.delay).await;
        Ok(generated(category_type, category_name, 9))
    }
}

/// Generator that always fails
pub struct FailingGenerator;

#[async_trait]
impl QuestionGenerator for FailingGenerator {
    async fn generate_batch(
        &self,
        _category_type: CategoryType,
        _category_name: &str,
    ) -> Result<Vec<QuestionTemplate>> {
        Err(Error::Generation("no model".to_string()))
    }
}

/// `count` distinct generated questions, tiered by thirds
pub fn generated(category_type: CategoryType, name: &str, count: usize) -> Vec<QuestionTemplate> {
    let texts = (1..=count)
        .map(|i| format!("Generated question {i} about {name}?"))
        .collect();
    partition_by_tier(texts, category_type, name)
}

pub fn corpus(store: Arc<dyn CorpusStore>, generator: Arc<dyn QuestionGenerator>) -> CorpusManager {
    CorpusManager::new(store, generator, UsedDefaults::new(), StdRng::seed_from_u64(7))
}

pub fn offline_corpus() -> CorpusManager {
    corpus(Arc::new(MemoryCorpusStore::new()), Arc::new(FailingGenerator))
}

pub fn profile() -> Profile {
    Profile {
        name: "Ada".to_string(),
        profession: "software engineer".to_string(),
        main_category: "Technology".to_string(),
        subcategory: "Software Engineer".to_string(),
        years_experience: 6,
    }
}

/// Session tuning for tests: no ctrl-c race, no background profession work
pub fn test_config() -> SessionConfig {
    SessionConfig {
        readiness_timeout: Duration::from_secs(3),
        prepare_profession_corpus: false,
        catch_interrupt: false,
    }
}

/// Handles onto what an interviewer did
pub struct Harness {
    pub interviewer: Interviewer,
    pub lines: Arc<Mutex<Vec<String>>>,
    pub asked: Arc<Mutex<Vec<String>>>,
    pub sink: MemorySink,
    pub sessions: Arc<Mutex<Vec<SessionInfo>>>,
}

pub fn harness(
    corpus: CorpusManager,
    replies: Vec<Reply>,
    followup: (FixedModel, GateMode),
    config: SessionConfig,
) -> Harness {
    let presenter = RecordingPresenter::default();
    let lines = Arc::clone(&presenter.lines);
    let sessions = Arc::clone(&presenter.sessions);
    let source = ScriptedSource::new(replies);
    let asked = Arc::clone(&source.asked);
    let sink = MemorySink::default();

    let (model, gate) = followup;
    let followup = FollowupUnit::new(
        Arc::new(model),
        FollowupConfig {
            gate,
            ..FollowupConfig::default()
        },
        StdRng::seed_from_u64(11),
    );

    let parts = Collaborators {
        corpus,
        followup,
        estimator: WillingnessEstimator::default(),
        hobbies: Box::new(KeywordHobbyExtractor::new()),
        presenter: Box::new(presenter),
        source: Box::new(source),
        sink: Box::new(sink.clone()),
    };

    Harness {
        interviewer: Interviewer::new(parts, config, StdRng::seed_from_u64(3)),
        lines,
        asked,
        sink,
        sessions,
    }
}

/// `seconds` of a loud 440 Hz tone at 16 kHz
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn loud_tone(seconds: f32) -> Vec<f32> {
    let n = (16_000.0 * seconds) as usize;
    (0..n)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16_000.0).sin())
        .collect()
}

/// `seconds` of silence at 16 kHz
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn silence(seconds: f32) -> Vec<f32> {
    vec![0.0; (16_000.0 * seconds) as usize]
}

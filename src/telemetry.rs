//! Session timing and answer records
//!
//! The interviewer appends [`TimingEvent`]s to a [`TimingLog`] as it goes and
//! produces one [`AnswerRecord`] per answered question. [`FileRecorder`]
//! writes both to a responses directory.

use std::fmt;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Error, Result};
use crate::corpus::{CategoryType, QuestionTemplate};
use crate::ports::{Answer, ResponseSink, SessionInfo};
use crate::willingness::WillingnessTier;

/// Words per second assumed when an answer has no audio
const FALLBACK_WORDS_PER_SECOND: f64 = 2.5;

/// Lower bound for a recorded answer duration
const MIN_TIME_SPENT: f64 = 0.1;

/// Interview phase an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Intake,
    Professional,
    HobbyDiscovery,
    HobbyQuestions,
    Conclusion,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Intake => "Intake",
            Self::Professional => "Professional",
            Self::HobbyDiscovery => "Hobby Discovery",
            Self::HobbyQuestions => "Hobby Questions",
            Self::Conclusion => "Conclusion",
        };
        f.write_str(s)
    }
}

/// What a timing event marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    /// Selection of the next question started
    QuestionPreparation,
    /// The prompt first became audible
    FirstAudible,
    /// An answer finished, transcription included
    ResponseCompletion,
    /// Seconds between the previous answer and the next prompt
    Gap,
    /// Transition or introduction line
    Introduction,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::QuestionPreparation => "Question Preparation",
            Self::FirstAudible => "First Speech Byte",
            Self::ResponseCompletion => "Response Completion",
            Self::Gap => "Response-to-Speech Gap",
            Self::Introduction => "Introduction",
        };
        f.write_str(s)
    }
}

/// One timestamped moment of the session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingEvent {
    pub label: String,
    pub phase: Phase,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub gap_seconds: Option<f64>,
}

/// Append-only, ordered log of a session's timing events
#[derive(Debug, Clone, Default)]
pub struct TimingLog {
    events: Vec<TimingEvent>,
}

impl TimingLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a point in time
    pub fn mark(
        &mut self,
        phase: Phase,
        kind: EventKind,
        label: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) {
        self.events.push(TimingEvent {
            label: label.into(),
            phase,
            kind,
            timestamp,
            gap_seconds: None,
        });
    }

    /// Record the gap between an answer ending and the next prompt starting
    ///
    /// Returns the gap in seconds. Negative gaps (clock skew between
    /// collaborators) are clamped to zero.
    pub fn gap(
        &mut self,
        phase: Phase,
        label: impl Into<String>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> f64 {
        let seconds = seconds_between(from, to);
        self.events.push(TimingEvent {
            label: label.into(),
            phase,
            kind: EventKind::Gap,
            timestamp: to,
            gap_seconds: Some(seconds),
        });
        seconds
    }

    #[must_use]
    pub fn events(&self) -> &[TimingEvent] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All gaps recorded in `phase`, in order
    #[must_use]
    pub fn gaps(&self, phase: Phase) -> Vec<f64> {
        self.events
            .iter()
            .filter(|e| e.phase == phase)
            .filter_map(|e| e.gap_seconds)
            .collect()
    }
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let micros = (to - from).num_microseconds().unwrap_or_default();
    #[allow(clippy::cast_precision_loss)]
    let seconds = micros as f64 / 1_000_000.0;
    seconds.max(0.0)
}

/// Summary statistics over a set of gaps
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GapStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation, 0 with fewer than two gaps
    pub stddev: f64,
}

impl GapStats {
    /// `None` for an empty slice
    #[must_use]
    pub fn from_gaps(gaps: &[f64]) -> Option<Self> {
        if gaps.is_empty() {
            return None;
        }

        #[allow(clippy::cast_precision_loss)]
        let n = gaps.len() as f64;
        let mean = gaps.iter().sum::<f64>() / n;
        let min = gaps.iter().copied().fold(f64::INFINITY, f64::min);
        let max = gaps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let stddev = if gaps.len() > 1 {
            let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        } else {
            0.0
        };

        Some(Self {
            count: gaps.len(),
            mean,
            min,
            max,
            stddev,
        })
    }
}

/// Gap statistics per phase and overall
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GapSummary {
    pub professional_gaps: Vec<f64>,
    pub hobby_gaps: Vec<f64>,
    pub professional: Option<GapStats>,
    pub hobby: Option<GapStats>,
    pub overall: Option<GapStats>,
}

impl GapSummary {
    #[must_use]
    pub fn from_log(log: &TimingLog) -> Self {
        let professional_gaps = log.gaps(Phase::Professional);
        let hobby_gaps = log.gaps(Phase::HobbyQuestions);
        let all: Vec<f64> = professional_gaps.iter().chain(&hobby_gaps).copied().collect();

        Self {
            professional: GapStats::from_gaps(&professional_gaps),
            hobby: GapStats::from_gaps(&hobby_gaps),
            overall: GapStats::from_gaps(&all),
            professional_gaps,
            hobby_gaps,
        }
    }
}

/// Length of the recorded answer audio, in seconds
///
/// # Errors
///
/// Returns [`Error::DataIntegrity`] when there is no audio to measure.
#[allow(clippy::cast_precision_loss)]
pub fn audio_duration(sample_count: usize, sample_rate: u32) -> Result<f64> {
    if sample_count == 0 || sample_rate == 0 {
        return Err(Error::DataIntegrity(format!(
            "no answer audio ({sample_count} samples at {sample_rate} Hz)"
        )));
    }
    Ok(sample_count as f64 / f64::from(sample_rate))
}

/// How long an answer took, in seconds
///
/// Uses the audio length when there is audio. Otherwise estimates from the
/// word count and logs the data-integrity warning.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn time_spent_seconds(sample_count: usize, sample_rate: u32, word_count: usize) -> f64 {
    let seconds = audio_duration(sample_count, sample_rate).unwrap_or_else(|e| {
        tracing::warn!(error = %e, word_count, "estimating duration from word count");
        word_count as f64 / FALLBACK_WORDS_PER_SECOND
    });
    seconds.max(MIN_TIME_SPENT)
}

/// One answered question
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRecord {
    pub recording_id: String,
    pub timestamp: DateTime<Utc>,
    pub category_type: CategoryType,
    pub category_name: String,
    pub question_text: String,
    pub answer_text: String,
    pub word_count: usize,
    pub time_spent_seconds: f64,
    pub willingness_tier: WillingnessTier,
    pub audio_ref: Option<PathBuf>,
    pub question_audio_ref: Option<PathBuf>,
}

impl AnswerRecord {
    /// Build a record for `question`
    ///
    /// `answer_text` may differ from `answer.text` when a follow-up exchange
    /// was folded into it; word count is taken from `answer_text`.
    #[must_use]
    pub fn new(
        recording_id: impl Into<String>,
        question: &QuestionTemplate,
        answer_text: impl Into<String>,
        answer: &Answer,
        question_audio_ref: Option<PathBuf>,
    ) -> Self {
        let answer_text = answer_text.into();
        let word_count = answer_text.split_whitespace().count();

        Self {
            recording_id: recording_id.into(),
            timestamp: answer.completed_at,
            category_type: question.category_type,
            category_name: question.category_name.clone(),
            question_text: question.text.clone(),
            time_spent_seconds: time_spent_seconds(
                answer.samples.len(),
                answer.sample_rate,
                word_count,
            ),
            answer_text,
            word_count,
            willingness_tier: question.tier,
            audio_ref: answer.audio_ref.clone(),
            question_audio_ref,
        }
    }
}

/// Writes records and timing logs into a responses directory
///
/// Once a session begins, files go to a per-user subdirectory of the root.
///
/// - `interview_responses.csv`: one row per answer, appended
/// - `{recording_id}_response.json`: the same record, pretty-printed
/// - `timing_data.csv` (or `timing_data_interrupted.csv`): events, summary
///   statistics and raw gaps
#[derive(Debug, Clone)]
pub struct FileRecorder {
    root: PathBuf,
    dir: PathBuf,
}

impl FileRecorder {
    /// Create a recorder, creating `root` if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            dir: root.clone(),
            root,
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the timing file for a session outcome
    #[must_use]
    pub fn timing_path(&self, interrupted: bool) -> PathBuf {
        if interrupted {
            self.dir.join("timing_data_interrupted.csv")
        } else {
            self.dir.join("timing_data.csv")
        }
    }
}

impl ResponseSink for FileRecorder {
    fn begin_session(&mut self, session: &SessionInfo) -> Result<()> {
        let dir = self.root.join(session.user_slug());
        std::fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "responses directory");
        self.dir = dir;
        Ok(())
    }

    fn record_answer(&mut self, record: &AnswerRecord) -> Result<()> {
        let csv_path = self.dir.join("interview_responses.csv");
        let write_header = !csv_path.exists();

        let file = OpenOptions::new().create(true).append(true).open(&csv_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;

        let json_path = self.dir.join(format!("{}_response.json", record.recording_id));
        std::fs::write(&json_path, serde_json::to_string_pretty(record)?)?;

        tracing::debug!(recording_id = %record.recording_id, "recorded answer");
        Ok(())
    }

    fn flush_timing(
        &mut self,
        log: &TimingLog,
        summary: &GapSummary,
        interrupted: bool,
    ) -> Result<()> {
        let path = self.timing_path(interrupted);
        let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&path)?;

        writer.write_record(["Phase", "Event Type", "Event Name", "Timestamp", "Gap (seconds)"])?;
        for event in log.events() {
            writer.write_record([
                event.phase.to_string(),
                event.kind.to_string(),
                event.label.clone(),
                event.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                event.gap_seconds.map(|g| format!("{g:.3}")).unwrap_or_default(),
            ])?;
        }

        writer.write_record([""; 5])?;
        writer.write_record(["Summary Statistics", "", "", "", ""])?;
        for (label, stats) in [
            ("All Phases", summary.overall),
            ("Professional", summary.professional),
            ("Hobby", summary.hobby),
        ] {
            let Some(stats) = stats else { continue };
            for (name, value) in [
                ("Average Gap", stats.mean),
                ("Max Gap", stats.max),
                ("Min Gap", stats.min),
                ("StdDev", stats.stddev),
            ] {
                writer.write_record([label, name, format!("{value:.3}").as_str(), "", ""])?;
            }
        }

        writer.write_record([""; 5])?;
        writer.write_record(["Raw Gap Data", "", "", "", ""])?;
        writer.write_record(["Phase", "Gap #", "Seconds", "", ""])?;
        for (i, gap) in summary.professional_gaps.iter().enumerate() {
            writer.write_record([
                "Professional",
                format!("P{}", i + 1).as_str(),
                format!("{gap:.3}").as_str(),
                "",
                "",
            ])?;
        }
        for (i, gap) in summary.hobby_gaps.iter().enumerate() {
            writer.write_record([
                "Hobby",
                format!("H{}", i + 1).as_str(),
                format!("{gap:.3}").as_str(),
                "",
                "",
            ])?;
        }
        writer.flush()?;

        tracing::info!(path = %path.display(), events = log.len(), interrupted, "saved timing data");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::milliseconds(ms)
    }

    #[test]
    fn gaps_are_grouped_by_phase() {
        let mut log = TimingLog::new();
        log.gap(Phase::Professional, "q1_gap", at(0), at(1500));
        log.gap(Phase::Professional, "q2_gap", at(0), at(2500));
        log.mark(Phase::HobbyDiscovery, EventKind::FirstAudible, "hobby_discovery", at(3000));
        log.gap(Phase::HobbyQuestions, "hobby_q2_gap", at(3000), at(4000));

        let summary = GapSummary::from_log(&log);
        assert_eq!(summary.professional_gaps, vec![1.5, 2.5]);
        assert_eq!(summary.hobby_gaps, vec![1.0]);
        assert_eq!(summary.overall.unwrap().count, 3);
        assert!((summary.professional.unwrap().mean - 2.0).abs() < 1e-9);
    }

    #[test]
    fn negative_gaps_clamp_to_zero() {
        let mut log = TimingLog::new();
        assert_eq!(log.gap(Phase::Professional, "skew", at(500), at(0)), 0.0);
    }

    #[test]
    fn stats_handle_single_and_empty() {
        assert!(GapStats::from_gaps(&[]).is_none());

        let one = GapStats::from_gaps(&[2.0]).unwrap();
        assert_eq!(one.stddev, 0.0);
        assert_eq!(one.min, 2.0);

        let two = GapStats::from_gaps(&[1.0, 3.0]).unwrap();
        assert!((two.stddev - std::f64::consts::SQRT_2).abs() < 1e-9);
        assert_eq!(two.max, 3.0);
    }

    #[test]
    fn time_spent_prefers_audio() {
        assert!((time_spent_seconds(32_000, 16_000, 3) - 2.0).abs() < 1e-9);
        assert!((time_spent_seconds(0, 16_000, 10) - 4.0).abs() < 1e-9);
        assert!((time_spent_seconds(0, 0, 0) - MIN_TIME_SPENT).abs() < 1e-9);
    }

    #[test]
    fn missing_audio_is_a_data_integrity_error() {
        assert!(matches!(audio_duration(0, 16_000), Err(Error::DataIntegrity(_))));
        assert!(matches!(audio_duration(16_000, 0), Err(Error::DataIntegrity(_))));
        assert!((audio_duration(8_000, 16_000).unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn recorder_moves_into_user_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = FileRecorder::new(dir.path()).unwrap();
        recorder
            .begin_session(&SessionInfo::new("Ada Lovelace", at(0)))
            .unwrap();

        assert_eq!(recorder.dir(), dir.path().join("ada_lovelace"));
        assert!(recorder.dir().is_dir());
    }

    #[test]
    fn recorder_writes_csv_json_and_timing() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = FileRecorder::new(dir.path()).unwrap();

        let question = QuestionTemplate {
            text: "What drew you to engineering?".to_string(),
            category_type: CategoryType::Main,
            category_name: "engineering".to_string(),
            tier: WillingnessTier::Medium,
        };
        let answer = Answer {
            text: "Bridges, mostly".to_string(),
            samples: vec![0.0; 8_000],
            sample_rate: 16_000,
            completed_at: at(1_000),
            audio_ref: None,
        };

        for id in ["q1", "q2"] {
            let record = AnswerRecord::new(id, &question, answer.text.clone(), &answer, None);
            assert!((record.time_spent_seconds - 0.5).abs() < 1e-9);
            recorder.record_answer(&record).unwrap();
        }

        let csv = std::fs::read_to_string(dir.path().join("interview_responses.csv")).unwrap();
        assert_eq!(csv.lines().count(), 3, "one header, two rows");
        assert!(dir.path().join("q2_response.json").exists());

        let mut log = TimingLog::new();
        log.gap(Phase::Professional, "q1_gap", at(0), at(1_250));
        recorder
            .flush_timing(&log, &GapSummary::from_log(&log), true)
            .unwrap();

        let timing = std::fs::read_to_string(recorder.timing_path(true)).unwrap();
        assert!(timing.starts_with("Phase,Event Type,Event Name,Timestamp,Gap (seconds)"));
        assert!(timing.contains("Professional,P1,1.250"));
        assert!(!recorder.timing_path(false).exists());
    }
}

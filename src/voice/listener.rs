//! Spoken answers: record until the speaker goes quiet, then transcribe

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use super::capture::{AudioCapture, SAMPLE_RATE, save_wav};
use super::presenter::Speaker;
use super::segmenter::{SegmentEnd, SegmenterConfig, UtteranceSegmenter};
use super::stt::SpeechToText;
use crate::ports::{
    Answer, AnswerSource, CAPTURE_ATTEMPTS, Captured, Expect, REPROMPT, SessionInfo,
    is_quit_phrase,
};
use crate::{Error, Result};

/// How often the capture buffer is drained into the segmenter
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Captures answers from the microphone
pub struct VoiceAnswerSource {
    capture: AudioCapture,
    stt: SpeechToText,
    segmenter: UtteranceSegmenter,
    speaker: Option<Arc<Speaker>>,
    recordings_root: Option<PathBuf>,
    /// `{root}/{user}/{stamp}` once a session has begun
    session_dir: Option<PathBuf>,
}

impl VoiceAnswerSource {
    #[must_use]
    pub const fn new(capture: AudioCapture, stt: SpeechToText, config: SegmenterConfig) -> Self {
        Self {
            capture,
            stt,
            segmenter: UtteranceSegmenter::new(config),
            speaker: None,
            recordings_root: None,
            session_dir: None,
        }
    }

    /// Speak re-prompts instead of staying silent
    #[must_use]
    pub fn with_speaker(mut self, speaker: Arc<Speaker>) -> Self {
        self.speaker = Some(speaker);
        self
    }

    /// Save every attempt as a WAV file under a per-session directory of `dir`
    #[must_use]
    pub fn with_recordings(mut self, dir: PathBuf) -> Self {
        self.recordings_root = Some(dir);
        self
    }

    /// Record until the segmenter decides the answer is over
    async fn record(&mut self) -> Result<(Vec<f32>, SegmentEnd)> {
        self.capture.start()?;
        // Drop anything picked up while the prompt was playing
        self.capture.clear_buffer();
        let _ = self.segmenter.take();

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let chunk = self.capture.take_buffer();
            if self.segmenter.push(&chunk) {
                let end = self.segmenter.end().unwrap_or(SegmentEnd::Silence);
                return Ok((self.segmenter.take(), end));
            }
        }
    }

    fn save(&self, question_id: &str, attempt: usize, samples: &[f32]) -> Option<PathBuf> {
        let dir = self.session_dir.as_ref()?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = dir.join(format!("{stamp}_{question_id}_attempt{attempt}.wav"));
        match save_wav(&path, samples, SAMPLE_RATE) {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "failed to save answer audio");
                None
            }
        }
    }

    async fn reprompt(&self) {
        let Some(speaker) = &self.speaker else {
            return;
        };
        if let Err(e) = speaker.say(REPROMPT).await {
            tracing::warn!(error = %e, "re-prompt failed");
        }
    }
}

#[async_trait]
impl AnswerSource for VoiceAnswerSource {
    async fn capture(&mut self, question_id: &str, expect: Expect) -> Result<Captured> {
        let mut last = Answer::text_only(String::new());

        for attempt in 1..=CAPTURE_ATTEMPTS {
            tracing::debug!(question_id, attempt, "listening for answer");
            let (samples, end) = self.record().await?;
            let audio_ref = self.save(question_id, attempt, &samples);

            let text = if end == SegmentEnd::NoSpeech {
                String::new()
            } else {
                match self.stt.transcribe_samples(&samples, SAMPLE_RATE).await {
                    Ok(text) => text,
                    Err(e @ (Error::Unavailable(_) | Error::Stt(_) | Error::Http(_))) => {
                        tracing::warn!(question_id, attempt, error = %e, "transcription failed");
                        String::new()
                    }
                    Err(e) => return Err(e),
                }
            };

            if is_quit_phrase(&text) {
                tracing::info!(question_id, "quit phrase heard");
                return Ok(Captured::Quit);
            }

            last = Answer {
                text,
                samples,
                sample_rate: SAMPLE_RATE,
                completed_at: Utc::now(),
                audio_ref,
            };

            if last.word_count() >= expect.min_words() {
                return Ok(Captured::Answer(last));
            }

            tracing::debug!(question_id, attempt, words = last.word_count(), "answer too short");
            if attempt < CAPTURE_ATTEMPTS {
                self.reprompt().await;
            }
        }

        // Keep the audio for scoring but drop the unusable transcript
        last.text.clear();
        Ok(Captured::Answer(last))
    }

    fn begin_session(&mut self, session: &SessionInfo) {
        self.session_dir = self
            .recordings_root
            .as_ref()
            .map(|root| root.join(session.user_slug()).join(session.stamp()));
    }
}

//! Spoken prompts

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::playback::AudioPlayback;
use super::tts::TextToSpeech;
use crate::Result;
use crate::ports::{Presented, Presenter, SessionInfo};

/// Synthesizes and plays text; shared by the presenter and the listener
pub struct Speaker {
    tts: TextToSpeech,
    playback: AudioPlayback,
}

impl Speaker {
    #[must_use]
    pub const fn new(tts: TextToSpeech, playback: AudioPlayback) -> Self {
        Self { tts, playback }
    }

    /// Speak `text`, returning when it first became audible and the MP3 played
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    pub async fn say(&self, text: &str) -> Result<(DateTime<Utc>, Vec<u8>)> {
        let mp3 = self.tts.synthesize(text).await?;
        let first_audible_at = self.playback.play_mp3(mp3.clone()).await?;
        Ok((first_audible_at, mp3))
    }
}

/// Presents interview prompts through text-to-speech
pub struct VoicePresenter {
    speaker: Arc<Speaker>,
    recordings_root: Option<PathBuf>,
    /// `{root}/{user}/{stamp}` once a session has begun
    session_dir: Option<PathBuf>,
}

impl VoicePresenter {
    #[must_use]
    pub const fn new(speaker: Arc<Speaker>) -> Self {
        Self {
            speaker,
            recordings_root: None,
            session_dir: None,
        }
    }

    /// Keep each prompt's audio as `{recording_id}_question.mp3` under a
    /// per-session directory of `dir`
    #[must_use]
    pub fn with_recordings(mut self, dir: PathBuf) -> Self {
        self.recordings_root = Some(dir);
        self
    }

    fn save(&self, recording_id: &str, mp3: &[u8]) -> Option<PathBuf> {
        let dir = self.session_dir.as_ref()?;
        let path = dir.join(format!("{recording_id}_question.mp3"));
        let written = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, mp3));
        match written {
            Ok(()) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "failed to save prompt audio");
                None
            }
        }
    }
}

#[async_trait]
impl Presenter for VoicePresenter {
    async fn present(&mut self, text: &str, recording_id: &str) -> Result<Presented> {
        tracing::debug!(recording_id, "presenting prompt");
        let (first_audible_at, mp3) = self.speaker.say(text).await?;

        Ok(Presented {
            first_audible_at,
            audio_ref: self.save(recording_id, &mp3),
        })
    }

    fn begin_session(&mut self, session: &SessionInfo) {
        self.session_dir = self
            .recordings_root
            .as_ref()
            .map(|root| root.join(session.user_slug()).join(session.stamp()));
    }
}

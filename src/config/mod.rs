//! Configuration management for Cadence

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::followup::{FollowupConfig, GateMode};
use crate::interview::SessionConfig;
use crate::voice::{SegmenterConfig, SttProvider, TtsProvider};
use crate::{Error, Result};

use file::CadenceConfigFile;

/// Cadence configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API keys
    pub api_keys: ApiKeys,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Interview tuning
    pub interview: InterviewConfig,

    /// Storage locations
    pub paths: Paths,

    /// Language model used for generation and follow-ups
    pub llm_model: Option<String>,
}

/// Keys for the hosted services
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// `Anthropic` API key (question generation, follow-ups)
    pub anthropic: Option<String>,

    /// `OpenAI` API key (Whisper and TTS)
    pub openai: Option<String>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<String>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<String>,
}

impl ApiKeys {
    /// Anthropic key, wrapped for handing to a client
    #[must_use]
    pub fn anthropic_secret(&self) -> Option<SecretString> {
        self.anthropic.clone().map(SecretString::from)
    }
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("anthropic", &self.anthropic.is_some())
            .field("openai", &self.openai.is_some())
            .field("deepgram", &self.deepgram.is_some())
            .field("elevenlabs", &self.elevenlabs.is_some())
            .finish()
    }
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub stt_provider: SttProvider,

    /// STT model; provider default when unset
    pub stt_model: Option<String>,

    /// Transcription language code
    pub language: String,

    pub tts_provider: TtsProvider,

    /// TTS model; provider default when unset
    pub tts_model: Option<String>,

    /// TTS voice; provider default when unset
    pub tts_voice: Option<String>,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// Microphone name; system default when unset
    pub input_device: Option<String>,

    /// Speaker name; system default when unset
    pub output_device: Option<String>,

    /// Answer segmentation
    pub segmenter: SegmenterConfig,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_provider: SttProvider::default(),
            stt_model: None,
            language: "en".to_string(),
            tts_provider: TtsProvider::default(),
            tts_model: None,
            tts_voice: None,
            tts_speed: 1.0,
            input_device: None,
            output_device: None,
            segmenter: SegmenterConfig::default(),
        }
    }
}

impl VoiceConfig {
    /// Key for the configured STT provider
    #[must_use]
    pub fn stt_key(&self, keys: &ApiKeys) -> Option<SecretString> {
        let key = match self.stt_provider {
            SttProvider::Whisper => &keys.openai,
            SttProvider::Deepgram => &keys.deepgram,
        };
        key.clone().map(SecretString::from)
    }

    /// Key for the configured TTS provider
    #[must_use]
    pub fn tts_key(&self, keys: &ApiKeys) -> Option<SecretString> {
        let key = match self.tts_provider {
            TtsProvider::OpenAI => &keys.openai,
            TtsProvider::ElevenLabs => &keys.elevenlabs,
        };
        key.clone().map(SecretString::from)
    }
}

/// Interview tuning
#[derive(Debug, Clone, Copy, Default)]
pub struct InterviewConfig {
    pub followup: FollowupConfig,
    pub session: SessionConfig,
}

/// Where questions, answers and recordings live
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root for everything below unless overridden
    pub data_dir: PathBuf,

    /// Question datasets (`{type}_{name}_questions.csv`)
    pub questions_dir: PathBuf,

    /// Per-user answer and timing files
    pub responses_dir: PathBuf,

    /// Per-session question and answer audio
    pub recordings_dir: PathBuf,
}

impl Paths {
    /// Lay out every directory under `data_dir`
    #[must_use]
    pub fn under(data_dir: PathBuf) -> Self {
        Self {
            questions_dir: data_dir.join("questions"),
            responses_dir: data_dir.join("personality_responses"),
            recordings_dir: data_dir.join("audio_recordings"),
            data_dir,
        }
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::under(default_data_dir())
    }
}

/// Default data directory: `~/.local/share/cadence` on Linux
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/cadence"),
        |d| d.data_dir().join("cadence"),
    )
}

impl Config {
    /// Load configuration from the environment and the optional TOML file
    ///
    /// Precedence is env > toml > default.
    ///
    /// # Errors
    ///
    /// Returns error if a provider or gate name is not recognised
    pub fn load() -> Result<Self> {
        Self::from_sources(file::load_config_file(), |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a provider or gate name is not recognised
    pub fn from_sources(
        fc: CadenceConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let key = |name: &str, fallback: Option<String>| {
            env(name).or(fallback).filter(|k| !k.trim().is_empty())
        };

        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            anthropic: key("ANTHROPIC_API_KEY", fc.api_keys.anthropic),
            openai: key("OPENAI_API_KEY", fc.api_keys.openai),
            deepgram: key("DEEPGRAM_API_KEY", fc.api_keys.deepgram),
            elevenlabs: key("ELEVENLABS_API_KEY", fc.api_keys.elevenlabs),
        };

        // Voice config (env > toml > default)
        let defaults = VoiceConfig::default();
        let stt_provider = env("CADENCE_STT_PROVIDER")
            .or(fc.voice.stt_provider)
            .map(|p| p.parse::<SttProvider>())
            .transpose()?
            .unwrap_or(defaults.stt_provider);
        let tts_provider = env("CADENCE_TTS_PROVIDER")
            .or(fc.voice.tts_provider)
            .map(|p| p.parse::<TtsProvider>())
            .transpose()?
            .unwrap_or(defaults.tts_provider);

        let mut segmenter = defaults.segmenter;
        if let Some(secs) = fc.voice.silence_seconds.filter(|s| s.is_finite() && *s > 0.0) {
            segmenter.silence = Duration::from_secs_f64(secs);
        }
        if let Some(threshold) = fc.voice.energy_threshold.filter(|t| *t > 0.0) {
            segmenter.energy_threshold = threshold;
        }

        #[allow(clippy::cast_possible_truncation)]
        let tts_speed = fc
            .voice
            .tts_speed
            .map_or(defaults.tts_speed, |s| s.clamp(0.25, 4.0) as f32);

        let voice = VoiceConfig {
            stt_provider,
            stt_model: env("CADENCE_STT_MODEL").or(fc.voice.stt_model),
            language: fc.voice.language.unwrap_or(defaults.language),
            tts_provider,
            tts_model: env("CADENCE_TTS_MODEL").or(fc.voice.tts_model),
            tts_voice: env("CADENCE_TTS_VOICE").or(fc.voice.tts_voice),
            tts_speed,
            input_device: fc.voice.input_device,
            output_device: fc.voice.output_device,
            segmenter,
        };

        // Interview tuning (env > toml > default)
        let mut interview = InterviewConfig::default();
        if let Some(p) = parse_env(&env, "CADENCE_FOLLOWUP_PROBABILITY")?
            .or(fc.interview.followup_probability)
        {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::Config(format!(
                    "follow-up probability must be within 0..=1, got {p}"
                )));
            }
            interview.followup.probability = p;
        }
        if let Some(gate) = env("CADENCE_FOLLOWUP_GATE").or(fc.interview.followup_gate) {
            interview.followup.gate = gate.parse::<GateMode>()?;
        }
        if let Some(ms) =
            parse_env(&env, "CADENCE_READINESS_TIMEOUT_MS")?.or(fc.interview.readiness_timeout_ms)
        {
            interview.session.readiness_timeout = Duration::from_millis(ms);
        }

        // Storage (env > toml > ~/.local/share/cadence)
        let data_dir = env("CADENCE_DATA_DIR")
            .map(PathBuf::from)
            .or(fc.paths.data_dir)
            .unwrap_or_else(default_data_dir);
        let mut paths = Paths::under(data_dir);
        if let Some(dir) = fc.paths.questions_dir {
            paths.questions_dir = dir;
        }
        if let Some(dir) = fc.paths.responses_dir {
            paths.responses_dir = dir;
        }
        if let Some(dir) = fc.paths.recordings_dir {
            paths.recordings_dir = dir;
        }

        let llm_model = env("CADENCE_LLM_MODEL").or(fc.llm.model);

        tracing::debug!(
            stt = ?voice.stt_provider,
            tts = ?voice.tts_provider,
            data_dir = %paths.data_dir.display(),
            "configuration loaded"
        );

        Ok(Self {
            api_keys,
            voice,
            interview,
            paths,
            llm_model,
        })
    }
}

fn parse_env<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    env(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid value for {key}: {raw}")))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_file() {
        let mut fc = CadenceConfigFile::default();
        fc.api_keys.anthropic = Some("from-file".to_string());
        fc.llm.model = Some("file-model".to_string());

        let config = Config::from_sources(
            fc,
            env(&[("ANTHROPIC_API_KEY", "from-env"), ("CADENCE_DATA_DIR", "/tmp/cadence")]),
        )
        .unwrap();

        let key = config.api_keys.anthropic_secret().unwrap();
        assert_eq!(key.expose_secret(), "from-env");
        assert_eq!(config.llm_model.as_deref(), Some("file-model"));
        assert_eq!(config.paths.questions_dir, PathBuf::from("/tmp/cadence/questions"));
    }

    #[test]
    fn blank_keys_are_missing() {
        let config = Config::from_sources(
            CadenceConfigFile::default(),
            env(&[("OPENAI_API_KEY", "  ")]),
        )
        .unwrap();
        assert!(config.api_keys.openai.is_none());
    }

    #[test]
    fn interview_tuning_from_env() {
        let config = Config::from_sources(
            CadenceConfigFile::default(),
            env(&[
                ("CADENCE_FOLLOWUP_PROBABILITY", "0.25"),
                ("CADENCE_READINESS_TIMEOUT_MS", "1500"),
                ("CADENCE_FOLLOWUP_GATE", "never"),
            ]),
        )
        .unwrap();

        assert!((config.interview.followup.probability - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.interview.followup.gate, GateMode::Never);
        assert_eq!(
            config.interview.session.readiness_timeout,
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn rejects_bad_values() {
        let bad_probability = Config::from_sources(
            CadenceConfigFile::default(),
            env(&[("CADENCE_FOLLOWUP_PROBABILITY", "1.5")]),
        );
        assert!(matches!(bad_probability, Err(Error::Config(_))));

        let bad_provider = Config::from_sources(
            CadenceConfigFile::default(),
            env(&[("CADENCE_STT_PROVIDER", "carrier-pigeon")]),
        );
        assert!(matches!(bad_provider, Err(Error::Config(_))));
    }

    #[test]
    fn provider_picks_key() {
        let mut fc = CadenceConfigFile::default();
        fc.voice.stt_provider = Some("deepgram".to_string());
        let config = Config::from_sources(
            fc,
            env(&[("OPENAI_API_KEY", "sk-open"), ("DEEPGRAM_API_KEY", "dg")]),
        )
        .unwrap();

        let stt = config.voice.stt_key(&config.api_keys).unwrap();
        assert_eq!(stt.expose_secret(), "dg");
        let tts = config.voice.tts_key(&config.api_keys).unwrap();
        assert_eq!(tts.expose_secret(), "sk-open");
    }
}

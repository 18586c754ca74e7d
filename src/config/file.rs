//! TOML configuration file loading
//!
//! Supports `~/.config/cadence/config.toml` as a persistent config source.
//! Every field is optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct CadenceConfigFile {
    /// Language model configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// Voice/audio configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Interview tuning
    #[serde(default)]
    pub interview: InterviewFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Where questions, answers and recordings are kept
    #[serde(default)]
    pub paths: PathsFileConfig,
}

/// Language model configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// Model identifier (e.g. "claude-3-haiku-20240307")
    pub model: Option<String>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// STT provider ("whisper" or "deepgram")
    pub stt_provider: Option<String>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// Transcription language code
    pub language: Option<String>,

    /// TTS provider ("openai" or "elevenlabs")
    pub tts_provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,

    /// TTS voice identifier (e.g. "nova")
    pub tts_voice: Option<String>,

    /// TTS speed multiplier
    pub tts_speed: Option<f64>,

    pub input_device: Option<String>,
    pub output_device: Option<String>,

    /// Seconds of silence that end an answer
    pub silence_seconds: Option<f64>,

    /// RMS level that counts as speech
    pub energy_threshold: Option<f32>,
}

/// Interview tuning
#[derive(Debug, Default, Deserialize)]
pub struct InterviewFileConfig {
    /// Chance a substantial answer gets a follow-up
    pub followup_probability: Option<f64>,

    /// "random", "always" or "never"
    pub followup_gate: Option<String>,

    /// How long the hobby phase waits for generated questions
    pub readiness_timeout_ms: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub anthropic: Option<String>,
    pub openai: Option<String>,
    pub deepgram: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Storage locations
#[derive(Debug, Default, Deserialize)]
pub struct PathsFileConfig {
    pub data_dir: Option<PathBuf>,
    pub questions_dir: Option<PathBuf>,
    pub responses_dir: Option<PathBuf>,
    pub recordings_dir: Option<PathBuf>,
}

/// Load the TOML config file from the standard path
///
/// Returns `CadenceConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> CadenceConfigFile {
    config_file_path().map_or_else(CadenceConfigFile::default, |path| load_from(&path))
}

/// Load a config file from `path`, falling back to defaults
pub fn load_from(path: &Path) -> CadenceConfigFile {
    if !path.exists() {
        return CadenceConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                CadenceConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            CadenceConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/cadence/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("cadence").join("config.toml"))
}

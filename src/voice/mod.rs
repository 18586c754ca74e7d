//! Voice adapters: microphone, speakers, speech services

mod capture;
mod listener;
mod playback;
mod presenter;
mod segmenter;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, load_wav, samples_to_wav, save_wav};
pub use listener::VoiceAnswerSource;
pub use playback::{AudioPlayback, PLAYBACK_SAMPLE_RATE, decode_mp3, resample};
pub use presenter::{Speaker, VoicePresenter};
pub use segmenter::{
    ENERGY_THRESHOLD, SegmentEnd, SegmentState, SegmenterConfig, UtteranceSegmenter,
    calculate_energy,
};
pub use stt::{SpeechToText, SttProvider};
pub use tts::{TextToSpeech, TtsProvider};

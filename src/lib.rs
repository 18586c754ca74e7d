//! Cadence - Adaptive voice interviews
//!
//! This library provides the core of the Cadence interviewer:
//! - Willingness estimation from answer audio
//! - Tiered question corpus with background generation
//! - Follow-up decisions and validation
//! - Phase-sequenced interview orchestration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Adapters                          │
//! │   Microphone/STT  │  TTS/Speaker  │  Console  │ CSV │
//! └────────────────────┬────────────────────────────────┘
//!                      │ ports
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Interviewer                        │
//! │   Phases  │  Gaps  │  Willingness  │  Follow-ups    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Corpus Manager                       │
//! │   Store  │  Defaults  │  Generator (language model) │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod console;
pub mod corpus;
pub mod error;
pub mod extract;
pub mod followup;
pub mod interview;
pub mod llm;
pub mod ports;
pub mod telemetry;
pub mod voice;
pub mod willingness;

pub use config::Config;
pub use corpus::{
    AskedSet, CategoryType, CorpusManager, CorpusStore, CsvCorpusStore, MemoryCorpusStore,
    QuestionTemplate, Readiness,
};
pub use error::{Error, Result};
pub use followup::{FollowupConfig, FollowupUnit, GateMode};
pub use interview::{
    AbortReason, Collaborators, InterviewState, Interviewer, Profile, SessionConfig,
    SessionReport,
};
pub use telemetry::{AnswerRecord, FileRecorder, GapSummary, Phase, TimingLog};
pub use willingness::{WillingnessEstimator, WillingnessState, WillingnessTier};

//! Willingness estimation from answer audio
//!
//! Turns the amplitude samples of one spoken answer into a coarse engagement
//! tier plus a 0-100 score. The estimate is a pure function of its input and
//! never fails: an empty buffer is `Low`, a buffer that produces non-finite
//! intermediates degrades to a neutral `Medium`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Frame length for zero-crossing analysis (in samples)
const ZCR_FRAME_LENGTH: usize = 2048;

/// Hop between zero-crossing frames (in samples)
const ZCR_HOP_LENGTH: usize = 512;

/// Neutral score used when the estimate cannot be computed
const NEUTRAL_SCORE: f64 = 50.0;

/// Coarse engagement classification of a speaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WillingnessTier {
    Low,
    Medium,
    High,
}

impl WillingnessTier {
    /// All tiers in fixed cycle order
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Tiers to try for a lookup, starting at `self` and wrapping forward
    /// through Low → Medium → High
    #[must_use]
    pub fn cycle_from(self) -> [Self; 3] {
        let start = self.index();
        [
            Self::ALL[start],
            Self::ALL[(start + 1) % 3],
            Self::ALL[(start + 2) % 3],
        ]
    }

    const fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// Stored label (matches the persisted corpus format)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low_willingness",
            Self::Medium => "medium_willingness",
            Self::High => "high_willingness",
        }
    }

    /// Parse a stored label, accepting both `low` and `low_willingness` forms
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().trim_end_matches("_willingness") {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for WillingnessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// Normalized sub-scores behind a composite score
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Breakdown {
    /// Mean absolute amplitude, scaled
    pub volume: f64,
    /// Zero-crossing-rate activity, scaled
    pub speech_activity: f64,
    /// Penalizes silence, rewards duration; up to 120 for long unbroken speech
    pub engagement: f64,
}

impl Breakdown {
    const fn uniform(value: f64) -> Self {
        Self {
            volume: value,
            speech_activity: value,
            engagement: value,
        }
    }

    fn is_finite(&self) -> bool {
        self.volume.is_finite() && self.speech_activity.is_finite() && self.engagement.is_finite()
    }
}

/// Result of scoring one answer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Estimate {
    pub tier: WillingnessTier,
    pub score: f64,
    pub breakdown: Breakdown,
}

impl Estimate {
    /// Estimate for an answer with no usable audio
    #[must_use]
    pub const fn silent() -> Self {
        Self {
            tier: WillingnessTier::Low,
            score: 0.0,
            breakdown: Breakdown::uniform(0.0),
        }
    }

    /// Fallback when scoring fails
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            tier: WillingnessTier::Medium,
            score: NEUTRAL_SCORE,
            breakdown: Breakdown::uniform(NEUTRAL_SCORE),
        }
    }
}

/// Willingness carried between slots
///
/// Starts at `Medium` with a neutral score. Only `update` mutates it, and
/// only after an answer has been scored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WillingnessState {
    pub tier: WillingnessTier,
    pub score: f64,
}

impl Default for WillingnessState {
    fn default() -> Self {
        Self {
            tier: WillingnessTier::Medium,
            score: NEUTRAL_SCORE,
        }
    }
}

impl WillingnessState {
    /// Apply a fresh estimate
    pub fn update(&mut self, estimate: &Estimate) {
        self.tier = estimate.tier;
        self.score = estimate.score.clamp(0.0, 100.0);
    }
}

/// Fixed constants of the estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WillingnessConfig {
    /// Amplitude below which a sample counts as silence
    pub speech_threshold: f32,
    /// Gain applied to mean absolute amplitude
    pub volume_gain: f64,
    /// Gain applied to the mean zero-crossing rate
    pub activity_gain: f64,
    /// Scores below this are `Low`
    pub low_threshold: f64,
    /// Scores above this are `High`
    pub high_threshold: f64,
    pub volume_weight: f64,
    pub activity_weight: f64,
    pub engagement_weight: f64,
}

impl Default for WillingnessConfig {
    fn default() -> Self {
        Self {
            speech_threshold: 0.01,
            volume_gain: 1000.0,
            activity_gain: 500.0,
            low_threshold: 30.0,
            high_threshold: 70.0,
            volume_weight: 0.3,
            activity_weight: 0.3,
            engagement_weight: 0.4,
        }
    }
}

/// Scores answer audio into a willingness tier
#[derive(Debug, Clone, Default)]
pub struct WillingnessEstimator {
    config: WillingnessConfig,
}

impl WillingnessEstimator {
    /// Create an estimator with the given constants
    #[must_use]
    pub const fn new(config: WillingnessConfig) -> Self {
        Self { config }
    }

    /// Score one answer's samples
    #[must_use]
    pub fn estimate(&self, samples: &[f32], sample_rate: u32) -> Estimate {
        if samples.is_empty() {
            return Estimate::silent();
        }

        if samples.iter().any(|s| !s.is_finite()) {
            tracing::warn!(samples = samples.len(), "non-finite audio samples, using neutral willingness");
            return Estimate::neutral();
        }

        let breakdown = self.breakdown(samples, sample_rate);
        let score = self.composite(&breakdown);

        if !breakdown.is_finite() || !score.is_finite() {
            tracing::warn!(?breakdown, "willingness computation produced non-finite values");
            return Estimate::neutral();
        }

        let estimate = Estimate {
            tier: self.classify(score),
            score,
            breakdown,
        };

        tracing::debug!(
            tier = %estimate.tier,
            score = estimate.score,
            volume = breakdown.volume,
            speech = breakdown.speech_activity,
            engagement = breakdown.engagement,
            "willingness estimated"
        );

        estimate
    }

    /// Weighted composite of a breakdown, clamped to [0, 100]
    #[must_use]
    pub fn composite(&self, breakdown: &Breakdown) -> f64 {
        let c = &self.config;
        let score = breakdown.volume * c.volume_weight
            + breakdown.speech_activity * c.activity_weight
            + breakdown.engagement * c.engagement_weight;
        score.clamp(0.0, 100.0)
    }

    /// Map a composite score to a tier
    #[must_use]
    pub fn classify(&self, score: f64) -> WillingnessTier {
        if score < self.config.low_threshold {
            WillingnessTier::Low
        } else if score > self.config.high_threshold {
            WillingnessTier::High
        } else {
            WillingnessTier::Medium
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn breakdown(&self, samples: &[f32], sample_rate: u32) -> Breakdown {
        let len = samples.len() as f64;

        let mean_abs = samples.iter().map(|s| f64::from(s.abs())).sum::<f64>() / len;
        let volume = (mean_abs * self.config.volume_gain).clamp(0.0, 100.0);

        let speech_activity =
            (zero_crossing_rate(samples) * self.config.activity_gain).clamp(0.0, 100.0);

        let silent = samples
            .iter()
            .filter(|s| s.abs() < self.config.speech_threshold)
            .count() as f64;
        let silence_ratio = silent / len;
        let duration = (len / f64::from(sample_rate.max(1))).max(0.1);
        let duration_bonus = (duration * 10.0).min(100.0);
        let engagement = (100.0 - silence_ratio * 100.0 + duration_bonus * 0.2).max(0.0);

        Breakdown {
            volume,
            speech_activity,
            engagement,
        }
    }
}

/// Mean framewise zero-crossing rate
///
/// Buffers shorter than one frame are treated as a single frame.
#[allow(clippy::cast_precision_loss)]
fn zero_crossing_rate(samples: &[f32]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }

    let crossings = |frame: &[f32]| {
        frame
            .windows(2)
            .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
            .count() as f64
            / ZCR_FRAME_LENGTH as f64
    };

    if samples.len() <= ZCR_FRAME_LENGTH {
        return crossings(samples);
    }

    let mut total = 0.0;
    let mut frames = 0usize;
    let mut start = 0;
    while start + ZCR_FRAME_LENGTH <= samples.len() {
        total += crossings(&samples[start..start + ZCR_FRAME_LENGTH]);
        frames += 1;
        start += ZCR_HOP_LENGTH;
    }

    total / frames as f64
}

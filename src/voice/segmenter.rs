//! Energy-based end-of-answer detection
//!
//! An answer ends once the speaker has been quiet for a while after saying
//! something, or when it runs past the maximum length.

use std::time::Duration;

use super::capture::SAMPLE_RATE;

/// RMS energy above which a chunk counts as speech
pub const ENERGY_THRESHOLD: f32 = 0.03;

/// Segmentation limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmenterConfig {
    pub energy_threshold: f32,
    /// Quiet time that ends an answer
    pub silence: Duration,
    /// An answer is never cut shorter than this
    pub min_speech: Duration,
    /// Hard cap on answer length
    pub max_duration: Duration,
    /// How long to wait for the first word before giving up
    pub lead_in: Duration,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            energy_threshold: ENERGY_THRESHOLD,
            silence: Duration::from_secs(3),
            min_speech: Duration::from_secs(1),
            max_duration: Duration::from_secs(480),
            lead_in: Duration::from_secs(10),
        }
    }
}

/// Where the segmenter is within an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    /// Nothing above the threshold yet
    Waiting,
    /// Speech heard; waiting for it to end
    Speaking,
    /// Answer finished
    Complete,
}

/// Why an answer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEnd {
    /// Speech followed by enough silence
    Silence,
    /// Ran into the maximum duration
    MaxDuration,
    /// No speech before the lead-in ran out
    NoSpeech,
}

/// Accumulates an answer and decides when it is over
pub struct UtteranceSegmenter {
    config: SegmenterConfig,
    sample_rate: u32,
    state: SegmentState,
    end: Option<SegmentEnd>,
    samples: Vec<f32>,
    silent_run: usize,
    voiced: usize,
}

impl UtteranceSegmenter {
    #[must_use]
    pub const fn new(config: SegmenterConfig) -> Self {
        Self::with_sample_rate(config, SAMPLE_RATE)
    }

    #[must_use]
    pub const fn with_sample_rate(config: SegmenterConfig, sample_rate: u32) -> Self {
        Self {
            config,
            sample_rate,
            state: SegmentState::Waiting,
            end: None,
            samples: Vec::new(),
            silent_run: 0,
            voiced: 0,
        }
    }

    /// Feed a chunk of samples, returning `true` once the answer is over
    pub fn push(&mut self, chunk: &[f32]) -> bool {
        if self.state == SegmentState::Complete {
            return true;
        }

        let energy = calculate_energy(chunk);
        let loud = energy > self.config.energy_threshold;
        self.samples.extend_from_slice(chunk);

        if loud {
            self.voiced += chunk.len();
            self.silent_run = 0;
            if self.state == SegmentState::Waiting {
                tracing::debug!(energy, "speech started");
                self.state = SegmentState::Speaking;
            }
        } else {
            self.silent_run += chunk.len();
        }

        let total = self.samples.len();
        let end = if total >= self.samples_for(self.config.max_duration) {
            Some(SegmentEnd::MaxDuration)
        } else {
            match self.state {
                SegmentState::Waiting if total >= self.samples_for(self.config.lead_in) => {
                    Some(SegmentEnd::NoSpeech)
                }
                SegmentState::Speaking
                    if self.silent_run >= self.samples_for(self.config.silence)
                        && total >= self.samples_for(self.config.min_speech) =>
                {
                    Some(SegmentEnd::Silence)
                }
                _ => None,
            }
        };

        if let Some(end) = end {
            tracing::debug!(?end, samples = total, voiced = self.voiced, "answer segmented");
            self.state = SegmentState::Complete;
            self.end = Some(end);
        }
        self.state == SegmentState::Complete
    }

    #[must_use]
    pub const fn state(&self) -> SegmentState {
        self.state
    }

    /// Why the answer ended, once it has
    #[must_use]
    pub const fn end(&self) -> Option<SegmentEnd> {
        self.end
    }

    /// Whether anything above the threshold was heard
    #[must_use]
    pub const fn heard_speech(&self) -> bool {
        self.voiced > 0
    }

    /// Take the recorded answer, leaving the segmenter ready for another
    pub fn take(&mut self) -> Vec<f32> {
        self.state = SegmentState::Waiting;
        self.end = None;
        self.silent_run = 0;
        self.voiced = 0;
        std::mem::take(&mut self.samples)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn samples_for(&self, duration: Duration) -> usize {
        (duration.as_secs_f64() * f64::from(self.sample_rate)) as usize
    }
}

/// RMS energy of a chunk
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f32 = samples.iter().map(|s| s * s).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum / samples.len() as f32;
    mean.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 100;

    fn segmenter() -> UtteranceSegmenter {
        UtteranceSegmenter::with_sample_rate(SegmenterConfig::default(), RATE)
    }

    #[test]
    fn test_energy_calculation() {
        assert!(calculate_energy(&[0.0; 100]) < 0.001);
        assert!(calculate_energy(&[0.5; 100]) > 0.4);
        assert!(calculate_energy(&[]).abs() < f32::EPSILON);
    }

    #[test]
    fn answer_ends_after_silence_following_speech() {
        let mut seg = segmenter();
        // Two seconds of speech
        assert!(!seg.push(&[0.2; 200]));
        assert_eq!(seg.state(), SegmentState::Speaking);
        // Two seconds of quiet is not enough
        assert!(!seg.push(&[0.0; 200]));
        assert!(seg.push(&[0.0; 100]));
        assert_eq!(seg.end(), Some(SegmentEnd::Silence));

        let samples = seg.take();
        assert_eq!(samples.len(), 500);
        assert_eq!(seg.state(), SegmentState::Waiting);
    }

    #[test]
    fn pause_mid_answer_does_not_end_it() {
        let mut seg = segmenter();
        seg.push(&[0.2; 100]);
        seg.push(&[0.0; 250]);
        assert!(!seg.push(&[0.2; 100]));
        assert!(!seg.push(&[0.0; 250]));
    }

    #[test]
    fn silence_alone_waits_for_lead_in() {
        let mut seg = segmenter();
        assert!(!seg.push(&[0.0; 500]));
        assert!(seg.push(&[0.0; 500]));
        assert_eq!(seg.end(), Some(SegmentEnd::NoSpeech));
        assert!(!seg.heard_speech());
    }

    #[test]
    fn long_answers_are_capped() {
        let config = SegmenterConfig {
            max_duration: Duration::from_secs(5),
            ..SegmenterConfig::default()
        };
        let mut seg = UtteranceSegmenter::with_sample_rate(config, RATE);
        assert!(!seg.push(&[0.3; 400]));
        assert!(seg.push(&[0.3; 100]));
        assert_eq!(seg.end(), Some(SegmentEnd::MaxDuration));
    }
}

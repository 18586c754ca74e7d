//! Voice pipeline integration tests
//!
//! Tests voice components without requiring audio hardware

use std::time::Duration;

use cadence_interview::voice::{
    SAMPLE_RATE, SegmentEnd, SegmentState, SegmenterConfig, UtteranceSegmenter, load_wav,
    samples_to_wav, save_wav,
};
use cadence_interview::{WillingnessEstimator, WillingnessTier};

mod common;

/// 100 ms of audio, the size the listener drains per poll
const CHUNK: usize = SAMPLE_RATE as usize / 10;

/// Generate sine wave audio samples
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn generate_sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Feed audio in listener-sized chunks until the segmenter finishes
fn feed(segmenter: &mut UtteranceSegmenter, audio: &[f32]) -> bool {
    audio.chunks(CHUNK).any(|chunk| segmenter.push(chunk))
}

#[test]
fn test_answer_ends_after_trailing_silence() {
    let mut segmenter = UtteranceSegmenter::new(SegmenterConfig::default());

    assert!(!feed(&mut segmenter, &common::silence(1.0)));
    assert_eq!(segmenter.state(), SegmentState::Waiting);

    assert!(!feed(&mut segmenter, &generate_sine_samples(220.0, 2.0, 0.4)));
    assert_eq!(segmenter.state(), SegmentState::Speaking);
    assert!(segmenter.heard_speech());

    // A short pause is not the end
    assert!(!feed(&mut segmenter, &common::silence(1.5)));
    assert!(!feed(&mut segmenter, &generate_sine_samples(220.0, 1.0, 0.4)));

    assert!(feed(&mut segmenter, &common::silence(3.5)));
    assert_eq!(segmenter.end(), Some(SegmentEnd::Silence));

    let recorded = segmenter.take();
    assert!(recorded.len() >= SAMPLE_RATE as usize * 8);
    assert_eq!(segmenter.state(), SegmentState::Waiting);
    assert_eq!(segmenter.end(), None);
    assert!(!segmenter.heard_speech());
}

#[test]
fn test_no_speech_gives_up_after_lead_in() {
    let config = SegmenterConfig {
        lead_in: Duration::from_secs(2),
        ..SegmenterConfig::default()
    };
    let mut segmenter = UtteranceSegmenter::new(config);

    assert!(feed(&mut segmenter, &common::silence(3.0)));
    assert_eq!(segmenter.end(), Some(SegmentEnd::NoSpeech));
    assert!(!segmenter.heard_speech());
}

#[test]
fn test_long_answer_is_capped() {
    let config = SegmenterConfig {
        max_duration: Duration::from_secs(2),
        ..SegmenterConfig::default()
    };
    let mut segmenter = UtteranceSegmenter::new(config);

    assert!(feed(&mut segmenter, &generate_sine_samples(330.0, 5.0, 0.5)));
    assert_eq!(segmenter.end(), Some(SegmentEnd::MaxDuration));
    assert_eq!(segmenter.take().len(), SAMPLE_RATE as usize * 2);
}

#[test]
fn test_quiet_noise_is_not_speech() {
    let mut segmenter = UtteranceSegmenter::new(SegmenterConfig::default());

    feed(&mut segmenter, &generate_sine_samples(440.0, 2.0, 0.01));
    assert_eq!(segmenter.state(), SegmentState::Waiting);
}

#[test]
fn test_willingness_from_audio() {
    let estimator = WillingnessEstimator::default();

    let engaged = estimator.estimate(&common::loud_tone(5.0), SAMPLE_RATE);
    assert_eq!(engaged.tier, WillingnessTier::High);

    let withdrawn = estimator.estimate(&common::silence(5.0), SAMPLE_RATE);
    assert_eq!(withdrawn.tier, WillingnessTier::Low);
    assert!(withdrawn.score < engaged.score);

    let empty = estimator.estimate(&[], SAMPLE_RATE);
    assert_eq!(empty.tier, WillingnessTier::Low);
    assert!(empty.score.abs() < f64::EPSILON);
}

#[test]
fn test_corrupt_audio_scores_neutral() {
    let estimator = WillingnessEstimator::default();
    let mut samples = common::loud_tone(1.0);
    samples[100] = f32::NAN;

    let estimate = estimator.estimate(&samples, SAMPLE_RATE);
    assert_eq!(estimate.tier, WillingnessTier::Medium);
    assert!(estimate.score.is_finite());
}

#[test]
fn test_saved_answer_scores_the_same() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ada").join("answer.wav");
    let samples = common::loud_tone(3.0);

    save_wav(&path, &samples, SAMPLE_RATE).unwrap();
    let (loaded, rate) = load_wav(&path).unwrap();

    assert_eq!(rate, SAMPLE_RATE);
    assert_eq!(loaded.len(), samples.len());

    let estimator = WillingnessEstimator::default();
    let before = estimator.estimate(&samples, SAMPLE_RATE);
    let after = estimator.estimate(&loaded, rate);
    assert_eq!(before.tier, after.tier);
    assert!((before.score - after.score).abs() < 1.0);
}

#[test]
fn test_wav_encoding_header() {
    let samples = generate_sine_samples(440.0, 0.1, 0.5);
    let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(&wav[8..12], b"WAVE");
    assert_eq!(wav.len(), 44 + samples.len() * 2);
}

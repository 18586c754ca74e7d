//! Speaker output for synthesized prompts

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Rate MP3 prompts are resampled to before playback
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Extra time allowed past the nominal clip length
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Plays mono clips on an output device
pub struct AudioPlayback {
    device_name: Option<String>,
    config: StreamConfig,
}

impl AudioPlayback {
    /// Open the default output device
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        Self::open(None)
    }

    /// Open an output device by name, or the default when `None`
    ///
    /// # Errors
    ///
    /// Returns error if the device is missing or has no usable config
    pub fn open(device_name: Option<&str>) -> Result<Self> {
        let device = find_output_device(device_name)?;
        let rate = SampleRate(PLAYBACK_SAMPLE_RATE);

        let mut configs: Vec<_> = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .filter(|c| c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
            .collect();
        configs.sort_by_key(cpal::SupportedStreamConfigRange::channels);

        let config = configs
            .into_iter()
            .next()
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?
            .with_sample_rate(rate)
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "audio playback initialized"
        );

        Ok(Self {
            device_name: device_name.map(str::to_string),
            config,
        })
    }

    /// Play MP3 bytes, returning when the clip first became audible
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    pub async fn play_mp3(&self, mp3_data: Vec<u8>) -> Result<DateTime<Utc>> {
        let (samples, rate) = decode_mp3(&mp3_data)?;
        let samples = resample(&samples, rate, PLAYBACK_SAMPLE_RATE);
        self.play(samples).await
    }

    /// Play samples at the playback rate, returning when they became audible
    ///
    /// # Errors
    ///
    /// Returns error if the output stream fails
    pub async fn play(&self, samples: Vec<f32>) -> Result<DateTime<Utc>> {
        let device_name = self.device_name.clone();
        let config = self.config.clone();
        let (started_tx, started_rx) = mpsc::channel();

        let task = tokio::task::spawn_blocking(move || {
            play_blocking(device_name.as_deref(), &config, samples, &started_tx)
        });
        task.await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))??;

        // Fall back to now when the clip was empty and never started
        Ok(started_rx.try_recv().unwrap_or_else(|_| Utc::now()))
    }
}

fn find_output_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    match name {
        Some(name) => host
            .output_devices()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|d| d.name().is_ok_and(|n| n == name))
            .ok_or_else(|| Error::Audio(format!("output device not found: {name}"))),
        None => host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string())),
    }
}

fn play_blocking(
    device_name: Option<&str>,
    config: &StreamConfig,
    samples: Vec<f32>,
    started_tx: &mpsc::Sender<DateTime<Utc>>,
) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }

    let device = find_output_device(device_name)?;
    let channels = usize::from(config.channels.max(1));
    let total = samples.len();

    let samples = Arc::new(samples);
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream = {
        let samples = Arc::clone(&samples);
        let position = Arc::clone(&position);
        let finished = Arc::clone(&finished);
        device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position.load(Ordering::Relaxed);
                    for frame in data.chunks_mut(channels) {
                        let sample = samples.get(pos).copied().unwrap_or(0.0);
                        frame.fill(sample);
                        if pos < samples.len() {
                            pos += 1;
                        }
                    }
                    position.store(pos, Ordering::Relaxed);
                    if pos >= samples.len() {
                        finished.store(true, Ordering::Release);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?
    };

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;
    let _ = started_tx.send(Utc::now());

    let nominal = Duration::from_millis(total as u64 * 1000 / u64::from(PLAYBACK_SAMPLE_RATE));
    let deadline = std::time::Instant::now() + nominal + DRAIN_GRACE;

    while !finished.load(Ordering::Acquire) {
        if std::time::Instant::now() > deadline {
            tracing::warn!(samples = total, "playback did not drain in time");
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    // Let the device flush its last buffer
    std::thread::sleep(Duration::from_millis(100));
    drop(stream);

    tracing::debug!(samples = total, "playback complete");
    Ok(())
}

/// Decode MP3 bytes to mono samples and their sample rate
///
/// # Errors
///
/// Returns error if the data is not valid MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut rate = PLAYBACK_SAMPLE_RATE;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                rate = u32::try_from(frame.sample_rate).unwrap_or(PLAYBACK_SAMPLE_RATE);
                let channels = frame.channels.max(1);
                samples.extend(frame.data.chunks(channels).map(|chunk| {
                    let sum: f32 = chunk.iter().map(|&s| f32::from(s) / 32768.0).sum();
                    #[allow(clippy::cast_precision_loss)]
                    {
                        sum / chunk.len() as f32
                    }
                }));
            }
            // ID3 tags and padding ahead of the first frame
            Err(minimp3::Error::SkippedData) => {}
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok((samples, rate))
}

/// Linear resampling between rates
#[must_use]
pub fn resample(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || from == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = f64::from(from) / f64::from(to);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let out_len = (samples.len() as f64 / ratio).round() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let src = i as f64 * ratio;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let idx = (src.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            #[allow(clippy::cast_possible_truncation)]
            let frac = (src - src.floor()) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resample_changes_length_by_ratio() {
        let input = vec![0.0; 16000];
        assert_eq!(resample(&input, 16000, 24000).len(), 24000);
        assert_eq!(resample(&input, 24000, 24000).len(), 16000);
    }

    #[test]
    fn resample_interpolates() {
        let out = resample(&[0.0, 1.0], 1, 2);
        assert_eq!(out.len(), 4);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn empty_input_decodes_to_nothing() {
        let (samples, rate) = decode_mp3(&[]).unwrap();
        assert!(samples.is_empty());
        assert_eq!(rate, PLAYBACK_SAMPLE_RATE);
    }
}

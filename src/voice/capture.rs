//! Microphone capture

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, mpsc};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, Stream, StreamConfig};

use crate::{Error, Result};

/// Sample rate answers are recorded at
pub const SAMPLE_RATE: u32 = 16000;

/// Records mono samples from an input device into a shared buffer
///
/// The input stream runs on its own thread so the capture handle can move
/// between tasks.
pub struct AudioCapture {
    device_name: Option<String>,
    config: StreamConfig,
    worker: Option<Worker>,
    buffer: Arc<Mutex<Vec<f32>>>,
}

struct Worker {
    stop_tx: mpsc::Sender<()>,
    handle: std::thread::JoinHandle<()>,
}

impl AudioCapture {
    /// Open the default input device
    ///
    /// # Errors
    ///
    /// Returns error if no input device supports 16 kHz capture
    pub fn new() -> Result<Self> {
        Self::open(None)
    }

    /// Open an input device by name, or the default when `None`
    ///
    /// # Errors
    ///
    /// Returns error if the device is missing or has no usable config
    pub fn open(device_name: Option<&str>) -> Result<Self> {
        let device = find_input_device(device_name)?;

        let rate = SampleRate(SAMPLE_RATE);
        let mut configs: Vec<_> = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .filter(|c| c.min_sample_rate() <= rate && c.max_sample_rate() >= rate)
            .collect();
        // Mono first, otherwise the narrowest layout; frames are downmixed
        configs.sort_by_key(cpal::SupportedStreamConfigRange::channels);

        let config = configs
            .into_iter()
            .next()
            .ok_or_else(|| Error::Audio("no 16 kHz input config found".to_string()))?
            .with_sample_rate(rate)
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device_name: device_name.map(str::to_string),
            config,
            worker: None,
            buffer: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Start recording into the buffer
    ///
    /// # Errors
    ///
    /// Returns error if the input stream cannot be started
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        let buffer = Arc::clone(&self.buffer);
        let config = self.config.clone();
        let device_name = self.device_name.clone();
        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                let stream = match build_stream(device_name.as_deref(), &config, buffer) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Hold the stream open until stopped or the handle is dropped
                let _ = stop_rx.recv();
                drop(stream);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => return Err(Error::Audio("capture thread exited".to_string())),
        }

        self.worker = Some(Worker { stop_tx, handle });
        tracing::debug!("audio capture started");
        Ok(())
    }

    /// Stop recording; buffered samples are kept
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.handle.join();
            tracing::debug!("audio capture stopped");
        }
    }

    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.worker.is_some()
    }

    /// Take everything recorded since the last take
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        std::mem::take(&mut *self.lock())
    }

    /// Discard buffered samples
    pub fn clear_buffer(&self) {
        self.lock().clear();
    }

    /// Number of buffered samples
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<f32>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn find_input_device(name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();
    match name {
        Some(name) => host
            .input_devices()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|d| d.name().is_ok_and(|n| n == name))
            .ok_or_else(|| Error::Audio(format!("input device not found: {name}"))),
        None => host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string())),
    }
}

fn build_stream(
    device_name: Option<&str>,
    config: &StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
) -> Result<Stream> {
    let device = find_input_device(device_name)?;
    let channels = usize::from(config.channels.max(1));

    let stream = device
        .build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mut buf = buffer.lock().unwrap_or_else(PoisonError::into_inner);
                if channels == 1 {
                    buf.extend_from_slice(data);
                } else {
                    buf.extend(downmix(data, channels));
                }
            },
            |err| {
                tracing::error!(error = %err, "audio capture error");
            },
            None,
        )
        .map_err(|e| Error::Audio(e.to_string()))?;

    stream.play().map_err(|e| Error::Audio(e.to_string()))?;
    Ok(stream)
}

/// Average interleaved frames down to one channel
fn downmix(data: &[f32], channels: usize) -> impl Iterator<Item = f32> + '_ {
    #[allow(clippy::cast_precision_loss)]
    let scale = 1.0 / channels as f32;
    data.chunks(channels)
        .map(move |frame| frame.iter().sum::<f32>() * scale)
}

fn wav_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Encode mono samples as 16-bit PCM WAV bytes
///
/// # Errors
///
/// Returns error if encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, wav_spec(sample_rate))
            .map_err(|e| Error::Audio(e.to_string()))?;
        for &sample in samples {
            writer
                .write_sample(to_i16(sample))
                .map_err(|e| Error::Audio(e.to_string()))?;
        }
        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

/// Write mono samples to a WAV file, creating parent directories
///
/// # Errors
///
/// Returns error if the file cannot be written
pub fn save_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer =
        hound::WavWriter::create(path, wav_spec(sample_rate)).map_err(|e| Error::Audio(e.to_string()))?;
    for &sample in samples {
        writer
            .write_sample(to_i16(sample))
            .map_err(|e| Error::Audio(e.to_string()))?;
    }
    writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
    Ok(())
}

/// Read a WAV file as mono f32 samples and its sample rate
///
/// # Errors
///
/// Returns error if the file is missing or not PCM WAV
pub fn load_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let reader = hound::WavReader::open(path).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Audio(e.to_string()))?,
        hound::SampleFormat::Int => {
            #[allow(clippy::cast_precision_loss)]
            let full_scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::Audio(e.to_string()))?
        }
    };

    let samples = if channels == 1 {
        interleaved
    } else {
        downmix(&interleaved, channels).collect()
    };
    Ok((samples, spec.sample_rate))
}

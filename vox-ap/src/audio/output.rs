//! Audio output using cpal
//!
//! Manages the output device and host-driven callback. The device
//! callback hands the engine a mono quantum to fill, then fans the
//! result out to however many channels the device wants, applying the
//! master volume on the way.
//!
//! The render closure runs on the real-time audio thread; everything it
//! needs (including the mono scratch buffer) is allocated before the
//! stream starts.

use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat as DeviceSampleFormat;
use cpal::{Device, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Preferred device rate when the hardware offers a choice
const PREFERRED_SAMPLE_RATE: u32 = 48_000;

/// Mono scratch capacity in frames; device quanta larger than this are
/// rendered in chunks
const SCRATCH_FRAMES: usize = 8_192;

/// Per-quantum render callback: fill the mono slice, return keep-alive.
pub type RenderFn = dyn FnMut(&mut [f32]) -> bool + Send;

/// Audio output manager using cpal.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: DeviceSampleFormat,
    stream: Option<Stream>,

    /// Master volume as f32 bits; atomic so the control side never
    /// contends with the audio callback
    volume_bits: Arc<AtomicU32>,

    /// Set by the stream error callback
    error_flag: Arc<AtomicBool>,
}

impl AudioOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device.
    ///
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    ///
    /// If the requested device is missing, falls back to the default
    /// device rather than failing.
    pub fn new(device_name: Option<String>) -> Result<Self> {
        let host = cpal::default_host();

        let device = if let Some(name) = device_name.as_ref() {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

            match devices.find(|d| d.name().ok().as_ref() == Some(name)) {
                Some(dev) => {
                    info!("Found requested audio device: {}", name);
                    dev
                }
                None => {
                    warn!(
                        "Requested device '{}' not found, falling back to default device",
                        name
                    );
                    host.default_output_device().ok_or_else(|| {
                        Error::AudioOutput(format!(
                            "Device '{}' not found and no default device available",
                            name
                        ))
                    })?
                }
            }
        } else {
            host.default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?
        };

        let (config, sample_format) = Self::get_best_config(&device)?;

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}",
            config.sample_rate.0, config.channels, sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            volume_bits: Arc::new(AtomicU32::new(1.0_f32.to_bits())),
            error_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get the best supported configuration for playback.
    ///
    /// Prefers f32 output at 48 kHz; falls back to the device default.
    /// The engine resamples to whatever rate ends up selected.
    fn get_best_config(device: &Device) -> Result<(StreamConfig, DeviceSampleFormat)> {
        let mut supported_configs = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported_configs.find(|config| {
            config.sample_format() == DeviceSampleFormat::F32
                && config.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
                && config.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
        });

        if let Some(supported_config) = preferred {
            let sample_format = supported_config.sample_format();
            let config = supported_config
                .with_sample_rate(cpal::SampleRate(PREFERRED_SAMPLE_RATE))
                .config();
            return Ok((config, sample_format));
        }

        // Fallback: use default config
        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        let sample_format = supported_config.sample_format();
        let config = supported_config.config();
        Ok((config, sample_format))
    }

    /// Start playback with a per-quantum render callback.
    ///
    /// The callback fills a mono slice each invocation; output is
    /// duplicated to every device channel. It runs on the real-time
    /// audio thread, so it must not block or allocate.
    pub fn start<F>(&mut self, render: F) -> Result<()>
    where
        F: FnMut(&mut [f32]) -> bool + Send + 'static,
    {
        info!("Starting audio stream");

        let render: Arc<Mutex<RenderFn>> = Arc::new(Mutex::new(render));

        let stream = match self.sample_format {
            DeviceSampleFormat::F32 => self.build_stream_f32(render)?,
            DeviceSampleFormat::I16 => self.build_stream_i16(render)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);

        info!("Audio stream started successfully");
        Ok(())
    }

    /// Build audio stream for f32 device samples
    fn build_stream_f32(&self, render: Arc<Mutex<RenderFn>>) -> Result<Stream> {
        let channels = self.config.channels as usize;
        let volume_bits = Arc::clone(&self.volume_bits);
        let error_flag = Arc::clone(&self.error_flag);
        let mut scratch = vec![0.0_f32; SCRATCH_FRAMES];

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut render = render.lock().unwrap();
                    let volume = f32::from_bits(volume_bits.load(Ordering::Relaxed));

                    for block in data.chunks_mut(channels * SCRATCH_FRAMES) {
                        let frames = block.len() / channels;
                        let quantum = &mut scratch[..frames];
                        render(quantum);

                        for (frame, &sample) in
                            block.chunks_mut(channels).zip(quantum.iter())
                        {
                            let sample = (sample * volume).clamp(-1.0, 1.0);
                            for out in frame.iter_mut() {
                                *out = sample;
                            }
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                },
                None, // No timeout
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))?;

        Ok(stream)
    }

    /// Build audio stream for i16 device samples
    fn build_stream_i16(&self, render: Arc<Mutex<RenderFn>>) -> Result<Stream> {
        let channels = self.config.channels as usize;
        let volume_bits = Arc::clone(&self.volume_bits);
        let error_flag = Arc::clone(&self.error_flag);
        let mut scratch = vec![0.0_f32; SCRATCH_FRAMES];

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    let mut render = render.lock().unwrap();
                    let volume = f32::from_bits(volume_bits.load(Ordering::Relaxed));

                    for block in data.chunks_mut(channels * SCRATCH_FRAMES) {
                        let frames = block.len() / channels;
                        let quantum = &mut scratch[..frames];
                        render(quantum);

                        for (frame, &sample) in
                            block.chunks_mut(channels).zip(quantum.iter())
                        {
                            let sample = (sample * volume).clamp(-1.0, 1.0);
                            let value = (sample * i16::MAX as f32) as i16;
                            for out in frame.iter_mut() {
                                *out = value;
                            }
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))?;

        Ok(stream)
    }

    /// Stop audio playback.
    pub fn stop(&mut self) -> Result<()> {
        info!("Stopping audio stream");

        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
            drop(stream);
        }

        Ok(())
    }

    /// Set output volume (0.0 = silent, 1.0 = full), clamped.
    pub fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        self.volume_bits.store(clamped.to_bits(), Ordering::Relaxed);
        debug!("Volume set to {:.2}", clamped);
    }

    /// Get current volume.
    pub fn get_volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    /// Get device name.
    pub fn device_name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "Unknown".to_string())
    }

    /// Get sample rate the device was opened at.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Get channel count.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Check if the stream error callback has fired.
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        // Ensure stream is stopped on drop
        let _ = self.stop();
    }
}

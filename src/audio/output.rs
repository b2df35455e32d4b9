// Host audio output (C5, "Host audio output") - cpal-backed ring
// buffer sink for interleaved 16-bit stereo samples.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::sync::{Arc, Mutex};

use super::resampler::AudioBuffer;

/// Host audio output configuration.
#[derive(Clone)]
pub struct AudioConfig {
    /// Sample rate in Hz (44100 or 48000).
    pub sample_rate: u32,
    /// Number of channels (2 = stereo; the frame engine always mixes
 /// stereo).
    pub channels: u16,
    /// Buffer size in milliseconds (affects latency).
    pub buffer_duration_ms: u32,
}

impl AudioConfig {
    pub fn new() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            buffer_duration_ms: 50,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_buffer_duration(mut self, duration_ms: u32) -> Self {
        self.buffer_duration_ms = duration_ms;
        self
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Host audio output handle; owns the cpal device/stream and the shared
/// ring buffer the frame engine's mixer pushes into.
pub struct AudioOutput {
    config: AudioConfig,
    _device: Device,
    stream: Stream,
    buffer: Arc<Mutex<AudioBuffer>>,
}

impl AudioOutput {
    pub fn new(config: AudioConfig) -> Result<Self, String> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or("No output device available")?;

        println!("Audio device: {}", device.name().unwrap_or_default());

        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let buffer_capacity = ((config.buffer_duration_ms as f64 / 1000.0)
            * config.sample_rate as f64) as usize
            * config.channels as usize;
        let buffer = Arc::new(Mutex::new(AudioBuffer::new(buffer_capacity)));

        let buffer_clone = Arc::clone(&buffer);

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    let mut buf = buffer_clone.lock().unwrap();
                    for sample in data.iter_mut() {
                        *sample = buf.pop().unwrap_or(0);
                    }
                },
                move |err| {
                    eprintln!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| format!("Failed to build audio stream: {}", e))?;

        stream
            .play()
            .map_err(|e| format!("Failed to start audio stream: {}", e))?;

        println!(
            "Audio output initialized: {} Hz, {} channel(s)",
            config.sample_rate, config.channels
        );

        Ok(Self {
            config,
            _device: device,
            stream,
            buffer,
        })
    }

    /// Push one stereo frame into the ring. Returns false if the ring is
 /// full.
    pub fn push_frame(&self, left: i16, right: i16) -> bool {
        let mut buf = self.buffer.lock().unwrap();
        buf.push_frame(left, right) == 2
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.lock().unwrap().len()
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer.lock().unwrap().capacity()
    }

    pub fn is_buffer_nearly_full(&self) -> bool {
        let buf = self.buffer.lock().unwrap();
        buf.len() > (buf.capacity() * 9 / 10)
    }

    pub fn clear_buffer(&self) {
        self.buffer.lock().unwrap().clear();
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn pause(&self) -> Result<(), String> {
        self.stream
            .pause()
            .map_err(|e| format!("Failed to pause audio: {}", e))
    }

    pub fn resume(&self) -> Result<(), String> {
        self.stream
            .play()
            .map_err(|e| format!("Failed to resume audio: {}", e))
    }
}

/// Builder for `AudioOutput`.
pub struct AudioOutputBuilder {
    config: AudioConfig,
}

impl AudioOutputBuilder {
    pub fn new() -> Self {
        Self {
            config: AudioConfig::new(),
        }
    }

    pub fn sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.config.channels = channels;
        self
    }

    pub fn buffer_duration(mut self, duration_ms: u32) -> Self {
        self.config.buffer_duration_ms = duration_ms;
        self
    }

    pub fn build(self) -> Result<AudioOutput, String> {
        AudioOutput::new(self.config)
    }
}

impl Default for AudioOutputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

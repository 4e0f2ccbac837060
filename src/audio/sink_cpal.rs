//! Desktop sink backed by a cpal output stream
//!
//! cpal is callback-driven, so the blocking-write contract is implemented
//! with a lock-free SPSC ring between the writer and the device callback:
//! `write` converts to PCM16 and pushes frames, parking briefly whenever the
//! ring is full, while the callback drains it and up-mixes mono to the
//! device channel count. The ring holds two seconds of audio, which is the
//! backpressure window that keeps generation ahead of consumption.

use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::sink::{AudioSink, SinkFactory};
use super::waveform::pcm16_frame;
use crate::error::AudioError;

/// Ring capacity in seconds of mono PCM16
const RING_SECONDS: usize = 2;

/// Writer backoff while the device drains the ring
const WRITE_BACKOFF: Duration = Duration::from_millis(1);

/// Factory for the default output device of the default cpal host
pub struct CpalSinkFactory;

impl CpalSinkFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CpalSinkFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkFactory for CpalSinkFactory {
    fn open(&self, sample_rate: u32) -> Result<Box<dyn AudioSink>, AudioError> {
        Ok(Box::new(CpalSink::open(sample_rate)?))
    }
}

/// Blocking-write sink over a cpal output stream
pub struct CpalSink {
    stream: Option<cpal::Stream>,
    producer: rtrb::Producer<i16>,
    gain: f32,
}

impl CpalSink {
    /// Open the default output device with its default stream config.
    ///
    /// The engine's sample rate sizes the ring; the stream itself keeps the
    /// device's preferred configuration.
    pub fn open(sample_rate: u32) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device =
            host.default_output_device()
                .ok_or_else(|| AudioError::DeviceUnavailable {
                    reason: "no default output device".to_string(),
                })?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("failed to get default output config: {:?}", e),
            })?;

        let stream_config: cpal::StreamConfig = config.clone().into();
        let channels = stream_config.channels.max(1) as usize;

        let (producer, mut consumer) =
            rtrb::RingBuffer::<i16>::new(sample_rate as usize * RING_SECONDS);

        let err_fn = |err| log::warn!("Output stream error: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        // Underrun plays silence rather than stale frames
                        let value = consumer.pop().map(|v| v as f32 / 32_768.0).unwrap_or(0.0);
                        for sample in frame.iter_mut() {
                            *sample = value;
                        }
                    }
                },
                err_fn,
                None,
            ),
            cpal::SampleFormat::I16 => device.build_output_stream(
                &stream_config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let value = consumer.pop().unwrap_or(0);
                        for sample in frame.iter_mut() {
                            *sample = value;
                        }
                    }
                },
                err_fn,
                None,
            ),
            other => {
                return Err(AudioError::StreamOpenFailed {
                    reason: format!("unsupported device sample format {:?}", other),
                })
            }
        }
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

        Ok(Self {
            stream: Some(stream),
            producer,
            gain: 1.0,
        })
    }
}

impl AudioSink for CpalSink {
    fn start(&mut self) -> Result<(), AudioError> {
        match &self.stream {
            Some(stream) => stream.play().map_err(|e| AudioError::HardwareError {
                details: format!("failed to start output stream: {}", e),
            }),
            None => Err(AudioError::StreamFailure {
                reason: "sink already closed".to_string(),
            }),
        }
    }

    fn set_volume(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        for &sample in samples {
            let mut frame = pcm16_frame(sample, self.gain);
            loop {
                match self.producer.push(frame) {
                    Ok(()) => break,
                    Err(rtrb::PushError::Full(rejected)) => {
                        if self.producer.is_abandoned() {
                            return Err(AudioError::StreamFailure {
                                reason: "device callback gone".to_string(),
                            });
                        }
                        frame = rejected;
                        thread::sleep(WRITE_BACKOFF);
                    }
                }
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            log::debug!("cpal sink closed");
        }
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        self.close();
    }
}

//! Android sink backed by a synchronous Oboe output stream
//!
//! Oboe's synchronous streams already provide the blocking-write contract:
//! `write` hands PCM16 frames to AAudio/OpenSL ES and returns once the
//! device has buffered them, so no intermediate ring is needed here.

use oboe::{
    AudioOutputStreamSync, AudioStream, AudioStreamBuilder, AudioStreamSync, Mono, Output,
    PerformanceMode, SharingMode,
};

use super::sink::{AudioSink, SinkFactory};
use super::waveform::pcm16_frame;
use crate::error::AudioError;

/// Per-write timeout; generous compared to the one-second default cycle
const WRITE_TIMEOUT_NANOS: i64 = 2_000_000_000;

/// Factory for the device's low-latency mono output stream
pub struct OboeSinkFactory;

impl OboeSinkFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OboeSinkFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkFactory for OboeSinkFactory {
    fn open(&self, sample_rate: u32) -> Result<Box<dyn AudioSink>, AudioError> {
        Ok(Box::new(OboeSink::open(sample_rate)?))
    }
}

/// Blocking-write sink over a synchronous Oboe output stream
pub struct OboeSink {
    stream: Option<AudioStreamSync<Output, (i16, Mono)>>,
    gain: f32,
    scratch: Vec<i16>,
}

impl OboeSink {
    pub fn open(sample_rate: u32) -> Result<Self, AudioError> {
        let stream = AudioStreamBuilder::default()
            .set_performance_mode(PerformanceMode::LowLatency)
            .set_sharing_mode(SharingMode::Exclusive)
            .set_direction::<Output>()
            .set_sample_rate(sample_rate as i32)
            .set_channel_count::<Mono>()
            .set_format::<i16>()
            .open_stream()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("output stream: {:?}", e),
            })?;

        Ok(Self {
            stream: Some(stream),
            gain: 1.0,
            scratch: Vec::new(),
        })
    }
}

impl AudioSink for OboeSink {
    fn start(&mut self) -> Result<(), AudioError> {
        match self.stream.as_mut() {
            Some(stream) => stream.start().map_err(|e| AudioError::HardwareError {
                details: format!("failed to start output stream: {:?}", e),
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
        let stream = self.stream.as_mut().ok_or_else(|| AudioError::StreamFailure {
            reason: "sink already closed".to_string(),
        })?;

        self.scratch.clear();
        self.scratch
            .extend(samples.iter().map(|&s| pcm16_frame(s, self.gain)));

        let mut written = 0usize;
        while written < self.scratch.len() {
            let frames = stream
                .write(
                    &self.scratch[written..],
                    (self.scratch.len() - written) as i32,
                    WRITE_TIMEOUT_NANOS,
                )
                .map_err(|e| AudioError::StreamFailure {
                    reason: format!("{:?}", e),
                })?;
            written += frames.max(0) as usize;
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                log::warn!("Failed to stop oboe stream on close: {:?}", e);
            }
            log::debug!("oboe sink closed");
        }
    }
}

impl Drop for OboeSink {
    fn drop(&mut self) {
        self.close();
    }
}

//! Streaming audio sink abstraction
//!
//! A sink owns one mono output stream on the platform audio device. The
//! pattern sequencer pushes one generated cycle at a time through `write`,
//! which converts float samples to device PCM and blocks until the device
//! has accepted the data - that backpressure is the engine's only flow
//! control, keeping generation exactly one device buffer ahead.
//!
//! Sinks are opened by the playback thread itself via a `SinkFactory` and
//! never cross threads; device acquisition and release are scoped exactly to
//! the play/stop lifecycle.

use std::sync::Arc;

use crate::error::AudioError;

/// One open, mono, streaming output device.
///
/// `close` is idempotent and must never fail; every other operation reports
/// device trouble as an `AudioError` which the playback loop logs and
/// swallows (playback degrades to stopped-silent rather than crashing).
pub trait AudioSink {
    /// Begin device playback
    fn start(&mut self) -> Result<(), AudioError>;

    /// Set the output gain, clamped to [0.0, 1.0], applied to subsequent
    /// writes before the samples reach the device
    fn set_volume(&mut self, gain: f32);

    /// Convert to 16-bit PCM and stream to the device, blocking until the
    /// device accepts the data
    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError>;

    /// Stop and release the device; safe to call repeatedly or out of order
    fn close(&mut self);
}

/// Opens sinks on behalf of the playback thread.
///
/// The factory crosses into the audio thread (hence `Send + Sync`); the sink
/// it opens stays on that thread for its whole life.
pub trait SinkFactory: Send + Sync {
    fn open(&self, sample_rate: u32) -> Result<Box<dyn AudioSink>, AudioError>;
}

/// The platform's real device sink factory: cpal on desktop, oboe on Android.
pub fn default_sink_factory() -> Arc<dyn SinkFactory> {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "android")] {
            Arc::new(super::sink_oboe::OboeSinkFactory::new())
        } else {
            Arc::new(super::sink_cpal::CpalSinkFactory::new())
        }
    }
}

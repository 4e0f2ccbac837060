//! In-memory sink for device-free testing
//!
//! This module provides a sink implementation with the same contract as the
//! real device backends but no hardware access, so the full engine can run
//! under `cargo test` on any machine. A shared `SinkProbe` records lifecycle
//! events (opens, closes, cycles, the last written PCM) for assertions, and
//! optional pacing emulates device backpressure.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use super::sink::{AudioSink, SinkFactory};
use super::waveform::pcm16_frame;
use crate::error::AudioError;

/// Observation point shared between a `MemorySinkFactory`, the sinks it
/// opens, and the test code asserting on them.
#[derive(Default)]
pub struct SinkProbe {
    opens: AtomicUsize,
    closes: AtomicUsize,
    cycles: AtomicUsize,
    started: AtomicBool,
    volume: Mutex<f32>,
    last_cycle: Mutex<Vec<i16>>,
}

impl SinkProbe {
    /// Number of sinks the factory has opened
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of sinks that have been closed
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Number of cycles written across all sinks
    pub fn cycles_written(&self) -> usize {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Whether any sink reached `start()`
    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Gain in effect for the most recent write
    pub fn volume(&self) -> f32 {
        *self.volume.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// PCM frames of the most recently written cycle
    pub fn last_cycle(&self) -> Vec<i16> {
        self.last_cycle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Sink that converts writes to PCM16 and records them on the probe
pub struct MemorySink {
    probe: Arc<SinkProbe>,
    gain: f32,
    pacing: Option<Duration>,
    closed: bool,
}

impl AudioSink for MemorySink {
    fn start(&mut self) -> Result<(), AudioError> {
        self.probe.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn set_volume(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, 1.0);
    }

    fn write(&mut self, samples: &[f32]) -> Result<(), AudioError> {
        if self.closed {
            return Err(AudioError::StreamFailure {
                reason: "sink already closed".to_string(),
            });
        }

        let pcm: Vec<i16> = samples
            .iter()
            .map(|&s| pcm16_frame(s, self.gain))
            .collect();
        *self
            .probe
            .last_cycle
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = pcm;
        *self.probe.volume.lock().unwrap_or_else(|e| e.into_inner()) = self.gain;
        self.probe.cycles.fetch_add(1, Ordering::SeqCst);

        if let Some(pacing) = self.pacing {
            thread::sleep(pacing);
        }
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.probe.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Factory producing `MemorySink`s wired to one shared probe
pub struct MemorySinkFactory {
    probe: Arc<SinkProbe>,
    pacing: Option<Duration>,
    fail_open: bool,
}

impl MemorySinkFactory {
    pub fn new() -> Self {
        Self {
            probe: Arc::new(SinkProbe::default()),
            pacing: None,
            fail_open: false,
        }
    }

    /// Emulate device backpressure: every write blocks for `pacing`
    pub fn with_pacing(pacing: Duration) -> Self {
        Self {
            pacing: Some(pacing),
            ..Self::new()
        }
    }

    /// Factory whose `open` always fails, for device-error paths
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::new()
        }
    }

    pub fn probe(&self) -> Arc<SinkProbe> {
        Arc::clone(&self.probe)
    }
}

impl Default for MemorySinkFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkFactory for MemorySinkFactory {
    fn open(&self, _sample_rate: u32) -> Result<Box<dyn AudioSink>, AudioError> {
        if self.fail_open {
            return Err(AudioError::DeviceUnavailable {
                reason: "memory sink factory configured to fail".to_string(),
            });
        }
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySink {
            probe: Arc::clone(&self.probe),
            gain: 1.0,
            pacing: self.pacing,
            closed: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_writes() {
        let factory = MemorySinkFactory::new();
        let probe = factory.probe();
        let mut sink = factory.open(48_000).unwrap();

        sink.start().unwrap();
        sink.set_volume(1.0);
        sink.write(&[1.0, -1.0, 0.0]).unwrap();

        assert!(probe.started());
        assert_eq!(probe.opens(), 1);
        assert_eq!(probe.cycles_written(), 1);
        assert_eq!(probe.last_cycle(), vec![32_767, -32_767, 0]);
    }

    #[test]
    fn test_memory_sink_close_is_idempotent() {
        let factory = MemorySinkFactory::new();
        let probe = factory.probe();
        let mut sink = factory.open(48_000).unwrap();

        sink.close();
        sink.close();
        drop(sink);

        assert_eq!(probe.closes(), 1);
    }

    #[test]
    fn test_write_after_close_fails() {
        let factory = MemorySinkFactory::new();
        let mut sink = factory.open(48_000).unwrap();

        sink.close();
        assert!(matches!(
            sink.write(&[0.0]),
            Err(AudioError::StreamFailure { .. })
        ));
    }

    #[test]
    fn test_failing_factory() {
        let factory = MemorySinkFactory::failing();
        assert!(matches!(
            factory.open(48_000),
            Err(AudioError::DeviceUnavailable { .. })
        ));
        assert_eq!(factory.probe().opens(), 0);
    }
}

//! Pattern sequencer - the real-time click scheduler
//!
//! This is the core of the engine: a generate/push loop that decides,
//! sample by sample, which role buffer plays at which instant, and keeps the
//! audio sink fed without ever stopping the device across reconfigurations.
//!
//! Architecture:
//! - `SequencerControls`: the atomically-shared control block written by the
//!   configuration facade and read by the audio thread
//! - `PatternState`: the pure walker over tick/silence/pulse counters
//! - `PatternSequencer`: the worker that fills one cycle at a time and
//!   blocks on `AudioSink::write` (device backpressure)
//!
//! Thread safety and the dirty hand-off:
//! - Parameter fields are stored Relaxed; `mark_dirty` stores Release and
//!   the audio loop's `take_dirty` swaps Acquire, so a field written before
//!   the flag is visible to the loop that observes the flag
//! - Derived quantities (silence length, role buffers) are re-read only at a
//!   dirty boundary, so parameters never tear mid-tick
//! - Stopping is cooperative via the `playing` flag, checked every cycle

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use super::sounds::{RoleBuffers, SoundBank};
use super::time_signature::TimeSignature;
use crate::audio::sink::AudioSink;
use crate::config::AudioConfig;
use crate::error::log_audio_error;

/// Shared playback state: written by the facade, read by the audio thread.
///
/// The dirty flag is the only synchronization point; see the module docs for
/// the memory-ordering contract.
pub struct SequencerControls {
    tempo: AtomicU32,
    volume: AtomicU32,
    time_signature: AtomicU32,
    subdivision_enabled: AtomicBool,
    accent_enabled: AtomicBool,
    playing: AtomicBool,
    dirty: AtomicBool,
}

impl SequencerControls {
    pub fn new(tempo: u32, volume: u32, time_signature: TimeSignature) -> Self {
        Self {
            tempo: AtomicU32::new(tempo),
            volume: AtomicU32::new(volume),
            time_signature: AtomicU32::new(time_signature.pack()),
            subdivision_enabled: AtomicBool::new(false),
            accent_enabled: AtomicBool::new(true),
            playing: AtomicBool::new(false),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn set_tempo(&self, bpm: u32) {
        self.tempo.store(bpm, Ordering::Relaxed);
    }

    pub fn tempo(&self) -> u32 {
        self.tempo.load(Ordering::Relaxed)
    }

    pub fn set_volume(&self, percent: u32) {
        self.volume.store(percent, Ordering::Relaxed);
    }

    pub fn volume(&self) -> u32 {
        self.volume.load(Ordering::Relaxed)
    }

    pub fn set_time_signature(&self, time_signature: TimeSignature) {
        self.time_signature
            .store(time_signature.pack(), Ordering::Relaxed);
    }

    pub fn time_signature(&self) -> TimeSignature {
        TimeSignature::unpack(self.time_signature.load(Ordering::Relaxed))
    }

    pub fn set_subdivision_enabled(&self, enabled: bool) {
        self.subdivision_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn subdivision_enabled(&self) -> bool {
        self.subdivision_enabled.load(Ordering::Relaxed)
    }

    pub fn set_accent_enabled(&self, enabled: bool) {
        self.accent_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn accent_enabled(&self) -> bool {
        self.accent_enabled.load(Ordering::Relaxed)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Publish pending field writes to the audio loop
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::Relaxed);
    }

    /// Consume the dirty flag; true at most once per configuration change
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::Acquire)
    }

    /// Coherent copy of the pattern parameters, taken at a dirty boundary
    pub fn snapshot(&self) -> PatternConfig {
        PatternConfig {
            tempo: self.tempo(),
            volume: self.volume(),
            time_signature: self.time_signature(),
            subdivision_enabled: self.subdivision_enabled(),
            accent_enabled: self.accent_enabled(),
        }
    }
}

/// One coherent set of pattern parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternConfig {
    pub tempo: u32,
    pub volume: u32,
    pub time_signature: TimeSignature,
    pub subdivision_enabled: bool,
    pub accent_enabled: bool,
}

/// Silent frames between two ticks so that one beat-subdivision slot spans
/// exactly `60 / (tempo * subdivisions)` seconds.
///
/// Signed: at extreme tempo-subdivision products the slot period is shorter
/// than the tick itself and the result goes negative, in which case the
/// walker resets after a single silent frame (ticks back to back).
///
/// Recomputed once per (re)configuration, never per sample.
#[inline]
pub fn silence_frames(tempo: u32, subdivisions: u32, sample_rate: u32, tick_frames: usize) -> i64 {
    let pulses_per_minute = (tempo.max(1) * subdivisions.max(1)) as f64;
    let period = (60.0 / pulses_per_minute) * sample_rate as f64;
    period.round() as i64 - tick_frames as i64
}

/// The sample-by-sample pattern walker.
///
/// Three counters: position inside the current tick, silent frames since the
/// tick ended, and the pulse index that wraps at `numerator * subdivisions`.
/// All parameters are fixed at construction; live changes build a new walker
/// at the next dirty boundary.
pub struct PatternState {
    tick_pos: usize,
    silence_pos: i64,
    pulse_index: u32,
    silence_frames: i64,
    tick_frames: usize,
    pulses_per_measure: u32,
    subdivisions: u32,
    subdivision_enabled: bool,
    buffers: RoleBuffers,
}

impl PatternState {
    pub fn new(config: &PatternConfig, buffers: RoleBuffers, audio: &AudioConfig) -> Self {
        Self {
            tick_pos: 0,
            silence_pos: 0,
            pulse_index: 0,
            silence_frames: silence_frames(
                config.tempo,
                config.time_signature.subdivisions() as u32,
                audio.sample_rate,
                audio.tick_frames,
            ),
            tick_frames: audio.tick_frames,
            pulses_per_measure: config.time_signature.pulses_per_measure(),
            subdivisions: config.time_signature.subdivisions() as u32,
            subdivision_enabled: config.subdivision_enabled,
            buffers,
        }
    }

    pub fn silence_frames(&self) -> i64 {
        self.silence_frames
    }

    pub fn pulse_index(&self) -> u32 {
        self.pulse_index
    }

    /// Produce one output sample and advance the walker.
    ///
    /// Inside a tick the role is chosen by the pulse index: beat slots
    /// (`pulse % subdivisions == 0`) win over subdivision slots (the slot
    /// directly before a beat, only when subdivisions are enabled); all other
    /// slots play the regular tick. Buffer reads past a short or empty
    /// sample yield silence.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.tick_pos < self.tick_frames {
            let buffer = if self.pulse_index % self.subdivisions == 0 {
                &self.buffers.beat
            } else if self.subdivision_enabled && (self.pulse_index + 1) % self.subdivisions == 0 {
                &self.buffers.subdivision
            } else {
                &self.buffers.tick
            };
            let sample = buffer.get(self.tick_pos).copied().unwrap_or(0.0);
            self.tick_pos += 1;
            return sample;
        }

        self.silence_pos += 1;
        if self.silence_pos >= self.silence_frames {
            self.tick_pos = 0;
            self.silence_pos = 0;
            self.pulse_index = (self.pulse_index + 1) % self.pulses_per_measure;
        }
        0.0
    }

    /// Fill one output cycle
    pub fn fill(&mut self, cycle: &mut [f32]) {
        for slot in cycle.iter_mut() {
            *slot = self.next_sample();
        }
    }
}

/// The generate/push worker that runs on the dedicated audio thread.
///
/// Owns nothing exclusively: controls and sound bank are shared with the
/// facade. The sink is opened by the thread that calls `run` and closed on
/// every exit path.
pub struct PatternSequencer {
    controls: Arc<SequencerControls>,
    bank: Arc<Mutex<SoundBank>>,
    audio: AudioConfig,
    on_reconfigured: Option<Box<dyn Fn() + Send + Sync>>,
}

impl PatternSequencer {
    pub fn new(
        controls: Arc<SequencerControls>,
        bank: Arc<Mutex<SoundBank>>,
        audio: AudioConfig,
    ) -> Self {
        Self {
            controls,
            bank,
            audio,
            on_reconfigured: None,
        }
    }

    /// Install the hook invoked after each live reconfiguration, used to
    /// resynchronize the visual pulse scheduler
    pub fn set_reconfigure_hook(&mut self, hook: impl Fn() + Send + Sync + 'static) {
        self.on_reconfigured = Some(Box::new(hook));
    }

    /// Run the generate/push loop until `playing` clears or the device dies.
    ///
    /// Per cycle: fill from the walker, apply the current volume, block on
    /// the sink write, then check the dirty flag. A dirty cycle rebuilds the
    /// walker from a fresh snapshot and fires the reconfigure hook - the
    /// sink keeps streaming throughout. Device errors are logged and end
    /// playback quietly.
    pub fn run(&self, sink: &mut dyn AudioSink) {
        if let Err(err) = sink.start() {
            log_audio_error(&err, "sequencer_start");
            self.controls.set_playing(false);
            sink.close();
            return;
        }

        let mut cycle = vec![0.0_f32; self.audio.cycle_frames];

        'reconfigure: while self.controls.is_playing() {
            let config = self.controls.snapshot();
            let buffers = match self.bank.lock() {
                Ok(bank) => bank.role_buffers(config.accent_enabled),
                Err(_) => {
                    log::error!("Sound bank lock poisoned; stopping playback");
                    self.controls.set_playing(false);
                    break;
                }
            };

            let mut state = PatternState::new(&config, buffers, &self.audio);
            log::debug!(
                "Pattern configured: tempo={} signature={} silence_frames={}",
                config.tempo,
                config.time_signature.label(),
                state.silence_frames()
            );

            while self.controls.is_playing() {
                state.fill(&mut cycle);
                sink.set_volume(self.controls.volume() as f32 / 100.0);
                if let Err(err) = sink.write(&cycle) {
                    log_audio_error(&err, "sequencer_write");
                    self.controls.set_playing(false);
                    break 'reconfigure;
                }

                if self.controls.take_dirty() {
                    if let Some(hook) = &self.on_reconfigured {
                        hook();
                    }
                    continue 'reconfigure;
                }
            }
        }

        sink.close();
        log::info!("Pattern sequencer stopped");
    }
}

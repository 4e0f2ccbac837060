// MetronomeManager: the configuration facade and single mutable-state owner
//
// Everything the UI layer does goes through this type: it clamps and fans
// out parameter changes to the sequencer control block and the visual
// scheduler, guards the playback thread lifecycle, and exposes the
// observable state (running flag, tempo, signature label, lights).
//
// Constructed once at process start and passed by reference to consumers;
// there is no global instance.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::audio::sink::{default_sink_factory, SinkFactory};
use crate::config::EngineConfig;
use crate::error::{log_audio_error, log_metronome_error, MetronomeError};
use crate::metronome::sequencer::{PatternSequencer, SequencerControls};
use crate::metronome::sounds::{SampleLibrary, SilentLibrary, SoundBank, SoundId, SoundRole, SoundType};
use crate::metronome::tap::TapTempo;
use crate::metronome::time_signature::TimeSignature;
use crate::metronome::visual::{Light, VisualScheduler};

/// Configuration facade for one metronome engine instance.
///
/// Owns the shared control block, the sound bank, the visual scheduler and
/// the playback worker handle. All methods are `&self` and thread-safe, so a
/// host can share the manager behind an `Arc`.
pub struct MetronomeManager {
    config: EngineConfig,
    library: Arc<dyn SampleLibrary>,
    sink_factory: Arc<dyn SinkFactory>,
    controls: Arc<SequencerControls>,
    bank: Arc<Mutex<SoundBank>>,
    visual: Arc<VisualScheduler>,
    tap: Mutex<TapTempo>,
    epoch: Instant,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MetronomeManager {
    /// Build a manager with explicit dependencies.
    ///
    /// # Arguments
    /// * `config` - Engine configuration
    /// * `library` - Source of sampled click assets
    /// * `sink_factory` - Opens the output device for each playback run
    /// * `max_lights` - Display light capacity (see
    ///   `visual::max_lights_for_width`)
    ///
    /// Starts stopped, in common time, with the sampled bank's default
    /// claves assignment - the same defaults a fresh app launch shows.
    pub fn new(
        config: EngineConfig,
        library: Arc<dyn SampleLibrary>,
        sink_factory: Arc<dyn SinkFactory>,
        max_lights: usize,
    ) -> Self {
        let controls = Arc::new(SequencerControls::new(
            config.clamp_tempo(config.metronome.default_tempo),
            config.metronome.default_volume.min(100),
            TimeSignature::COMMON_TIME,
        ));
        let bank = Arc::new(Mutex::new(SoundBank::sampled(
            &config.audio,
            Arc::clone(&library),
        )));
        let visual = Arc::new(VisualScheduler::new(max_lights));
        visual.set_tempo(controls.tempo());
        visual.set_subdivision_enabled(false);
        visual.set_accent_enabled(true);

        let tap = Mutex::new(TapTempo::new(config.metronome.tap_timeout_ms));

        Self {
            library,
            sink_factory,
            controls,
            bank,
            visual,
            tap,
            epoch: Instant::now(),
            worker: Mutex::new(None),
            config,
        }
    }

    /// Manager wired to the platform's real audio device, with no sample
    /// assets (sine bank only makes sound until a library is provided)
    pub fn with_defaults() -> Self {
        let config = EngineConfig::default();
        let max_lights = config.visual.wide_screen_lights;
        Self::new(
            config,
            Arc::new(SilentLibrary),
            default_sink_factory(),
            max_lights,
        )
    }

    // ========================================================================
    // CONFIGURATION COMMANDS
    // ========================================================================

    /// Set the tempo in BPM, clamped to the configured [1, 300] range.
    /// Applied at the next cycle boundary when playing.
    pub fn set_tempo(&self, bpm: u32) {
        let clamped = self.config.clamp_tempo(bpm);
        self.controls.set_tempo(clamped);
        self.visual.set_tempo(clamped);
        self.mark_dirty_if_playing();
    }

    /// Set the volume percentage, clamped to [0, 100].
    /// Volume is re-read every cycle, no reconfiguration needed.
    pub fn set_volume(&self, percent: u32) {
        self.controls.set_volume(percent.min(100));
    }

    /// Install a new (pre-validated) time signature
    pub fn set_time_signature(&self, time_signature: TimeSignature) {
        self.controls.set_time_signature(time_signature);
        self.visual.change_time_signature(time_signature);
        self.mark_dirty_if_playing();
    }

    pub fn set_subdivisions_enabled(&self, enabled: bool) {
        self.controls.set_subdivision_enabled(enabled);
        self.visual.set_subdivision_enabled(enabled);
        self.mark_dirty_if_playing();
    }

    pub fn set_accent_enabled(&self, enabled: bool) {
        self.controls.set_accent_enabled(enabled);
        self.visual.set_accent_enabled(enabled);
        self.mark_dirty_if_playing();
    }

    /// Switch between the sine and sampled metronome.
    ///
    /// Tears down the running playback thread and device and installs a
    /// fresh bank with default sound assignments; the engine stays stopped
    /// until the next `start()`. Tempo, volume and signature persist.
    pub fn select_sound_type(&self, sound_type: SoundType) {
        match self.lock_bank() {
            Ok(bank) if bank.sound_type() == sound_type => return,
            Err(err) => {
                log_metronome_error(&err, "select_sound_type");
                return;
            }
            Ok(_) => {}
        }

        self.stop();

        let fresh = match sound_type {
            SoundType::Sine => SoundBank::sine(&self.config.audio, &self.config.metronome),
            SoundType::Sampled => {
                SoundBank::sampled(&self.config.audio, Arc::clone(&self.library))
            }
        };
        match self.lock_bank() {
            Ok(mut bank) => {
                *bank = fresh;
                log::info!("Switched metronome type to {:?}", sound_type);
            }
            Err(err) => log_metronome_error(&err, "select_sound_type"),
        }
    }

    /// Assign a catalog sound to a role; re-decodes only that role and
    /// applies at the next cycle boundary when playing
    pub fn select_sound(&self, role: SoundRole, sound: SoundId) {
        match self.lock_bank() {
            Ok(mut bank) => {
                bank.select(role, sound);
                self.mark_dirty_if_playing();
            }
            Err(err) => log_metronome_error(&err, "select_sound"),
        }
    }

    // ========================================================================
    // TRANSPORT
    // ========================================================================

    /// Start playback and the visual scheduler.
    ///
    /// Guarded: calling while a sequencer thread is already marked playing
    /// is a logged no-op, so duplicate threads can never spawn. Device
    /// failures inside the worker are logged and flip the engine back to
    /// stopped; they are never surfaced here.
    pub fn start(&self) {
        if !self.visual.is_running() {
            self.visual.start();
        }

        if self.controls.is_playing() {
            log::debug!("start() ignored: sequencer already playing");
            return;
        }

        // Reap a worker left over from a device-failure exit
        if let Some(handle) = self.lock_worker().take() {
            let _ = handle.join();
        }

        self.controls.clear_dirty();
        self.controls.set_playing(true);

        let mut sequencer = PatternSequencer::new(
            Arc::clone(&self.controls),
            Arc::clone(&self.bank),
            self.config.audio.clone(),
        );
        let visual = Arc::clone(&self.visual);
        sequencer.set_reconfigure_hook(move || {
            visual.stop();
            visual.start();
        });

        let factory = Arc::clone(&self.sink_factory);
        let controls = Arc::clone(&self.controls);
        let sample_rate = self.config.audio.sample_rate;

        let spawned = thread::Builder::new()
            .name("beater-audio".to_string())
            .spawn(move || match factory.open(sample_rate) {
                Ok(mut sink) => sequencer.run(sink.as_mut()),
                Err(err) => {
                    log_audio_error(&err, "open_sink");
                    controls.set_playing(false);
                }
            });

        match spawned {
            Ok(handle) => *self.lock_worker() = Some(handle),
            Err(err) => {
                log::error!("Failed to spawn audio thread: {}", err);
                self.controls.set_playing(false);
            }
        }
    }

    /// Stop playback and the visual scheduler; the worker closes the device
    /// on its way out. Safe to call repeatedly.
    pub fn stop(&self) {
        self.controls.set_playing(false);
        if let Some(handle) = self.lock_worker().take() {
            if handle.join().is_err() {
                log::error!("Audio worker panicked during shutdown");
            }
        }
        self.visual.stop();
    }

    /// Force a resync: apply pending configuration at the next cycle
    /// boundary and rebuild the light array
    pub fn refresh(&self) {
        self.mark_dirty_if_playing();
        self.visual.refresh();
    }

    /// Feed one user tap to the tempo estimator; estimates update the tempo
    /// live, mid-series
    pub fn tap(&self) {
        let now_ms = self.epoch.elapsed().as_millis() as u64;
        let estimate = self
            .tap
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .tap_at(now_ms);
        if let Some(bpm) = estimate {
            self.set_tempo(bpm);
            self.refresh();
        }
    }

    // ========================================================================
    // OBSERVABLE STATE
    // ========================================================================

    pub fn is_running(&self) -> bool {
        self.controls.is_playing()
    }

    pub fn current_tempo(&self) -> u32 {
        self.controls.tempo()
    }

    pub fn current_volume(&self) -> u32 {
        self.controls.volume()
    }

    pub fn current_time_signature(&self) -> TimeSignature {
        self.controls.time_signature()
    }

    /// Display label in "N/D" form
    pub fn time_signature_label(&self) -> String {
        self.controls.time_signature().label()
    }

    pub fn sound_type(&self) -> SoundType {
        match self.lock_bank() {
            Ok(bank) => bank.sound_type(),
            Err(err) => {
                log_metronome_error(&err, "sound_type");
                SoundType::Sampled
            }
        }
    }

    /// Current selection for a role; `None` on the sine bank
    pub fn sound_selection(&self, role: SoundRole) -> Option<SoundId> {
        match self.lock_bank() {
            Ok(bank) => bank.selection(role),
            Err(err) => {
                log_metronome_error(&err, "sound_selection");
                None
            }
        }
    }

    /// Current indicator light array
    pub fn lights(&self) -> Vec<Light> {
        self.visual.lights()
    }

    /// Receiver for wholesale light array updates
    pub fn subscribe_lights(&self) -> broadcast::Receiver<Vec<Light>> {
        self.visual.subscribe()
    }

    /// Light updates as an async stream, for hosts driving a UI from a
    /// runtime
    pub fn light_stream(&self) -> BroadcastStream<Vec<Light>> {
        BroadcastStream::new(self.visual.subscribe())
    }

    // ========================================================================
    // PRIVATE HELPERS
    // ========================================================================

    fn mark_dirty_if_playing(&self) {
        if self.controls.is_playing() {
            self.controls.mark_dirty();
        }
    }

    fn lock_bank(&self) -> Result<MutexGuard<'_, SoundBank>, MetronomeError> {
        self.bank.lock().map_err(|_| MetronomeError::StatePoisoned)
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for MetronomeManager {
    fn drop(&mut self) {
        self.stop();
    }
}

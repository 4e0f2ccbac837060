//! Visual pulse scheduler
//!
//! Drives the beat indicator lights on an independent, coarse clock. This is
//! deliberately NOT synchronized sample-for-sample with the audio engine: it
//! recomputes its own interval from the shared tempo/signature state and
//! drifts on its own, which is fine for a cosmetic display. The facade
//! resynchronizes it (stop + start) whenever the audio pattern reconfigures.
//!
//! Light arrays are replaced wholesale on every tick and published over a
//! broadcast channel for UI consumption.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::time_signature::TimeSignature;
use crate::config::VisualConfig;

/// Longest single nap of the timer thread; bounds stop() latency
const MAX_NAP: Duration = Duration::from_millis(25);

/// State of one beat indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Light {
    /// Off
    Empty,
    /// Lit for a regular pulse
    Fill,
    /// Highlighted for the accented measure start
    Full,
}

/// Light capacity for a given display width, in dp
pub fn max_lights_for_width(width_dp: f32, config: &VisualConfig) -> usize {
    if width_dp < 600.0 {
        config.narrow_screen_lights
    } else {
        config.wide_screen_lights
    }
}

/// State shared between the scheduler handle and its timer thread
struct VisualShared {
    tempo: AtomicU32,
    time_signature: AtomicU32,
    subdivision_enabled: AtomicBool,
    accent_enabled: AtomicBool,
    max_lights: usize,
    running: AtomicBool,
    lights: Mutex<Vec<Light>>,
    updates: broadcast::Sender<Vec<Light>>,
}

impl VisualShared {
    fn time_signature(&self) -> TimeSignature {
        TimeSignature::unpack(self.time_signature.load(Ordering::Relaxed))
    }

    /// Light exactly one indicator, all others Empty; returns the current
    /// light count for index wrapping
    fn illuminate(&self, index: usize) -> usize {
        let mut lights = self.lights.lock().unwrap_or_else(|e| e.into_inner());
        let count = lights.len().max(1);
        let index = index % count;
        let accented = self.accent_enabled.load(Ordering::Relaxed) && index == 0;
        for (i, light) in lights.iter_mut().enumerate() {
            *light = if i == index {
                if accented {
                    Light::Full
                } else {
                    Light::Fill
                }
            } else {
                Light::Empty
            };
        }
        let _ = self.updates.send(lights.clone());
        count
    }

    /// Rebuild the light array for the current signature, all Empty
    fn refresh(&self) {
        let count = self.time_signature().indicator_count().min(self.max_lights);
        let mut lights = self.lights.lock().unwrap_or_else(|e| e.into_inner());
        *lights = vec![Light::Empty; count.max(1)];
        let _ = self.updates.send(lights.clone());
    }

    /// Sleep in short naps until the deadline or until stopped
    fn nap_until(&self, deadline: Instant) {
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(MAX_NAP));
        }
    }
}

/// The repeating timer driving the indicator lights.
///
/// Keeps its own copies of tempo/signature/flags (set by the facade) so the
/// visual clock never touches sequencer state. `start` while running is a
/// no-op; `stop` cancels the timer and zeroes the lights.
pub struct VisualScheduler {
    shared: Arc<VisualShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl VisualScheduler {
    pub fn new(max_lights: usize) -> Self {
        let (updates, _) = broadcast::channel(16);
        let shared = Arc::new(VisualShared {
            tempo: AtomicU32::new(120),
            time_signature: AtomicU32::new(TimeSignature::COMMON_TIME.pack()),
            subdivision_enabled: AtomicBool::new(false),
            accent_enabled: AtomicBool::new(true),
            max_lights: max_lights.max(1),
            running: AtomicBool::new(false),
            lights: Mutex::new(Vec::new()),
            updates,
        });
        shared.refresh();
        Self {
            shared,
            worker: Mutex::new(None),
        }
    }

    pub fn set_tempo(&self, bpm: u32) {
        self.shared.tempo.store(bpm, Ordering::Relaxed);
    }

    pub fn set_subdivision_enabled(&self, enabled: bool) {
        self.shared
            .subdivision_enabled
            .store(enabled, Ordering::Relaxed);
    }

    pub fn set_accent_enabled(&self, enabled: bool) {
        self.shared.accent_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Install a new signature and rebuild the light array
    pub fn change_time_signature(&self, time_signature: TimeSignature) {
        self.shared
            .time_signature
            .store(time_signature.pack(), Ordering::Relaxed);
        self.shared.refresh();
    }

    /// Milliseconds between visual pulses: `60000/tempo`, or
    /// `60000/(tempo*subdivisions)` with subdivisions enabled.
    /// Recomputed on every start.
    pub fn interval(&self) -> Duration {
        let tempo = self.shared.tempo.load(Ordering::Relaxed).max(1);
        let divisor = if self.shared.subdivision_enabled.load(Ordering::Relaxed) {
            tempo * self.shared.time_signature().subdivisions() as u32
        } else {
            tempo
        };
        Duration::from_millis((60_000 / u64::from(divisor)).max(1))
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Start the timer thread; a no-op while one is already running
    pub fn start(&self) {
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let interval = self.interval();
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("beater-visual".to_string())
            .spawn(move || {
                let mut index = 0usize;
                let mut next_pulse = Instant::now();
                while shared.running.load(Ordering::SeqCst) {
                    let count = shared.illuminate(index);
                    index = (index + 1) % count;
                    next_pulse += interval;
                    shared.nap_until(next_pulse);
                }
            });

        match spawned {
            Ok(handle) => {
                *self.worker.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
            }
            Err(err) => {
                log::error!("Failed to spawn visual scheduler thread: {}", err);
                self.shared.running.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Cancel the timer and zero all lights
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }

        let mut lights = self.shared.lights.lock().unwrap_or_else(|e| e.into_inner());
        for light in lights.iter_mut() {
            *light = Light::Empty;
        }
        let _ = self.shared.updates.send(lights.clone());
    }

    /// Rebuild the light array for the current signature, all Empty.
    /// Length is `min(numerator, max_lights)`.
    pub fn refresh(&self) {
        self.shared.refresh();
    }

    /// Current light array
    pub fn lights(&self) -> Vec<Light> {
        self.shared
            .lights
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Receiver for wholesale light array updates
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Light>> {
        self.shared.updates.subscribe()
    }
}

impl Drop for VisualScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_lights_for_width() {
        let config = VisualConfig::default();
        assert_eq!(max_lights_for_width(360.0, &config), 4);
        assert_eq!(max_lights_for_width(599.9, &config), 4);
        assert_eq!(max_lights_for_width(600.0, &config), 8);
        assert_eq!(max_lights_for_width(1_280.0, &config), 8);
    }

    #[test]
    fn test_interval_from_tempo() {
        let scheduler = VisualScheduler::new(8);
        scheduler.set_tempo(120);
        assert_eq!(scheduler.interval(), Duration::from_millis(500));

        scheduler.set_tempo(60);
        assert_eq!(scheduler.interval(), Duration::from_millis(1_000));
    }

    #[test]
    fn test_interval_with_subdivisions() {
        let scheduler = VisualScheduler::new(8);
        scheduler.set_tempo(120);
        scheduler.change_time_signature(TimeSignature::new(4, 2).unwrap());
        scheduler.set_subdivision_enabled(true);
        assert_eq!(scheduler.interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_refresh_caps_light_count_at_capacity() {
        let narrow = VisualScheduler::new(4);
        narrow.change_time_signature(TimeSignature::new(7, 2).unwrap());
        assert_eq!(narrow.lights().len(), 4);

        let wide = VisualScheduler::new(8);
        wide.change_time_signature(TimeSignature::new(7, 2).unwrap());
        assert_eq!(wide.lights().len(), 7);
    }

    #[test]
    fn test_initial_lights_all_empty() {
        let scheduler = VisualScheduler::new(8);
        let lights = scheduler.lights();
        assert_eq!(lights.len(), 4); // common time
        assert!(lights.iter().all(|&l| l == Light::Empty));
    }

    #[test]
    fn test_start_advances_exactly_one_light() {
        let scheduler = VisualScheduler::new(8);
        // 300 BPM x 4 subdivisions = 50 ms pulses, fast enough to observe
        scheduler.set_tempo(300);
        scheduler.change_time_signature(TimeSignature::new(4, 4).unwrap());
        scheduler.set_subdivision_enabled(true);

        scheduler.start();
        assert!(scheduler.is_running());
        thread::sleep(Duration::from_millis(120));

        let lights = scheduler.lights();
        let lit = lights.iter().filter(|&&l| l != Light::Empty).count();
        assert_eq!(lit, 1, "exactly one indicator lit per pulse");

        scheduler.stop();
    }

    #[test]
    fn test_accented_measure_start_is_full() {
        let scheduler = VisualScheduler::new(8);
        scheduler.set_tempo(300);
        scheduler.set_accent_enabled(true);

        scheduler.start();
        // The very first pulse fires immediately at index 0
        thread::sleep(Duration::from_millis(30));
        let lights = scheduler.lights();
        assert_eq!(lights[0], Light::Full);

        scheduler.stop();
    }

    #[test]
    fn test_start_twice_is_noop() {
        let scheduler = VisualScheduler::new(8);
        scheduler.set_tempo(300);
        scheduler.start();
        scheduler.start(); // must not spawn a second timer
        assert!(scheduler.is_running());
        scheduler.stop();
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_stop_zeroes_lights() {
        let scheduler = VisualScheduler::new(8);
        scheduler.set_tempo(300);
        scheduler.start();
        thread::sleep(Duration::from_millis(30));
        scheduler.stop();

        assert!(scheduler.lights().iter().all(|&l| l == Light::Empty));
    }

    #[test]
    fn test_subscribe_receives_wholesale_updates() {
        let scheduler = VisualScheduler::new(8);
        let mut receiver = scheduler.subscribe();
        scheduler.refresh();

        let update = receiver.try_recv().expect("refresh should broadcast");
        assert_eq!(update.len(), 4);
        assert!(update.iter().all(|&l| l == Light::Empty));
    }
}

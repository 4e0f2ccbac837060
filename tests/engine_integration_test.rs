//! Integration tests for the metronome engine
//!
//! These tests drive the full engine - facade, sequencer thread, sound bank,
//! visual scheduler - against the in-memory sink, validating:
//! - Transport lifecycle (start/stop, device acquisition and release)
//! - Live reconfiguration through the dirty flag, without device churn
//! - Accent/subdivision pattern content actually written to the sink
//! - Light array observability during playback

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use beater_core::audio::stubs::{MemorySinkFactory, SinkProbe};
use beater_core::metronome::SilentLibrary;
use beater_core::{EngineConfig, Light, MetronomeManager, SoundType, TimeSignature};

fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    // 100 ms cycles so reconfiguration boundaries come around quickly
    config.audio.cycle_frames = 4_800;
    config
}

fn engine_with_probe(max_lights: usize) -> (MetronomeManager, Arc<SinkProbe>) {
    let factory = MemorySinkFactory::with_pacing(Duration::from_millis(2));
    let probe = factory.probe();
    let manager = MetronomeManager::new(
        test_config(),
        Arc::new(SilentLibrary),
        Arc::new(factory),
        max_lights,
    );
    (manager, probe)
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

/// Full lifecycle: start streams cycles, stop releases the device
#[test]
fn test_lifecycle_opens_and_releases_device() {
    let (manager, probe) = engine_with_probe(8);

    assert!(!manager.is_running());
    manager.start();
    assert!(manager.is_running());

    assert!(
        wait_until(|| probe.cycles_written() >= 3),
        "engine should keep the sink fed"
    );
    assert!(probe.started());
    assert_eq!(probe.opens(), 1);
    assert_eq!(probe.closes(), 0);

    manager.stop();
    assert!(!manager.is_running());
    assert_eq!(probe.closes(), 1, "stop must release the device");

    manager.stop();
    assert_eq!(probe.closes(), 1, "repeated stop is a no-op");
}

/// Restarting after a stop opens a fresh device
#[test]
fn test_restart_after_stop() {
    let (manager, probe) = engine_with_probe(8);

    manager.start();
    assert!(wait_until(|| probe.cycles_written() >= 1));
    manager.stop();

    manager.start();
    assert!(wait_until(|| probe.opens() == 2));
    assert!(manager.is_running());
    manager.stop();
    assert_eq!(probe.closes(), 2);
}

/// Switching to 7/2 at tempo 90 with subdivisions, while playing.
/// The dirty flag reconfigures at a cycle boundary; the device is never
/// closed or reopened, and the light count follows the new numerator.
#[test]
fn test_live_time_signature_change_without_device_churn() {
    let (manager, probe) = engine_with_probe(8);
    manager.set_tempo(90);
    manager.set_subdivisions_enabled(true);
    manager.select_sound_type(SoundType::Sine);

    manager.start();
    assert!(wait_until(|| probe.cycles_written() >= 2));

    manager.set_time_signature(TimeSignature::new(7, 2).unwrap());

    let cycles_at_change = probe.cycles_written();
    assert!(
        wait_until(|| probe.cycles_written() > cycles_at_change + 1),
        "streaming must continue across the reconfiguration"
    );
    assert!(manager.is_running());
    assert_eq!(probe.opens(), 1, "no reopen across reconfiguration");
    assert_eq!(probe.closes(), 0, "no close across reconfiguration");
    assert_eq!(manager.time_signature_label(), "7/2");
    assert_eq!(manager.lights().len(), 7);

    manager.stop();
}

/// Narrow displays cap the light count at 4
#[test]
fn test_narrow_display_caps_lights() {
    let (manager, _probe) = engine_with_probe(4);
    manager.set_time_signature(TimeSignature::new(7, 2).unwrap());
    assert_eq!(manager.lights().len(), 4);
}

/// Sine playback writes audible (non-zero) PCM at full volume
#[test]
fn test_sine_playback_produces_audible_pcm() {
    let (manager, probe) = engine_with_probe(8);
    manager.select_sound_type(SoundType::Sine);
    manager.set_volume(100);

    manager.start();
    assert!(wait_until(|| probe.cycles_written() >= 2));
    manager.stop();

    let cycle = probe.last_cycle();
    assert_eq!(cycle.len(), 4_800);
    assert!(
        cycle.iter().any(|&s| s != 0),
        "full-volume sine playback must produce non-zero PCM"
    );
}

/// Volume 0 yields all-zero PCM regardless of waveform content
#[test]
fn test_volume_zero_silences_output() {
    let (manager, probe) = engine_with_probe(8);
    manager.select_sound_type(SoundType::Sine);
    manager.set_volume(0);

    manager.start();
    assert!(wait_until(|| probe.cycles_written() >= 2));
    manager.stop();

    assert!(probe.last_cycle().iter().all(|&s| s == 0));
}

/// The sampled bank with no assets plays silence but streams normally
#[test]
fn test_sampled_bank_without_assets_streams_silence() {
    let (manager, probe) = engine_with_probe(8);
    assert_eq!(manager.sound_type(), SoundType::Sampled);

    manager.start();
    assert!(wait_until(|| probe.cycles_written() >= 2));
    manager.stop();

    assert!(probe.last_cycle().iter().all(|&s| s == 0));
}

/// Lights animate while running and zero out on stop
#[test]
fn test_lights_animate_and_clear() {
    let (manager, probe) = engine_with_probe(8);
    // 300 BPM x 4 enabled subdivisions = 50 ms visual pulses
    manager.set_tempo(300);
    manager.set_time_signature(TimeSignature::new(4, 4).unwrap());
    manager.set_subdivisions_enabled(true);

    manager.start();
    assert!(wait_until(|| probe.cycles_written() >= 1));
    assert!(wait_until(|| {
        manager.lights().iter().any(|&l| l != Light::Empty)
    }));

    let lit = manager
        .lights()
        .iter()
        .filter(|&&l| l != Light::Empty)
        .count();
    assert_eq!(lit, 1, "exactly one indicator lit per visual pulse");

    manager.stop();
    assert!(manager.lights().iter().all(|&l| l == Light::Empty));
}

/// Light updates are observable over the broadcast channel
#[test]
fn test_light_broadcast_updates() {
    let (manager, _probe) = engine_with_probe(8);
    let mut receiver = manager.subscribe_lights();

    manager.refresh();
    let update = receiver
        .try_recv()
        .expect("refresh must broadcast a light array");
    assert_eq!(update.len(), 4);
}

//! Click sound roles, the sound catalog and the per-role buffer bank
//!
//! A metronome plays three roles: the accented beat, the regular tick and
//! the subdivision pulse. Each role resolves to a cached mono buffer, either
//! synthesized (sine voices) or decoded from a bundled percussion sample.
//! The bank is a tagged enum selected at construction; switching metronome
//! type swaps the whole bank.
//!
//! Decoding happens when a selection changes, never per tick. Sample bytes
//! come from an injected `SampleLibrary` because asset storage is the host
//! platform's concern.

use std::sync::Arc;

use crate::audio::waveform::{decode_pcm16, sine_wave};
use crate::config::{AudioConfig, MetronomeConfig};

/// Shared, immutable role buffer
pub type SampleBuffer = Arc<Vec<f32>>;

/// The three playable positions in a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundRole {
    /// First slot of each beat (accented when accent is enabled)
    Beat,
    /// Regular beat slot
    Tick,
    /// Slot directly before the next beat
    Subdivision,
}

/// Which kind of bank is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundType {
    /// Synthesized sine voices
    Sine,
    /// Decoded percussion samples
    Sampled,
}

/// The bundled percussion catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundId {
    Off,
    Beep,
    Bongo,
    Clap,
    Claves1,
    Claves2,
    Claves3,
    Cowbell,
    Metro1,
    Metro2,
    Metro3,
    Rim,
    Sticks,
    Wood,
}

impl SoundId {
    /// Every selectable sound, in display order
    pub const ALL: [SoundId; 14] = [
        SoundId::Off,
        SoundId::Beep,
        SoundId::Bongo,
        SoundId::Clap,
        SoundId::Claves1,
        SoundId::Claves2,
        SoundId::Claves3,
        SoundId::Cowbell,
        SoundId::Metro1,
        SoundId::Metro2,
        SoundId::Metro3,
        SoundId::Rim,
        SoundId::Sticks,
        SoundId::Wood,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            SoundId::Off => "Off",
            SoundId::Beep => "Beep",
            SoundId::Bongo => "Bongo",
            SoundId::Clap => "Clap",
            SoundId::Claves1 => "Claves 1",
            SoundId::Claves2 => "Claves 2",
            SoundId::Claves3 => "Claves 3",
            SoundId::Cowbell => "Cowbell",
            SoundId::Metro1 => "Metro 1",
            SoundId::Metro2 => "Metro 2",
            SoundId::Metro3 => "Metro 3",
            SoundId::Rim => "Rim",
            SoundId::Sticks => "Sticks",
            SoundId::Wood => "Wood",
        }
    }
}

/// Source of raw sample bytes for the catalog.
///
/// Implemented by the host app over its asset store. Bytes are 16-bit
/// little-endian PCM, optionally WAV-wrapped; `None` means the asset is
/// missing and the role plays silence.
pub trait SampleLibrary: Send + Sync {
    fn raw_pcm(&self, sound: SoundId) -> Option<Vec<u8>>;
}

/// Library with no assets; every sampled role decodes to silence.
///
/// Useful for hosts that only use the sine bank, and for tests.
pub struct SilentLibrary;

impl SampleLibrary for SilentLibrary {
    fn raw_pcm(&self, _sound: SoundId) -> Option<Vec<u8>> {
        None
    }
}

/// The buffers a pattern actually plays, pulled once per (re)configuration
#[derive(Clone)]
pub struct RoleBuffers {
    pub beat: SampleBuffer,
    pub tick: SampleBuffer,
    pub subdivision: SampleBuffer,
}

/// Per-role cached buffers for the active metronome type
pub enum SoundBank {
    Sine {
        beat: SampleBuffer,
        tick: SampleBuffer,
        subdivision: SampleBuffer,
        silence: SampleBuffer,
    },
    Sampled {
        library: Arc<dyn SampleLibrary>,
        beat_sound: SoundId,
        tick_sound: SoundId,
        subdivision_sound: SoundId,
        beat: Option<SampleBuffer>,
        tick: Option<SampleBuffer>,
        subdivision: Option<SampleBuffer>,
        silence: SampleBuffer,
    },
}

impl SoundBank {
    /// Sine bank with the configured voice frequencies, synthesized once
    pub fn sine(audio: &AudioConfig, metronome: &MetronomeConfig) -> Self {
        let frames = audio.tick_frames;
        SoundBank::Sine {
            beat: Arc::new(sine_wave(frames, audio.sample_rate, metronome.beat_frequency_hz)),
            tick: Arc::new(sine_wave(frames, audio.sample_rate, metronome.tick_frequency_hz)),
            subdivision: Arc::new(sine_wave(
                frames,
                audio.sample_rate,
                metronome.subdivision_frequency_hz,
            )),
            silence: Arc::new(vec![0.0; frames]),
        }
    }

    /// Sampled bank with the default claves assignment decoded up front
    pub fn sampled(audio: &AudioConfig, library: Arc<dyn SampleLibrary>) -> Self {
        let mut bank = SoundBank::Sampled {
            library,
            beat_sound: SoundId::Claves1,
            tick_sound: SoundId::Claves2,
            subdivision_sound: SoundId::Claves3,
            beat: None,
            tick: None,
            subdivision: None,
            silence: Arc::new(vec![0.0; audio.tick_frames]),
        };
        bank.select(SoundRole::Beat, SoundId::Claves1);
        bank.select(SoundRole::Tick, SoundId::Claves2);
        bank.select(SoundRole::Subdivision, SoundId::Claves3);
        bank
    }

    pub fn sound_type(&self) -> SoundType {
        match self {
            SoundBank::Sine { .. } => SoundType::Sine,
            SoundBank::Sampled { .. } => SoundType::Sampled,
        }
    }

    /// Assign a catalog sound to a role, re-decoding only that role.
    ///
    /// `Off` clears the role. On the sine bank this is a no-op; the sine
    /// voices are fixed per configuration.
    pub fn select(&mut self, role: SoundRole, sound: SoundId) {
        match self {
            SoundBank::Sine { .. } => {
                log::debug!("Ignoring sound selection on sine bank: {:?}", sound);
            }
            SoundBank::Sampled {
                library,
                beat_sound,
                tick_sound,
                subdivision_sound,
                beat,
                tick,
                subdivision,
                ..
            } => {
                let decoded = if sound == SoundId::Off {
                    None
                } else {
                    let buffer = library
                        .raw_pcm(sound)
                        .map(|bytes| decode_pcm16(&bytes))
                        .unwrap_or_default();
                    if buffer.is_empty() {
                        log::warn!(
                            "Sample {:?} decoded to an empty buffer; role {:?} will be silent",
                            sound,
                            role
                        );
                    }
                    Some(Arc::new(buffer))
                };
                match role {
                    SoundRole::Beat => {
                        *beat_sound = sound;
                        *beat = decoded;
                    }
                    SoundRole::Tick => {
                        *tick_sound = sound;
                        *tick = decoded;
                    }
                    SoundRole::Subdivision => {
                        *subdivision_sound = sound;
                        *subdivision = decoded;
                    }
                }
            }
        }
    }

    /// Current selection for a role; `None` on the sine bank
    pub fn selection(&self, role: SoundRole) -> Option<SoundId> {
        match self {
            SoundBank::Sine { .. } => None,
            SoundBank::Sampled {
                beat_sound,
                tick_sound,
                subdivision_sound,
                ..
            } => Some(match role {
                SoundRole::Beat => *beat_sound,
                SoundRole::Tick => *tick_sound,
                SoundRole::Subdivision => *subdivision_sound,
            }),
        }
    }

    /// Resolve the buffers one pattern configuration will play.
    ///
    /// With accent disabled the beat slot plays the same buffer as a regular
    /// tick. Missing roles resolve to the cached silence buffer.
    pub fn role_buffers(&self, accent_enabled: bool) -> RoleBuffers {
        match self {
            SoundBank::Sine {
                beat,
                tick,
                subdivision,
                ..
            } => RoleBuffers {
                beat: if accent_enabled {
                    Arc::clone(beat)
                } else {
                    Arc::clone(tick)
                },
                tick: Arc::clone(tick),
                subdivision: Arc::clone(subdivision),
            },
            SoundBank::Sampled {
                beat,
                tick,
                subdivision,
                silence,
                ..
            } => {
                let tick_buffer = tick.as_ref().unwrap_or(silence);
                let beat_buffer = if accent_enabled {
                    beat.as_ref().unwrap_or(silence)
                } else {
                    tick_buffer
                };
                RoleBuffers {
                    beat: Arc::clone(beat_buffer),
                    tick: Arc::clone(tick_buffer),
                    subdivision: Arc::clone(subdivision.as_ref().unwrap_or(silence)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::waveform::encode_pcm16;
    use crate::config::EngineConfig;

    /// Library serving one recognizable constant-valued sample per sound
    struct FlatLibrary;

    impl SampleLibrary for FlatLibrary {
        fn raw_pcm(&self, sound: SoundId) -> Option<Vec<u8>> {
            let level = match sound {
                SoundId::Claves1 => 0.9,
                SoundId::Claves2 => 0.5,
                SoundId::Claves3 => 0.25,
                SoundId::Cowbell => -0.7,
                _ => return None,
            };
            Some(encode_pcm16(&vec![level; 64], 1.0))
        }
    }

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn test_sine_bank_caches_distinct_voices() {
        let cfg = config();
        let bank = SoundBank::sine(&cfg.audio, &cfg.metronome);
        assert_eq!(bank.sound_type(), SoundType::Sine);

        let buffers = bank.role_buffers(true);
        assert_eq!(buffers.beat.len(), cfg.audio.tick_frames);
        assert_ne!(buffers.beat[1], buffers.tick[1]);
        assert_ne!(buffers.tick[1], buffers.subdivision[1]);
    }

    #[test]
    fn test_accent_disabled_maps_beat_to_tick() {
        let cfg = config();
        let bank = SoundBank::sine(&cfg.audio, &cfg.metronome);
        let buffers = bank.role_buffers(false);
        assert!(Arc::ptr_eq(&buffers.beat, &buffers.tick));
    }

    #[test]
    fn test_sampled_bank_default_selection() {
        let cfg = config();
        let bank = SoundBank::sampled(&cfg.audio, Arc::new(FlatLibrary));
        assert_eq!(bank.sound_type(), SoundType::Sampled);
        assert_eq!(bank.selection(SoundRole::Beat), Some(SoundId::Claves1));
        assert_eq!(bank.selection(SoundRole::Tick), Some(SoundId::Claves2));
        assert_eq!(
            bank.selection(SoundRole::Subdivision),
            Some(SoundId::Claves3)
        );

        let buffers = bank.role_buffers(true);
        assert!((buffers.beat[0] - 0.9).abs() < 1e-3);
        assert!((buffers.tick[0] - 0.5).abs() < 1e-3);
        assert!((buffers.subdivision[0] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_select_re_decodes_single_role() {
        let cfg = config();
        let mut bank = SoundBank::sampled(&cfg.audio, Arc::new(FlatLibrary));
        bank.select(SoundRole::Tick, SoundId::Cowbell);

        let buffers = bank.role_buffers(true);
        assert!((buffers.tick[0] + 0.7).abs() < 1e-3);
        // Beat untouched
        assert!((buffers.beat[0] - 0.9).abs() < 1e-3);
    }

    #[test]
    fn test_off_role_plays_silence() {
        let cfg = config();
        let mut bank = SoundBank::sampled(&cfg.audio, Arc::new(FlatLibrary));
        bank.select(SoundRole::Subdivision, SoundId::Off);

        let buffers = bank.role_buffers(true);
        assert!(buffers.subdivision.iter().all(|&s| s == 0.0));
        assert_eq!(bank.selection(SoundRole::Subdivision), Some(SoundId::Off));
    }

    #[test]
    fn test_missing_asset_degrades_to_silent_role() {
        let cfg = config();
        let mut bank = SoundBank::sampled(&cfg.audio, Arc::new(SilentLibrary));
        bank.select(SoundRole::Beat, SoundId::Wood);

        let buffers = bank.role_buffers(true);
        assert!(buffers.beat.is_empty() || buffers.beat.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_accent_disabled_with_missing_tick_uses_silence() {
        let cfg = config();
        let mut bank = SoundBank::sampled(&cfg.audio, Arc::new(FlatLibrary));
        bank.select(SoundRole::Tick, SoundId::Off);

        let buffers = bank.role_buffers(false);
        assert!(buffers.beat.iter().all(|&s| s == 0.0));
    }
}

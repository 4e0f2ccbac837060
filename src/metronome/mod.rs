// Metronome domain: pattern scheduling, sounds, visual pulses, tap tempo

pub mod sequencer;
pub mod sounds;
pub mod tap;
pub mod time_signature;
pub mod visual;

pub use sequencer::{PatternSequencer, SequencerControls};
pub use sounds::{SampleLibrary, SilentLibrary, SoundBank, SoundId, SoundRole, SoundType};
pub use tap::TapTempo;
pub use time_signature::TimeSignature;
pub use visual::{Light, VisualScheduler};

// Audio output layer: click waveform generation and streaming sinks

pub mod sink;
pub mod stubs;
pub mod waveform;

#[cfg(not(target_os = "android"))]
pub mod sink_cpal;
#[cfg(target_os = "android")]
pub mod sink_oboe;

pub use sink::{default_sink_factory, AudioSink, SinkFactory};

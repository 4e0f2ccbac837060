// Beater Core - Rust metronome engine
// Real-time click pattern generation with glitch-free live reconfiguration

// Module declarations
pub mod audio;
pub mod config;
pub mod error;
pub mod managers;
pub mod metronome;

// Re-exports for convenience
pub use config::EngineConfig;
pub use managers::MetronomeManager;
pub use metronome::{Light, SoundId, SoundRole, SoundType, TimeSignature};

#[cfg(target_os = "android")]
use log::info;

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        /// Initialize logging through logcat
        pub fn init_logging() {
            use tracing_subscriber::layer::SubscriberExt;

            match tracing_android::layer("BeaterCore") {
                Ok(layer) => {
                    let subscriber = tracing_subscriber::registry().with(layer);
                    if tracing::subscriber::set_global_default(subscriber).is_err() {
                        // A subscriber was already installed; keep it
                    }
                }
                Err(err) => eprintln!("Failed to initialize Android logging: {}", err),
            }
        }
    } else {
        /// Initialize logging to stderr, honoring RUST_LOG
        pub fn init_logging() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
                )
                .try_init();
        }
    }
}

/// JNI_OnLoad is called when the native library is loaded by Android.
/// Registers the Android context required by oboe before any device access.
#[cfg(target_os = "android")]
#[no_mangle]
pub extern "system" fn JNI_OnLoad(
    vm: jni::JavaVM,
    _reserved: *mut std::ffi::c_void,
) -> jni::sys::jint {
    init_logging();

    info!("JNI_OnLoad called - registering Android context for audio access");

    let vm_ptr = vm.get_java_vm_pointer() as *mut std::ffi::c_void;
    // SAFETY: the JavaVM pointer is guaranteed valid by the Android runtime,
    // and this runs before any oboe stream is opened
    unsafe { ndk_context::initialize_android_context(vm_ptr, std::ptr::null_mut()) };

    jni::sys::JNI_VERSION_1_6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facade_is_constructible_without_hardware() {
        use crate::audio::stubs::MemorySinkFactory;
        use crate::metronome::SilentLibrary;
        use std::sync::Arc;

        let manager = MetronomeManager::new(
            EngineConfig::default(),
            Arc::new(SilentLibrary),
            Arc::new(MemorySinkFactory::new()),
            8,
        );
        assert!(!manager.is_running());
    }
}

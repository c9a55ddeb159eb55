//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use rtlboot_lib::error::RtlError;
#[allow(unused_imports)]
pub use rtlboot_lib::profile::{DeviceProfile, FlashRegion};
#[allow(unused_imports)]
pub use rtlboot_lib::session::{BootSession, SessionConfig};
#[allow(unused_imports)]
pub use rtlboot_lib::sim::SimulatedBootloader;
#[allow(unused_imports)]
pub use rtlboot_lib::table::DecodePolicy;
#[allow(unused_imports)]
pub use std::time::Duration;

/// Gateway profile with a short wake interval so sync loops run fast
#[allow(dead_code)]
pub fn fast_profile() -> DeviceProfile {
    DeviceProfile {
        sync_interval_ms: 1,
        ..DeviceProfile::default()
    }
}

/// Tight deadlines for tests that expect a timeout
#[allow(dead_code)]
pub fn short_timeouts() -> SessionConfig {
    SessionConfig {
        response_timeout: Some(Duration::from_millis(50)),
        sync_timeout: Some(Duration::from_millis(50)),
    }
}

/// A session talking to a simulated monitor
#[allow(dead_code)]
pub fn session_with(sim: SimulatedBootloader) -> BootSession<SimulatedBootloader> {
    BootSession::new(sim, fast_profile(), SessionConfig::default())
}

/// Flash image whose bytes count up from 0, wrapping at 256
#[allow(dead_code)]
pub fn counting_image(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}

/// Install a test subscriber once; `RUST_LOG=debug` shows the serial traffic
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scrambled KEK that descrambles to 6d417246774b7c502455295a2e5f3364
#[allow(dead_code)]
pub const STORED_KEK: &str = "3132333435363738393a3b3c3d3e3f40";

/// "auskey-0123456789abcdef-h4ckM3!!" encrypted with the KEK above
#[allow(dead_code)]
pub const ENCRYPTED_AUSKEY: &str = "e4b0691bc26141146f0505e5c6f84b9b4f50ce7a2cb2ed43bbca5a6158f2a187";

pub mod command;
pub mod constants;
pub mod dump;
pub mod error;
pub mod kek;
pub mod keys;
pub mod profile;
pub mod session;
pub mod sim;
pub mod table;
pub mod transport;

// Re-export the session and the common entry points for easy access
pub use dump::{DumpPlan, DumpProgress, dump_flash};
pub use error::RtlError;
pub use keys::{RecoveredKeys, recover_keys};
pub use profile::DeviceProfile;
pub use session::{BootSession, SessionConfig};
pub use table::{DecodePolicy, HexWordTable};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use rtlboot_lib::{DecodePolicy, DeviceProfile, SessionConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Serial connection and logging options shared by every tool.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Serial port device - e.g. /dev/ttyUSB0 or COM3 or /dev/ttyS0
    #[arg(short = 'p', long)]
    pub serial_port: String,
    /// Override the console baud rate of the device profile.
    #[arg(long)]
    pub baud: Option<u32>,
    /// How long to wait for each reply from the boot monitor (0 waits forever).
    #[arg(long, default_value_t = 10_000)]
    pub response_timeout_ms: u64,
    /// How long to keep sending ESC before giving up (0 waits forever).
    #[arg(long, default_value_t = 60)]
    pub sync_timeout_secs: u64,
    /// JSON device profile overriding addresses and protocol constants.
    #[arg(long)]
    pub profile: Option<PathBuf>,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long)]
    pub log_file: Option<PathBuf>,
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl ConnectionArgs {
    pub fn load_profile(&self) -> Result<DeviceProfile> {
        let mut profile = match &self.profile {
            Some(path) => {
                let profile = DeviceProfile::load(path)
                    .with_context(|| format!("Failed to load device profile from {:?}", path))?;
                info!(name = %profile.name, "Loaded device profile");
                profile
            }
            None => DeviceProfile::default(),
        };
        if let Some(baud) = self.baud {
            profile.baud_rate = baud;
        }
        Ok(profile)
    }

    pub fn session_config(&self) -> SessionConfig {
        let nonzero = |d: Duration| (!d.is_zero()).then_some(d);
        SessionConfig {
            response_timeout: nonzero(Duration::from_millis(self.response_timeout_ms)),
            sync_timeout: nonzero(Duration::from_secs(self.sync_timeout_secs)),
        }
    }
}

/// What to do with bytes in a dump that are not valid UTF-8.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeArg {
    /// Replace them and keep parsing
    Lossy,
    /// Abort the run
    Strict,
}

impl From<DecodeArg> for DecodePolicy {
    fn from(arg: DecodeArg) -> Self {
        match arg {
            DecodeArg::Lossy => DecodePolicy::Lossy,
            DecodeArg::Strict => DecodePolicy::Strict,
        }
    }
}

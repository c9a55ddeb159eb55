use std::io;
use std::str::Utf8Error;
use std::time::Duration;
use thiserror::Error;

/// The primary error type for the `rtlboot-lib` library.
#[derive(Error, Debug)]
pub enum RtlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Timed out after {elapsed:?} waiting for {waiting_for:?}")]
    ProtocolTimeout { waiting_for: String, elapsed: Duration },

    #[error("Response is not valid UTF-8: {0}")]
    Decode(#[from] Utf8Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Step size {0:#x} must be a non-zero multiple of 4")]
    InvalidStep(u32),

    #[error("Invalid address range {start:#x}..{end:#x}")]
    InvalidRange { start: u32, end: u32 },

    #[error("Read length {0} must be a non-zero multiple of 4")]
    InvalidLength(u32),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptFailed(String),

    #[error("Cannot parse device profile: {0}")]
    Profile(#[from] serde_json::Error),

    #[error("Invalid device profile: {0}")]
    InvalidProfile(String),
}

impl From<hex::FromHexError> for RtlError {
    fn from(e: hex::FromHexError) -> Self {
        RtlError::MalformedResponse(format!("invalid hex text: {e}"))
    }
}

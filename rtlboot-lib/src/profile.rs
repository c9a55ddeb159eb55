//! Device profile: every magic number the tools depend on, gathered in one place.
//!
//! The default profile describes the LIDL Silvercrest Zigbee gateway. Other
//! revisions of the same boot monitor can be described by a JSON file whose
//! fields override the defaults, e.g.
//!
//! ```json
//! { "name": "other-rev", "kek": { "address": 4200450, "length": 16 } }
//! ```

use crate::constants::*;
use crate::error::RtlError;
use crate::kek::KekScrambler;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// A contiguous range of flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashRegion {
    pub address: u32,
    pub length: u32,
}

impl FlashRegion {
    pub const fn new(address: u32, length: u32) -> Self {
        Self { address, length }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Human readable label, only used in logs
    pub name: String,
    pub baud_rate: u32,
    /// RAM address `FLR` copies into and `DW` dumps from
    pub staging_address: u32,
    pub prompt_banner: String,
    pub confirm_marker: String,
    pub wake_sequence: Vec<u8>,
    pub confirm_reply: Vec<u8>,
    pub sync_interval_ms: u64,
    pub kek: FlashRegion,
    pub auskey: [FlashRegion; 2],
    pub kek_divisor: u32,
    pub kek_offset: u8,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            name: "lidl-silvercrest-gateway".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            staging_address: STAGING_ADDRESS,
            prompt_banner: PROMPT_BANNER.to_string(),
            confirm_marker: CONFIRM_MARKER.to_string(),
            wake_sequence: WAKE_SEQUENCE.to_vec(),
            confirm_reply: CONFIRM_REPLY.to_vec(),
            sync_interval_ms: SYNC_INTERVAL_MS,
            kek: FlashRegion::new(KEK_ADDRESS, KEY_BLOCK_SIZE),
            auskey: [
                FlashRegion::new(AUSKEY_ADDRESSES[0], KEY_BLOCK_SIZE),
                FlashRegion::new(AUSKEY_ADDRESSES[1], KEY_BLOCK_SIZE),
            ],
            kek_divisor: KEK_DIVISOR,
            kek_offset: KEK_OFFSET,
        }
    }
}

impl DeviceProfile {
    /// Parse a profile from JSON. Missing fields keep their default value.
    pub fn from_json(json: &str) -> Result<Self, RtlError> {
        let profile: Self = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Reject profiles the session cannot drive safely. An empty terminator
    /// would match immediately and desync the command sequence.
    pub fn validate(&self) -> Result<(), RtlError> {
        let empty = [
            ("prompt_banner", self.prompt_banner.is_empty()),
            ("confirm_marker", self.confirm_marker.is_empty()),
            ("wake_sequence", self.wake_sequence.is_empty()),
            ("confirm_reply", self.confirm_reply.is_empty()),
        ];
        if let Some((field, _)) = empty.iter().find(|(_, is_empty)| *is_empty) {
            return Err(RtlError::InvalidProfile(format!("{field} must not be empty")));
        }
        if self.baud_rate == 0 {
            return Err(RtlError::InvalidProfile("baud_rate must not be zero".to_string()));
        }
        KekScrambler::from_profile(self)
            .map_err(|e| RtlError::InvalidProfile(e.to_string()))?;
        Ok(())
    }

    /// Load a profile from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RtlError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_matches_gateway() {
        let profile = DeviceProfile::default();
        assert_eq!(profile.baud_rate, 38400);
        assert_eq!(profile.staging_address, 0x8000_0000);
        assert_eq!(profile.kek, FlashRegion::new(0x401802, 16));
        assert_eq!(profile.auskey[0], FlashRegion::new(0x402002, 16));
        assert_eq!(profile.auskey[1], FlashRegion::new(0x402012, 16));
        assert_eq!(profile.kek_divisor, 0x5D);
        assert_eq!(profile.kek_offset, b'!');
        assert_eq!(profile.sync_interval(), Duration::from_millis(200));
    }

    #[test]
    fn test_partial_json_overrides_defaults() {
        let profile = DeviceProfile::from_json(r#"{ "name": "rev-b", "baud_rate": 115200 }"#).unwrap();
        assert_eq!(profile.name, "rev-b");
        assert_eq!(profile.baud_rate, 115200);
        assert_eq!(profile.prompt_banner, "<RealTek>");
        assert_eq!(profile.kek.address, 0x401802);
    }

    #[test]
    fn test_invalid_json_is_profile_error() {
        let result = DeviceProfile::from_json("{ not json");
        assert!(matches!(result, Err(RtlError::Profile(_))));
    }

    #[test]
    fn test_default_profile_is_valid() {
        DeviceProfile::default().validate().unwrap();
    }

    #[test]
    fn test_empty_terminators_are_rejected() {
        for json in [
            r#"{ "confirm_marker": "" }"#,
            r#"{ "prompt_banner": "" }"#,
            r#"{ "wake_sequence": [] }"#,
            r#"{ "confirm_reply": [] }"#,
        ] {
            let result = DeviceProfile::from_json(json);
            assert!(matches!(result, Err(RtlError::InvalidProfile(_))), "{json} was accepted");
        }
    }

    #[test]
    fn test_out_of_range_divisor_is_rejected() {
        for json in [r#"{ "kek_divisor": 0 }"#, r#"{ "kek_divisor": 2147483648 }"#] {
            let result = DeviceProfile::from_json(json);
            assert!(matches!(result, Err(RtlError::InvalidProfile(_))), "{json} was accepted");
        }
    }
}

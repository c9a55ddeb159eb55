//! KEK descrambling.
//!
//! The gateway stores its key-encryption-key in flash in scrambled form. The
//! real AES key is recovered byte by byte, using the first stored byte `m` as
//! multiplier:
//!
//! ```text
//! p      = m * b                      (not reduced)
//! c1     = i8(p mod 256)
//! c2     = i8((p / 0x5D) mod 256)
//! out[i] = (c1 + c2 * -0x5D + '!') mod 256
//! ```
//!
//! Both intermediate values are reinterpreted as signed bytes before they are
//! combined. The arithmetic must be reproduced exactly, wraparound included.

use crate::constants::{KEK_DIVISOR, KEK_OFFSET, KEY_BLOCK_SIZE};
use crate::error::RtlError;
use crate::profile::DeviceProfile;

pub const KEK_LEN: usize = KEY_BLOCK_SIZE as usize;

/// Largest divisor the transform accepts
pub const MAX_DIVISOR: u32 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KekScrambler {
    divisor: u32,
    offset: u8,
}

impl Default for KekScrambler {
    fn default() -> Self {
        Self {
            divisor: KEK_DIVISOR,
            offset: KEK_OFFSET,
        }
    }
}

impl KekScrambler {
    /// The divisor must fit in a byte; larger values overflow the signed mix.
    pub fn new(divisor: u32, offset: u8) -> Result<Self, RtlError> {
        if !(1..=MAX_DIVISOR).contains(&divisor) {
            return Err(RtlError::KeyDerivationFailed(format!(
                "KEK divisor {divisor:#x} outside 1..={MAX_DIVISOR:#x}"
            )));
        }
        Ok(Self { divisor, offset })
    }

    pub fn from_profile(profile: &DeviceProfile) -> Result<Self, RtlError> {
        Self::new(profile.kek_divisor, profile.kek_offset)
    }

    /// Turn the 16 bytes read from flash into the AES-128 key.
    pub fn derive(&self, stored: &[u8]) -> Result<[u8; KEK_LEN], RtlError> {
        if stored.len() != KEK_LEN {
            return Err(RtlError::KeyDerivationFailed(format!(
                "KEK must be {KEK_LEN} bytes, got {}",
                stored.len()
            )));
        }

        let multiplier = u32::from(stored[0]);
        let divisor = self.divisor as i32;
        let mut key = [0u8; KEK_LEN];
        for (out, &b) in key.iter_mut().zip(stored) {
            let product = multiplier * u32::from(b);
            let c1 = product as u8 as i8;
            let c2 = (product / self.divisor) as u8 as i8;
            let mixed = i32::from(c1) + i32::from(c2) * -divisor + i32::from(self.offset);
            *out = mixed as u8;
        }
        Ok(key)
    }
}

/// Descramble a stored KEK with the gateway's constants.
pub fn derive_kek(stored: &[u8]) -> Result<[u8; KEK_LEN], RtlError> {
    KekScrambler::default().derive(stored)
}

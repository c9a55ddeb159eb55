//! KEK and AUSKEY recovery.
//!
//! # Recovery Flow
//!
//! 1. Wake the boot monitor and wait for `<RealTek>`
//! 2. Read the scrambled KEK (16 bytes at 0x401802) and descramble it
//! 3. Read both AUSKEY halves (16 bytes at 0x402002 and 0x402012)
//! 4. AES-128-ECB decrypt the 32-byte AUSKEY with the KEK
//!
//! The last 8 bytes of the decrypted AUSKEY are the root password.

use crate::constants::ROOT_PASSWORD_LEN;
use crate::error::RtlError;
use crate::kek::{KEK_LEN, KekScrambler};
use crate::profile::{DeviceProfile, FlashRegion};
use crate::session::BootSession;
use crate::table::DecodePolicy;
use crate::transport::Transport;
use aes::Aes128;
use aes::cipher::{BlockDecrypt, KeyInit};
use tracing::{debug, info};

/// Everything recovered from a gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredKeys {
    /// KEK exactly as dumped from flash
    pub kek_hex: String,
    /// Descrambled AES-128 key
    pub kek: [u8; KEK_LEN],
    /// Both AUSKEY halves as dumped from flash
    pub auskey_hex: String,
    /// Decrypted AUSKEY, ASCII
    pub auskey: String,
    /// Trailing 8 characters of the AUSKEY
    pub root_password: String,
}

/// AES-128-ECB decrypt whole 16-byte blocks
pub fn aes_ecb_decrypt_blocks(ciphertext: &[u8], key: &[u8; KEK_LEN]) -> Result<Vec<u8>, RtlError> {
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(RtlError::DecryptFailed(format!(
            "ciphertext must be a non-empty multiple of 16 bytes, got {}",
            ciphertext.len()
        )));
    }

    let cipher = Aes128::new(key.into());
    let mut output = ciphertext.to_vec();
    for chunk in output.chunks_mut(16) {
        cipher.decrypt_block(chunk.into());
    }
    Ok(output)
}

/// Derive the KEK from its dumped hex text and decrypt the AUSKEY with it.
pub fn unlock(kek_hex: &str, auskey_hex: &str, profile: &DeviceProfile) -> Result<RecoveredKeys, RtlError> {
    let stored_kek = hex::decode(kek_hex.replace(' ', ""))?;
    let kek = KekScrambler::from_profile(profile)?.derive(&stored_kek)?;
    debug!(kek = hex::encode(kek), "KEK descrambled");

    let encrypted = hex::decode(auskey_hex.replace(' ', ""))?;
    let plaintext = aes_ecb_decrypt_blocks(&encrypted, &kek)?;

    if !plaintext.is_ascii() {
        return Err(RtlError::DecryptFailed(format!(
            "AUSKEY plaintext is not ASCII ({}), wrong KEK?",
            hex::encode(&plaintext)
        )));
    }
    // ASCII was checked above, so this is lossless
    let auskey = String::from_utf8_lossy(&plaintext).into_owned();
    if auskey.len() < ROOT_PASSWORD_LEN {
        return Err(RtlError::DecryptFailed("AUSKEY shorter than the root password".to_string()));
    }
    let root_password = auskey[auskey.len() - ROOT_PASSWORD_LEN..].to_string();

    Ok(RecoveredKeys {
        kek_hex: kek_hex.to_string(),
        kek,
        auskey_hex: auskey_hex.to_string(),
        auskey,
        root_password,
    })
}

// First dumped row of `region`, as one hex string
fn read_region_hex<T: Transport>(session: &mut BootSession<T>, region: FlashRegion) -> Result<String, RtlError> {
    let table = session.read_table(region.address, region.length, DecodePolicy::Strict)?;
    table.first_row_hex()
}

/// Scrambled KEK as hex text.
pub fn read_kek_hex<T: Transport>(session: &mut BootSession<T>) -> Result<String, RtlError> {
    let region = session.profile().kek;
    read_region_hex(session, region)
}

/// Both encrypted AUSKEY halves concatenated, as hex text.
pub fn read_auskey_hex<T: Transport>(session: &mut BootSession<T>) -> Result<String, RtlError> {
    let [first, second] = session.profile().auskey;
    let mut auskey_hex = read_region_hex(session, first)?;
    auskey_hex.push_str(&read_region_hex(session, second)?);
    Ok(auskey_hex)
}

/// Run the whole recovery against a live session.
pub fn recover_keys<T: Transport>(session: &mut BootSession<T>) -> Result<RecoveredKeys, RtlError> {
    session.sync_prompt()?;

    info!("Reading KEK...");
    let kek_hex = read_kek_hex(session)?;
    info!("Reading AUSKEY...");
    let auskey_hex = read_auskey_hex(session)?;

    let keys = unlock(&kek_hex, &auskey_hex, session.profile())?;
    info!("AUSKEY decrypted");
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEK_HEX: &str = "3132333435363738393A3B3C3D3E3F40";
    const AUSKEY_HEX: &str = "E4B0691BC26141146F0505E5C6F84B9B4F50CE7A2CB2ED43BBCA5A6158F2A187";

    #[test]
    fn test_unlock_known_vector() {
        let keys = unlock(KEK_HEX, AUSKEY_HEX, &DeviceProfile::default()).unwrap();
        assert_eq!(hex::encode(keys.kek), "6d417246774b7c502455295a2e5f3364");
        assert_eq!(keys.auskey, "auskey-0123456789abcdef-h4ckM3!!");
        assert_eq!(keys.root_password, "h4ckM3!!");
    }

    #[test]
    fn test_unlock_ignores_spaces_in_hex() {
        let spaced = "31323334 35363738 393A3B3C 3D3E3F40";
        let keys = unlock(spaced, AUSKEY_HEX, &DeviceProfile::default()).unwrap();
        assert_eq!(keys.root_password, "h4ckM3!!");
    }

    #[test]
    fn test_wrong_kek_is_decrypt_failure() {
        let result = unlock("00112233445566778899AABBCCDDEEFF", AUSKEY_HEX, &DeviceProfile::default());
        assert!(matches!(result, Err(RtlError::DecryptFailed(_))));
    }

    #[test]
    fn test_short_kek_is_derivation_failure() {
        let result = unlock("31323334", AUSKEY_HEX, &DeviceProfile::default());
        assert!(matches!(result, Err(RtlError::KeyDerivationFailed(_))));
    }

    #[test]
    fn test_partial_block_is_rejected() {
        let key = [0u8; KEK_LEN];
        assert!(matches!(aes_ecb_decrypt_blocks(&[0u8; 20], &key), Err(RtlError::DecryptFailed(_))));
    }

    #[test]
    fn test_non_hex_dump_is_malformed() {
        let result = unlock("not hex at all!!", AUSKEY_HEX, &DeviceProfile::default());
        assert!(matches!(result, Err(RtlError::MalformedResponse(_))));
    }
}

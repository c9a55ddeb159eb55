use crate::profile::DeviceProfile;
use std::fmt;

/// A command line understood by the Realtek boot monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `ESC` + `\n`, interrupts autoboot and redraws the prompt
    Wake,
    /// `FLR <staging> <address> <length>`: copy flash into RAM, asks for confirmation
    FlashRead { staging: u32, address: u32, length: u32 },
    /// `y\r`, answers the `FLR` confirmation question
    Confirm,
    /// `DW <staging> <count>`: print `count` 32-bit words starting at `staging`
    DumpWords { staging: u32, count: u32 },
}

impl Command {
    pub fn flash_read(profile: &DeviceProfile, address: u32, length: u32) -> Self {
        Command::FlashRead {
            staging: profile.staging_address,
            address,
            length,
        }
    }

    pub fn dump_words(profile: &DeviceProfile, count: u32) -> Self {
        Command::DumpWords {
            staging: profile.staging_address,
            count,
        }
    }

    /// Bytes to put on the wire, line terminator included.
    pub fn encode(&self, profile: &DeviceProfile) -> Vec<u8> {
        match self {
            Command::Wake => profile.wake_sequence.clone(),
            Command::Confirm => profile.confirm_reply.clone(),
            Command::FlashRead { .. } | Command::DumpWords { .. } => format!("{self}\n").into_bytes(),
        }
    }

    /// Text the monitor prints once it has finished answering this command.
    pub fn terminator<'a>(&self, profile: &'a DeviceProfile) -> &'a str {
        match self {
            Command::FlashRead { .. } => &profile.confirm_marker,
            Command::Wake | Command::Confirm | Command::DumpWords { .. } => &profile.prompt_banner,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Wake => write!(f, "<ESC>"),
            Command::Confirm => write!(f, "y"),
            // Addresses are bare uppercase hex, sizes are decimal
            Command::FlashRead {
                staging,
                address,
                length,
            } => write!(f, "FLR {staging:X} {address:X} {length}"),
            Command::DumpWords { staging, count } => write!(f, "DW {staging:X} {count}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_read_encoding() {
        let profile = DeviceProfile::default();
        let cmd = Command::flash_read(&profile, 0x401802, 16);
        assert_eq!(cmd.encode(&profile), b"FLR 80000000 401802 16\n");
        assert_eq!(cmd.terminator(&profile), "--> ");
    }

    #[test]
    fn test_flash_read_address_is_uppercase_hex() {
        let profile = DeviceProfile::default();
        let cmd = Command::flash_read(&profile, 0x2ABC00, 256);
        assert_eq!(cmd.encode(&profile), b"FLR 80000000 2ABC00 256\n");
    }

    #[test]
    fn test_dump_words_encoding() {
        let profile = DeviceProfile::default();
        let cmd = Command::dump_words(&profile, 64);
        assert_eq!(cmd.encode(&profile), b"DW 80000000 64\n");
        assert_eq!(cmd.terminator(&profile), "<RealTek>");
    }

    #[test]
    fn test_wake_and_confirm_encoding() {
        let profile = DeviceProfile::default();
        assert_eq!(Command::Wake.encode(&profile), b"\x1b\n");
        assert_eq!(Command::Confirm.encode(&profile), b"y\r");
        assert_eq!(Command::Confirm.terminator(&profile), "<RealTek>");
    }
}

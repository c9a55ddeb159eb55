// Bootloader constants for the Realtek RTL8196-family boot monitor

/// Default console baud rate of the boot monitor
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// RAM scratch address every `FLR` copy lands at
pub const STAGING_ADDRESS: u32 = 0x8000_0000;

/// Prompt printed when the monitor is idle and ready for a command
pub const PROMPT_BANNER: &str = "<RealTek>";

/// Tail of the "(Y)es, (N)o->" question printed by `FLR`
pub const CONFIRM_MARKER: &str = "--> ";

/// `ESC` + `\n`, interrupts autoboot and redraws the prompt
pub const WAKE_SEQUENCE: &[u8] = b"\x1b\n";

/// Reply accepted by the `FLR` confirmation question
pub const CONFIRM_REPLY: &[u8] = b"y\r";

/// Row separator of the `DW` table
pub const ROW_SEPARATOR: &str = "\n\r";

/// Column separator of the `DW` table
pub const COLUMN_SEPARATOR: char = '\t';

/// Delay between wake attempts (ms)
pub const SYNC_INTERVAL_MS: u64 = 200;

/// Size of one dumped word in bytes
pub const WORD_SIZE: u32 = 4;

/// Words printed per `DW` row
pub const WORDS_PER_ROW: usize = 4;

/// Start of the SPI flash window
pub const FLASH_BASE: u32 = 0x20_0000;

/// Default amount of flash swept by a dump (16 MiB)
pub const DEFAULT_DUMP_SIZE: u32 = 16 * 1024 * 1024;

/// Default bytes per `FLR`/`DW` round
pub const DEFAULT_STEP: u32 = 0x100;

/// Flash offset of the key-encryption-key
pub const KEK_ADDRESS: u32 = 0x40_1802;

/// Flash offsets of the two AUSKEY halves
pub const AUSKEY_ADDRESSES: [u32; 2] = [0x40_2002, 0x40_2012];

/// Size of the KEK and of each AUSKEY half
pub const KEY_BLOCK_SIZE: u32 = 16;

/// Divisor of the KEK scrambling routine
pub const KEK_DIVISOR: u32 = 0x5D;

/// Offset of the KEK scrambling routine (`'!'`)
pub const KEK_OFFSET: u8 = b'!';

/// Number of trailing AUSKEY plaintext bytes that form the root password
pub const ROOT_PASSWORD_LEN: usize = 8;

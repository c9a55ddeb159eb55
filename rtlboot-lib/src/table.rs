//! Parsing of the tabular output printed by the `DW` command.
//!
//! A dump looks like this on the wire (rows end in `\n\r`, columns are tabs):
//!
//! ```text
//! DW 80000000 8\n\r
//! 80000000:\t00112233\t44556677\t8899AABB\tCCDDEEFF\n\r
//! 80000010:\t01020304\t05060708\t090A0B0C\t0D0E0F10\n\r
//! <RealTek>
//! ```
//!
//! The first row echoes the command and is dropped, as is column 0 of every
//! remaining row. Words are most-significant byte first.

use crate::constants::{COLUMN_SEPARATOR, ROW_SEPARATOR, WORDS_PER_ROW};
use crate::error::RtlError;
use std::borrow::Cow;

/// How undecodable bytes in a response are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Replace invalid UTF-8 with U+FFFD and carry on
    #[default]
    Lossy,
    /// Fail with [`RtlError::Decode`]
    Strict,
}

impl DecodePolicy {
    pub fn decode<'a>(&self, raw: &'a [u8]) -> Result<Cow<'a, str>, RtlError> {
        match self {
            DecodePolicy::Lossy => Ok(String::from_utf8_lossy(raw)),
            DecodePolicy::Strict => Ok(Cow::Borrowed(std::str::from_utf8(raw)?)),
        }
    }
}

/// Word columns of a `DW` response, one entry per data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexWordTable {
    rows: Vec<Vec<String>>,
}

impl HexWordTable {
    /// Parse a decoded `DW` response. `prompt` is the monitor prompt that may
    /// close the response; that row and blank rows carry no data.
    pub fn parse(text: &str, prompt: &str) -> Result<Self, RtlError> {
        let mut rows = Vec::new();
        for line in text.split(ROW_SEPARATOR).skip(1) {
            let trimmed = line.trim();
            if trimmed.is_empty() || (!prompt.is_empty() && trimmed.contains(prompt)) {
                continue;
            }
            let mut columns = line.split(COLUMN_SEPARATOR);
            columns.next();
            let words: Vec<String> = columns
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect();
            if words.is_empty() {
                return Err(RtlError::MalformedResponse(format!(
                    "row without data columns: {trimmed:?}"
                )));
            }
            rows.push(words);
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn first_row(&self) -> Result<&[String], RtlError> {
        self.rows
            .first()
            .map(Vec::as_slice)
            .ok_or_else(|| RtlError::MalformedResponse("dump contains no data rows".to_string()))
    }

    /// The word columns of the first data row concatenated into one hex string.
    pub fn first_row_hex(&self) -> Result<String, RtlError> {
        Ok(self.first_row()?.concat())
    }

    /// All word strings in row order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(String::as_str)
    }

    pub fn word_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Every word parsed as a base-16 `u32`.
    pub fn to_u32s(&self) -> Result<Vec<u32>, RtlError> {
        self.words()
            .map(|w| {
                u32::from_str_radix(w, 16)
                    .map_err(|e| RtlError::MalformedResponse(format!("bad hex word {w:?}: {e}")))
            })
            .collect()
    }
}

/// Render words the way the monitor prints them. `echo` is the command line
/// that starts the response and `prompt` the line that closes it.
pub fn format_table(echo: &str, base: u32, words: &[u32], prompt: &str) -> String {
    let mut out = String::from(echo);
    for (i, row) in words.chunks(WORDS_PER_ROW).enumerate() {
        out.push_str(ROW_SEPARATOR);
        let row_addr = base.wrapping_add((i * WORDS_PER_ROW * 4) as u32);
        out.push_str(&format!("{row_addr:08X}:"));
        for word in row {
            out.push(COLUMN_SEPARATOR);
            out.push_str(&format!("{word:08X}"));
        }
    }
    out.push_str(ROW_SEPARATOR);
    out.push_str(prompt);
    out
}

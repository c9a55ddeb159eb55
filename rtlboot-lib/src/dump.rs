use crate::constants::WORD_SIZE;
use crate::error::RtlError;
use crate::session::BootSession;
use crate::table::DecodePolicy;
use crate::transport::Transport;
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;
use tracing::{debug, info};

// Log progress every this many bytes
const PROGRESS_INTERVAL: u64 = 0x1_0000;

/// The sequence of `FLR`/`DW` rounds needed to cover `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpPlan {
    start: u32,
    end: u32,
    step: u32,
}

impl DumpPlan {
    /// Validates the plan before anything is sent to the device.
    pub fn new(start: u32, end: u32, step: u32) -> Result<Self, RtlError> {
        if step == 0 || step % WORD_SIZE != 0 {
            return Err(RtlError::InvalidStep(step));
        }
        if start >= end {
            return Err(RtlError::InvalidRange { start, end });
        }
        Ok(Self { start, end, step })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    /// Start address of every round, in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = u32> + use<> {
        (self.start..self.end).step_by(self.step as usize)
    }

    pub fn read_count(&self) -> usize {
        (self.total_bytes().div_ceil(u64::from(self.step))) as usize
    }

    pub fn total_bytes(&self) -> u64 {
        u64::from(self.end - self.start)
    }
}

/// Progress report passed to the dump callback after every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpProgress {
    pub address: u32,
    pub bytes_written: u64,
    pub total_bytes: u64,
}

/// Write `words` as big-endian bytes, stopping after `limit` bytes.
/// Returns the number of bytes written.
pub fn write_words<W: Write>(out: &mut W, words: &[u32], limit: usize) -> std::io::Result<usize> {
    let mut written = 0;
    for &word in words {
        let remaining = limit - written;
        if remaining == 0 {
            break;
        }
        if remaining >= WORD_SIZE as usize {
            out.write_u32::<BigEndian>(word)?;
            written += WORD_SIZE as usize;
        } else {
            out.write_all(&word.to_be_bytes()[..remaining])?;
            written += remaining;
        }
    }
    Ok(written)
}

/// Sweep the flash range described by `plan` and mirror it into `out`.
///
/// The first error aborts the sweep; whatever was written so far stays in `out`.
pub fn dump_flash<T, W, F>(
    session: &mut BootSession<T>,
    plan: &DumpPlan,
    out: &mut W,
    policy: DecodePolicy,
    mut on_progress: F,
) -> Result<u64, RtlError>
where
    T: Transport,
    W: Write,
    F: FnMut(&DumpProgress),
{
    info!(
        start = format!("{:#x}", plan.start()),
        end = format!("{:#x}", plan.end()),
        step = format!("{:#x}", plan.step()),
        reads = plan.read_count(),
        "Starting..."
    );

    let mut bytes_written = 0u64;
    for address in plan.addresses() {
        debug!("Reading {:#x}", address);
        let words = match session.read_words(address, plan.step(), policy) {
            Ok(words) => words,
            Err(e) => {
                // Keep what was dumped so far, the read error is what gets reported
                let _ = out.flush();
                return Err(e);
            }
        };

        // A final partial step is read in full but only written up to `end`
        let limit = plan.step().min(plan.end() - address) as usize;
        bytes_written += write_words(out, &words, limit)? as u64;

        let progress = DumpProgress {
            address,
            bytes_written,
            total_bytes: plan.total_bytes(),
        };
        on_progress(&progress);
        if bytes_written % PROGRESS_INTERVAL < u64::from(plan.step()) {
            info!(
                "{:#x}: {}/{} bytes ({:.1}%)",
                address,
                bytes_written,
                plan.total_bytes(),
                bytes_written as f64 * 100.0 / plan.total_bytes() as f64
            );
        }
    }

    out.flush()?;
    info!(bytes = bytes_written, "Dump complete");
    Ok(bytes_written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_addresses() {
        let plan = DumpPlan::new(0x200000, 0x200400, 0x100).unwrap();
        let addresses: Vec<u32> = plan.addresses().collect();
        assert_eq!(addresses, vec![0x200000, 0x200100, 0x200200, 0x200300]);
        assert_eq!(plan.read_count(), 4);
    }

    #[test]
    fn test_plan_partial_last_step() {
        let plan = DumpPlan::new(0x1000, 0x1104, 0x100).unwrap();
        assert_eq!(plan.addresses().collect::<Vec<_>>(), vec![0x1000, 0x1100]);
        assert_eq!(plan.read_count(), 2);
        assert_eq!(plan.total_bytes(), 0x104);
    }

    #[test]
    fn test_plan_count_matches_ceiling() {
        for (start, end, step) in [(0u32, 1u32, 4u32), (0, 8, 4), (0, 9, 4), (0x10, 0x1000, 0x40), (7, 300, 12)] {
            let plan = DumpPlan::new(start, end, step).unwrap();
            let expected = (end - start).div_ceil(step) as usize;
            assert_eq!(plan.read_count(), expected);
            assert_eq!(plan.addresses().count(), expected);
        }
    }

    #[test]
    fn test_plan_rejects_bad_step() {
        assert!(matches!(DumpPlan::new(0, 0x100, 0x102), Err(RtlError::InvalidStep(0x102))));
        assert!(matches!(DumpPlan::new(0, 0x100, 0), Err(RtlError::InvalidStep(0))));
    }

    #[test]
    fn test_plan_rejects_empty_range() {
        assert!(matches!(DumpPlan::new(0x100, 0x100, 4), Err(RtlError::InvalidRange { .. })));
        assert!(matches!(DumpPlan::new(0x200, 0x100, 4), Err(RtlError::InvalidRange { .. })));
    }

    #[test]
    fn test_write_words_big_endian() {
        let mut out = Vec::new();
        let n = write_words(&mut out, &[0x0000_000A, 0x0000_000B], 8).unwrap();
        assert_eq!(n, 8);
        assert_eq!(out, vec![0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x0B]);
    }

    #[test]
    fn test_write_words_truncates_at_limit() {
        let mut out = Vec::new();
        let n = write_words(&mut out, &[0x11223344, 0x55667788], 6).unwrap();
        assert_eq!(n, 6);
        assert_eq!(out, vec![0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    }
}

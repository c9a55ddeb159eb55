//! In-memory stand-in for the Realtek boot monitor.
//!
//! [`SimulatedBootloader`] holds a flash image and answers the `ESC`, `FLR`,
//! `y` and `DW` commands the same way the real console does, which lets the
//! session, dumper and key recovery run end to end without hardware.

use crate::profile::DeviceProfile;
use crate::table::format_table;
use crate::transport::Transport;
use std::collections::VecDeque;
use std::io::{self, Read, Write};

const ESC: u8 = 0x1b;

#[derive(Debug)]
pub struct SimulatedBootloader {
    profile: DeviceProfile,
    flash_base: u32,
    flash: Vec<u8>,
    ram: Vec<u8>,
    line: Vec<u8>,
    output: VecDeque<u8>,
    pending_copy: Option<(u32, u32)>,
    silent: bool,
    ignore_wakes: usize,
    wakes: usize,
    noise: Vec<u8>,
    boot_noise: Vec<u8>,
    commands: Vec<String>,
    flash_reads: Vec<(u32, u32)>,
}

impl SimulatedBootloader {
    /// A monitor whose flash starts at `flash_base` and contains `image`.
    /// Reads outside the image return erased flash (`0xFF`).
    pub fn new(profile: DeviceProfile, flash_base: u32, image: Vec<u8>) -> Self {
        Self {
            profile,
            flash_base,
            flash: image,
            ram: Vec::new(),
            line: Vec::new(),
            output: VecDeque::new(),
            pending_copy: None,
            silent: false,
            ignore_wakes: 0,
            wakes: 0,
            noise: Vec::new(),
            boot_noise: Vec::new(),
            commands: Vec::new(),
            flash_reads: Vec::new(),
        }
    }

    /// A device that never prints anything.
    pub fn silent(profile: DeviceProfile) -> Self {
        let mut sim = Self::new(profile, 0, Vec::new());
        sim.silent = true;
        sim
    }

    /// Stay quiet for the first `count` wake sequences, as if still booting.
    pub fn ignoring_first_wakes(mut self, count: usize) -> Self {
        self.ignore_wakes = count;
        self
    }

    /// Append `noise` to the echo line of every `DW` response.
    pub fn with_dump_noise(mut self, noise: &[u8]) -> Self {
        self.noise = noise.to_vec();
        self
    }

    /// Print `noise` instead of the prompt for every ignored wake sequence.
    pub fn with_boot_noise(mut self, noise: &[u8]) -> Self {
        self.boot_noise = noise.to_vec();
        self
    }

    /// Command lines received so far, `ESC` shown as `<ESC>`.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// `(address, length)` of every confirmed `FLR`.
    pub fn flash_reads(&self) -> &[(u32, u32)] {
        &self.flash_reads
    }

    pub fn wakes(&self) -> usize {
        self.wakes
    }

    fn emit(&mut self, text: &[u8]) {
        if !self.silent {
            self.output.extend(text);
        }
    }

    fn flash_byte(&self, address: u32) -> u8 {
        address
            .checked_sub(self.flash_base)
            .and_then(|offset| self.flash.get(offset as usize))
            .copied()
            .unwrap_or(0xFF)
    }

    fn handle_line(&mut self, line: Vec<u8>) {
        let prompt = self.profile.prompt_banner.clone();

        if line == [ESC] {
            self.commands.push("<ESC>".to_string());
            self.wakes += 1;
            if self.wakes > self.ignore_wakes {
                self.emit(format!("\r\n{prompt}").as_bytes());
            } else {
                let noise = self.boot_noise.clone();
                self.emit(&noise);
            }
            return;
        }

        let text = String::from_utf8_lossy(&line).trim().to_string();
        if text.is_empty() {
            return;
        }
        self.commands.push(text.clone());

        if let Some((address, length)) = self.pending_copy.take() {
            if text.eq_ignore_ascii_case("y") {
                self.ram = (0..length).map(|i| self.flash_byte(address.wrapping_add(i))).collect();
                self.flash_reads.push((address, length));
                self.emit(format!("{text}\n\rFlash Read Succeed!\n\r{prompt}").as_bytes());
            } else {
                self.emit(format!("{text}\n\rAbort!\n\r{prompt}").as_bytes());
            }
            return;
        }

        let parts: Vec<&str> = text.split_whitespace().collect();
        match parts.as_slice() {
            ["FLR", dst, src, len] => {
                let parsed = (
                    u32::from_str_radix(dst, 16),
                    u32::from_str_radix(src, 16),
                    len.parse::<u32>(),
                );
                if let (Ok(_), Ok(address), Ok(length)) = parsed {
                    self.pending_copy = Some((address, length));
                    self.emit(
                        format!(
                            "{text}\n\rFlash read from {address:X} to {dst} with {length:X} bytes\n\r(Y)es , (N)o ? {}",
                            self.profile.confirm_marker
                        )
                        .as_bytes(),
                    );
                } else {
                    self.emit(format!("{text}\n\rUsage: FLR <dst> <src> <length>\n\r{prompt}").as_bytes());
                }
            }
            ["DW", addr, count] => {
                let parsed = (u32::from_str_radix(addr, 16), count.parse::<usize>());
                if let (Ok(addr), Ok(count)) = parsed {
                    let offset = addr.wrapping_sub(self.profile.staging_address) as usize;
                    let words: Vec<u32> = (0..count)
                        .map(|i| {
                            let mut word = [0u8; 4];
                            for (j, byte) in word.iter_mut().enumerate() {
                                *byte = self.ram.get(offset.wrapping_add(i * 4 + j)).copied().unwrap_or(0);
                            }
                            u32::from_be_bytes(word)
                        })
                        .collect();
                    let mut echo = text.clone().into_bytes();
                    echo.extend_from_slice(&self.noise);
                    // The echo row may carry arbitrary bytes, format the rest as text
                    let table = format_table("", addr, &words, &prompt);
                    echo.extend_from_slice(table.as_bytes());
                    self.emit(&echo);
                } else {
                    self.emit(format!("{text}\n\rUsage: DW <addr> <count>\n\r{prompt}").as_bytes());
                }
            }
            _ => self.emit(format!("{text}\n\rUnknown command !\n\r{prompt}").as_bytes()),
        }
    }
}

impl Read for SimulatedBootloader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.output.len());
        for (slot, byte) in buf.iter_mut().zip(self.output.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for SimulatedBootloader {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            match byte {
                b'\n' | b'\r' => {
                    let line = std::mem::take(&mut self.line);
                    self.handle_line(line);
                }
                _ => self.line.push(byte),
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for SimulatedBootloader {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        Ok(self.output.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(sim: &mut SimulatedBootloader) -> String {
        let mut buf = vec![0u8; sim.bytes_to_read().unwrap()];
        sim.read_exact(&mut buf).unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    #[test]
    fn test_wake_prints_prompt() {
        let mut sim = SimulatedBootloader::new(DeviceProfile::default(), 0, Vec::new());
        sim.write_all(b"\x1b\n").unwrap();
        assert!(drain(&mut sim).contains("<RealTek>"));
        assert_eq!(sim.wakes(), 1);
    }

    #[test]
    fn test_flr_then_dw_dumps_flash() {
        let image = vec![0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77];
        let mut sim = SimulatedBootloader::new(DeviceProfile::default(), 0x1000, image);

        sim.write_all(b"FLR 80000000 1000 8\n").unwrap();
        assert!(drain(&mut sim).ends_with("--> "));
        sim.write_all(b"y\r").unwrap();
        assert!(drain(&mut sim).ends_with("<RealTek>"));
        sim.write_all(b"DW 80000000 2\n").unwrap();
        let dump = drain(&mut sim);

        assert!(dump.starts_with("DW 80000000 2\n\r80000000:\t00112233\t44556677"));
        assert_eq!(sim.flash_reads(), &[(0x1000, 8)]);
    }

    #[test]
    fn test_reads_past_image_are_erased_flash() {
        let sim = SimulatedBootloader::new(DeviceProfile::default(), 0x1000, vec![0xAB]);
        assert_eq!(sim.flash_byte(0x1000), 0xAB);
        assert_eq!(sim.flash_byte(0x1001), 0xFF);
        assert_eq!(sim.flash_byte(0x0FFF), 0xFF);
    }

    #[test]
    fn test_silent_device_never_answers() {
        let mut sim = SimulatedBootloader::silent(DeviceProfile::default());
        sim.write_all(b"\x1b\nFLR 80000000 0 4\n").unwrap();
        assert_eq!(sim.bytes_to_read().unwrap(), 0);
    }
}

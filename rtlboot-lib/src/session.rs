use crate::command::Command;
use crate::constants::WORD_SIZE;
use crate::error::RtlError;
use crate::profile::DeviceProfile;
use crate::table::{DecodePolicy, HexWordTable};
use crate::transport::{self, Transport};
use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem;
use serialport::SerialPort;
use std::io::ErrorKind;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

// Default deadline for a single terminator wait
const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

// Default deadline for the whole wake/sync phase
const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(60);

// Back-off when the transport has nothing to offer
const IDLE_BACKOFF: Duration = Duration::from_millis(5);

// Bytes kept while hunting for the prompt during sync
const SYNC_WINDOW: usize = 4096;

/// Deadlines applied to device waits. `None` waits forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub response_timeout: Option<Duration>,
    pub sync_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
            sync_timeout: Some(DEFAULT_SYNC_TIMEOUT),
        }
    }
}

/// An exclusive command/response session with the boot monitor.
///
/// The session owns its transport, so the serial port is closed whenever the
/// session goes out of scope, on error paths included.
pub struct BootSession<T: Transport> {
    transport: T,
    profile: DeviceProfile,
    config: SessionConfig,
    pending: BytesMut,
}

impl BootSession<Box<dyn SerialPort>> {
    /// Open the serial port at `path` and wrap it in a session.
    pub fn open(path: &str, profile: DeviceProfile, config: SessionConfig) -> Result<Self, RtlError> {
        let port = transport::open_serial(path, &profile)?;
        Ok(Self::new(port, profile, config))
    }
}

impl<T: Transport> BootSession<T> {
    pub fn new(transport: T, profile: DeviceProfile, config: SessionConfig) -> Self {
        Self {
            transport,
            profile,
            config,
            pending: BytesMut::with_capacity(1024),
        }
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    fn send(&mut self, cmd: Command) -> Result<(), RtlError> {
        let bytes = cmd.encode(&self.profile);
        debug!(command = %cmd, bytes = hex::encode(&bytes), "Serial Write");
        self.transport.write_all(&bytes)?;
        self.transport.flush()?;
        Ok(())
    }

    /// Send the wake sequence until the prompt banner shows up.
    ///
    /// Returns the number of wake attempts it took.
    pub fn sync_prompt(&mut self) -> Result<u32, RtlError> {
        let started = Instant::now();
        let banner = self.profile.prompt_banner.clone().into_bytes();
        let mut attempts = 0u32;
        info!("Waiting for {} prompt...", self.profile.prompt_banner);

        loop {
            attempts += 1;
            debug!(attempt = attempts, "Sending ESC and NL");
            self.send(Command::Wake)?;
            thread::sleep(self.profile.sync_interval());

            let available = self.transport.bytes_to_read()?;
            if available > 0 {
                let mut buf = vec![0u8; available];
                let n = self.read_some(&mut buf)?;
                trace!(text = %String::from_utf8_lossy(&buf[..n]).escape_debug(), "Sync read");
                self.pending.extend_from_slice(&buf[..n]);
            }

            if memmem::find(&self.pending, &banner).is_some() {
                info!(attempts, "{} detected.", self.profile.prompt_banner);
                // Whatever the monitor printed while waking up is noise
                self.pending.clear();
                return Ok(attempts);
            }

            if self.pending.len() > SYNC_WINDOW {
                let excess = self.pending.len() - SYNC_WINDOW;
                self.pending.advance(excess);
            }

            if let Some(limit) = self.config.sync_timeout {
                if started.elapsed() >= limit {
                    return Err(RtlError::ProtocolTimeout {
                        waiting_for: self.profile.prompt_banner.clone(),
                        elapsed: started.elapsed(),
                    });
                }
            }
        }
    }

    // One read, with poll timeouts reported as zero bytes
    fn read_some(&mut self, buf: &mut [u8]) -> Result<usize, RtlError> {
        match self.transport.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read until `terminator` has been received and return everything up to
    /// and including it. Bytes after the terminator stay buffered for the next read.
    pub fn read_until(&mut self, terminator: &str) -> Result<Bytes, RtlError> {
        let started = Instant::now();
        let needle = terminator.as_bytes();
        let mut buf = [0u8; 512];
        let mut searched = 0usize;

        loop {
            // Only rescan the tail that could hold a new match
            let from = searched.saturating_sub(needle.len().saturating_sub(1));
            if let Some(pos) = memmem::find(&self.pending[from..], needle) {
                let frame = self.pending.split_to(from + pos + needle.len()).freeze();
                trace!(len = frame.len(), terminator = %terminator.escape_debug(), "Frame complete");
                return Ok(frame);
            }
            searched = self.pending.len();

            if let Some(limit) = self.config.response_timeout {
                if started.elapsed() >= limit {
                    return Err(RtlError::ProtocolTimeout {
                        waiting_for: terminator.to_string(),
                        elapsed: started.elapsed(),
                    });
                }
            }

            match self.read_some(&mut buf)? {
                0 => thread::sleep(IDLE_BACKOFF),
                n => self.pending.extend_from_slice(&buf[..n]),
            }
        }
    }

    /// Send `cmd` and wait for the terminator it is answered with.
    pub fn exchange(&mut self, cmd: Command) -> Result<Bytes, RtlError> {
        let terminator = cmd.terminator(&self.profile).to_string();
        self.send(cmd)?;
        let reply = self.read_until(&terminator)?;
        debug!(command = %cmd, reply = %String::from_utf8_lossy(&reply).escape_debug(), "Serial Read");
        Ok(reply)
    }

    /// Copy `length` bytes of flash at `address` to the staging area, dump them
    /// with `DW` and parse the resulting table.
    pub fn read_table(&mut self, address: u32, length: u32, policy: DecodePolicy) -> Result<HexWordTable, RtlError> {
        if length == 0 || length % WORD_SIZE != 0 {
            return Err(RtlError::InvalidLength(length));
        }

        self.exchange(Command::flash_read(&self.profile, address, length))?;
        self.exchange(Command::Confirm)?;
        let frame = self.exchange(Command::dump_words(&self.profile, length / WORD_SIZE))?;

        let text = policy.decode(&frame)?;
        HexWordTable::parse(&text, &self.profile.prompt_banner)
    }

    /// Like [`read_table`](Self::read_table) but returns the words as integers
    /// and checks that exactly `length / 4` of them came back.
    pub fn read_words(&mut self, address: u32, length: u32, policy: DecodePolicy) -> Result<Vec<u32>, RtlError> {
        let words = self.read_table(address, length, policy)?.to_u32s()?;
        let expected = (length / WORD_SIZE) as usize;
        if words.len() != expected {
            return Err(RtlError::MalformedResponse(format!(
                "expected {expected} words at {address:#x}, got {}",
                words.len()
            )));
        }
        Ok(words)
    }
}

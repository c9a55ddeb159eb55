use crate::error::RtlError;
use crate::profile::DeviceProfile;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::info;

/// Poll interval of a single blocking read on the serial line. Reads that
/// return nothing within this window are retried until the caller's deadline.
pub const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A byte stream to the boot monitor.
pub trait Transport: Read + Write {
    /// Number of bytes that can be read right now without blocking.
    fn bytes_to_read(&mut self) -> io::Result<usize>;
}

impl Transport for Box<dyn SerialPort> {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        let available = SerialPort::bytes_to_read(self.as_ref())?;
        Ok(available as usize)
    }
}

/// Open the console port at the profile's baud rate, 8N1, no flow control.
pub fn open_serial(path: &str, profile: &DeviceProfile) -> Result<Box<dyn SerialPort>, RtlError> {
    info!(port = path, baud = profile.baud_rate, "Opening serial port");
    let port = serialport::new(path, profile.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(READ_POLL_INTERVAL)
        .open()?;
    Ok(port)
}

/// Serial ports the OS knows about, as `(name, description)` pairs.
pub fn list_ports() -> Result<Vec<(String, String)>, RtlError> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let description = match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => format!(
                    "USB {:04x}:{:04x} {}",
                    usb.vid,
                    usb.pid,
                    usb.product.unwrap_or_default()
                ),
                serialport::SerialPortType::PciPort => "PCI".to_string(),
                serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
                serialport::SerialPortType::Unknown => "Unknown".to_string(),
            };
            (p.port_name, description)
        })
        .collect())
}

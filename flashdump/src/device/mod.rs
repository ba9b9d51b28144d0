//! Serial port discovery and classification.
//!
//! Enumerates serial endpoints and tags the ones that look like a Flipper
//! Zero (including its USB-UART bridge mode used to reach the Wi-Fi dev
//! board), an Espressif native USB device, or a common USB-UART bridge.
//! Nothing here opens a port.

use crate::error::{Error, Result};

#[cfg(feature = "native")]
use log::{debug, info, trace};

/// Known USB device kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Flipper Zero CDC port (also used in USB-UART bridge mode).
    FlipperZero,
    /// Espressif native USB (ESP32-S2/S3 dev boards, including the Flipper
    /// Wi-Fi dev board).
    Esp32Native,
    /// CH340/CH341 USB-to-Serial converter.
    Ch340,
    /// Silicon Labs CP210x USB-to-Serial converter.
    Cp210x,
    /// FTDI USB-to-Serial converter.
    Ftdi,
    /// Unknown device.
    Unknown,
}

/// Known USB VID/PID pairs. An empty PID list matches any PID.
const KNOWN_USB_DEVICES: &[(u16, &[u16], DeviceKind)] = &[
    (0x0483, &[0x5740], DeviceKind::FlipperZero),
    (0x303A, &[], DeviceKind::Esp32Native),
    (
        0x1A86,
        &[0x7523, 0x7522, 0x5523, 0x55D4],
        DeviceKind::Ch340,
    ),
    (0x10C4, &[0xEA60, 0xEA70], DeviceKind::Cp210x),
    (0x0403, &[0x6001, 0x6010, 0x6014, 0x6015], DeviceKind::Ftdi),
];

impl DeviceKind {
    /// Classify a USB VID/PID pair.
    #[must_use]
    pub fn from_vid_pid(vid: u16, pid: u16) -> Self {
        KNOWN_USB_DEVICES
            .iter()
            .find(|(known_vid, pids, _)| {
                vid == *known_vid && (pids.is_empty() || pids.contains(&pid))
            })
            .map_or(Self::Unknown, |(_, _, kind)| *kind)
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FlipperZero => "Flipper Zero",
            Self::Esp32Native => "ESP32 USB",
            Self::Ch340 => "CH340/CH341",
            Self::Cp210x => "CP210x",
            Self::Ftdi => "FTDI",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether this is a recognised device.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Preferred during auto-selection.
    pub fn is_board(&self) -> bool {
        matches!(self, Self::FlipperZero | Self::Esp32Native)
    }
}

/// A discovered serial endpoint.
#[derive(Debug, Clone)]
pub struct DetectedPort {
    /// Port name/path (e.g., "/dev/ttyACM0" or "COM3").
    pub name: String,
    /// Classified device kind.
    pub device: DeviceKind,
    /// USB Vendor ID (if available).
    pub vid: Option<u16>,
    /// USB Product ID (if available).
    pub pid: Option<u16>,
    /// Manufacturer string (if available).
    pub manufacturer: Option<String>,
    /// Product string (if available).
    pub product: Option<String>,
    /// Serial number (if available).
    pub serial: Option<String>,
}

/// List all serial ports with metadata.
///
/// Fails with [`Error::Serial`] when the platform cannot enumerate ports.
#[cfg(feature = "native")]
pub fn detect_ports() -> Result<Vec<DetectedPort>> {
    let ports = serialport::available_ports().inspect_err(|e| {
        debug!("Failed to enumerate serial ports: {e}");
    })?;

    let found = ports
        .into_iter()
        .map(|port_info| {
            let mut detected = DetectedPort {
                name: port_info.port_name.clone(),
                device: DeviceKind::Unknown,
                vid: None,
                pid: None,
                manufacturer: None,
                product: None,
                serial: None,
            };

            if let serialport::SerialPortType::UsbPort(usb_info) = port_info.port_type {
                detected.vid = Some(usb_info.vid);
                detected.pid = Some(usb_info.pid);
                detected.manufacturer = usb_info.manufacturer;
                detected.product = usb_info.product;
                detected.serial = usb_info.serial_number;
                detected.device = DeviceKind::from_vid_pid(usb_info.vid, usb_info.pid);

                trace!(
                    "Found USB port: {} (VID: {:04X}, PID: {:04X}, Device: {:?})",
                    port_info.port_name, usb_info.vid, usb_info.pid, detected.device
                );
            }

            detected
        })
        .collect();
    Ok(found)
}

/// List all serial ports (no native support compiled in).
#[cfg(not(feature = "native"))]
pub fn detect_ports() -> Result<Vec<DetectedPort>> {
    Ok(Vec::new())
}

/// Pick the best port from a list: boards first, then known bridges, then
/// the first port.
pub fn select_port(ports: Vec<DetectedPort>) -> Result<DetectedPort> {
    let best = ports
        .iter()
        .position(|p| p.device.is_board())
        .or_else(|| ports.iter().position(|p| p.device.is_known()))
        .or_else(|| (!ports.is_empty()).then_some(0))
        .ok_or(Error::DeviceNotFound)?;
    ports.into_iter().nth(best).ok_or(Error::DeviceNotFound)
}

/// Auto-detect a single port.
#[cfg(feature = "native")]
pub fn auto_detect_port() -> Result<DetectedPort> {
    let port = select_port(detect_ports()?)?;
    info!("Auto-detected {} port: {}", port.device.name(), port.name);
    Ok(port)
}

/// Auto-detect a single port (no native support compiled in).
#[cfg(not(feature = "native"))]
pub fn auto_detect_port() -> Result<DetectedPort> {
    Err(Error::Unsupported(
        "port detection requires the `native` feature".to_string(),
    ))
}

/// Format ports for display, one line each.
pub fn format_port_list(ports: &[DetectedPort]) -> Vec<String> {
    ports
        .iter()
        .map(|port| {
            let device_info = if port.device.is_known() {
                format!(" [{}]", port.device.name())
            } else if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
                format!(" [VID:{vid:04X} PID:{pid:04X}]")
            } else {
                String::new()
            };

            let product_info = port
                .product
                .as_ref()
                .map(|p| format!(" - {p}"))
                .unwrap_or_default();

            format!("{}{}{}", port.name, device_info, product_info)
        })
        .collect()
}

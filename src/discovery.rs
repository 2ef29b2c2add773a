use serde::Serialize;
use std::fs;
use tracing::debug;

// -------------------- Default port --------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Other,
}

impl Platform {
    pub fn current() -> Platform {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }
}

const LINUX_FALLBACK: &str = "/dev/ttyUSB0";
const MACOS_FALLBACK: &str = "/dev/cu.usbserial-A11DA9X2";
const OTHER_FALLBACK: &str = "COM3";

/// Choose a device path from the names found in `/dev`.
pub fn pick_port<I>(dev_entries: I, platform: Platform) -> String
where
    I: IntoIterator<Item = String>,
{
    let prefixes: &[&str] = match platform {
        Platform::Linux => &["ttyUSB", "ttyACM"],
        Platform::MacOs => &["cu.usbserial-", "cu.usbmodem"],
        Platform::Other => return OTHER_FALLBACK.to_string(),
    };
    let mut matches: Vec<String> = dev_entries
        .into_iter()
        .filter(|name| prefixes.iter().any(|p| name.starts_with(p)))
        .collect();
    // directory order is arbitrary
    matches.sort();
    match matches.into_iter().next() {
        Some(name) => format!("/dev/{name}"),
        None if platform == Platform::Linux => LINUX_FALLBACK.to_string(),
        None => MACOS_FALLBACK.to_string(),
    }
}

/// Find the transceiver by filename convention.
pub fn find_usb_port() -> String {
    let platform = Platform::current();
    let entries: Vec<String> = match fs::read_dir("/dev") {
        Ok(dir) => dir
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect(),
        Err(e) => {
            debug!("cannot list /dev: {e}");
            Vec::new()
        }
    };
    let port = pick_port(entries, platform);
    debug!("discovered port {port} ({platform:?})");
    port
}

// -------------------- Enumeration --------------------

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub port_type: String, // "usb" | "pci" | "bluetooth" | "unknown"
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl SerialPortInfo {
    fn bare(port_name: String, port_type: &str) -> Self {
        Self {
            port_name,
            port_type: port_type.into(),
            vid: None,
            pid: None,
            serial_number: None,
            manufacturer: None,
            product: None,
        }
    }
}

impl From<serialport::SerialPortInfo> for SerialPortInfo {
    fn from(p: serialport::SerialPortInfo) -> Self {
        match p.port_type {
            serialport::SerialPortType::UsbPort(info) => SerialPortInfo {
                port_name: p.port_name,
                port_type: "usb".into(),
                vid: Some(info.vid),
                pid: Some(info.pid),
                serial_number: info.serial_number,
                manufacturer: info.manufacturer,
                product: info.product,
            },
            serialport::SerialPortType::BluetoothPort => Self::bare(p.port_name, "bluetooth"),
            serialport::SerialPortType::PciPort => Self::bare(p.port_name, "pci"),
            serialport::SerialPortType::Unknown => Self::bare(p.port_name, "unknown"),
        }
    }
}

pub fn list_ports() -> Result<Vec<SerialPortInfo>, serialport::Error> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(SerialPortInfo::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn linux_prefers_first_usb_tty() {
        let dev = names(&["tty0", "ttyUSB1", "null", "ttyACM0", "ttyUSB0"]);
        assert_eq!(pick_port(dev, Platform::Linux), "/dev/ttyACM0");
        let dev = names(&["tty0", "ttyUSB3", "ttyS0"]);
        assert_eq!(pick_port(dev, Platform::Linux), "/dev/ttyUSB3");
    }

    #[test]
    fn linux_fallback() {
        assert_eq!(pick_port(names(&["tty0", "ttyS0"]), Platform::Linux), "/dev/ttyUSB0");
    }

    #[test]
    fn macos_uses_callout_devices() {
        let dev = names(&["tty.usbserial-A1", "cu.usbserial-A1", "cu.Bluetooth"]);
        assert_eq!(pick_port(dev, Platform::MacOs), "/dev/cu.usbserial-A1");
        let dev = names(&["cu.usbmodem1101"]);
        assert_eq!(pick_port(dev, Platform::MacOs), "/dev/cu.usbmodem1101");
        assert_eq!(pick_port(Vec::new(), Platform::MacOs), MACOS_FALLBACK);
    }

    #[test]
    fn other_platforms_use_com3() {
        assert_eq!(pick_port(names(&["ttyUSB0"]), Platform::Other), "COM3");
    }
}

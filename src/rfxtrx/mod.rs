//! RFXtrx serial transceiver driver: packet layouts, stream framing, and the
//! worker thread that owns the port.

pub mod framing;
pub mod link;
pub mod packet;

pub use link::{SerialConnector, SerialLink};
pub use packet::LightingPacket;

// hex converter helper
pub fn to_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

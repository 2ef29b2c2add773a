//! RFXtrx packet layouts
//!
//! Outbound: lighting commands (packet types 0x10..=0x15) and the 14-byte
//! interface control packet used by the handshake. Inbound: interface
//! responses and transmitter acknowledgements; anything else is reported by
//! packet type only.

use crate::address::{DeviceAddress, Target};
use crate::error::BridgeError;
use crate::protocol::{LightingFamily, Switch};

const INTERFACE_CONTROL: u8 = 0x00;
const INTERFACE_MESSAGE: u8 = 0x01;
const RECEIVER_TRANSMITTER: u8 = 0x02;

/// Interface control commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Reset = 0x00,
    GetStatus = 0x02,
    StartReceiver = 0x07,
}

pub fn control_packet(cmd: ControlCommand, seq: u8) -> Vec<u8> {
    let mut out = vec![0u8; 14];
    out[0] = 0x0D;
    out[1] = INTERFACE_CONTROL;
    out[2] = 0x00;
    if cmd != ControlCommand::Reset {
        out[3] = seq;
    }
    out[4] = cmd as u8;
    out
}

// Lighting4 pulse width in microseconds
const PT2262_PULSE_US: u16 = 350;

/// One on/off transmission to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightingPacket {
    pub address: DeviceAddress,
    pub switch: Switch,
}

impl LightingPacket {
    pub fn new(address: DeviceAddress, switch: Switch) -> Self {
        Self { address, switch }
    }

    pub fn family(&self) -> LightingFamily {
        self.address.protocol.family()
    }

    /// Serialise with the given sequence number, length byte first.
    pub fn encode(&self, seq: u8) -> Vec<u8> {
        let family = self.family();
        let mut out = vec![0u8, family.packet_type(), self.address.protocol.subtype(), seq];
        let on = self.switch == Switch::On;

        match (&self.address.target, family) {
            (Target::HouseUnit { house, unit }, _) => {
                out.extend_from_slice(&[*house, *unit, on as u8]);
            }
            (Target::IdUnit { id, unit }, LightingFamily::Lighting2) => {
                out.extend_from_slice(&[
                    ((id >> 24) & 0x03) as u8,
                    (id >> 16) as u8,
                    (id >> 8) as u8,
                    *id as u8,
                    *unit,
                    on as u8,
                    0x00, // level
                ]);
            }
            (Target::IdUnit { id, unit }, _) => {
                out.extend_from_slice(&[
                    (id >> 16) as u8,
                    (id >> 8) as u8,
                    *id as u8,
                    *unit,
                    on as u8,
                    0x00, // level
                ]);
            }
            (Target::SystemChannel { system, channel }, _) => {
                let mask: u16 = 1 << (channel - 1);
                out.extend_from_slice(&[
                    *system,
                    (mask & 0xFF) as u8,
                    ((mask >> 8) & 0x03) as u8,
                    if on { 0x10 } else { 0x1A },
                ]);
            }
            (Target::Code { code }, _) => {
                out.extend_from_slice(&[
                    (code >> 16) as u8,
                    (code >> 8) as u8,
                    *code as u8,
                    (PT2262_PULSE_US >> 8) as u8,
                    PT2262_PULSE_US as u8,
                ]);
            }
            (Target::IdGroupUnit { id, group, unit }, _) => {
                out.extend_from_slice(&[
                    (id >> 8) as u8,
                    *id as u8,
                    *group,
                    *unit,
                    // Blyss inverts the command byte
                    if on { 0x00 } else { 0x01 },
                    seq % 5, // command sequence
                    0x00,
                ]);
            }
        }

        out.push(0x00); // rssi / filler
        out[0] = (out.len() - 1) as u8;
        out
    }
}

/// Result code of a transmitter response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxCode {
    Ack,
    AckDelayed,
    Nak,
    NakInvalidAddress,
    Unknown(u8),
}

impl From<u8> for TxCode {
    fn from(b: u8) -> Self {
        match b {
            0x00 => TxCode::Ack,
            0x01 => TxCode::AckDelayed,
            0x02 => TxCode::Nak,
            0x03 => TxCode::NakInvalidAddress,
            other => TxCode::Unknown(other),
        }
    }
}

impl TxCode {
    pub fn into_result(self) -> Result<(), BridgeError> {
        match self {
            TxCode::Ack | TxCode::AckDelayed => Ok(()),
            TxCode::NakInvalidAddress => Err(BridgeError::NakInvalidAddress),
            TxCode::Nak | TxCode::Unknown(_) => Err(BridgeError::Nak),
        }
    }
}

/// Decoded inbound packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Status {
        transceiver_type: u8,
        firmware_version: u8,
    },
    ReceiverStarted,
    WrongCommand,
    TransmitAck {
        seq: u8,
        code: TxCode,
    },
    ReceiverLockError,
    Other {
        packet_type: u8,
    },
}

/// `packet` includes the length byte.
pub fn decode(packet: &[u8]) -> Inbound {
    let get = |i: usize| packet.get(i).copied().unwrap_or(0);
    match (get(1), get(2)) {
        (INTERFACE_MESSAGE, 0x00) => Inbound::Status {
            transceiver_type: get(5),
            firmware_version: get(6),
        },
        (INTERFACE_MESSAGE, 0x07) => Inbound::ReceiverStarted,
        (INTERFACE_MESSAGE, 0xFF) => Inbound::WrongCommand,
        (RECEIVER_TRANSMITTER, 0x00) => Inbound::ReceiverLockError,
        (RECEIVER_TRANSMITTER, 0x01) => Inbound::TransmitAck {
            seq: get(3),
            code: TxCode::from(get(4)),
        },
        (packet_type, _) => Inbound::Other { packet_type },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Protocol;

    fn packet(p: Protocol, id: &str, house: &str, unit: u32, sw: Switch) -> LightingPacket {
        LightingPacket::new(DeviceAddress::resolve(p, id, house, unit).unwrap(), sw)
    }

    #[test]
    fn arc_matches_known_frame() {
        // 07 10 01 62 41 01 01 00
        let bytes = packet(Protocol::Arc, "", "A", 1, Switch::On).encode(0x62);
        assert_eq!(bytes, vec![0x07, 0x10, 0x01, 0x62, 0x41, 0x01, 0x01, 0x00]);
    }

    #[test]
    fn ac_off() {
        let bytes = packet(Protocol::Ac, "02382C82", "", 2, Switch::Off).encode(0x05);
        assert_eq!(
            bytes,
            vec![0x0B, 0x11, 0x00, 0x05, 0x02, 0x38, 0x2C, 0x82, 0x02, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn koppla_channel_mask() {
        let bytes = packet(Protocol::IkeaKoppla, "2", "", 10, Switch::On).encode(1);
        assert_eq!(bytes, vec![0x08, 0x12, 0x00, 0x01, 0x02, 0x00, 0x02, 0x10, 0x00]);
        let bytes = packet(Protocol::IkeaKoppla, "2", "", 3, Switch::Off).encode(1);
        assert_eq!(bytes[5..8], [0x04, 0x00, 0x1A]);
    }

    #[test]
    fn pt2262_code_and_pulse() {
        let bytes = packet(Protocol::Pt2262, "015510", "", 1, Switch::On).encode(9);
        assert_eq!(
            bytes,
            vec![0x09, 0x13, 0x00, 0x09, 0x01, 0x55, 0x10, 0x01, 0x5E, 0x00]
        );
    }

    #[test]
    fn lightwave_layout() {
        let bytes = packet(Protocol::LightwaveRf, "F394AB", "", 1, Switch::On).encode(2);
        assert_eq!(
            bytes,
            vec![0x0A, 0x14, 0x00, 0x02, 0xF3, 0x94, 0xAB, 0x01, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn blyss_inverts_command() {
        let on = packet(Protocol::Blyss, "F09A", "K", 4, Switch::On).encode(7);
        assert_eq!(
            on,
            vec![0x0B, 0x15, 0x00, 0x07, 0xF0, 0x9A, b'K', 0x04, 0x00, 0x02, 0x00, 0x00]
        );
        let off = packet(Protocol::Blyss, "F09A", "K", 4, Switch::Off).encode(7);
        assert_eq!(off[8], 0x01);
    }

    #[test]
    fn control_packets() {
        assert_eq!(
            control_packet(ControlCommand::Reset, 9),
            vec![0x0D, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
        );
        let status = control_packet(ControlCommand::GetStatus, 1);
        assert_eq!(&status[..5], &[0x0D, 0x00, 0x00, 0x01, 0x02]);
        assert_eq!(status.len(), 14);
    }

    #[test]
    fn decode_inbound() {
        assert_eq!(
            decode(&[0x04, 0x02, 0x01, 0x11, 0x00]),
            Inbound::TransmitAck {
                seq: 0x11,
                code: TxCode::Ack
            }
        );
        assert_eq!(
            decode(&[0x04, 0x02, 0x01, 0x11, 0x03]),
            Inbound::TransmitAck {
                seq: 0x11,
                code: TxCode::NakInvalidAddress
            }
        );
        assert_eq!(
            decode(&[0x0D, 0x01, 0x00, 0x01, 0x02, 0x53, 0x5A, 0, 0, 0, 0, 0, 0, 0]),
            Inbound::Status {
                transceiver_type: 0x53,
                firmware_version: 0x5A
            }
        );
        assert_eq!(decode(&[0x14, 0x01, 0x07, 0x03]), Inbound::ReceiverStarted);
        assert_eq!(decode(&[0x0A, 0x52, 0x01]), Inbound::Other { packet_type: 0x52 });
    }

    #[test]
    fn tx_codes() {
        assert!(TxCode::AckDelayed.into_result().is_ok());
        assert!(matches!(TxCode::Nak.into_result(), Err(BridgeError::Nak)));
        assert!(matches!(TxCode::Unknown(9).into_result(), Err(BridgeError::Nak)));
    }
}

//! Per-family request validation and device identifier formatting
//!
//! A request names a device with up to three loose fields (`device_id`,
//! `house_code`, `unit_code`). Which ones matter, and how they combine into
//! the identifier string and the packet fields, depends on the lighting
//! family of the protocol.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{BridgeError, Result};
use crate::protocol::{LightingFamily, Protocol};

/// Decoded device location, ready to be packed into a lighting packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Lighting1: house letter + unit
    HouseUnit { house: u8, unit: u8 },
    /// Lighting2 / Lighting5: numeric id + unit
    IdUnit { id: u32, unit: u8 },
    /// Lighting3: system code + channel
    SystemChannel { system: u8, channel: u8 },
    /// Lighting4: raw 24-bit code
    Code { code: u32 },
    /// Lighting6: 16-bit id + group letter + unit
    IdGroupUnit { id: u16, group: u8, unit: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    pub protocol: Protocol,
    pub target: Target,
    identifier: String,
}

impl DeviceAddress {
    /// Validate the loose request fields for `protocol` and build the address.
    pub fn resolve(
        protocol: Protocol,
        device_id: &str,
        house_code: &str,
        unit_code: u32,
    ) -> Result<DeviceAddress> {
        let family = protocol.family();
        let device_id = device_id.trim();
        let house_code = house_code.trim();

        let (target, identifier) = match family {
            LightingFamily::Lighting1 => {
                if house_code.is_empty() {
                    return Err(BridgeError::MissingField {
                        field: "house_code",
                        family,
                    });
                }
                let house = parse_letter(house_code)?;
                let unit = in_range("unit_code", family, unit_code, 1, 16)?;
                (
                    Target::HouseUnit { house, unit },
                    format!("{}{}", house as char, unit_code),
                )
            }
            LightingFamily::Lighting2 | LightingFamily::Lighting5 => {
                let hex = require_hex(device_id, family)?;
                let max = match protocol {
                    Protocol::Ac | Protocol::HomeEasyEu | Protocol::Anslut => 0x03FF_FFFF,
                    _ => 0x00FF_FFFF,
                };
                let id = in_range("device_id", family, hex_value(&hex)?, 0, max)?;
                let unit = in_range("unit_code", family, unit_code, 1, 16)?;
                (
                    Target::IdUnit { id, unit },
                    format!("0x{hex}/{unit_code}"),
                )
            }
            LightingFamily::Lighting3 => {
                let hex = require_hex(device_id, family)?;
                let system = in_range("device_id", family, hex_value(&hex)?, 0, 15)?;
                let channel = in_range("unit_code", family, unit_code, 1, 10)?;
                (
                    Target::SystemChannel { system, channel },
                    format!("0x{hex}/{unit_code}"),
                )
            }
            LightingFamily::Lighting4 => {
                let hex = require_hex(device_id, family)?;
                let code = in_range("device_id", family, hex_value(&hex)?, 0, 0x00FF_FFFF)?;
                (Target::Code { code }, format!("0x{hex}"))
            }
            LightingFamily::Lighting6 => {
                let hex = require_hex(device_id, family)?;
                let id = in_range("device_id", family, hex_value(&hex)?, 0, 0xFFFF)?;
                let group = if house_code.is_empty() {
                    b'A'
                } else {
                    parse_letter(house_code)?
                };
                let unit = in_range("unit_code", family, unit_code, 1, 5)?;
                (
                    Target::IdGroupUnit { id, group, unit },
                    format!("0x{hex}"),
                )
            }
        };

        Ok(DeviceAddress {
            protocol,
            target,
            identifier,
        })
    }

    /// Identifier string in the form the controller and logs use, e.g.
    /// `A1`, `0x02382C82/1` or `0x00F09A`.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

fn hex_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:0[xX])?([0-9A-Fa-f]{1,8})$").expect("static regex"))
}

/// Uppercased hex digits without prefix, leading zeros kept.
fn require_hex(device_id: &str, family: LightingFamily) -> Result<String> {
    if device_id.is_empty() {
        return Err(BridgeError::MissingField {
            field: "device_id",
            family,
        });
    }
    hex_pattern()
        .captures(device_id)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
        .ok_or_else(|| BridgeError::InvalidDeviceId(device_id.to_string()))
}

fn hex_value(hex: &str) -> Result<u32> {
    u32::from_str_radix(hex, 16).map_err(|_| BridgeError::InvalidDeviceId(hex.to_string()))
}

fn parse_letter(code: &str) -> Result<u8> {
    match code.as_bytes() {
        [c] if c.to_ascii_uppercase().is_ascii_uppercase() && c.to_ascii_uppercase() <= b'P' => {
            Ok(c.to_ascii_uppercase())
        }
        _ => Err(BridgeError::InvalidHouseCode(code.to_string())),
    }
}

fn in_range<T: TryFrom<u32>>(
    field: &'static str,
    family: LightingFamily,
    value: u32,
    min: u32,
    max: u32,
) -> Result<T> {
    let err = || BridgeError::OutOfRange {
        field,
        family,
        value,
        min,
        max,
    };
    if value < min || value > max {
        return Err(err());
    }
    T::try_from(value).map_err(|_| err())
}

//! Sub-protocol lookup table
//!
//! Maps the protocol names the controller uses to the RFXtrx lighting family
//! (packet type) and subtype byte that carry them on the wire.

use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;

/// Wire-format class shared by a group of sub-protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightingFamily {
    Lighting1,
    Lighting2,
    Lighting3,
    Lighting4,
    Lighting5,
    Lighting6,
}

impl LightingFamily {
    /// RFXtrx packet type byte
    pub fn packet_type(self) -> u8 {
        match self {
            LightingFamily::Lighting1 => 0x10,
            LightingFamily::Lighting2 => 0x11,
            LightingFamily::Lighting3 => 0x12,
            LightingFamily::Lighting4 => 0x13,
            LightingFamily::Lighting5 => 0x14,
            LightingFamily::Lighting6 => 0x15,
        }
    }
}

impl fmt::Display for LightingFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = match self {
            LightingFamily::Lighting1 => 1,
            LightingFamily::Lighting2 => 2,
            LightingFamily::Lighting3 => 3,
            LightingFamily::Lighting4 => 4,
            LightingFamily::Lighting5 => 5,
            LightingFamily::Lighting6 => 6,
        };
        write!(f, "Lighting{n}")
    }
}

/// On/off state carried by a lighting packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Switch::On => "on",
            Switch::Off => "off",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    // Lighting1
    X10,
    Arc,
    Abicod,
    Waveman,
    Emw100,
    Impuls,
    RisingSun,
    Philips,
    Energenie,
    Energenie5,
    CocoStick,
    // Lighting2
    Ac,
    HomeEasyEu,
    Anslut,
    Kambrook,
    // Lighting3
    IkeaKoppla,
    // Lighting4
    Pt2262,
    // Lighting5
    LightwaveRf,
    Emw100Gdo,
    Bbsb,
    Rsl,
    Livolo,
    Trc02,
    Aoke,
    RgbTrc02,
    // Lighting6
    Blyss,
}

use LightingFamily::*;

const ALL: &[Protocol] = &[
    Protocol::X10,
    Protocol::Arc,
    Protocol::Abicod,
    Protocol::Waveman,
    Protocol::Emw100,
    Protocol::Impuls,
    Protocol::RisingSun,
    Protocol::Philips,
    Protocol::Energenie,
    Protocol::Energenie5,
    Protocol::CocoStick,
    Protocol::Ac,
    Protocol::HomeEasyEu,
    Protocol::Anslut,
    Protocol::Kambrook,
    Protocol::IkeaKoppla,
    Protocol::Pt2262,
    Protocol::LightwaveRf,
    Protocol::Emw100Gdo,
    Protocol::Bbsb,
    Protocol::Rsl,
    Protocol::Livolo,
    Protocol::Trc02,
    Protocol::Aoke,
    Protocol::RgbTrc02,
    Protocol::Blyss,
];

impl Protocol {
    pub fn from_name(name: &str) -> Result<Protocol, BridgeError> {
        ALL.iter()
            .copied()
            .find(|p| p.name() == name)
            .ok_or_else(|| BridgeError::UnsupportedProtocol(name.to_string()))
    }

    /// (wire name, family, subtype)
    fn row(self) -> (&'static str, LightingFamily, u8) {
        match self {
            Protocol::X10 => ("X10", Lighting1, 0x00),
            Protocol::Arc => ("ARC", Lighting1, 0x01),
            Protocol::Abicod => ("ABICOD", Lighting1, 0x02),
            Protocol::Waveman => ("WAVEMAN", Lighting1, 0x03),
            Protocol::Emw100 => ("EMW100", Lighting1, 0x04),
            Protocol::Impuls => ("IMPULS", Lighting1, 0x05),
            Protocol::RisingSun => ("RISINGSUN", Lighting1, 0x06),
            Protocol::Philips => ("PHILIPS", Lighting1, 0x07),
            Protocol::Energenie => ("ENERGENIE", Lighting1, 0x08),
            Protocol::Energenie5 => ("ENERGENIE_5", Lighting1, 0x09),
            Protocol::CocoStick => ("COCOSTICK", Lighting1, 0x0A),
            Protocol::Ac => ("AC", Lighting2, 0x00),
            Protocol::HomeEasyEu => ("HOMEEASY_EU", Lighting2, 0x01),
            Protocol::Anslut => ("ANSLUT", Lighting2, 0x02),
            Protocol::Kambrook => ("KAMBROOK", Lighting2, 0x03),
            Protocol::IkeaKoppla => ("IKEA_KOPPLA", Lighting3, 0x00),
            Protocol::Pt2262 => ("PT2262", Lighting4, 0x00),
            Protocol::LightwaveRf => ("LIGHTWAVERF", Lighting5, 0x00),
            Protocol::Emw100Gdo => ("EMW100_GDO", Lighting5, 0x01),
            Protocol::Bbsb => ("BBSB", Lighting5, 0x02),
            Protocol::Rsl => ("RSL", Lighting5, 0x04),
            Protocol::Livolo => ("LIVOLO", Lighting5, 0x05),
            Protocol::Trc02 => ("TRC02", Lighting5, 0x06),
            Protocol::Aoke => ("AOKE", Lighting5, 0x07),
            Protocol::RgbTrc02 => ("RGB_TRC02", Lighting5, 0x08),
            Protocol::Blyss => ("BLYSS", Lighting6, 0x00),
        }
    }

    pub fn name(self) -> &'static str {
        self.row().0
    }

    pub fn family(self) -> LightingFamily {
        self.row().1
    }

    pub fn subtype(self) -> u8 {
        self.row().2
    }

    pub fn all() -> impl Iterator<Item = Protocol> {
        ALL.iter().copied()
    }
}

impl FromStr for Protocol {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::from_name(s)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_variant_once() {
        let mut seen = std::collections::HashSet::new();
        for p in Protocol::all() {
            assert!(seen.insert(p), "{p:?} listed twice");
            assert_eq!(Protocol::from_name(p.name()).unwrap(), p);
        }
        assert_eq!(seen.len(), 26);
    }

    #[test]
    fn families_and_subtypes() {
        assert_eq!(Protocol::Arc.family(), LightingFamily::Lighting1);
        assert_eq!(Protocol::Arc.subtype(), 0x01);
        assert_eq!(Protocol::Ac.family(), LightingFamily::Lighting2);
        assert_eq!(Protocol::Kambrook.subtype(), 0x03);
        assert_eq!(Protocol::IkeaKoppla.family(), LightingFamily::Lighting3);
        assert_eq!(Protocol::Pt2262.family(), LightingFamily::Lighting4);
        assert_eq!(Protocol::Rsl.subtype(), 0x04);
        assert_eq!(Protocol::RgbTrc02.family(), LightingFamily::Lighting5);
        assert_eq!(Protocol::Blyss.family().packet_type(), 0x15);
    }

    #[test]
    fn lookup_is_exact() {
        assert!(Protocol::from_name("ac").is_err());
        let err = Protocol::from_name("ZWAVE").unwrap_err();
        assert_eq!(err.to_string(), "Unsupported protocol: ZWAVE");
    }

    #[test]
    fn family_display() {
        assert_eq!(LightingFamily::Lighting4.to_string(), "Lighting4");
    }
}

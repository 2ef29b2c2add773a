//! Drives an RFXCOM RFXtrx433 transceiver from newline-delimited JSON on
//! stdin, answering one JSON line per request on stdout.

pub mod address;
pub mod bridge;
pub mod config;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod messages;
pub mod pairing;
pub mod protocol;
pub mod rfxtrx;
pub mod stdio;
pub mod transceiver;

#[cfg(test)]
mod testing;

pub use bridge::{Bridge, Flow};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use rfxtrx::SerialConnector;

//! Bridge error types
//!
//! Every variant's `Display` text is what ends up in the `error` field of a
//! response line, so the wording is part of the stdio contract.

use thiserror::Error;

use crate::protocol::LightingFamily;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// No connected transceiver
    #[error("RFXCOM not ready")]
    NotReady,

    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown action")]
    UnknownAction,

    /// A field the protocol family needs was empty
    #[error("{field} required for {family}")]
    MissingField {
        field: &'static str,
        family: LightingFamily,
    },

    #[error("Invalid device_id: {0}")]
    InvalidDeviceId(String),

    #[error("Invalid house_code: {0}")]
    InvalidHouseCode(String),

    #[error("{field} out of range for {family}: {value} (expected {min}..={max})")]
    OutOfRange {
        field: &'static str,
        family: LightingFamily,
        value: u32,
        min: u32,
        max: u32,
    },

    /// Malformed request line
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to connect to RFXCOM on {port}: {reason}")]
    ConnectFailed { port: String, reason: String },

    #[error("Timeout during initialisation")]
    InitTimeout,

    #[error("Transceiver rejected the command (NAK)")]
    Nak,

    #[error("Transceiver rejected the command (invalid AC address)")]
    NakInvalidAddress,

    #[error("No acknowledgement from transceiver after {0} ms")]
    AckTimeout(u128),

    #[error("Link to transceiver lost")]
    LinkLost,

    #[error("{errors} errors out of {sent} transmissions")]
    PairingFailed { sent: u32, errors: u32 },

    #[error("Serial error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

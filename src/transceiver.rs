//! Seam between the bridge and whatever drives the radio.
//!
//! The bridge only ever submits lighting packets and waits on receipts; the
//! serial RFXtrx link in [`crate::rfxtrx`] is one implementation, test doubles
//! are another.

use std::sync::mpsc;
use std::time::Duration;

use crate::config::LinkConfig;
use crate::error::{BridgeError, Result};
use crate::rfxtrx::packet::LightingPacket;

/// Completion handle for one submitted transmission.
pub struct Receipt {
    rx: mpsc::Receiver<Result<()>>,
}

impl Receipt {
    /// Returns the sending half the driver completes.
    pub fn channel() -> (mpsc::Sender<Result<()>>, Receipt) {
        let (tx, rx) = mpsc::channel();
        (tx, Receipt { rx })
    }

    /// Block until the transceiver answers, the link drops, or `timeout` passes.
    pub fn wait(self, timeout: Duration) -> Result<()> {
        match self.rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(BridgeError::AckTimeout(timeout.as_millis()))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(BridgeError::LinkLost),
        }
    }
}

pub trait Transmitter: Send {
    /// Queue one packet; does not wait for the acknowledgement.
    fn submit(&self, packet: LightingPacket) -> Result<Receipt>;

    /// False once the link has dropped.
    fn is_ready(&self) -> bool;

    fn port_name(&self) -> &str;

    fn close(&mut self);
}

pub trait Connector: Send {
    fn connect(&self, port: &str, cfg: &LinkConfig) -> Result<Box<dyn Transmitter>>;
}

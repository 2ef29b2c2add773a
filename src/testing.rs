//! In-memory transceiver doubles shared by unit tests.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;

use crate::config::LinkConfig;
use crate::error::{BridgeError, Result};
use crate::rfxtrx::packet::LightingPacket;
use crate::transceiver::{Connector, Receipt, Transmitter};

#[derive(Clone, Copy)]
pub enum Outcome {
    Ack,
    Nak,
}

pub struct FakeLink {
    outcome: Outcome,
    port: String,
    ready: AtomicBool,
    /// answer from another thread after this long instead of at once
    delay: Option<Duration>,
    log: Arc<Mutex<Vec<LightingPacket>>>,
    closes: Arc<AtomicUsize>,
}

impl FakeLink {
    fn with(outcome: Outcome) -> Self {
        Self {
            outcome,
            port: "/dev/fake0".into(),
            ready: AtomicBool::new(true),
            delay: None,
            log: Arc::default(),
            closes: Arc::default(),
        }
    }

    /// Acknowledges every transmission `delay` after it was submitted.
    pub fn acking_after(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::with(Outcome::Ack)
        }
    }

    pub fn acking() -> Self {
        Self::with(Outcome::Ack)
    }

    pub fn failing() -> Self {
        Self::with(Outcome::Nak)
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<LightingPacket> {
        self.log.lock().unwrap().clone()
    }
}

impl Transmitter for FakeLink {
    fn submit(&self, packet: LightingPacket) -> Result<Receipt> {
        if !self.is_ready() {
            return Err(BridgeError::NotReady);
        }
        self.log.lock().unwrap().push(packet);
        let (reply, receipt) = Receipt::channel();
        let outcome = self.outcome;
        let answer = move || match outcome {
            Outcome::Ack => Ok(()),
            Outcome::Nak => Err(BridgeError::Nak),
        };
        match self.delay {
            Some(delay) => {
                thread::spawn(move || {
                    thread::sleep(delay);
                    let _ = reply.send(answer());
                });
            }
            None => {
                let _ = reply.send(answer());
            }
        }
        Ok(receipt)
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn port_name(&self) -> &str {
        &self.port
    }

    fn close(&mut self) {
        self.ready.store(false, Ordering::SeqCst);
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Hands out [`FakeLink`]s and records what was asked of it.
#[derive(Clone)]
pub struct FakeConnector {
    pub outcome: Outcome,
    pub refuse: bool,
    pub ports: Arc<Mutex<Vec<String>>>,
    pub log: Arc<Mutex<Vec<LightingPacket>>>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            refuse: false,
            ports: Arc::default(),
            log: Arc::default(),
            closes: Arc::default(),
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(Outcome::Ack)
        }
    }

    pub fn sent(&self) -> Vec<LightingPacket> {
        self.log.lock().unwrap().clone()
    }
}

impl Connector for FakeConnector {
    fn connect(&self, port: &str, _cfg: &LinkConfig) -> Result<Box<dyn Transmitter>> {
        self.ports.lock().unwrap().push(port.to_string());
        if self.refuse {
            return Err(BridgeError::ConnectFailed {
                port: port.to_string(),
                reason: "no such device".into(),
            });
        }
        Ok(Box::new(FakeLink {
            outcome: self.outcome,
            port: port.to_string(),
            ready: AtomicBool::new(true),
            delay: None,
            log: Arc::clone(&self.log),
            closes: Arc::clone(&self.closes),
        }))
    }
}

use std::{
    collections::HashMap,
    io::{self, Read, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::{Duration, Instant},
};

use serialport::{DataBits, FlowControl, Parity, StopBits};
use tracing::{debug, error, info, trace, warn};

use super::framing::PacketSplitter;
use super::packet::{control_packet, decode, ControlCommand, Inbound, LightingPacket};
use super::to_hex;
use crate::config::LinkConfig;
use crate::error::{BridgeError, Result};
use crate::transceiver::{Connector, Receipt, Transmitter};

// -------------------- Connector --------------------

/// Opens RFXtrx transceivers on local serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    fn connect(&self, port: &str, cfg: &LinkConfig) -> Result<Box<dyn Transmitter>> {
        Ok(Box::new(SerialLink::open(port, cfg)?))
    }
}

// -------------------- Runtime handle --------------------

enum LinkCmd {
    Transmit {
        packet: LightingPacket,
        reply: mpsc::Sender<Result<()>>,
    },
    Stop,
}

pub struct SerialLink {
    port_name: String,
    tx: mpsc::Sender<LinkCmd>,
    join: Option<thread::JoinHandle<()>>,
    connected: Arc<AtomicBool>,
}

impl SerialLink {
    /// Open the port, run the handshake, and start the worker thread.
    /// Returns once the transceiver has started its receiver.
    pub fn open(port_name: &str, cfg: &LinkConfig) -> Result<SerialLink> {
        let (tx, rx) = mpsc::channel::<LinkCmd>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let connected = Arc::new(AtomicBool::new(false));

        let abandoned = Arc::new(AtomicBool::new(false));

        let port_name2 = port_name.to_string();
        let cfg2 = cfg.clone();
        let connected2 = Arc::clone(&connected);
        let abandoned2 = Arc::clone(&abandoned);

        let join = thread::Builder::new()
            .name("rfxtrx-link".into())
            .spawn(move || {
                // open port INSIDE worker so it owns it
                let mut port = match serialport::new(&port_name2, cfg2.baud_rate)
                    .data_bits(DataBits::Eight)
                    .parity(Parity::None)
                    .stop_bits(StopBits::One)
                    .flow_control(FlowControl::None)
                    .timeout(cfg2.read_timeout)
                    .open()
                {
                    Ok(p) => p,
                    Err(e) => {
                        let _ = ready_tx.send(Err(BridgeError::ConnectFailed {
                            port: port_name2.clone(),
                            reason: e.to_string(),
                        }));
                        return;
                    }
                };
                info!(port = %port_name2, baud = cfg2.baud_rate, "serial port opened");

                let link = LinkThread {
                    port_name: &port_name2,
                    cfg: &cfg2,
                    connected: &connected2,
                    abandoned: &abandoned2,
                };
                link.serve(&mut *port, &ready_tx, &rx);
                info!(port = %port_name2, "serial port released");
            })?;

        // the handshake has its own deadline; the margin covers a stuck open()
        match ready_rx.recv_timeout(cfg.init_timeout + Duration::from_secs(1)) {
            Ok(Ok(())) => Ok(SerialLink {
                port_name: port_name.to_string(),
                tx,
                join: Some(join),
                connected,
            }),
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // the thread drops the port as soon as open() returns
                abandoned.store(true, Ordering::SeqCst);
                warn!(port = %port_name, "serial open did not complete in time");
                Err(BridgeError::InitTimeout)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(BridgeError::LinkLost),
        }
    }
}

/// Everything the link thread does once it holds an open port.
struct LinkThread<'a> {
    port_name: &'a str,
    cfg: &'a LinkConfig,
    connected: &'a AtomicBool,
    abandoned: &'a AtomicBool,
}

impl LinkThread<'_> {
    /// Handshake, report readiness, then run the worker until stopped.
    /// Returns early, releasing the port, when `open` has stopped waiting.
    fn serve<P: Read + Write + ?Sized>(
        &self,
        port: &mut P,
        ready_tx: &mpsc::Sender<Result<()>>,
        rx: &mpsc::Receiver<LinkCmd>,
    ) {
        if self.abandoned.load(Ordering::SeqCst) {
            debug!(port = %self.port_name, "open was abandoned, skipping handshake");
            return;
        }

        match handshake(port, self.cfg) {
            Ok(Inbound::Status {
                transceiver_type,
                firmware_version,
            }) => {
                info!(
                    "transceiver ready: type=0x{:02X} firmware={}",
                    transceiver_type, firmware_version
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(port = %self.port_name, "handshake failed: {e}");
                let _ = ready_tx.send(Err(e));
                return;
            }
        }

        self.connected.store(true, Ordering::SeqCst);
        if self.abandoned.load(Ordering::SeqCst) || ready_tx.send(Ok(())).is_err() {
            self.connected.store(false, Ordering::SeqCst);
            debug!(port = %self.port_name, "nobody waiting for the link");
            return;
        }

        let mut worker = LinkWorker::new(self.cfg.ack_timeout, self.connected);
        worker.run(port, rx);
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Transmitter for SerialLink {
    fn submit(&self, packet: LightingPacket) -> Result<Receipt> {
        if !self.is_ready() {
            return Err(BridgeError::NotReady);
        }
        let (reply, receipt) = Receipt::channel();
        self.tx
            .send(LinkCmd::Transmit { packet, reply })
            .map_err(|_| BridgeError::LinkLost)?;
        Ok(receipt)
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn close(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = self.tx.send(LinkCmd::Stop);
            let _ = join.join();
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.close();
    }
}

// -------------------- Handshake --------------------

/// Reset, settle, flush, get status, start receiver. Returns the status
/// packet the transceiver reported.
pub(crate) fn handshake<P: Read + Write + ?Sized>(
    port: &mut P,
    cfg: &LinkConfig,
) -> Result<Inbound> {
    let deadline = Instant::now() + cfg.init_timeout;

    write_packet(port, &control_packet(ControlCommand::Reset, 0))?;
    thread::sleep(cfg.reset_settle);

    // Drain leftovers
    let mut junk = [0u8; 256];
    while Instant::now() < deadline {
        match port.read(&mut junk) {
            Ok(n) if n > 0 => {}
            _ => break,
        }
    }

    write_packet(port, &control_packet(ControlCommand::GetStatus, 1))?;
    let status = wait_for(port, deadline, |m| matches!(m, Inbound::Status { .. }))?;

    write_packet(port, &control_packet(ControlCommand::StartReceiver, 2))?;
    wait_for(port, deadline, |m| matches!(m, Inbound::ReceiverStarted))?;

    Ok(status)
}

fn write_packet<P: Write + ?Sized>(port: &mut P, bytes: &[u8]) -> Result<()> {
    debug!("[RFX/TX] {}", to_hex(bytes));
    port.write_all(bytes)?;
    port.flush()?;
    Ok(())
}

fn wait_for<P: Read + ?Sized>(
    port: &mut P,
    deadline: Instant,
    want: impl Fn(&Inbound) -> bool,
) -> Result<Inbound> {
    let mut splitter = PacketSplitter::new();
    let mut tmp = [0u8; 256];
    while Instant::now() < deadline {
        match port.read(&mut tmp) {
            Ok(n) if n > 0 => {
                let mut found = None;
                splitter.feed(&tmp[..n], &mut |packet| {
                    debug!("[RFX/RX] {}", to_hex(&packet));
                    let msg = decode(&packet);
                    if found.is_none() && want(&msg) {
                        found = Some(msg);
                    }
                });
                if let Some(msg) = found {
                    return Ok(msg);
                }
            }
            Ok(_) => {}
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => return Err(e.into()),
        }
    }
    Err(BridgeError::InitTimeout)
}

// -------------------- Worker --------------------

struct PendingTx {
    reply: mpsc::Sender<Result<()>>,
    sent_at: Instant,
}

/// Owns the port after the handshake: writes queued packets, matches
/// transmitter responses to them by sequence number.
struct LinkWorker<'a> {
    next_seq: u8,
    pending: HashMap<u8, PendingTx>,
    splitter: PacketSplitter,
    ack_timeout: Duration,
    connected: &'a AtomicBool,
}

impl<'a> LinkWorker<'a> {
    fn new(ack_timeout: Duration, connected: &'a AtomicBool) -> Self {
        Self {
            next_seq: 0,
            pending: HashMap::new(),
            splitter: PacketSplitter::new(),
            ack_timeout,
            connected,
        }
    }

    fn run<P: Read + Write + ?Sized>(&mut self, port: &mut P, rx: &mpsc::Receiver<LinkCmd>) {
        let mut tmp = [0u8; 512];
        loop {
            // process queued commands (transmit / stop)
            loop {
                match rx.try_recv() {
                    Ok(LinkCmd::Transmit { packet, reply }) => self.transmit(port, packet, reply),
                    Ok(LinkCmd::Stop) => {
                        debug!("stop requested, dropping {} pending", self.pending.len());
                        self.pending.clear();
                        return;
                    }
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => return,
                }
            }

            match port.read(&mut tmp) {
                Ok(n) if n > 0 => self.on_bytes(&tmp[..n]),
                Ok(_) => {}
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) => {
                    error!("read error, link lost: {e}");
                    self.connected.store(false, Ordering::SeqCst);
                    for (_, p) in self.pending.drain() {
                        let _ = p.reply.send(Err(BridgeError::LinkLost));
                    }
                    return;
                }
            }

            self.expire();
        }
    }

    fn transmit<P: Write + ?Sized>(
        &mut self,
        port: &mut P,
        packet: LightingPacket,
        reply: mpsc::Sender<Result<()>>,
    ) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        let bytes = packet.encode(seq);
        trace!(
            "{} {} {}",
            packet.address.protocol,
            packet.address.identifier(),
            packet.switch
        );
        if let Err(e) = write_packet(port, &bytes) {
            let _ = reply.send(Err(e));
            return;
        }
        let previous = self.pending.insert(
            seq,
            PendingTx {
                reply,
                sent_at: Instant::now(),
            },
        );
        if previous.is_some() {
            warn!("sequence {seq} reused before its acknowledgement arrived");
        }
    }

    fn on_bytes(&mut self, chunk: &[u8]) {
        let mut packets = Vec::new();
        self.splitter.feed(chunk, &mut |p| packets.push(p));
        for packet in packets {
            debug!("[RFX/RX] {}", to_hex(&packet));
            match decode(&packet) {
                Inbound::TransmitAck { seq, code } => match self.pending.remove(&seq) {
                    Some(p) => {
                        let _ = p.reply.send(code.into_result());
                    }
                    None => debug!("acknowledgement for unknown sequence {seq}"),
                },
                Inbound::ReceiverLockError => warn!("receiver did not lock"),
                Inbound::WrongCommand => warn!("transceiver reported a wrong command"),
                Inbound::Status { .. } | Inbound::ReceiverStarted => {}
                Inbound::Other { packet_type } => {
                    trace!("ignoring packet type 0x{packet_type:02X}")
                }
            }
        }
    }

    fn expire(&mut self) {
        let timeout = self.ack_timeout;
        let stale: Vec<u8> = self
            .pending
            .iter()
            .filter(|(_, p)| p.sent_at.elapsed() > timeout)
            .map(|(seq, _)| *seq)
            .collect();
        for seq in stale {
            if let Some(p) = self.pending.remove(&seq) {
                let _ = p.reply.send(Err(BridgeError::AckTimeout(timeout.as_millis())));
            }
        }
    }
}

//! Request dispatcher
//!
//! Owns the (optional) live transceiver link and turns each decoded request
//! into exactly one response. Failures never escape as panics or early
//! exits: they become `{"status":"error"}` responses.

use tracing::{info, warn};

use crate::address::DeviceAddress;
use crate::config::BridgeConfig;
use crate::discovery;
use crate::error::{BridgeError, Result};
use crate::messages::{DeviceRequest, Request, Response};
use crate::pairing::{self, PairReport};
use crate::protocol::{Protocol, Switch};
use crate::rfxtrx::packet::LightingPacket;
use crate::transceiver::{Connector, Transmitter};

/// What the caller should do after writing the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Switch(Switch),
    Pair,
}

fn parse_command(raw: &str) -> Result<Command> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" => Ok(Command::Switch(Switch::On)),
        "off" => Ok(Command::Switch(Switch::Off)),
        "pair" => Ok(Command::Pair),
        _ => Err(BridgeError::UnknownCommand(raw.to_string())),
    }
}

pub struct Bridge<C: Connector> {
    connector: C,
    config: BridgeConfig,
    link: Option<Box<dyn Transmitter>>,
}

impl<C: Connector> Bridge<C> {
    pub fn new(connector: C, config: BridgeConfig) -> Self {
        Self {
            connector,
            config,
            link: None,
        }
    }

    /// Decode and handle one stdin line.
    pub fn handle_line(&mut self, line: &str) -> (Response, Flow) {
        match Request::parse(line) {
            Ok(req) => self.handle(req),
            Err(e) => {
                warn!("rejected request line: {e}");
                (Response::error(e), Flow::Continue)
            }
        }
    }

    pub fn handle(&mut self, req: Request) -> (Response, Flow) {
        let outcome = match req {
            Request::Init { port } => self.init(port).map(|port| Response::Ready { port }),
            Request::Send(d) => self.send(&d),
            Request::Pair(d) => self.pair(&d).map(Response::paired),
            Request::Close => {
                self.close();
                return (Response::Closed, Flow::Exit);
            }
            Request::Status => Ok(self.status()),
            Request::ListPorts => discovery::list_ports()
                .map(|ports| Response::Success {
                    result: None,
                    ports: Some(ports),
                })
                .map_err(BridgeError::from),
        };
        let response = outcome.unwrap_or_else(|e| {
            warn!("request failed: {e}");
            Response::error(e)
        });
        (response, Flow::Continue)
    }

    fn init(&mut self, port: Option<String>) -> Result<String> {
        let port = port
            .or_else(|| self.config.default_port.clone())
            .unwrap_or_else(discovery::find_usb_port);
        // re-init replaces the previous link
        self.close();
        info!("connecting to RFXCOM on {port}");
        let link = self.connector.connect(&port, &self.config.link)?;
        let name = link.port_name().to_string();
        info!("RFXCOM ready on {name}");
        self.link = Some(link);
        Ok(name)
    }

    fn ready_link(&self) -> Result<&dyn Transmitter> {
        match &self.link {
            Some(link) if link.is_ready() => Ok(link.as_ref()),
            _ => Err(BridgeError::NotReady),
        }
    }

    fn send(&self, req: &DeviceRequest) -> Result<Response> {
        let link = self.ready_link()?;
        let protocol = Protocol::from_name(&req.protocol)?;
        let address =
            DeviceAddress::resolve(protocol, &req.device_id, &req.house_code, req.unit_code)?;

        let switch = match parse_command(&req.command)? {
            Command::Switch(s) => s,
            Command::Pair => return self.pair(req).map(Response::paired),
        };

        info!("{} {} -> {}", protocol, address.identifier(), switch);
        link.submit(LightingPacket::new(address, switch))?
            .wait(self.config.link.ack_timeout)?;
        Ok(Response::success())
    }

    fn pair(&self, req: &DeviceRequest) -> Result<PairReport> {
        let link = self.ready_link()?;
        let protocol = Protocol::from_name(&req.protocol)?;
        let address =
            DeviceAddress::resolve(protocol, &req.device_id, &req.house_code, req.unit_code)?;
        let packet = LightingPacket::new(address, Switch::On);
        pairing::run_burst(
            link,
            &packet,
            &self.config.pairing,
            self.config.link.ack_timeout,
        )
    }

    fn status(&self) -> Response {
        Response::Health {
            initialized: self.ready_link().is_ok(),
            port: self.link.as_ref().map(|l| l.port_name().to_string()),
        }
    }

    /// Close the link if one is open. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
            info!("link to {} closed", link.port_name());
        }
    }
}

impl<C: Connector> Drop for Bridge<C> {
    fn drop(&mut self) {
        self.close();
    }
}

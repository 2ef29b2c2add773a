use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

use rfxcom_bridge::config::{BridgeConfig, LinkConfig, PairingConfig};
use rfxcom_bridge::logging::{init_logging, LogFormat};
use rfxcom_bridge::{stdio, Bridge, SerialConnector};

const PKG_DESCRIPTION: &str = concat!(
    env!("CARGO_PKG_NAME"),
    " - ",
    env!("CARGO_PKG_DESCRIPTION")
);

#[derive(Debug, Parser)]
#[command(version, about = PKG_DESCRIPTION)]
struct Cli {
    /// Serial device used by `init` requests that name no port
    #[arg(long, env = "RFXCOM_PORT")]
    port: Option<String>,
    #[arg(long, env = "RFXCOM_BAUD_RATE", default_value_t = 38_400)]
    baud_rate: u32,
    /// Budget for the whole reset/status/start-receiver handshake
    #[arg(long, env = "RFXCOM_INIT_TIMEOUT_MS", default_value_t = 10_000)]
    init_timeout_ms: u64,
    /// How long one transmission may wait for its acknowledgement
    #[arg(long, env = "RFXCOM_ACK_TIMEOUT_MS", default_value_t = 5_000)]
    ack_timeout_ms: u64,
    #[arg(long, env = "RFXCOM_PAIR_INTERVAL_MS", default_value_t = 15)]
    pair_interval_ms: u64,
    #[arg(long, env = "RFXCOM_PAIR_DURATION_MS", default_value_t = 3_500)]
    pair_duration_ms: u64,
    /// Filter directive, e.g. `info` or `rfxcom_bridge=debug`; RUST_LOG wins
    #[arg(long, default_value = "info")]
    log_level: String,
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

impl Cli {
    fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            default_port: self.port.clone().filter(|p| !p.trim().is_empty()),
            link: LinkConfig {
                baud_rate: self.baud_rate,
                init_timeout: Duration::from_millis(self.init_timeout_ms),
                ack_timeout: Duration::from_millis(self.ack_timeout_ms),
                ..LinkConfig::default()
            },
            pairing: PairingConfig {
                interval: Duration::from_millis(self.pair_interval_ms.max(1)),
                duration: Duration::from_millis(self.pair_duration_ms),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.log_format);

    let config = cli.bridge_config();
    info!(
        "rfxcom-bridge {} starting (default port: {})",
        env!("CARGO_PKG_VERSION"),
        config.default_port.as_deref().unwrap_or("auto")
    );

    let bridge = Bridge::new(SerialConnector, config);
    let stdin = BufReader::new(tokio::io::stdin());
    let shutdown = stdio::interrupted(tokio::signal::ctrl_c());

    stdio::run(bridge, stdin, std::io::stdout(), shutdown)
        .await
        .context("stdio loop failed")?;

    info!("bye");
    Ok(())
}

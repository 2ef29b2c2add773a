// Runtime knobs. Defaults match what the RFXtrx firmware and the controller
// expect; the CLI overrides them one by one.
use std::time::Duration;

/// Serial link and handshake settings
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub baud_rate: u32,        // 38400 8N1
    pub read_timeout: Duration, // poll granularity of the link worker
    pub init_timeout: Duration, // whole handshake, open to receiver started
    pub reset_settle: Duration, // quiet time after the reset packet
    pub ack_timeout: Duration,  // per transmission
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: 38_400,
            read_timeout: Duration::from_millis(10),
            init_timeout: Duration::from_secs(10),
            reset_settle: Duration::from_millis(500),
            ack_timeout: Duration::from_secs(5),
        }
    }
}

/// Pairing burst timing
#[derive(Debug, Clone)]
pub struct PairingConfig {
    pub interval: Duration,
    pub duration: Duration,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(15),
            duration: Duration::from_millis(3_500),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    /// Used by `init` when the request carries no port; discovery otherwise.
    pub default_port: Option<String>,
    pub link: LinkConfig,
    pub pairing: PairingConfig,
}

//! Pairing burst
//!
//! Receivers in learning mode latch onto the first code they hear repeated
//! for long enough, so pairing is a train of identical ON packets at a fixed
//! cadence. Transmissions are fired without waiting for their
//! acknowledgements; those are collected once the train has ended.

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PairingConfig;
use crate::error::{BridgeError, Result};
use crate::rfxtrx::packet::LightingPacket;
use crate::transceiver::{Receipt, Transmitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairReport {
    /// acknowledged transmissions
    pub sent: u32,
    /// failed or refused transmissions
    pub errors: u32,
}

/// A burst fails when more than half as many transmissions failed as succeeded.
pub fn verdict(sent: u32, errors: u32) -> Result<PairReport> {
    if u64::from(errors) * 2 > u64::from(sent) {
        Err(BridgeError::PairingFailed { sent, errors })
    } else {
        Ok(PairReport { sent, errors })
    }
}

pub fn run_burst(
    link: &dyn Transmitter,
    packet: &LightingPacket,
    cfg: &PairingConfig,
    ack_timeout: Duration,
) -> Result<PairReport> {
    let interval = cfg.interval.max(Duration::from_millis(1));
    let start = Instant::now();
    let mut next = start + interval;
    let mut receipts: Vec<Receipt> = Vec::new();
    let mut refused = 0u32;

    info!(
        "pairing {} {} for {} ms every {} ms",
        packet.address.protocol,
        packet.address.identifier(),
        cfg.duration.as_millis(),
        interval.as_millis()
    );

    loop {
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        }
        if next.duration_since(start) >= cfg.duration {
            break;
        }
        match link.submit(packet.clone()) {
            Ok(receipt) => receipts.push(receipt),
            Err(e) => {
                debug!("pairing transmission refused: {e}");
                refused += 1;
            }
        }
        next += interval;
        // ticks missed while blocked are dropped, not replayed
        let now = Instant::now();
        while next + interval <= now {
            next += interval;
        }
    }

    let burst_end = Instant::now();
    let deadline = burst_end + ack_timeout;
    let mut sent = 0u32;
    let mut errors = refused;
    for receipt in receipts {
        let remaining = deadline
            .saturating_duration_since(Instant::now())
            .max(Duration::from_millis(1));
        match receipt.wait(remaining) {
            Ok(()) => sent += 1,
            Err(e) => {
                debug!("pairing transmission failed: {e}");
                errors += 1;
            }
        }
    }

    info!(
        "pairing burst done in {} ms: {sent} acknowledged, {errors} failed",
        start.elapsed().as_millis()
    );
    verdict(sent, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::DeviceAddress;
    use crate::protocol::{Protocol, Switch};
    use crate::testing::FakeLink;

    fn packet() -> LightingPacket {
        LightingPacket::new(
            DeviceAddress::resolve(Protocol::Ac, "02382C82", "", 1).unwrap(),
            Switch::On,
        )
    }

    fn cfg() -> PairingConfig {
        PairingConfig {
            interval: Duration::from_millis(5),
            duration: Duration::from_millis(60),
        }
    }

    #[test]
    fn verdict_threshold() {
        assert_eq!(verdict(10, 5).unwrap(), PairReport { sent: 10, errors: 5 });
        assert!(verdict(10, 6).is_err());
        assert_eq!(verdict(0, 0).unwrap(), PairReport { sent: 0, errors: 0 });
        let err = verdict(1, 3).unwrap_err();
        assert_eq!(err.to_string(), "3 errors out of 1 transmissions");
    }

    #[test]
    fn burst_sends_only_on_packets_at_cadence() {
        let link = FakeLink::acking();
        let report = run_burst(&link, &packet(), &cfg(), Duration::from_secs(1)).unwrap();
        let submitted = link.submitted();
        assert_eq!(report.errors, 0);
        assert_eq!(report.sent as usize, submitted.len());
        // 60 ms / 5 ms, first tick after one interval
        assert!(!submitted.is_empty() && submitted.len() <= 11);
        assert!(submitted.iter().all(|p| p.switch == Switch::On));
    }

    #[test]
    fn burst_lasts_the_configured_duration() {
        let link = FakeLink::acking();
        let started = Instant::now();
        run_burst(&link, &packet(), &cfg(), Duration::from_secs(1)).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn failing_link_fails_the_burst() {
        let link = FakeLink::failing();
        let err = run_burst(&link, &packet(), &cfg(), Duration::from_secs(1)).unwrap_err();
        match err {
            BridgeError::PairingFailed { sent, errors } => {
                assert_eq!(sent, 0);
                assert!(errors > 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn refused_submissions_count_as_errors() {
        let link = FakeLink::acking();
        link.set_ready(false);
        let err = run_burst(&link, &packet(), &cfg(), Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, BridgeError::PairingFailed { sent: 0, .. }));
    }

    #[test]
    fn acknowledgements_after_the_burst_still_count() {
        // every ack lands after the 60 ms burst is over
        let link = FakeLink::acking_after(Duration::from_millis(100));
        let report = run_burst(&link, &packet(), &cfg(), Duration::from_secs(2)).unwrap();
        assert_eq!(report.sent as usize, link.submitted().len());
        assert_eq!(report.errors, 0);
    }

    #[test]
    fn acknowledgements_past_the_timeout_are_errors() {
        let link = FakeLink::acking_after(Duration::from_millis(400));
        let err = run_burst(&link, &packet(), &cfg(), Duration::from_millis(50)).unwrap_err();
        match err {
            BridgeError::PairingFailed { sent, errors } => {
                assert_eq!(sent, 0);
                assert_eq!(errors as usize, link.submitted().len());
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

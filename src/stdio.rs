//! Line loop between stdin/stdout and the bridge.
//!
//! Reading stays on the async side so an interrupt can cut in at any time;
//! requests run one at a time on a blocking worker because a pairing burst
//! holds the bridge for several seconds.

use std::future::Future;
use std::io::{self, Write};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::bridge::{Bridge, Flow};
use crate::transceiver::Connector;

/// Serve requests until end of input, a `close` request, or `shutdown`
/// resolving. The bridge's link is closed on every path, and every request
/// already handed to the worker is answered before this returns.
pub async fn run<C, R, W, S>(
    bridge: Bridge<C>,
    input: R,
    output: W,
    shutdown: S,
) -> io::Result<()>
where
    C: Connector + 'static,
    R: AsyncBufRead + Unpin,
    W: Write + Send + 'static,
    S: Future<Output = ()>,
{
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    let stopping = Arc::new(AtomicBool::new(false));
    let stopping2 = Arc::clone(&stopping);

    let mut worker = tokio::task::spawn_blocking(move || -> io::Result<()> {
        let mut bridge = bridge;
        let mut output = output;
        while let Some(line) = line_rx.blocking_recv() {
            if stopping2.load(Ordering::SeqCst) {
                break;
            }
            let (response, flow) = bridge.handle_line(&line);
            writeln!(output, "{}", response.to_line())?;
            output.flush()?;
            if flow == Flow::Exit {
                break;
            }
        }
        bridge.close();
        Ok(())
    });

    tokio::pin!(shutdown);
    let mut input = input;
    let mut buf = Vec::new();
    let mut read_error = None;
    let mut finished = None;

    loop {
        tokio::select! {
            res = &mut worker => {
                finished = Some(res);
                break;
            }
            _ = &mut shutdown => {
                info!("interrupt received, shutting down");
                stopping.store(true, Ordering::SeqCst);
                break;
            }
            read = input.read_until(b'\n', &mut buf) => match read {
                Ok(0) => {
                    debug!("end of input");
                    break;
                }
                Ok(_) => {
                    // undecodable bytes reach the parser and get an error response
                    let line = String::from_utf8_lossy(&buf).trim().to_string();
                    buf.clear();
                    if line.is_empty() {
                        continue;
                    }
                    debug!("request: {line}");
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("stdin read failed: {e}");
                    read_error = Some(e);
                    break;
                }
            },
        }
    }

    drop(line_tx);
    let res = match finished {
        Some(res) => res,
        None => worker.await,
    };
    res.map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
    match read_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Resolves once `signal` reports an interrupt. A signal source that could
/// not be installed never resolves, leaving EOF and `close` to end the loop.
pub async fn interrupted<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("cannot listen for interrupts: {e}");
        std::future::pending::<()>().await;
    }
}

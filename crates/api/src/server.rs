//! Listener setup.

use std::io;
use std::net::{IpAddr, SocketAddr};

use tokio::net::TcpListener;

/// Bind the first free port in `port..port + attempts`.
///
/// Only "address in use" moves on to the next port; any other bind error is
/// returned immediately.
pub async fn bind_first_free(host: IpAddr, port: u16, attempts: u16) -> io::Result<TcpListener> {
    let mut last_err = None;
    for offset in 0..attempts.max(1) {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind(SocketAddr::new(host, candidate)).await {
            Ok(listener) => {
                if offset > 0 {
                    tracing::info!(
                        requested = port,
                        bound = candidate,
                        "Requested port busy, using next free port"
                    );
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                tracing::debug!(port = candidate, "Port in use");
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::AddrInUse, "no free port in range")))
}

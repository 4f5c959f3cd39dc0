//! Passive-mode data listeners.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::net::TcpListener;
use tracing::trace;

/// Hands out listeners on ports from a fixed range, round-robin.
///
/// Ports still in use by other sessions are skipped; when every port in the
/// range is busy, binding fails with `AddrInUse`.
#[derive(Debug)]
pub struct PassivePorts {
    low: u16,
    high: u16,
    cursor: AtomicU32,
}

impl PassivePorts {
    /// Create an allocator for `low..=high`. An inverted range is swapped.
    #[must_use]
    pub fn new(low: u16, high: u16) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        Self {
            low,
            high,
            cursor: AtomicU32::new(0),
        }
    }

    /// Number of ports in the range.
    #[must_use]
    pub fn span(&self) -> u32 {
        u32::from(self.high - self.low) + 1
    }

    /// Bind a listener on `ip` using the next free port in the range.
    pub async fn bind(&self, ip: IpAddr) -> io::Result<TcpListener> {
        let span = self.span();
        for _ in 0..span {
            let offset = self.cursor.fetch_add(1, Ordering::Relaxed) % span;
            // offset < span <= u16::MAX + 1, and low + offset <= high.
            let port = self.low + u16::try_from(offset).unwrap_or(0);
            match TcpListener::bind(SocketAddr::new(ip, port)).await {
                Ok(listener) => return Ok(listener),
                Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                    trace!(port, "passive port busy");
                }
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AddrInUse,
            format!("no free passive port in {}-{}", self.low, self.high),
        ))
    }
}

/// Text of a `227` reply for `ip:port`.
#[must_use]
pub fn pasv_text(ip: Ipv4Addr, port: u16) -> String {
    let [a, b, c, d] = ip.octets();
    format!(
        "Entering Passive Mode ({a},{b},{c},{d},{},{})",
        port >> 8,
        port & 0xff
    )
}

/// Text of a `229` reply for `port`.
#[must_use]
pub fn epsv_text(port: u16) -> String {
    format!("Entering Extended Passive Mode (|||{port}|)")
}

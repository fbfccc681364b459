//! TCP reachability probe used as the device's connectivity check.

use crate::collaborators::Connectivity;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

/// Considers the network available when a TCP connection to `host:port`
/// can be opened within `timeout`.
#[derive(Clone, Debug)]
pub struct TcpConnectivity {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpConnectivity {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }
}

impl Connectivity for TcpConnectivity {
    fn is_network_available(&self) -> bool {
        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                debug!(host = %self.host, error = %e, "probe host did not resolve");
                return false;
            }
        };
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(_) => return true,
                Err(e) => debug!(%addr, error = %e, "probe connect failed"),
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn reachable_listener_counts_as_online() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = TcpConnectivity::new("127.0.0.1", port, Duration::from_secs(1));
        assert!(probe.is_network_available());
    }

    #[test]
    fn closed_port_counts_as_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let probe = TcpConnectivity::new("127.0.0.1", port, Duration::from_millis(200));
        assert!(!probe.is_network_available());
    }
}

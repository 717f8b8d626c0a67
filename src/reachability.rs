//! Network-connectivity oracle consulted before every remote load.
//!
//! Only the boolean contract matters to the loaders: they poll
//! [`Reachability::is_connected_to_network`] once per remote fetch and never
//! cache the answer. Hosts with their own connectivity monitor implement the
//! trait themselves; [`SystemReachability`] is a dependency-free default.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Answers whether the device currently has a usable network route.
///
/// Implementations must not block for long; the check runs on the caller's
/// thread before any work is dispatched.
pub trait Reachability: Send + Sync {
    fn is_connected_to_network(&self) -> bool;
}

/// Default-route check.
///
/// "Connecting" a UDP socket sends no packets; it only asks the OS to pick a
/// route and a source address. If no interface has a route to `probe`, the
/// connect fails and the device is considered offline.
#[derive(Debug, Clone)]
pub struct SystemReachability {
    probe: SocketAddr,
}

impl SystemReachability {
    pub fn new() -> Self {
        Self {
            probe: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(1, 1, 1, 1), 53)),
        }
    }

    /// Use a different probe address (e.g. a host inside a private network).
    pub fn with_probe(probe: SocketAddr) -> Self {
        Self { probe }
    }
}

impl Default for SystemReachability {
    fn default() -> Self {
        Self::new()
    }
}

impl Reachability for SystemReachability {
    fn is_connected_to_network(&self) -> bool {
        let bind_addr: SocketAddr = match self.probe {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (std::net::Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let connected = UdpSocket::bind(bind_addr)
            .and_then(|socket| socket.connect(self.probe))
            .is_ok();

        debug!("Reachability probe {} → {}", self.probe, connected);
        connected
    }
}

/// A reachability answer set by the host.
///
/// Useful when connectivity is tracked elsewhere (push notifications from the
/// platform) and in tests.
#[derive(Debug)]
pub struct FixedReachability {
    connected: AtomicBool,
}

impl FixedReachability {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

impl Reachability for FixedReachability {
    fn is_connected_to_network(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn fixed_reachability_follows_host() {
        let r = FixedReachability::new(false);
        assert!(!r.is_connected_to_network());
        r.set_connected(true);
        assert!(r.is_connected_to_network());
    }

    #[test]
    fn loopback_probe_is_always_routable() {
        let r = SystemReachability::with_probe("127.0.0.1:9".parse().unwrap());
        assert!(r.is_connected_to_network());
    }

    #[test]
    fn usable_as_trait_object() {
        let r: Arc<dyn Reachability> = Arc::new(FixedReachability::new(true));
        assert!(r.is_connected_to_network());
    }
}

//! Fast-open connection configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for [`FastOpenStream`](crate::socket::tfostream::FastOpenStream).
#[derive(Debug, Clone)]
pub struct FastOpenConfig {
    /// Try TCP Fast Open at all. When false, connect then write.
    pub enabled: bool,
    /// Fall back to an ordinary connect when the platform or kernel
    /// does not support client-side fast open.
    pub fallback: bool,
    /// Bound on waiting for the connection to complete
    pub connect_timeout: Duration,
    /// Set TCP_NODELAY on the connected stream
    pub nodelay: bool,
    /// Local address to bind before connecting
    pub bind_addr: Option<SocketAddr>,
}

impl Default for FastOpenConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fallback: true,
            connect_timeout: Duration::from_secs(10),
            nodelay: true,
            bind_addr: None,
        }
    }
}

impl FastOpenConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable fast open.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Enable or disable the ordinary-connect fallback.
    pub fn fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set TCP_NODELAY.
    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Set local bind address.
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FastOpenConfig::new();
        assert!(config.enabled);
        assert!(config.fallback);
        assert!(config.nodelay);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(config.bind_addr.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = FastOpenConfig::new()
            .enabled(false)
            .fallback(false)
            .nodelay(false)
            .connect_timeout(Duration::from_millis(250))
            .bind_addr(bind);
        assert!(!config.enabled);
        assert!(!config.fallback);
        assert!(!config.nodelay);
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.bind_addr, Some(bind));
    }
}

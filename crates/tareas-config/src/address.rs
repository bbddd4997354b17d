use std::fmt;

/// TCP endpoint the daemon binds to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenAddress {
    host: String,
    port: u16,
}

impl ListenAddress {
    /// Builds an address from a host name (or literal IP) and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Host name or literal IP address.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port; `0` asks the kernel for an ephemeral port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ListenAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "tcp://[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "tcp://{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_ipv4_address() {
        let address = ListenAddress::new("127.0.0.1", 6000);
        assert_eq!(address.to_string(), "tcp://127.0.0.1:6000");
    }

    #[test]
    fn brackets_ipv6_hosts() {
        let address = ListenAddress::new("::1", 6000);
        assert_eq!(address.to_string(), "tcp://[::1]:6000");
    }
}

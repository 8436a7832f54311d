//! Server identities.

use std::fmt;

/// Role of a server in a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServerRole {
    /// Hosts the primary write-logged device
    Storage,
    /// Relays host writes toward archives
    Proxy,
    /// Holds base images and diffs
    Archive,
}

impl fmt::Display for ServerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServerRole::Storage => "storage",
            ServerRole::Proxy => "proxy",
            ServerRole::Archive => "archive",
        })
    }
}

/// Identity of one server process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerParams {
    pub name: String,
    pub addr: String,
    pub port: u16,
    pub role: ServerRole,
    /// Volume group backing an archive's base images
    pub vg: Option<String>,
}

impl ServerParams {
    pub fn new(name: impl Into<String>, addr: impl Into<String>, port: u16, role: ServerRole) -> Self {
        Self {
            name: name.into(),
            addr: addr.into(),
            port,
            role,
            vg: None,
        }
    }

    /// Shorthand for an archive server.
    pub fn archive(name: impl Into<String>, addr: impl Into<String>, port: u16) -> Self {
        Self::new(name, addr, port, ServerRole::Archive)
    }

    pub fn with_vg(mut self, vg: impl Into<String>) -> Self {
        self.vg = Some(vg.into());
        self
    }
}

impl fmt::Display for ServerParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}:{})", self.name, self.addr, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_params_display() {
        let a0 = ServerParams::archive("a0", "192.168.0.1", 10200);
        assert_eq!(a0.to_string(), "a0(192.168.0.1:10200)");
        assert_eq!(a0.role, ServerRole::Archive);
    }

    #[test]
    fn test_server_params_vg() {
        let a0 = ServerParams::archive("a0", "localhost", 10200).with_vg("vg0");
        assert_eq!(a0.vg.as_deref(), Some("vg0"));
        assert_ne!(a0, ServerParams::archive("a0", "localhost", 10200));
    }
}

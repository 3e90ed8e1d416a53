//! Standard host paths used by nettopo.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Directory where `ip netns add` places named namespaces.
pub static NETNS_DIR: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("NETTOPO_NETNS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/var/run/netns"))
});

/// Sysfs directory listing the host's network interfaces.
pub static SYSFS_NET: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("NETTOPO_SYSFS_NET")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/sys/class/net"))
});

/// Default port-name file, relative to the test working directory.
pub static PORT_MAP_FILE: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("NETTOPO_PORT_MAP")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("testdata/netport.yaml"))
});

/// Host paths consulted while building a topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetTopoPaths {
    /// Named network namespace directory (default: /var/run/netns).
    pub netns_dir: PathBuf,
    /// Network interface class directory (default: /sys/class/net).
    pub sysfs_net: PathBuf,
    /// Port-name YAML file (default: testdata/netport.yaml).
    pub port_map: PathBuf,
}

impl Default for NetTopoPaths {
    fn default() -> Self {
        Self {
            netns_dir: NETNS_DIR.clone(),
            sysfs_net: SYSFS_NET.clone(),
            port_map: PORT_MAP_FILE.clone(),
        }
    }
}

impl NetTopoPaths {
    /// Create paths with default locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different port-name file.
    #[must_use]
    pub fn with_port_map(mut self, path: impl Into<PathBuf>) -> Self {
        self.port_map = path.into();
        self
    }

    /// Use a different netns directory.
    #[must_use]
    pub fn with_netns_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.netns_dir = path.into();
        self
    }

    /// Use a different sysfs net class directory.
    #[must_use]
    pub fn with_sysfs_net(mut self, path: impl Into<PathBuf>) -> Self {
        self.sysfs_net = path.into();
        self
    }

    /// Bind-mount file backing a named namespace.
    #[must_use]
    pub fn netns(&self, name: &str) -> PathBuf {
        self.netns_dir.join(name)
    }

    /// Sysfs entry of a network interface.
    #[must_use]
    pub fn interface(&self, ifname: &str) -> PathBuf {
        self.sysfs_net.join(ifname)
    }

    /// Whether a named namespace already exists on the host.
    #[must_use]
    pub fn netns_exists(&self, name: &str) -> bool {
        self.netns(name).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_locations() {
        let paths = NetTopoPaths::new()
            .with_netns_dir("/tmp/netns")
            .with_sysfs_net("/tmp/net");
        assert_eq!(paths.netns("h1"), PathBuf::from("/tmp/netns/h1"));
        assert_eq!(paths.interface("eth0"), PathBuf::from("/tmp/net/eth0"));
    }

    #[test]
    fn netns_exists_follows_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let paths = NetTopoPaths::new().with_netns_dir(dir.path());
        assert!(!paths.netns_exists("h1"));
        std::fs::write(dir.path().join("h1"), b"").unwrap();
        assert!(paths.netns_exists("h1"));
    }
}

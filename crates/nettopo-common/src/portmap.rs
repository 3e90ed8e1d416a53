//! Port-name table.
//!
//! Test topologies name ports by a logical key such as `net0port0`. The host
//! running the tests supplies a YAML file mapping each key to the system
//! interface cabled to it:
//!
//! ```yaml
//! net0port0: eth-1-0
//! net0port1: eth-2-0
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{NetTopoError, NetTopoResult};
use crate::paths::NetTopoPaths;

/// Mapping between logical netport keys and system interface names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortMap {
    by_netport: BTreeMap<String, String>,
    by_ifname: BTreeMap<String, String>,
}

impl PortMap {
    /// Build a table from `(netport, ifname)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let by_netport: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let by_ifname = by_netport
            .iter()
            .map(|(netport, ifname)| (ifname.clone(), netport.clone()))
            .collect();
        Self {
            by_netport,
            by_ifname,
        }
    }

    /// Parse a table from YAML text. `origin` only labels errors.
    pub fn from_yaml_str(yaml: &str, origin: &Path) -> NetTopoResult<Self> {
        let by_netport: BTreeMap<String, String> =
            serde_yaml::from_str(yaml).map_err(|e| NetTopoError::PortMapParse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Self::from_pairs(by_netport))
    }

    /// Read and parse a port-name file.
    pub fn load(path: &Path) -> NetTopoResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|source| NetTopoError::PortMapRead {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::from_yaml_str(&yaml, path)?;
        tracing::debug!(path = %path.display(), ports = map.len(), "Loaded port map");
        Ok(map)
    }

    /// Read the configured port-name file and check it against the host.
    pub fn load_verified(paths: &NetTopoPaths) -> NetTopoResult<Self> {
        let map = Self::load(&paths.port_map)?;
        map.verify(paths)?;
        Ok(map)
    }

    /// Check that every mapped interface exists under sysfs.
    pub fn verify(&self, paths: &NetTopoPaths) -> NetTopoResult<()> {
        for (netport, ifname) in &self.by_netport {
            if !paths.interface(ifname).exists() {
                return Err(NetTopoError::MissingInterface {
                    key: netport.clone(),
                    interface: ifname.clone(),
                });
            }
        }
        Ok(())
    }

    /// System interface name for a netport key.
    pub fn resolve(&self, netport: &str) -> NetTopoResult<&str> {
        self.by_netport
            .get(netport)
            .map(String::as_str)
            .ok_or_else(|| NetTopoError::UnknownPort {
                key: netport.to_string(),
            })
    }

    /// Netport key for a system interface name.
    #[must_use]
    pub fn netport_of(&self, ifname: &str) -> Option<&str> {
        self.by_ifname.get(ifname).map(String::as_str)
    }

    /// Number of mapped ports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_netport.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_netport.is_empty()
    }

    /// Iterate `(netport, ifname)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_netport
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = "net0port0: eth-1-0\nnet0port1: eth-2-0\n";

    #[test]
    fn parse_and_resolve() {
        let map = PortMap::from_yaml_str(YAML, Path::new("netport.yaml")).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve("net0port1").unwrap(), "eth-2-0");
        assert_eq!(map.netport_of("eth-1-0"), Some("net0port0"));
        assert!(matches!(
            map.resolve("net7port7"),
            Err(NetTopoError::UnknownPort { .. })
        ));
    }

    #[test]
    fn malformed_yaml_is_fatal() {
        let err = PortMap::from_yaml_str("- just\n- a list\n", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, NetTopoError::PortMapParse { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = PortMap::load(&dir.path().join("netport.yaml")).unwrap_err();
        assert!(matches!(err, NetTopoError::PortMapRead { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn verify_against_sysfs() {
        let dir = tempfile::tempdir().unwrap();
        let sysfs = dir.path().join("net");
        std::fs::create_dir_all(sysfs.join("eth-1-0")).unwrap();
        let port_map = dir.path().join("netport.yaml");
        std::fs::write(&port_map, YAML).unwrap();

        let paths = NetTopoPaths::new()
            .with_sysfs_net(&sysfs)
            .with_port_map(&port_map);
        let err = PortMap::load_verified(&paths).unwrap_err();
        assert!(matches!(
            err,
            NetTopoError::MissingInterface { ref interface, .. } if interface == "eth-2-0"
        ));

        std::fs::create_dir_all(sysfs.join("eth-2-0")).unwrap();
        let map = PortMap::load_verified(&paths).unwrap();
        assert_eq!(
            map.iter().collect::<Vec<_>>(),
            vec![("net0port0", "eth-1-0"), ("net0port1", "eth-2-0")]
        );
    }
}

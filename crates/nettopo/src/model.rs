//! Declarative topology model.
//!
//! A [`Topology`] is an ordered list of [`InterfaceSpec`]s. Each entry names
//! the namespace it lives in and either a logical netport (resolved through
//! the port map) or, for bridges, the bridge's own interface name. Later
//! entries may refer to namespaces and bridges declared by earlier ones.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use nettopo_common::{NetTopoError, NetTopoResult};

use crate::family::AddressFamily;

/// Role of an interface in the topology.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// A physical port moved into a namespace and addressed directly.
    #[default]
    Port,
    /// A VLAN sub-interface of a port, addressed directly.
    PortVlan,
    /// A bridge created inside a namespace.
    Bridge,
    /// A VLAN sub-interface enslaved to a bridge; carries no address.
    BridgePort,
}

impl DeviceType {
    /// Derive the device type. The bridge flag wins over everything else.
    #[must_use]
    pub fn classify(is_bridge: bool, vlan: Option<u16>, upper: Option<&str>) -> Self {
        if is_bridge {
            Self::Bridge
        } else if vlan.is_some_and(|id| id != 0) {
            if upper.is_some_and(|u| !u.is_empty()) {
                Self::BridgePort
            } else {
                Self::PortVlan
            }
        } else {
            Self::Port
        }
    }

    /// Whether the entry gets its addresses assigned.
    #[must_use]
    pub const fn is_addressable(self) -> bool {
        !matches!(self, Self::BridgePort)
    }
}

/// A static route installed in an interface's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Destination prefix or host address.
    pub prefix: String,
    /// Next-hop address.
    pub gateway: String,
}

impl RouteSpec {
    /// Create a route.
    pub fn new(prefix: impl Into<String>, gateway: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            gateway: gateway.into(),
        }
    }

    /// Address family, taken from the destination prefix.
    pub fn family(&self) -> NetTopoResult<AddressFamily> {
        AddressFamily::of(&self.prefix)
    }

    fn validate(&self) -> NetTopoResult<()> {
        let prefix = AddressFamily::of(&self.prefix)?;
        let gateway = AddressFamily::of(&self.gateway)?;
        if prefix != gateway {
            return Err(NetTopoError::RouteFamilyMismatch {
                prefix: self.prefix.clone(),
                gateway: self.gateway.clone(),
            });
        }
        Ok(())
    }
}

/// Auxiliary loopback-like interface standing in for a remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryInterfaceSpec {
    /// Interface name inside the namespace.
    pub ifname: String,
    /// Address assigned to it.
    pub address: String,
}

impl SecondaryInterfaceSpec {
    /// Create a secondary interface.
    pub fn new(ifname: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            ifname: ifname.into(),
            address: address.into(),
        }
    }
}

/// One interface participating in a topology.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceSpec {
    #[serde(skip)]
    device_type: DeviceType,
    /// Create a bridge instead of using a port.
    pub is_bridge: bool,
    /// Fixed ifindex for a bridge, keeping numbering stable across namespaces.
    pub bridge_ifindex: Option<u32>,
    /// Hardware address for a bridge.
    pub bridge_mac: Option<String>,
    /// VLAN id; `None` or `0` means untagged.
    pub vlan: Option<u16>,
    /// Lookup key into the port map.
    pub netport: Option<String>,
    /// Target namespace.
    pub netns: String,
    /// Interface name: given for bridges, resolved for ports.
    pub ifname: Option<String>,
    /// Bridge this entry is enslaved to (bridge ports only).
    pub upper: Option<String>,
    /// Legacy single address, used when `addresses` is empty.
    pub address: Option<String>,
    /// Addresses, possibly mixing IPv4 and IPv6.
    pub addresses: Vec<String>,
    /// Secondary dummy interfaces created in the same namespace.
    pub dummies: Vec<SecondaryInterfaceSpec>,
    /// Static routes.
    pub routes: Vec<RouteSpec>,
    /// Peer addresses expected to be reachable once the topology is up.
    pub remotes: Vec<String>,
}

impl InterfaceSpec {
    /// A port identified by its netport key, placed in `netns`.
    pub fn port(netport: impl Into<String>, netns: impl Into<String>) -> Self {
        Self {
            netport: Some(netport.into()),
            netns: netns.into(),
            ..Self::default()
        }
    }

    /// A bridge named `ifname`, created in `netns`.
    pub fn bridge(ifname: impl Into<String>, netns: impl Into<String>) -> Self {
        Self {
            is_bridge: true,
            ifname: Some(ifname.into()),
            netns: netns.into(),
            ..Self::default()
        }
    }

    /// Tag with a VLAN id.
    #[must_use]
    pub const fn vlan(mut self, id: u16) -> Self {
        self.vlan = Some(id);
        self
    }

    /// Enslave to the named bridge.
    #[must_use]
    pub fn upper(mut self, bridge: impl Into<String>) -> Self {
        self.upper = Some(bridge.into());
        self
    }

    /// Pin the bridge ifindex.
    #[must_use]
    pub const fn bridge_ifindex(mut self, ifindex: u32) -> Self {
        self.bridge_ifindex = Some(ifindex);
        self
    }

    /// Set the bridge hardware address.
    #[must_use]
    pub fn bridge_mac(mut self, mac: impl Into<String>) -> Self {
        self.bridge_mac = Some(mac.into());
        self
    }

    /// Set the legacy single address.
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Append to the address list.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.addresses.push(address.into());
        self
    }

    /// Append a static route.
    #[must_use]
    pub fn route(mut self, prefix: impl Into<String>, gateway: impl Into<String>) -> Self {
        self.routes.push(RouteSpec::new(prefix, gateway));
        self
    }

    /// Append a secondary dummy interface.
    #[must_use]
    pub fn dummy(mut self, ifname: impl Into<String>, address: impl Into<String>) -> Self {
        self.dummies.push(SecondaryInterfaceSpec::new(ifname, address));
        self
    }

    /// Append an expected peer address.
    #[must_use]
    pub fn remote(mut self, address: impl Into<String>) -> Self {
        self.remotes.push(address.into());
        self
    }

    /// Device type, as derived by [`Topology::normalize`].
    #[must_use]
    pub const fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// VLAN id, if tagged.
    #[must_use]
    pub fn vlan_id(&self) -> Option<u16> {
        self.vlan.filter(|id| *id != 0)
    }

    /// Interface name, once known.
    #[must_use]
    pub fn ifname(&self) -> Option<&str> {
        self.ifname.as_deref()
    }

    pub(crate) fn set_ifname(&mut self, ifname: String) {
        self.ifname = Some(ifname);
    }

    /// Addresses to assign: the list if present, else the legacy address.
    pub fn effective_addresses(&self) -> impl Iterator<Item = &str> {
        let legacy = if self.addresses.is_empty() {
            self.address.as_deref()
        } else {
            None
        };
        self.addresses.iter().map(String::as_str).chain(legacy)
    }

    /// Short human label for logs.
    #[must_use]
    pub fn label(&self) -> String {
        let name = self
            .ifname
            .as_deref()
            .or(self.netport.as_deref())
            .unwrap_or("?");
        format!("{}:{name}", self.netns)
    }

    fn normalize(&mut self) -> NetTopoResult<()> {
        self.device_type =
            DeviceType::classify(self.is_bridge, self.vlan, self.upper.as_deref());

        if self.netns.is_empty() {
            return Err(self.invalid("missing namespace"));
        }
        match self.device_type {
            DeviceType::Bridge => {
                if self.ifname.as_deref().is_none_or(str::is_empty) {
                    return Err(self.invalid("bridge without an interface name"));
                }
            }
            _ => {
                if self.netport.as_deref().is_none_or(str::is_empty) {
                    return Err(self.invalid("port without a netport key"));
                }
            }
        }
        if !self.device_type.is_addressable() && self.effective_addresses().next().is_some() {
            return Err(self.invalid("bridge ports cannot carry addresses"));
        }

        for address in self.effective_addresses() {
            AddressFamily::of(address)?;
        }
        for route in &self.routes {
            route.validate()?;
        }
        for dummy in &self.dummies {
            AddressFamily::of(&dummy.address)?;
        }
        Ok(())
    }

    fn invalid(&self, what: &str) -> NetTopoError {
        NetTopoError::InvalidTopology {
            message: format!("{}: {what}", self.label()),
        }
    }
}

/// Ordered set of interfaces making up a virtual network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Topology {
    interfaces: Vec<InterfaceSpec>,
}

impl Topology {
    /// Create a topology from its entries, in setup order.
    #[must_use]
    pub const fn new(interfaces: Vec<InterfaceSpec>) -> Self {
        Self { interfaces }
    }

    /// Parse a YAML list of interface entries.
    pub fn from_yaml_str(yaml: &str) -> NetTopoResult<Self> {
        let mut topology: Self =
            serde_yaml::from_str(yaml).map_err(|e| NetTopoError::InvalidTopology {
                message: e.to_string(),
            })?;
        topology.normalize()?;
        Ok(topology)
    }

    /// Derive device types and validate every entry.
    ///
    /// A bridge port's upper may already exist on the host. It is only
    /// rejected when it names a bridge declared later in the same namespace.
    /// Routes whose prefix and gateway disagree on address family are
    /// rejected.
    pub fn normalize(&mut self) -> NetTopoResult<()> {
        for spec in &mut self.interfaces {
            spec.normalize()?;
        }
        for (i, spec) in self.interfaces.iter().enumerate() {
            if spec.device_type != DeviceType::BridgePort {
                continue;
            }
            let upper = spec.upper.as_deref().unwrap_or_default();
            let declared_later = self.interfaces[i + 1..].iter().any(|other| {
                other.device_type == DeviceType::Bridge
                    && other.netns == spec.netns
                    && other.ifname.as_deref() == Some(upper)
            });
            if declared_later {
                return Err(spec.invalid(&format!(
                    "upper bridge {upper} is declared after it in {}",
                    spec.netns
                )));
            }
        }
        Ok(())
    }

    /// Entries in declared order.
    #[must_use]
    pub fn interfaces(&self) -> &[InterfaceSpec] {
        &self.interfaces
    }

    pub(crate) fn interfaces_mut(&mut self) -> &mut [InterfaceSpec] {
        &mut self.interfaces
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    /// Whether the topology has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Distinct namespaces, in order of first use.
    #[must_use]
    pub fn namespaces(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.interfaces
            .iter()
            .map(|spec| spec.netns.as_str())
            .filter(|ns| seen.insert(*ns))
            .collect()
    }
}

impl FromIterator<InterfaceSpec> for Topology {
    fn from_iter<I: IntoIterator<Item = InterfaceSpec>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

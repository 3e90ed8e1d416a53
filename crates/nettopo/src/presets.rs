//! Built-in topologies.
//!
//! Every preset uses the `netNportM` keys of the port-name table: ports
//! `netNport0` and `netNport1` are cabled back to back.

use crate::model::{InterfaceSpec, Topology};

/// Names accepted by [`by_name`].
pub const NAMES: &[&str] = &[
    "one-net",
    "one-ip6-net",
    "two-nets",
    "two-vlan-nets",
    "two-ip6-nets",
    "four-nets",
    "four-vlan-nets",
    "four-ip6-nets",
];

/// Look up a preset by name.
#[must_use]
pub fn by_name(name: &str) -> Option<Topology> {
    let topology = match name {
        "one-net" => one_net(),
        "one-ip6-net" => one_ip6_net(),
        "two-nets" => two_nets(),
        "two-vlan-nets" => two_vlan_nets(),
        "two-ip6-nets" => two_ip6_nets(),
        "four-nets" => four_nets(),
        "four-vlan-nets" => four_vlan_nets(),
        "four-ip6-nets" => four_ip6_nets(),
        _ => return None,
    };
    Some(topology)
}

/// `h0:net0port0 <-> h1:net0port1`, dual stack.
#[must_use]
pub fn one_net() -> Topology {
    Topology::new(vec![
        InterfaceSpec::port("net0port0", "h0")
            .with_address("10.1.0.0/31")
            .with_address("2001:db8:85a3::370:0001/64")
            .remote("10.1.0.1")
            .remote("2001:db8:85a3::370:0002"),
        InterfaceSpec::port("net0port1", "h1")
            .with_address("10.1.0.1/31")
            .with_address("2001:db8:85a3::370:0002/64")
            .remote("10.1.0.0")
            .remote("2001:db8:85a3::370:0001"),
    ])
}

/// `h0:net0port0 <-> h1:net0port1`, IPv6 only.
#[must_use]
pub fn one_ip6_net() -> Topology {
    Topology::new(vec![
        InterfaceSpec::port("net0port0", "h0")
            .address("2001:db8:85a3::370:0001/64")
            .remote("2001:db8:85a3::370:0002"),
        InterfaceSpec::port("net0port1", "h1")
            .address("2001:db8:85a3::370:0002/64")
            .remote("2001:db8:85a3::370:0001"),
    ])
}

/// Two hosts routed through `r`.
///
/// ```text
/// h1:net0port0 <-> r:net0port1
/// h2:net1port0 <-> r:net1port1
/// ```
#[must_use]
pub fn two_nets() -> Topology {
    two_nets_tagged([None, None])
}

/// [`two_nets`] over VLAN 1 and VLAN 2.
#[must_use]
pub fn two_vlan_nets() -> Topology {
    two_nets_tagged([Some(1), Some(2)])
}

fn two_nets_tagged(vlans: [Option<u16>; 2]) -> Topology {
    let tag = |spec: InterfaceSpec, vlan: Option<u16>| match vlan {
        Some(id) => spec.vlan(id),
        None => spec,
    };
    Topology::new(vec![
        tag(
            InterfaceSpec::port("net0port0", "h1")
                .address("10.1.0.0/31")
                .route("10.1.0.2/31", "10.1.0.1")
                .remote("10.1.0.2"),
            vlans[0],
        ),
        tag(InterfaceSpec::port("net0port1", "r").address("10.1.0.1/31"), vlans[0]),
        tag(
            InterfaceSpec::port("net1port0", "h2")
                .address("10.1.0.2/31")
                .route("10.1.0.0/31", "10.1.0.3")
                .remote("10.1.0.0"),
            vlans[1],
        ),
        tag(InterfaceSpec::port("net1port1", "r").address("10.1.0.3/31"), vlans[1]),
    ])
}

/// [`two_nets`] addressed with IPv6.
#[must_use]
pub fn two_ip6_nets() -> Topology {
    Topology::new(vec![
        InterfaceSpec::port("net0port0", "h1")
            .address("2001:db8:85a3::370:0001/64")
            .route("3001:db8:85a3::370:0002/64", "2001:db8:85a3::370:0002")
            .remote("3001:db8:85a3::370:0002"),
        InterfaceSpec::port("net0port1", "r").address("2001:db8:85a3::370:0002/64"),
        InterfaceSpec::port("net1port0", "h2")
            .address("3001:db8:85a3::370:0002/64")
            .route("2001:db8:85a3::370:0001/64", "3001:db8:85a3::370:0001")
            .remote("2001:db8:85a3::370:0001"),
        InterfaceSpec::port("net1port1", "r").address("3001:db8:85a3::370:0001/64"),
    ])
}

/// Two hosts with two links each to `r`, plus a dummy endpoint per host.
#[must_use]
pub fn four_nets() -> Topology {
    Topology::new(vec![
        InterfaceSpec::port("net0port0", "h1")
            .address("10.1.0.0/31")
            .dummy("dummy0", "10.5.5.5")
            .route("10.1.0.2/31", "10.1.0.1")
            .route("10.6.6.6", "10.1.0.1")
            .remote("10.1.0.2")
            .remote("10.6.6.6"),
        InterfaceSpec::port("net0port1", "r")
            .address("10.1.0.1/31")
            .route("10.5.5.5", "10.1.0.0"),
        InterfaceSpec::port("net1port0", "h2")
            .address("10.1.0.2/31")
            .dummy("dummy0", "10.6.6.6")
            .route("10.1.0.0/31", "10.1.0.3")
            .route("10.5.5.5", "10.1.0.3")
            .remote("10.1.0.0")
            .remote("10.5.5.5"),
        InterfaceSpec::port("net1port1", "r")
            .address("10.1.0.3/31")
            .route("10.6.6.6", "10.1.0.2"),
        InterfaceSpec::port("net2port0", "h1")
            .address("10.2.0.0/31")
            .route("10.2.0.2/31", "10.2.0.1")
            .route("10.1.0.0/31", "10.2.0.1")
            .route("10.6.6.6", "10.2.0.1")
            .remote("10.2.0.2"),
        InterfaceSpec::port("net2port1", "r")
            .address("10.2.0.1/31")
            .route("10.5.5.5", "10.2.0.0")
            .route("10.1.0.0/31", "10.2.0.0"),
        InterfaceSpec::port("net3port0", "h2")
            .address("10.2.0.2/31")
            .route("10.2.0.0/31", "10.2.0.3")
            .route("10.1.0.2/31", "10.2.0.3")
            .route("10.5.5.5", "10.2.0.3")
            .remote("10.2.0.0"),
        InterfaceSpec::port("net3port1", "r")
            .address("10.2.0.3/31")
            .route("10.1.0.2/31", "10.2.0.2")
            .route("10.6.6.6", "10.2.0.2"),
    ])
}

/// [`four_nets`] with each link on its own VLAN (1 through 4).
#[must_use]
pub fn four_vlan_nets() -> Topology {
    Topology::new(vec![
        InterfaceSpec::port("net0port0", "h1")
            .vlan(1)
            .address("10.1.0.0/31")
            .dummy("dummy0", "10.5.5.5")
            .route("10.1.0.2/31", "10.1.0.1")
            .route("10.6.6.6", "10.1.0.1")
            .remote("10.1.0.2")
            .remote("10.6.6.6"),
        InterfaceSpec::port("net0port1", "r")
            .vlan(1)
            .address("10.1.0.1/31")
            .route("10.5.5.5", "10.1.0.2"),
        InterfaceSpec::port("net1port0", "h2")
            .vlan(2)
            .address("10.1.0.2/31")
            .dummy("dummy0", "10.6.6.6")
            .route("10.1.0.0/31", "10.1.0.3")
            .route("10.5.5.5", "10.1.0.3")
            .remote("10.1.0.0")
            .remote("10.5.5.5"),
        InterfaceSpec::port("net1port1", "r")
            .vlan(2)
            .address("10.1.0.3/31")
            .route("10.6.6.6", "10.1.0.2"),
        InterfaceSpec::port("net2port0", "h1")
            .vlan(3)
            .address("10.2.0.0/31")
            .route("10.2.0.2/31", "10.2.0.1")
            .route("10.6.6.6", "10.2.0.1")
            .remote("10.2.0.2"),
        InterfaceSpec::port("net2port1", "r")
            .vlan(3)
            .address("10.2.0.1/31")
            .route("10.5.5.5", "10.2.0.2"),
        InterfaceSpec::port("net3port0", "h2")
            .vlan(4)
            .address("10.2.0.2/31")
            .route("10.2.0.0/31", "10.2.0.3")
            .route("10.5.5.5", "10.2.0.3")
            .remote("10.2.0.0"),
        InterfaceSpec::port("net3port1", "r")
            .vlan(4)
            .address("10.2.0.3/31")
            .route("10.6.6.6", "10.2.0.2"),
    ])
}

/// [`four_nets`] addressed with IPv6.
#[must_use]
pub fn four_ip6_nets() -> Topology {
    Topology::new(vec![
        InterfaceSpec::port("net0port0", "h1")
            .address("2001:db8:85a3::370:0001/64")
            .dummy("dummy0", "2222:db8:85a3::370:0001")
            .route("2002:db8:85a3::370:0001/64", "2001:db8:85a3::370:0002")
            .route("3333:db8:85a3::370:0001", "2001:db8:85a3::370:0002")
            .remote("2002:db8:85a3::370:0001")
            .remote("3333:db8:85a3::370:0001"),
        InterfaceSpec::port("net0port1", "r")
            .address("2001:db8:85a3::370:0002/64")
            .route("2222:db8:85a3::370:0001", "2001:db8:85a3::370:0001"),
        InterfaceSpec::port("net1port0", "h2")
            .address("2002:db8:85a3::370:0001/64")
            .dummy("dummy0", "3333:db8:85a3::370:0001")
            .route("2001:db8:85a3::370:0001/64", "2002:db8:85a3::370:0002")
            .route("2222:db8:85a3::370:0001", "2002:db8:85a3::370:0002")
            .remote("2001:db8:85a3::370:0002")
            .remote("2222:db8:85a3::370:0001"),
        InterfaceSpec::port("net1port1", "r")
            .address("2002:db8:85a3::370:0002/64")
            .route("3333:db8:85a3::370:0001", "2002:db8:85a3::370:0001"),
        InterfaceSpec::port("net2port0", "h1")
            .address("3001:db8:85a3::370:0001/64")
            .route("3002:db8:85a3::370:0001/64", "3001:db8:85a3::370:0002")
            .route("2001:db8:85a3::370:0001/64", "3001:db8:85a3::370:0002")
            .route("3333:db8:85a3::370:0001", "3001:db8:85a3::370:0002")
            .remote("3002:db8:85a3::370:0001"),
        InterfaceSpec::port("net2port1", "r")
            .address("3001:db8:85a3::370:0002/64")
            .route("2222:db8:85a3::370:0001", "3001:db8:85a3::370:0001")
            .route("2001:db8:85a3::370:0001/64", "3001:db8:85a3::370:0001"),
        InterfaceSpec::port("net3port0", "h2")
            .address("3002:db8:85a3::370:0001/64")
            .route("3001:db8:85a3::370:0001/64", "3002:db8:85a3::370:0002")
            .route("2002:db8:85a3::370:0001/64", "3002:db8:85a3::370:0002")
            .route("2222:db8:85a3::370:0001", "3002:db8:85a3::370:0002")
            .remote("3001:db8:85a3::370:0001"),
        InterfaceSpec::port("net3port1", "r")
            .address("3002:db8:85a3::370:0002/64")
            .route("3001:db8:85a3::370:0001/64", "3002:db8:85a3::370:0001")
            .route("3333:db8:85a3::370:0001", "3002:db8:85a3::370:0001"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeviceType;

    #[test]
    fn every_preset_normalizes() {
        for name in NAMES {
            let mut topology = by_name(name).unwrap();
            topology
                .normalize()
                .unwrap_or_else(|e| panic!("{name}: {e}"));
            assert!(!topology.is_empty());
        }
        assert!(by_name("five-nets").is_none());
    }

    #[test]
    fn vlan_presets_are_tagged() {
        let mut topology = two_vlan_nets();
        topology.normalize().unwrap();
        let vlans: Vec<_> = topology.interfaces().iter().map(InterfaceSpec::vlan_id).collect();
        assert_eq!(vlans, vec![Some(1), Some(1), Some(2), Some(2)]);
        assert!(
            topology
                .interfaces()
                .iter()
                .all(|spec| spec.device_type() == DeviceType::PortVlan)
        );
    }
}

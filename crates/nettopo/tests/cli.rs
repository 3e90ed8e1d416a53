//! Integration tests for the nettopo binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PORT_MAP: &str = "\
net0port0: eth-1-0
net0port1: eth-2-0
net1port0: eth-3-0
net1port1: eth-4-0
";

fn nettopo(dir: &TempDir) -> Command {
    let port_map = dir.path().join("netport.yaml");
    std::fs::write(&port_map, PORT_MAP).unwrap();

    let mut cmd = Command::cargo_bin("nettopo").unwrap();
    cmd.env("NETTOPO_NETNS_DIR", dir.path().join("netns"))
        .env("NETTOPO_SYSFS_NET", dir.path().join("net"))
        .env("RUST_LOG", "off")
        .arg("--port-map")
        .arg(&port_map);
    cmd
}

#[test]
fn lists_presets() {
    let dir = tempfile::tempdir().unwrap();
    nettopo(&dir)
        .arg("presets")
        .assert()
        .success()
        .stdout(predicate::str::contains("two-vlan-nets"))
        .stdout(predicate::str::contains("four-ip6-nets"));
}

#[test]
fn plans_a_preset() {
    let dir = tempfile::tempdir().unwrap();
    nettopo(&dir)
        .args(["--capability", "disabled", "--no-verify-ports", "plan", "two-vlan-nets"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# setup\nip netns add h1\n"))
        .stdout(predicate::str::contains("ip link add eth-1-0.1 link eth-1-0 type vlan id 1"))
        .stdout(predicate::str::contains("# teardown\nip -n r -4 address del 10.1.0.3/31 dev eth-4-0.2"));
}

#[test]
fn plans_a_yaml_topology() {
    let dir = tempfile::tempdir().unwrap();
    let topology = dir.path().join("bridge.yaml");
    std::fs::write(
        &topology,
        "\
- is_bridge: true
  ifname: br0
  netns: r
  bridge_ifindex: 3000
- netport: net0port1
  netns: r
  vlan: 10
  upper: br0
",
    )
    .unwrap();

    nettopo(&dir)
        .args(["--capability", "enabled", "--no-verify-ports", "plan"])
        .arg(&topology)
        .assert()
        .success()
        .stdout(predicate::str::contains("ip -n r link add br0 index 3000 type xeth-bridge"))
        .stdout(predicate::str::contains("ip -n r link set eth-2-0.10 master br0"));
}

#[test]
fn missing_interface_aborts() {
    let dir = tempfile::tempdir().unwrap();
    nettopo(&dir)
        .args(["--capability", "disabled", "plan", "two-nets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn unknown_port_aborts_plan() {
    let dir = tempfile::tempdir().unwrap();
    nettopo(&dir)
        .args(["--capability", "disabled", "--no-verify-ports", "plan", "four-nets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown netport: net2port0"));
}

//! Live tests creating real namespaces. Need root and iproute2.
//!
//! Run with `--features integration`.
#![cfg(feature = "integration")]

use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

use nettopo::{
    CapabilityMode, DriverConfig, InterfaceSpec, PingTester, Platform, ProcessRunner, Topology,
    TopologyContext, TopologyDriver,
};
use nettopo_common::{NetTopoPaths, PortMap};

static COUNTER: AtomicU32 = AtomicU32::new(0);

fn check_privileges() -> bool {
    Command::new("ip")
        .args(["netns", "list"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
        && Command::new("id")
            .arg("-u")
            .output()
            .map(|o| String::from_utf8_lossy(&o.stdout).trim() == "0")
            .unwrap_or(false)
}

fn unique_ns_name(prefix: &str) -> String {
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = format!("{prefix}_{:x}_{seq}", std::process::id() % 0xFFFF);
    name.chars().take(15).collect()
}

#[test_log::test]
fn bridge_namespace_round_trip() {
    if !check_privileges() {
        eprintln!("Skipping test, insufficient privileges or missing tools");
        return;
    }

    let netns = unique_ns_name("nt_br");
    let config = DriverConfig::default()
        .with_capability(CapabilityMode::Disabled)
        .with_paths(NetTopoPaths::new());
    let runner = ProcessRunner;
    let platform = Platform::detect(&config, &runner);
    let ctx = TopologyContext::new(config, PortMap::default(), platform);

    let mut topology = Topology::new(vec![
        InterfaceSpec::bridge("ntbr0", netns.as_str())
            .address("10.200.9.1/24")
            .remote("10.200.9.1"),
    ]);
    let report = TopologyDriver::new(&ctx, &runner).run(&mut topology, &[&PingTester::default()]);

    assert!(report.setup_error.is_none(), "{:?}", report.setup_error);
    assert!(report.passed(), "{:?}", report.tests);
    assert!(report.teardown.is_clean(), "{:?}", report.teardown.failed);
    assert!(!NetTopoPaths::new().netns_exists(&netns));
}

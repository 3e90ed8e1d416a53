//! Functional tests run against a live topology.

use nettopo_common::NetTopoResult;

use crate::command::{CommandLine, CommandRunner};
use crate::driver::TopologyContext;
use crate::family::AddressFamily;
use crate::model::Topology;

/// A check executed once a topology is up.
pub trait Tester {
    /// Name used in reports.
    fn name(&self) -> &str;

    /// Run the check.
    fn test(
        &self,
        topology: &Topology,
        ctx: &TopologyContext,
        runner: &dyn CommandRunner,
    ) -> NetTopoResult<()>;
}

/// Pings every remote of every interface from its namespace.
#[derive(Debug, Clone, Copy)]
pub struct PingTester {
    /// Echo requests per remote.
    pub count: u32,
    /// Reply timeout in seconds.
    pub timeout_secs: u32,
}

impl Default for PingTester {
    fn default() -> Self {
        Self {
            count: 1,
            timeout_secs: 1,
        }
    }
}

impl PingTester {
    fn command(&self, ctx: &TopologyContext, netns: &str, family: AddressFamily, remote: &str) -> CommandLine {
        let count = self.count.to_string();
        let timeout = self.timeout_secs.to_string();
        let mut args = vec!["netns", "exec", netns, "ping", "-c", count.as_str(), "-W", timeout.as_str()];
        if family == AddressFamily::V6 {
            args.push("-6");
        }
        args.push(remote);
        CommandLine::ip(&ctx.config, &args)
    }
}

impl Tester for PingTester {
    fn name(&self) -> &str {
        "ping"
    }

    fn test(
        &self,
        topology: &Topology,
        ctx: &TopologyContext,
        runner: &dyn CommandRunner,
    ) -> NetTopoResult<()> {
        for spec in topology.interfaces() {
            for remote in &spec.remotes {
                let family = AddressFamily::of(remote)?;
                if family == AddressFamily::V6 && !ctx.platform.supports_ipv6() {
                    tracing::info!(netns = %spec.netns, %remote, "Skipping IPv6 ping on this platform");
                    continue;
                }
                runner.run(&self.command(ctx, &spec.netns, family, remote))?;
                tracing::debug!(netns = %spec.netns, %remote, "Remote reachable");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nettopo_common::{NetTopoError, PortMap};

    use super::*;
    use crate::command::RecordingRunner;
    use crate::config::DriverConfig;
    use crate::model::InterfaceSpec;
    use crate::platform::Platform;

    fn topology() -> Topology {
        Topology::new(vec![
            InterfaceSpec::port("net0port0", "h0")
                .with_address("10.1.0.0/31")
                .with_address("2001:db8:85a3::370:0001/64")
                .remote("10.1.0.1")
                .remote("2001:db8:85a3::370:0002"),
        ])
    }

    #[test]
    fn pings_every_remote() {
        let ctx = TopologyContext::new(DriverConfig::default(), PortMap::default(), Platform::higher_version());
        let runner = RecordingRunner::new();
        PingTester::default().test(&topology(), &ctx, &runner).unwrap();
        assert_eq!(
            runner.lines(),
            vec![
                "ip netns exec h0 ping -c 1 -W 1 10.1.0.1",
                "ip netns exec h0 ping -c 1 -W 1 -6 2001:db8:85a3::370:0002",
            ]
        );
    }

    #[test]
    fn skips_ipv6_on_generic_platform() {
        let ctx = TopologyContext::new(DriverConfig::default(), PortMap::default(), Platform::generic());
        let runner = RecordingRunner::new();
        PingTester::default().test(&topology(), &ctx, &runner).unwrap();
        assert_eq!(runner.lines(), vec!["ip netns exec h0 ping -c 1 -W 1 10.1.0.1"]);
    }

    #[test]
    fn unparsable_remote_reported() {
        let ctx = TopologyContext::new(DriverConfig::default(), PortMap::default(), Platform::generic());
        let runner = RecordingRunner::new();
        let topology = Topology::new(vec![InterfaceSpec::port("net0port0", "h0").remote("peer.example")]);
        let err = PingTester::default().test(&topology, &ctx, &runner).unwrap_err();
        assert!(matches!(err, NetTopoError::InvalidAddress { .. }));
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn unreachable_remote_fails() {
        let ctx = TopologyContext::new(DriverConfig::default(), PortMap::default(), Platform::generic());
        let runner = RecordingRunner::new().fail_always("ping");
        assert!(PingTester::default().test(&topology(), &ctx, &runner).is_err());
    }
}

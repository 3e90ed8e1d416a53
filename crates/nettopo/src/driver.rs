//! Topology driver.
//!
//! Turns a [`Topology`] into `ip` invocations. For each interface, in
//! declared order, the driver ensures the namespace, creates or moves the
//! link, enslaves bridge ports, assigns addresses, creates secondary dummy
//! interfaces and installs routes. Each change pushes its undo command onto a
//! [`TeardownStack`].

use std::collections::HashSet;
use std::fmt;

use nettopo_common::{NetTopoError, NetTopoResult, PortMap};

use crate::command::{CommandLine, CommandRunner, RecordingRunner};
use crate::config::DriverConfig;
use crate::family::AddressFamily;
use crate::model::{DeviceType, InterfaceSpec, Topology};
use crate::platform::Platform;
use crate::teardown::{TeardownReport, TeardownStack};
use crate::tester::Tester;

/// Everything the driver needs to know about the host, built once.
#[derive(Debug, Clone)]
pub struct TopologyContext {
    /// Driver configuration.
    pub config: DriverConfig,
    /// Port-name table.
    pub ports: PortMap,
    /// Detected platform capability.
    pub platform: Platform,
}

impl TopologyContext {
    /// Assemble a context from already-known parts.
    #[must_use]
    pub const fn new(config: DriverConfig, ports: PortMap, platform: Platform) -> Self {
        Self {
            config,
            ports,
            platform,
        }
    }

    /// Load the verified port map and probe the platform.
    ///
    /// Port-map problems are fatal; a failed probe only disables the
    /// higher-version mode.
    pub fn init(config: DriverConfig, runner: &dyn CommandRunner) -> NetTopoResult<Self> {
        config.validate()?;
        let ports = PortMap::load_verified(&config.paths)?;
        let platform = Platform::detect_once(&config, runner);
        Ok(Self::new(config, ports, platform))
    }
}

/// Result of a functional tester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    /// Tester name.
    pub name: String,
    /// Error text when the tester failed.
    pub error: Option<String>,
}

/// Outcome of [`TopologyDriver::run`].
#[derive(Debug, Default)]
pub struct TestReport {
    /// Setup error, if the topology could not be built.
    pub setup_error: Option<NetTopoError>,
    /// Tester outcomes, empty when setup failed.
    pub tests: Vec<TestOutcome>,
    /// Teardown outcome.
    pub teardown: TeardownReport,
}

impl TestReport {
    /// Whether setup and every tester succeeded.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.setup_error.is_none() && self.tests.iter().all(|t| t.error.is_none())
    }
}

/// Setup and teardown commands of a topology, as they would run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Setup commands in execution order.
    pub setup: Vec<CommandLine>,
    /// Teardown commands in execution order.
    pub teardown: Vec<CommandLine>,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# setup")?;
        for cmd in &self.setup {
            writeln!(f, "{cmd}")?;
        }
        writeln!(f, "# teardown")?;
        for cmd in &self.teardown {
            writeln!(f, "{cmd}")?;
        }
        Ok(())
    }
}

/// Builds topologies through a [`CommandRunner`].
pub struct TopologyDriver<'a> {
    ctx: &'a TopologyContext,
    runner: &'a dyn CommandRunner,
    created_netns: HashSet<String>,
}

impl<'a> TopologyDriver<'a> {
    /// Create a driver.
    #[must_use]
    pub fn new(ctx: &'a TopologyContext, runner: &'a dyn CommandRunner) -> Self {
        Self {
            ctx,
            runner,
            created_netns: HashSet::new(),
        }
    }

    fn ip(&self, args: &[&str]) -> CommandLine {
        CommandLine::ip(&self.ctx.config, args)
    }

    fn config(&self) -> &DriverConfig {
        &self.ctx.config
    }

    /// Whether an address of this family should be configured.
    fn family_enabled(&self, family: AddressFamily, what: &str, target: &str) -> bool {
        if family == AddressFamily::V6 && !self.ctx.platform.supports_ipv6() {
            tracing::info!(%target, what, "Skipping IPv6 configuration on this platform");
            return false;
        }
        true
    }

    /// Create a namespace unless it already exists.
    ///
    /// Only namespaces created here get a delete registered.
    pub fn ensure_namespace(&mut self, netns: &str, teardown: &mut TeardownStack) -> NetTopoResult<()> {
        if self.created_netns.contains(netns) || self.config().paths.netns_exists(netns) {
            tracing::debug!(%netns, "Namespace already present");
            return Ok(());
        }
        self.runner.run(&self.ip(&["netns", "add", netns]))?;
        teardown.push(self.ip(&["netns", "del", netns]));
        self.created_netns.insert(netns.to_string());
        tracing::debug!(%netns, "Namespace created");
        Ok(())
    }

    /// Create the link for an entry, or move its port into the namespace.
    ///
    /// Fills in the entry's interface name for ports.
    pub fn create_link(&mut self, spec: &mut InterfaceSpec, teardown: &mut TeardownStack) -> NetTopoResult<()> {
        if spec.device_type() == DeviceType::Bridge {
            self.create_bridge(spec, teardown)
        } else {
            self.move_port(spec, teardown)
        }
    }

    fn create_bridge(&self, spec: &InterfaceSpec, teardown: &mut TeardownStack) -> NetTopoResult<()> {
        let ns = spec.netns.as_str();
        let ifname = spec.ifname().ok_or_else(|| NetTopoError::InvalidTopology {
            message: format!("{}: bridge without an interface name", spec.label()),
        })?;
        let link_type = self.ctx.platform.bridge_link_type();

        let ifindex = spec.bridge_ifindex.map(|i| i.to_string());
        let add = match ifindex.as_deref() {
            Some(index) => self.ip(&["-n", ns, "link", "add", ifname, "index", index, "type", link_type]),
            None => self.ip(&["-n", ns, "link", "add", ifname, "type", link_type]),
        };
        self.runner.run(&add)?;
        teardown.push(self.ip(&["-n", ns, "link", "del", ifname]));

        if let Some(mac) = spec.bridge_mac.as_deref() {
            if self.config().assign_bridge_mac {
                self.runner
                    .run(&self.ip(&["-n", ns, "link", "set", ifname, "address", mac]))?;
            } else {
                tracing::debug!(%ifname, %mac, "Bridge hardware address assignment disabled");
            }
        }
        self.runner.run(&self.ip(&["-n", ns, "link", "set", ifname, "up"]))?;
        tracing::debug!(netns = %ns, %ifname, link_type, "Bridge created");
        Ok(())
    }

    fn move_port(&self, spec: &mut InterfaceSpec, teardown: &mut TeardownStack) -> NetTopoResult<()> {
        let netport = spec.netport.as_deref().ok_or_else(|| NetTopoError::InvalidTopology {
            message: format!("{}: port without a netport key", spec.label()),
        })?;
        let mut ifname = self.ctx.ports.resolve(netport)?.to_string();

        if let Some(vlan) = spec.vlan_id() {
            let parent = ifname;
            let id = vlan.to_string();
            ifname = format!("{parent}.{vlan}");
            self.runner.run(&self.ip(&["link", "set", &parent, "up"]))?;
            self.runner.run(&self.ip(&[
                "link",
                "add",
                &ifname,
                "link",
                &parent,
                "type",
                self.ctx.platform.vlan_link_type(),
                "id",
                &id,
            ]))?;
            teardown.push(self.ip(&["link", "del", &ifname]));
        }
        spec.set_ifname(ifname.clone());

        let ns = spec.netns.as_str();
        self.runner.run_with_retry(
            self.config().link_attempts,
            &self.ip(&["link", "set", &ifname, "up", "netns", ns]),
        )?;
        teardown.push(self.ip(&["-n", ns, "link", "set", &ifname, "down", "netns", "1"]));
        tracing::debug!(netns = %ns, %ifname, "Link moved into namespace");
        Ok(())
    }

    /// Enslave a bridge port to its upper bridge.
    pub fn attach_bridge(&self, spec: &InterfaceSpec, teardown: &mut TeardownStack) -> NetTopoResult<()> {
        if spec.device_type() != DeviceType::BridgePort {
            return Ok(());
        }
        let ns = spec.netns.as_str();
        let ifname = Self::resolved(spec)?;
        let upper = spec.upper.as_deref().unwrap_or_default();
        self.runner
            .run(&self.ip(&["-n", ns, "link", "set", ifname, "master", upper]))?;
        teardown.push(self.ip(&["-n", ns, "link", "set", ifname, "nomaster"]));
        Ok(())
    }

    /// Assign the entry's addresses, skipping IPv6 when unsupported.
    pub fn assign_addresses(&self, spec: &InterfaceSpec, teardown: &mut TeardownStack) -> NetTopoResult<()> {
        if !spec.device_type().is_addressable() {
            return Ok(());
        }
        let ns = spec.netns.as_str();
        for address in spec.effective_addresses() {
            let ifname = Self::resolved(spec)?;
            let family = AddressFamily::of(address)?;
            if !self.family_enabled(family, "address", address) {
                continue;
            }
            self.runner.run_with_retry(
                self.config().address_attempts,
                &self.ip(&["-n", ns, family.flag(), "address", "add", address, "dev", ifname]),
            )?;
            teardown.push(self.ip(&["-n", ns, family.flag(), "address", "del", address, "dev", ifname]));
        }
        Ok(())
    }

    /// Create dummy interfaces standing in for remote endpoints.
    pub fn create_secondary_interfaces(
        &self,
        spec: &InterfaceSpec,
        teardown: &mut TeardownStack,
    ) -> NetTopoResult<()> {
        let ns = spec.netns.as_str();
        for dummy in &spec.dummies {
            let family = AddressFamily::of(&dummy.address)?;
            if !self.family_enabled(family, "secondary interface", &dummy.address) {
                continue;
            }
            let ifname = dummy.ifname.as_str();
            self.runner
                .run(&self.ip(&["-n", ns, "link", "add", ifname, "type", "dummy"]))?;
            teardown.push(self.ip(&["-n", ns, "link", "del", ifname]));
            self.runner.run(&self.ip(&["-n", ns, "link", "set", ifname, "up"]))?;
            self.runner.run_with_retry(
                self.config().address_attempts,
                &self.ip(&["-n", ns, family.flag(), "address", "add", &dummy.address, "dev", ifname]),
            )?;
        }
        Ok(())
    }

    /// Install the entry's static routes. Routes are not retried.
    pub fn install_routes(&self, spec: &InterfaceSpec, teardown: &mut TeardownStack) -> NetTopoResult<()> {
        let ns = spec.netns.as_str();
        for route in &spec.routes {
            let family = route.family()?;
            if !self.family_enabled(family, "route", &route.prefix) {
                continue;
            }
            self.runner.run(&self.ip(&[
                "-n",
                ns,
                family.flag(),
                "route",
                "add",
                &route.prefix,
                "via",
                &route.gateway,
            ]))?;
            teardown.push(self.ip(&[
                "-n",
                ns,
                family.flag(),
                "route",
                "del",
                &route.prefix,
                "via",
                &route.gateway,
            ]));
        }
        Ok(())
    }

    /// Run every setup step for one entry.
    pub fn setup_interface(&mut self, spec: &mut InterfaceSpec, teardown: &mut TeardownStack) -> NetTopoResult<()> {
        self.ensure_namespace(&spec.netns.clone(), teardown)?;
        self.create_link(spec, teardown)?;
        self.attach_bridge(spec, teardown)?;
        self.assign_addresses(spec, teardown)?;
        self.create_secondary_interfaces(spec, teardown)?;
        self.install_routes(spec, teardown)?;
        tracing::debug!(interface = %spec.label(), device_type = ?spec.device_type(), "Interface configured");
        Ok(())
    }

    /// Build a whole topology, stopping at the first failing entry.
    ///
    /// Undo commands for everything done so far stay on `teardown` even on
    /// error; the caller must unwind it.
    pub fn setup(&mut self, topology: &mut Topology, teardown: &mut TeardownStack) -> NetTopoResult<()> {
        topology.normalize()?;
        for spec in topology.interfaces_mut() {
            if let Err(e) = self.setup_interface(spec, teardown) {
                tracing::error!(interface = %spec.label(), error = %e, "Topology setup failed");
                return Err(e);
            }
        }
        tracing::info!(interfaces = topology.len(), teardown = teardown.len(), "Topology is up");
        Ok(())
    }

    /// Build the topology, run the testers against it, and tear it down.
    ///
    /// Testers run only if setup succeeded. Teardown always runs.
    pub fn run(&mut self, topology: &mut Topology, tests: &[&dyn Tester]) -> TestReport {
        let mut teardown = TeardownStack::new();
        let mut report = TestReport::default();

        match self.setup(topology, &mut teardown) {
            Ok(()) => {
                for tester in tests {
                    let error = tester
                        .test(topology, self.ctx, self.runner)
                        .err()
                        .map(|e| e.to_string());
                    match &error {
                        Some(e) => tracing::warn!(test = tester.name(), error = %e, "Test failed"),
                        None => tracing::info!(test = tester.name(), "Test passed"),
                    }
                    report.tests.push(TestOutcome {
                        name: tester.name().to_string(),
                        error,
                    });
                }
            }
            Err(e) => report.setup_error = Some(e),
        }

        report.teardown = teardown.unwind(self.runner);
        self.created_netns.clear();
        tracing::info!(
            actions = report.teardown.executed.len(),
            failed = report.teardown.failed.len(),
            "Topology torn down"
        );
        report
    }

    /// Compute the commands a topology would issue, without running them.
    pub fn plan(ctx: &TopologyContext, topology: &mut Topology) -> NetTopoResult<Plan> {
        let runner = RecordingRunner::new();
        let mut teardown = TeardownStack::new();
        TopologyDriver::new(ctx, &runner).setup(topology, &mut teardown)?;
        Ok(Plan {
            setup: runner.commands(),
            teardown: teardown.iter().rev().cloned().collect(),
        })
    }

    fn resolved(spec: &InterfaceSpec) -> NetTopoResult<&str> {
        spec.ifname().ok_or_else(|| NetTopoError::InvalidTopology {
            message: format!("{}: interface name not resolved", spec.label()),
        })
    }
}

//! # nettopo
//!
//! Declarative virtual network topologies for namespace-based tests.
//!
//! A [`Topology`] lists interfaces, their namespaces, VLAN and bridge roles,
//! addresses and routes. The [`TopologyDriver`] turns it into `ip`
//! invocations, records the undo command of every step on a
//! [`TeardownStack`], runs functional [`Tester`]s against the live network
//! and dismantles it again in reverse order.
//!
//! ## Usage
//!
//! ```no_run
//! use nettopo::{DriverConfig, PingTester, ProcessRunner, TopologyContext, TopologyDriver, presets};
//!
//! # fn example() -> nettopo_common::NetTopoResult<()> {
//! let runner = ProcessRunner;
//! let ctx = TopologyContext::init(DriverConfig::default(), &runner)?;
//!
//! let mut topology = presets::two_nets();
//! let report = TopologyDriver::new(&ctx, &runner).run(&mut topology, &[&PingTester::default()]);
//! assert!(report.passed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod cli;
pub mod command;
pub mod config;
pub mod driver;
pub mod family;
pub mod model;
pub mod platform;
pub mod presets;
pub mod teardown;
pub mod tester;

pub use command::{CommandLine, CommandRunner, ProcessRunner, RecordingRunner};
pub use config::{CapabilityMode, DriverConfig};
pub use driver::{Plan, TestOutcome, TestReport, TopologyContext, TopologyDriver};
pub use family::AddressFamily;
pub use model::{DeviceType, InterfaceSpec, RouteSpec, SecondaryInterfaceSpec, Topology};
pub use platform::Platform;
pub use teardown::{TeardownReport, TeardownStack};
pub use tester::{PingTester, Tester};

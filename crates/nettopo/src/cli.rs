//! CLI command definitions and handlers.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};

use nettopo_common::PortMap;

use crate::command::ProcessRunner;
use crate::config::{CapabilityMode, DriverConfig};
use crate::driver::{TopologyContext, TopologyDriver};
use crate::model::Topology;
use crate::platform::Platform;
use crate::presets;
use crate::tester::{PingTester, Tester};

/// nettopo - virtual network topologies for namespace tests
#[derive(Parser)]
#[command(name = "nettopo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Port-name YAML file
    #[arg(long, global = true, env = "NETTOPO_PORT_MAP")]
    pub port_map: Option<PathBuf>,

    /// Driver configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Platform capability: auto, enabled or disabled
    #[arg(long, global = true)]
    pub capability: Option<CapabilityMode>,

    /// Do not check mapped interfaces against sysfs
    #[arg(long, global = true)]
    pub no_verify_ports: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// List built-in topologies
    Presets,

    /// Print the commands a topology would run, without running them
    Plan {
        /// Preset name or path to a YAML topology
        topology: String,
    },

    /// Build a topology, optionally ping its remotes, then tear it down
    Up {
        /// Preset name or path to a YAML topology
        topology: String,

        /// Ping every declared remote once the topology is up
        #[arg(long)]
        ping: bool,
    },
}

impl Cli {
    /// Execute the parsed command.
    pub fn execute(self) -> Result<()> {
        match &self.command {
            Commands::Presets => {
                for name in presets::NAMES {
                    println!("{name}");
                }
                Ok(())
            }

            Commands::Plan { topology } => {
                let mut topology = load_topology(topology)?;
                let ctx = self.context()?;
                let plan = TopologyDriver::plan(&ctx, &mut topology)
                    .map_err(|e| eyre!("Failed to plan topology: {}", e))?;
                print!("{plan}");
                Ok(())
            }

            Commands::Up { topology, ping } => {
                let mut topology = load_topology(topology)?;
                let ctx = self.context()?;
                let runner = ProcessRunner;
                let pinger = PingTester::default();
                let tests: Vec<&dyn Tester> = if *ping { vec![&pinger] } else { Vec::new() };

                let report = TopologyDriver::new(&ctx, &runner).run(&mut topology, &tests);
                for outcome in &report.tests {
                    match &outcome.error {
                        Some(e) => println!("FAIL {}: {}", outcome.name, e),
                        None => println!("ok   {}", outcome.name),
                    }
                }
                for (action, error) in &report.teardown.failed {
                    eprintln!("teardown: {action}: {error}");
                }
                if let Some(e) = &report.setup_error {
                    return Err(eyre!("Failed to build topology: {}", e));
                }
                if !report.passed() {
                    return Err(eyre!("Topology tests failed"));
                }
                Ok(())
            }
        }
    }

    fn driver_config(&self) -> Result<DriverConfig> {
        let mut config = match &self.config {
            Some(path) => DriverConfig::from_file(path)
                .map_err(|e| eyre!("Failed to load config {}: {}", path.display(), e))?,
            None => DriverConfig::default(),
        };
        if let Some(port_map) = &self.port_map {
            config.paths.port_map.clone_from(port_map);
        }
        if let Some(mode) = self.capability {
            config.capability = mode;
        }
        Ok(config)
    }

    fn context(&self) -> Result<TopologyContext> {
        let config = self.driver_config()?;
        config.validate()?;
        let ports = if self.no_verify_ports {
            PortMap::load(&config.paths.port_map)?
        } else {
            PortMap::load_verified(&config.paths)?
        };
        let platform = Platform::detect_once(&config, &ProcessRunner);
        Ok(TopologyContext::new(config, ports, platform))
    }
}

fn load_topology(arg: &str) -> Result<Topology> {
    if let Some(topology) = presets::by_name(arg) {
        return Ok(topology);
    }
    let path = Path::new(arg);
    if !path.exists() {
        return Err(eyre!(
            "Unknown topology '{}': not a preset ({}) nor a file",
            arg,
            presets::NAMES.join(", ")
        ));
    }
    let yaml = std::fs::read_to_string(path)?;
    Ok(Topology::from_yaml_str(&yaml)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "nettopo",
            "plan",
            "two-nets",
            "--capability",
            "disabled",
            "--no-verify-ports",
        ])
        .unwrap();
        assert_eq!(cli.capability, Some(CapabilityMode::Disabled));
        assert!(cli.no_verify_ports);
        assert!(matches!(cli.command, Commands::Plan { ref topology } if topology == "two-nets"));
    }

    #[test]
    fn reject_unknown_capability() {
        assert!(Cli::try_parse_from(["nettopo", "--capability", "maybe", "presets"]).is_err());
    }

    #[test]
    fn unknown_topology() {
        let err = load_topology("no-such-net").unwrap_err();
        assert!(err.to_string().contains("two-nets"));
    }
}

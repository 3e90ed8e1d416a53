//! Platform capability detection.
//!
//! Hosts running the higher-version switch driver expose their own bridge
//! and VLAN link kinds and handle IPv6. The driver module is recognised by
//! its `modinfo` dependency list naming exactly the two companion modules.

use once_cell::sync::OnceCell;

use crate::command::{CommandLine, CommandRunner};
use crate::config::{CapabilityMode, DriverConfig};

static DETECTED: OnceCell<Platform> = OnceCell::new();

/// Detected platform capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Platform {
    higher_version: bool,
}

impl Platform {
    /// Generic Linux link types, no IPv6.
    #[must_use]
    pub const fn generic() -> Self {
        Self {
            higher_version: false,
        }
    }

    /// Higher-version driver link types, with IPv6.
    #[must_use]
    pub const fn higher_version() -> Self {
        Self {
            higher_version: true,
        }
    }

    /// Process-wide capability, probed on first use only.
    ///
    /// Later calls return the first answer and run no commands, whatever
    /// `config` and `runner` they pass.
    pub fn detect_once(config: &DriverConfig, runner: &dyn CommandRunner) -> Self {
        *DETECTED.get_or_init(|| Self::detect(config, runner))
    }

    /// Decide the platform capability without caching.
    ///
    /// Probe failures of any kind yield [`Platform::generic`]. Prefer
    /// [`Platform::detect_once`] outside tests.
    pub fn detect(config: &DriverConfig, runner: &dyn CommandRunner) -> Self {
        let platform = match config.capability {
            CapabilityMode::Enabled => Self::higher_version(),
            CapabilityMode::Disabled => Self::generic(),
            CapabilityMode::Auto => {
                let probe = CommandLine::modinfo(config, &config.driver_module);
                match runner.output(&probe) {
                    Ok(stdout) => {
                        let deps = parse_depends(&stdout);
                        Self {
                            higher_version: depends_exactly_on(&deps, &config.companion_modules),
                        }
                    }
                    Err(e) => {
                        tracing::warn!(module = %config.driver_module, error = %e, "Module probe failed, assuming generic platform");
                        Self::generic()
                    }
                }
            }
        };
        tracing::info!(higher_version = platform.higher_version, "Platform capability");
        platform
    }

    /// Whether the higher-version driver is present.
    #[must_use]
    pub const fn is_higher_version(self) -> bool {
        self.higher_version
    }

    /// Whether IPv6 addresses and routes are configured.
    #[must_use]
    pub const fn supports_ipv6(self) -> bool {
        self.higher_version
    }

    /// Link kind used for bridges.
    #[must_use]
    pub const fn bridge_link_type(self) -> &'static str {
        if self.higher_version {
            "xeth-bridge"
        } else {
            "bridge"
        }
    }

    /// Link kind used for VLAN sub-interfaces.
    #[must_use]
    pub const fn vlan_link_type(self) -> &'static str {
        if self.higher_version {
            "xeth-vlan"
        } else {
            "vlan"
        }
    }
}

/// Dependency names from the `depends:` line of `modinfo` output.
///
/// Returns an empty list when the line is missing or empty.
#[must_use]
pub fn parse_depends(modinfo: &str) -> Vec<String> {
    modinfo
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("depends:"))
        .map(|deps| {
            deps.split(',')
                .map(str::trim)
                .filter(|dep| !dep.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn depends_exactly_on(deps: &[String], companions: &[String; 2]) -> bool {
    deps.len() == 2 && companions.iter().all(|c| deps.contains(c)) && companions[0] != companions[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::RecordingRunner;

    const MODINFO: &str = "\
filename:       /lib/modules/4.13.0/extra/platina-mk1.ko
license:        GPL
depends:        xeth,platina-mk1-i2c
name:           platina_mk1
vermagic:       4.13.0 SMP mod_unload
";

    #[test]
    fn parse_depends_line() {
        assert_eq!(parse_depends(MODINFO), vec!["xeth", "platina-mk1-i2c"]);
        assert!(parse_depends("depends:\n").is_empty());
        assert!(parse_depends("license: GPL\n").is_empty());
    }

    #[test]
    fn detect_higher_version() {
        let runner = RecordingRunner::new().with_output("modinfo platina-mk1", MODINFO);
        let platform = Platform::detect(&DriverConfig::default(), &runner);
        assert!(platform.is_higher_version());
        assert_eq!(platform.bridge_link_type(), "xeth-bridge");
        assert_eq!(platform.vlan_link_type(), "xeth-vlan");
        assert_eq!(runner.lines(), vec!["modinfo platina-mk1"]);
    }

    #[test]
    fn extra_dependency_is_generic() {
        let runner = RecordingRunner::new().with_output(
            "modinfo platina-mk1",
            "depends: xeth,platina-mk1-i2c,i2c-core\n",
        );
        assert!(!Platform::detect(&DriverConfig::default(), &runner).is_higher_version());
    }

    #[test]
    fn missing_modinfo_is_generic() {
        let runner = RecordingRunner::new().fail_always("modinfo");
        let platform = Platform::detect(&DriverConfig::default(), &runner);
        assert_eq!(platform, Platform::generic());
        assert_eq!(platform.bridge_link_type(), "bridge");
        assert_eq!(platform.vlan_link_type(), "vlan");
        assert!(!platform.supports_ipv6());
    }

    #[test]
    fn probe_runs_once_per_process() {
        let first = RecordingRunner::new().with_output("modinfo platina-mk1", MODINFO);
        let platform = Platform::detect_once(&DriverConfig::default(), &first);
        assert_eq!(first.lines(), vec!["modinfo platina-mk1"]);

        let second = RecordingRunner::new().fail_always("modinfo");
        assert_eq!(Platform::detect_once(&DriverConfig::default(), &second), platform);
        assert!(second.commands().is_empty());
    }

    #[test]
    fn forced_modes_skip_probe() {
        let runner = RecordingRunner::new();
        let config = DriverConfig::default().with_capability(CapabilityMode::Enabled);
        assert!(Platform::detect(&config, &runner).supports_ipv6());
        let config = config.with_capability(CapabilityMode::Disabled);
        assert!(!Platform::detect(&config, &runner).supports_ipv6());
        assert!(runner.commands().is_empty());
    }
}

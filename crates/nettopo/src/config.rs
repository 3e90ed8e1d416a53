//! Driver configuration.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use nettopo_common::{NetTopoError, NetTopoPaths, NetTopoResult};

/// How the platform capability is decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityMode {
    /// Probe the driver module's dependencies.
    #[default]
    Auto,
    /// Force the higher-version mode.
    Enabled,
    /// Force generic link types and skip IPv6.
    Disabled,
}

impl FromStr for CapabilityMode {
    type Err = NetTopoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            other => Err(NetTopoError::Config {
                message: format!("unknown capability mode '{other}' (auto, enabled, disabled)"),
            }),
        }
    }
}

/// Topology driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Program and leading arguments for every `ip` invocation.
    pub ip_command: Vec<String>,
    /// Program and leading arguments for the module probe.
    pub modinfo_command: Vec<String>,
    /// Kernel module inspected by the capability probe.
    pub driver_module: String,
    /// The two dependencies that mark a higher-version driver.
    pub companion_modules: [String; 2],
    /// Capability decision.
    pub capability: CapabilityMode,
    /// Attempts for moving a link into its namespace.
    pub link_attempts: u32,
    /// Attempts for assigning an address.
    pub address_attempts: u32,
    /// Apply `bridge_mac` to bridges. Off by default.
    pub assign_bridge_mac: bool,
    /// Host paths.
    pub paths: NetTopoPaths,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            ip_command: vec!["ip".to_string()],
            modinfo_command: vec!["modinfo".to_string()],
            driver_module: "platina-mk1".to_string(),
            companion_modules: ["xeth".to_string(), "platina-mk1-i2c".to_string()],
            capability: CapabilityMode::Auto,
            link_attempts: 3,
            address_attempts: 3,
            assign_bridge_mac: false,
            paths: NetTopoPaths::default(),
        }
    }
}

impl DriverConfig {
    /// Parse a TOML configuration.
    pub fn from_toml_str(text: &str) -> NetTopoResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| NetTopoError::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML configuration file.
    pub fn from_file(path: &Path) -> NetTopoResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject configurations the driver cannot run with.
    pub fn validate(&self) -> NetTopoResult<()> {
        if self.ip_command.is_empty() {
            return Err(NetTopoError::Config {
                message: "ip_command must name a program".to_string(),
            });
        }
        if self.modinfo_command.is_empty() {
            return Err(NetTopoError::Config {
                message: "modinfo_command must name a program".to_string(),
            });
        }
        if self.link_attempts == 0 || self.address_attempts == 0 {
            return Err(NetTopoError::Config {
                message: "retry attempts must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Run `ip` through a multi-call binary, e.g. `goes ip`.
    #[must_use]
    pub fn with_ip_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ip_command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Set the capability decision.
    #[must_use]
    pub const fn with_capability(mut self, mode: CapabilityMode) -> Self {
        self.capability = mode;
        self
    }

    /// Enable or disable the bridge hardware-address step.
    #[must_use]
    pub const fn with_bridge_mac(mut self, enabled: bool) -> Self {
        self.assign_bridge_mac = enabled;
        self
    }

    /// Set host paths.
    #[must_use]
    pub fn with_paths(mut self, paths: NetTopoPaths) -> Self {
        self.paths = paths;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = DriverConfig::default();
        assert_eq!(config.ip_command, vec!["ip"]);
        assert_eq!(config.link_attempts, 3);
        assert_eq!(config.address_attempts, 3);
        assert!(!config.assign_bridge_mac);
        assert_eq!(config.capability, CapabilityMode::Auto);
        config.validate().unwrap();
    }

    #[test]
    fn from_toml() {
        let config = DriverConfig::from_toml_str(
            r#"
ip_command = ["goes", "ip"]
driver_module = "platina-mk2"
companion_modules = ["xeth", "fe1"]
capability = "disabled"

[paths]
netns_dir = "/tmp/netns"
"#,
        )
        .unwrap();
        assert_eq!(config.ip_command, vec!["goes", "ip"]);
        assert_eq!(config.driver_module, "platina-mk2");
        assert_eq!(config.companion_modules[1], "fe1");
        assert_eq!(config.capability, CapabilityMode::Disabled);
        assert_eq!(config.paths.netns_dir, std::path::PathBuf::from("/tmp/netns"));
        assert_eq!(config.link_attempts, 3);
    }

    #[test]
    fn reject_empty_ip_command() {
        let err = DriverConfig::from_toml_str("ip_command = []").unwrap_err();
        assert!(matches!(err, NetTopoError::Config { .. }));
    }

    #[test]
    fn capability_mode_from_str() {
        assert_eq!("enabled".parse::<CapabilityMode>().unwrap(), CapabilityMode::Enabled);
        assert!("sometimes".parse::<CapabilityMode>().is_err());
    }
}

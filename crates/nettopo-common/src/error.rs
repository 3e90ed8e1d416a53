//! Common error types for nettopo.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`NetTopoError`].
pub type NetTopoResult<T> = Result<T, NetTopoError>;

/// Errors raised while loading, building or tearing down a topology.
#[derive(Error, Diagnostic, Debug)]
pub enum NetTopoError {
    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(nettopo::io))]
    Io(#[from] std::io::Error),

    /// The port-name file could not be read.
    #[error("Failed to read port map {}: {source}", path.display())]
    #[diagnostic(
        code(nettopo::portmap::read),
        help("Set NETTOPO_PORT_MAP or pass --port-map to point at the netport YAML file")
    )]
    PortMapRead {
        /// Path of the port-name file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The port-name file is not a flat `netport: ifname` mapping.
    #[error("Malformed port map {}: {message}", path.display())]
    #[diagnostic(code(nettopo::portmap::parse))]
    PortMapParse {
        /// Path of the port-name file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A topology references a port key absent from the port map.
    #[error("Unknown netport: {key}")]
    #[diagnostic(code(nettopo::portmap::unknown_port))]
    UnknownPort {
        /// The missing port key.
        key: String,
    },

    /// A mapped system interface does not exist on this host.
    #[error("Interface {interface} for netport {key} does not exist")]
    #[diagnostic(
        code(nettopo::portmap::missing_interface),
        help("Check the port map against `ip link` on this host")
    )]
    MissingInterface {
        /// The port key.
        key: String,
        /// The system interface name it maps to.
        interface: String,
    },

    /// An external command could not be started.
    #[error("Failed to execute `{command}`: {source}")]
    #[diagnostic(code(nettopo::command::spawn))]
    CommandSpawn {
        /// The command line.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An external command ran and reported failure.
    #[error("`{command}` failed ({status}): {stderr}")]
    #[diagnostic(code(nettopo::command::failed))]
    CommandFailed {
        /// The command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Captured standard error.
        stderr: String,
    },

    /// An address or prefix string is neither IPv4 nor IPv6.
    #[error("Invalid address: {address}")]
    #[diagnostic(code(nettopo::topology::invalid_address))]
    InvalidAddress {
        /// The offending string.
        address: String,
    },

    /// A route mixes address families between prefix and gateway.
    #[error("Route {prefix} via {gateway} mixes IPv4 and IPv6")]
    #[diagnostic(
        code(nettopo::topology::route_family),
        help("Prefix and gateway of a route must be of the same address family")
    )]
    RouteFamilyMismatch {
        /// Destination prefix.
        prefix: String,
        /// Gateway address.
        gateway: String,
    },

    /// The topology description is inconsistent.
    #[error("Invalid topology: {message}")]
    #[diagnostic(code(nettopo::topology::invalid))]
    InvalidTopology {
        /// The error message.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(nettopo::config))]
    Config {
        /// The error message.
        message: String,
    },
}

impl NetTopoError {
    /// Whether the error means the test environment itself is unusable.
    ///
    /// These abort a run outright instead of failing a single topology.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PortMapRead { .. }
                | Self::PortMapParse { .. }
                | Self::UnknownPort { .. }
                | Self::MissingInterface { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = NetTopoError::UnknownPort {
            key: "net9port9".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown netport: net9port9");

        let err = NetTopoError::RouteFamilyMismatch {
            prefix: "10.1.0.2/31".to_string(),
            gateway: "2001:db8::1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Route 10.1.0.2/31 via 2001:db8::1 mixes IPv4 and IPv6"
        );
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: NetTopoError = io_err.into();
        assert!(matches!(err, NetTopoError::Io(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn environment_errors_are_fatal() {
        assert!(
            NetTopoError::MissingInterface {
                key: "net0port0".to_string(),
                interface: "eth1".to_string(),
            }
            .is_fatal()
        );
        assert!(
            !NetTopoError::CommandFailed {
                command: "ip netns add h1".to_string(),
                status: "exit status: 1".to_string(),
                stderr: String::new(),
            }
            .is_fatal()
        );
    }
}

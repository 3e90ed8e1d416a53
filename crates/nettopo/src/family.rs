//! Address family classification.

use std::fmt;
use std::net::IpAddr;

use nettopo_common::{NetTopoError, NetTopoResult};

/// IP address family of an address, prefix or route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4.
    V4,
    /// IPv6.
    V6,
}

impl AddressFamily {
    /// Classify an address (`10.6.6.6`) or CIDR prefix (`10.1.0.0/31`).
    pub fn of(address: &str) -> NetTopoResult<Self> {
        let invalid = || NetTopoError::InvalidAddress {
            address: address.to_string(),
        };
        let (ip, len) = match address.split_once('/') {
            Some((ip, len)) => (ip, Some(len)),
            None => (address, None),
        };
        let family = match ip.parse::<IpAddr>().map_err(|_| invalid())? {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        };
        if let Some(len) = len {
            let len: u8 = len.parse().map_err(|_| invalid())?;
            if len > family.max_prefix_len() {
                return Err(invalid());
            }
        }
        Ok(family)
    }

    /// Whether the address is IPv6.
    pub fn is_ipv6(address: &str) -> NetTopoResult<bool> {
        Ok(Self::of(address)? == Self::V6)
    }

    /// The `ip` family selector (`-4` / `-6`).
    #[must_use]
    pub const fn flag(self) -> &'static str {
        match self {
            Self::V4 => "-4",
            Self::V6 => "-6",
        }
    }

    /// Longest valid prefix length.
    #[must_use]
    pub const fn max_prefix_len(self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "ipv4"),
            Self::V6 => write!(f, "ipv6"),
        }
    }
}

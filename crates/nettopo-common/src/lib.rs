//! # nettopo-common
//!
//! Shared utilities and types for nettopo.
//!
//! This crate provides the pieces every other nettopo crate leans on:
//! - Common error types
//! - Standard host paths (netns run directory, sysfs net class)
//! - The port-name table mapping logical test ports to system interfaces

#![warn(missing_docs)]

pub mod error;
pub mod paths;
pub mod portmap;

pub use error::{NetTopoError, NetTopoResult};
pub use paths::NetTopoPaths;
pub use portmap::PortMap;

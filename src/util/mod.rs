//! Shared file-tree and download helpers.
//!
//! Public so that custom [`RuntimeSource`](crate::runtime::RuntimeSource)
//! implementations can reuse the same primitives the engine uses.

pub mod checksum;
pub mod fs;
pub mod http;

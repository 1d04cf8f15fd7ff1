//! Java runtime provisioning.
//!
//! A [`RuntimeSource`] says where runtimes live; the [`RuntimeProvisioner`]
//! downloads, verifies, and extracts them through the platform-keyed
//! [`RuntimeCache`] and installs the result into distribution trees.

mod cache;
mod provisioner;
mod source;

pub use cache::RuntimeCache;
pub use provisioner::RuntimeProvisioner;
pub use source::{CorrettoRuntimeSource, RuntimeArchiveKind, RuntimeDownload, RuntimeSource};

//! Distribution build engine for Java applications.
//!
//! Packages a runnable application together with a matching Java runtime
//! into self-contained platform distributions:
//! - plain directory trees, ready to run in place
//! - `tar.gz` archives (the Linux and macOS convention)
//! - `zip` archives (the Windows convention)
//!
//! Runtimes come from a [`RuntimeSource`] such as Amazon Corretto and are
//! kept in a checksum-validated per-platform cache, so repeat builds skip
//! the download entirely. The engine is embedded by a host build tool: it
//! publishes which build steps it depends on but never runs them.

pub mod archive;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod runtime;
pub mod util;

// Re-export commonly used types
pub use archive::ArchiveFormat;
pub use config::{
    AssetBinding, CommonConfig, DistConfig, DistConfigBuilder, DistVariant, FileSet,
    PackagingKind, Platform,
};
pub use error::{Error, Result};
pub use pipeline::{ApplicationInputs, BuiltDistribution, DistBuilder};
pub use runtime::{
    CorrettoRuntimeSource, RuntimeArchiveKind, RuntimeCache, RuntimeDownload, RuntimeProvisioner,
    RuntimeSource,
};

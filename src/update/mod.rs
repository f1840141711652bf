//! Host extension version tracking.

mod version;

pub use version::{is_update_available, RemoteVersionResolver, VersionInfo};

use thiserror::Error;

/// Placeholder for "remote version unknown". Never reports an update.
pub const SENTINEL_VERSION: &str = "0.0.0";

/// Transient-cache key of the fetched remote version.
pub const REMOTE_VERSION_CACHE_KEY: &str = "woonuxt_remote_version";

/// Version of the running build.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors from building a version resolver.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Invalid version pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Version pattern has no capture group: {0}")]
    MissingCaptureGroup(String),
}

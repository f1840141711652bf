//! Host runtime capability.
//!
//! The narrow contract this crate needs from the application that actually
//! loads extensions. Activation mechanics and on-disk layout belong to the
//! implementor.

use super::HostError;

/// Extension operations provided by the host runtime.
pub trait HostRuntime: Send + Sync {
    /// Download a package and unpack it into the extensions directory.
    fn install(&self, download_url: &str) -> Result<(), HostError>;

    /// Activate an installed extension.
    fn activate(&self, activation_path: &str) -> Result<(), HostError>;

    /// Deactivate an extension. Deactivating an inactive extension is a no-op.
    fn deactivate(&self, activation_path: &str);

    /// Remove an extension's files.
    fn delete(&self, activation_path: &str) -> Result<(), HostError>;

    /// Whether the extension is active.
    fn is_active(&self, activation_path: &str) -> bool;

    /// Whether the extension's files are present.
    fn file_exists(&self, activation_path: &str) -> bool;
}

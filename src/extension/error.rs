//! Extension lifecycle error types.

use thiserror::Error;

use super::SelfUpdateReport;

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Failures reported by the host runtime capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The package could not be fetched.
    #[error("download failed: {0}")]
    Download(String),

    /// The package was fetched but could not be installed.
    #[error("install failed: {0}")]
    Install(String),

    /// Activation was refused.
    #[error("activation failed: {0}")]
    Activate(String),

    /// Files could not be removed.
    #[error("delete failed: {0}")]
    Delete(String),

    /// Host state could not be read or written.
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Recovery class of a lifecycle failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad caller input; nothing was attempted.
    Validation,
    /// An external service was unreachable; no local state changed.
    Transport,
    /// Some side effect happened before the failure.
    PartialApplication,
}

/// Errors from the extension lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Slug is not in the required-extension catalog.
    #[error("Invalid extension: '{0}'")]
    InvalidSlug(String),

    /// Version string is malformed or the unknown-version sentinel.
    #[error("Invalid version number: '{0}'")]
    InvalidVersion(String),

    /// The package could not be downloaded.
    #[error("Download of '{slug}' failed: {message}")]
    DownloadFailed { slug: String, message: String },

    /// The package could not be installed.
    #[error("Installation of '{slug}' failed: {message}")]
    InstallFailed { slug: String, message: String },

    /// The extension is installed but could not be activated.
    #[error("Activation of '{slug}' failed: {message}")]
    ActivateFailed { slug: String, message: String },

    /// A self-update stopped after changing the existing installation.
    #[error("Self-update to {} stopped at {:?}: {}", .0.target_version, .0.step, .0.last_error.as_deref().unwrap_or("unknown error"))]
    SelfUpdatePartialFailure(Box<SelfUpdateReport>),
}

impl LifecycleError {
    /// Recovery class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidSlug(_) | Self::InvalidVersion(_) => ErrorClass::Validation,
            Self::DownloadFailed { .. } => ErrorClass::Transport,
            Self::InstallFailed { .. }
            | Self::ActivateFailed { .. }
            | Self::SelfUpdatePartialFailure(_) => ErrorClass::PartialApplication,
        }
    }

    /// Whether an operator may need to repair the installation by hand.
    pub fn requires_manual_recovery(&self) -> bool {
        match self {
            Self::SelfUpdatePartialFailure(report) => report.left_unavailable(),
            other => other.class() == ErrorClass::PartialApplication,
        }
    }

    /// Message shown to the user, with a retry link or a recovery note.
    ///
    /// `retry_url` is the "install now" style link offered for errors that are
    /// safe to retry.
    pub fn user_message(&self, retry_url: Option<&str>) -> String {
        let mut message = self.to_string();

        if self.requires_manual_recovery() {
            message.push_str(
                "\nManual recovery may be needed: check the extensions directory and reinstall the package.",
            );
        } else if let Some(url) = retry_url {
            message.push_str(&format!("\nTry again: {url}"));
        }

        message
    }
}

/// Errors from building the extension catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Duplicate extension slug: '{0}'")]
    DuplicateSlug(String),

    #[error("Invalid extension slug: '{0}'")]
    InvalidSlug(String),

    #[error("Extension '{slug}' has an invalid download URL: {url}")]
    InvalidUrl { slug: String, url: String },

    #[error("Extension '{slug}' has an invalid activation path: {path}")]
    InvalidActivationPath { slug: String, path: String },
}

//! Extension data types.

use serde::{Deserialize, Serialize};

/// Identity of a required extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDescriptor {
    /// Unique key
    pub slug: String,

    /// Human-readable name
    pub display_name: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Package download URL
    pub download_url: String,

    /// Host-runtime identifier of the installable unit (e.g. `dir/main.php`)
    pub activation_path: String,

    /// Icon URL
    #[serde(default)]
    pub icon_url: String,
}

/// Derived installation state, computed on demand from the host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionState {
    /// Files are not present.
    Absent,
    /// Files are present but the extension is not active.
    InstalledInactive,
    /// The extension is active.
    Active,
}

impl ExtensionState {
    /// Get display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Absent => "not installed",
            Self::InstalledInactive => "installed, inactive",
            Self::Active => "active",
        }
    }

    /// Get status icon.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Absent => "✗",
            Self::InstalledInactive => "○",
            Self::Active => "✓",
        }
    }
}

/// Two-valued status exposed to polling callers.
///
/// `InstalledInactive` and `Absent` both map to `NotInstalled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionStatus {
    Active,
    NotInstalled,
}

impl From<ExtensionState> for ExtensionStatus {
    fn from(state: ExtensionState) -> Self {
        match state {
            ExtensionState::Active => Self::Active,
            ExtensionState::Absent | ExtensionState::InstalledInactive => Self::NotInstalled,
        }
    }
}

impl ExtensionStatus {
    /// Wire value returned to polling clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "installed",
            Self::NotInstalled => "not_installed",
        }
    }
}

/// Last step a self-update reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfUpdateStep {
    NotStarted,
    Deactivated,
    Deleted,
    Installed,
    Activated,
}

/// Recorded progress of a self-update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfUpdateReport {
    /// Version being installed
    pub target_version: String,

    /// Furthest step completed
    pub step: SelfUpdateStep,

    /// Whether the previous installation was removed
    pub deleted: bool,

    /// Whether the new package was installed
    pub installed: bool,

    /// Whether the new package was activated
    pub activated: bool,

    /// Message of the failing step, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SelfUpdateReport {
    pub(crate) fn new(target_version: impl Into<String>) -> Self {
        Self {
            target_version: target_version.into(),
            step: SelfUpdateStep::NotStarted,
            deleted: false,
            installed: false,
            activated: false,
            last_error: None,
        }
    }

    pub(crate) fn advance(&mut self, step: SelfUpdateStep) {
        self.step = step;
        match step {
            SelfUpdateStep::Deleted => self.deleted = true,
            SelfUpdateStep::Installed => self.installed = true,
            SelfUpdateStep::Activated => self.activated = true,
            SelfUpdateStep::NotStarted | SelfUpdateStep::Deactivated => {}
        }
    }

    /// Whether the self extension is left without an active installation.
    pub fn left_unavailable(&self) -> bool {
        self.step >= SelfUpdateStep::Deactivated && !self.activated
    }
}

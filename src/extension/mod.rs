//! Required-extension management.
//!
//! - [`ExtensionRegistry`]: the validated catalog of required extensions
//! - [`LifecycleOrchestrator`]: install, activate and self-update
//! - [`StatusService`]: read-only status for polling clients
//! - [`HostRuntime`]: the capability the host application provides, with
//!   [`LocalHost`] as a directory-backed implementation

mod error;
mod host;
mod lifecycle;
mod local;
mod registry;
mod status;
mod types;

pub use error::{ErrorClass, HostError, LifecycleError, LifecycleResult, RegistryError};
pub use host::HostRuntime;
pub use lifecycle::LifecycleOrchestrator;
pub use local::{InstalledUnit, LocalHost};
pub use registry::{ExtensionRegistry, SelfExtension};
pub use status::StatusService;
pub use types::{
    ExtensionDescriptor, ExtensionState, ExtensionStatus, SelfUpdateReport, SelfUpdateStep,
};

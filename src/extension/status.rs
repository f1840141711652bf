//! Read-only status endpoint for UI polling.

use super::{ExtensionRegistry, ExtensionStatus, LifecycleError, LifecycleOrchestrator, LifecycleResult};

/// Answers "is extension X active?" without mutating anything.
#[derive(Clone)]
pub struct StatusService {
    registry: ExtensionRegistry,
    lifecycle: LifecycleOrchestrator,
}

impl StatusService {
    pub fn new(registry: ExtensionRegistry, lifecycle: LifecycleOrchestrator) -> Self {
        Self { registry, lifecycle }
    }

    /// Status of `slug`.
    ///
    /// The slug is validated before the host is consulted. An
    /// `activation_path` that does not belong to `slug` is rejected the same
    /// way, so callers cannot probe arbitrary paths.
    pub fn check_status(&self, slug: &str, activation_path: &str) -> LifecycleResult<ExtensionStatus> {
        let descriptor = self.registry.resolve(slug)?;

        if descriptor.activation_path != activation_path {
            tracing::warn!(slug, activation_path, "activation path does not match catalog entry");
            return Err(LifecycleError::InvalidSlug(slug.to_string()));
        }

        Ok(self.lifecycle.current_state(descriptor).into())
    }

    /// Status of `slug` using its catalog activation path.
    pub fn check_slug(&self, slug: &str) -> LifecycleResult<ExtensionStatus> {
        let descriptor = self.registry.resolve(slug)?;
        Ok(self.lifecycle.current_state(descriptor).into())
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }
}

//! Drives required extensions toward the active state.
//!
//! The orchestrator holds no state of its own; every decision is made from a
//! fresh read of the host runtime, since activation can happen out of band.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::{
    ExtensionDescriptor, ExtensionRegistry, ExtensionState, HostError, HostRuntime,
    LifecycleError, LifecycleResult, SelfExtension, SelfUpdateReport, SelfUpdateStep,
};
use crate::update::SENTINEL_VERSION;

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+$").expect("version pattern is valid"));

/// Installs, activates and self-updates extensions through a [`HostRuntime`].
#[derive(Clone)]
pub struct LifecycleOrchestrator {
    host: Arc<dyn HostRuntime>,
}

impl LifecycleOrchestrator {
    pub fn new(host: Arc<dyn HostRuntime>) -> Self {
        Self { host }
    }

    /// Current state of an extension. Pure read.
    pub fn current_state(&self, descriptor: &ExtensionDescriptor) -> ExtensionState {
        state_of(self.host.as_ref(), &descriptor.activation_path)
    }

    /// Make an extension active, installing it first if its files are missing.
    ///
    /// Already-active extensions return immediately without further host calls.
    /// Failures are not retried and nothing is rolled back: an activation
    /// failure leaves the extension installed but inactive.
    pub fn ensure_active(&self, descriptor: &ExtensionDescriptor) -> LifecycleResult<()> {
        let slug = descriptor.slug.as_str();

        match self.current_state(descriptor) {
            ExtensionState::Active => {
                tracing::debug!(slug, "extension already active");
                return Ok(());
            }
            ExtensionState::InstalledInactive => {
                tracing::debug!(slug, "extension files present, skipping download");
            }
            ExtensionState::Absent => {
                tracing::info!(slug, url = %descriptor.download_url, "installing extension");
                self.host.install(&descriptor.download_url).map_err(|e| install_error(slug, e))?;
            }
        }

        self.host.activate(&descriptor.activation_path).map_err(|e| {
            tracing::warn!(slug, error = %e, "activation failed");
            LifecycleError::ActivateFailed { slug: slug.to_string(), message: e.to_string() }
        })?;

        tracing::info!(slug, "extension active");
        Ok(())
    }

    /// Replace the host extension with `target_version`.
    ///
    /// Runs deactivate, delete, install, activate in that order. The version is
    /// validated before any host call. Any failure after deactivation returns
    /// [`LifecycleError::SelfUpdatePartialFailure`] with the recorded progress.
    pub fn self_update(
        &self,
        extension: &SelfExtension,
        target_version: &str,
    ) -> LifecycleResult<SelfUpdateReport> {
        if !VERSION_PATTERN.is_match(target_version) || target_version == SENTINEL_VERSION {
            return Err(LifecycleError::InvalidVersion(target_version.to_string()));
        }

        let path = extension.activation_path.as_str();
        let mut report = SelfUpdateReport::new(target_version);

        tracing::info!(version = target_version, "starting self-update");

        self.host.deactivate(path);
        report.advance(SelfUpdateStep::Deactivated);
        tracing::debug!(path, "self-update: deactivated");

        if let Err(e) = self.host.delete(path) {
            return Err(partial_failure(report, &e));
        }
        report.advance(SelfUpdateStep::Deleted);
        tracing::debug!(path, "self-update: deleted");

        if let Err(e) = self.host.install(&extension.package_url(target_version)) {
            return Err(partial_failure(report, &e));
        }
        report.advance(SelfUpdateStep::Installed);
        tracing::debug!(path, "self-update: installed");

        if let Err(e) = self.host.activate(path) {
            return Err(partial_failure(report, &e));
        }
        report.advance(SelfUpdateStep::Activated);

        tracing::info!(version = target_version, "self-update complete");
        Ok(report)
    }

    /// Whether every required extension is active.
    pub fn all_active(&self, registry: &ExtensionRegistry) -> bool {
        registry.list_required().iter().all(|d| self.current_state(d) == ExtensionState::Active)
    }

    /// State of every required extension, in catalog order.
    pub fn states<'a>(
        &self,
        registry: &'a ExtensionRegistry,
    ) -> Vec<(&'a ExtensionDescriptor, ExtensionState)> {
        registry.list_required().iter().map(|d| (d, self.current_state(d))).collect()
    }
}

fn state_of(host: &dyn HostRuntime, activation_path: &str) -> ExtensionState {
    if host.is_active(activation_path) {
        ExtensionState::Active
    } else if host.file_exists(activation_path) {
        ExtensionState::InstalledInactive
    } else {
        ExtensionState::Absent
    }
}

fn install_error(slug: &str, error: HostError) -> LifecycleError {
    tracing::warn!(slug, error = %error, "install failed");

    match error {
        HostError::Download(message) => {
            LifecycleError::DownloadFailed { slug: slug.to_string(), message }
        }
        other => LifecycleError::InstallFailed { slug: slug.to_string(), message: other.to_string() },
    }
}

fn partial_failure(mut report: SelfUpdateReport, error: &HostError) -> LifecycleError {
    tracing::error!(step = ?report.step, error = %error, "self-update stopped");
    report.last_error = Some(error.to_string());
    LifecycleError::SelfUpdatePartialFailure(Box::new(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::testing::SpyHost;

    fn graphql() -> ExtensionDescriptor {
        ExtensionRegistry::builtin().get("wp-graphql").cloned().unwrap()
    }

    fn orchestrator(host: &Arc<SpyHost>) -> LifecycleOrchestrator {
        LifecycleOrchestrator::new(host.clone())
    }

    #[test]
    fn test_current_state() {
        let host = Arc::new(SpyHost::new());
        let descriptor = graphql();
        let lifecycle = orchestrator(&host);

        assert_eq!(lifecycle.current_state(&descriptor), ExtensionState::Absent);
        host.add_files(&descriptor.activation_path);
        assert_eq!(lifecycle.current_state(&descriptor), ExtensionState::InstalledInactive);
        host.set_active(&descriptor.activation_path);
        assert_eq!(lifecycle.current_state(&descriptor), ExtensionState::Active);
    }

    #[test]
    fn test_ensure_active_installs_absent_extension() {
        let descriptor = graphql();
        let host = Arc::new(SpyHost::new().with_package(&descriptor.download_url, &descriptor.activation_path));

        orchestrator(&host).ensure_active(&descriptor).unwrap();

        assert_eq!(
            host.mutations(),
            vec![
                format!("install {}", descriptor.download_url),
                format!("activate {}", descriptor.activation_path)
            ]
        );
    }

    #[test]
    fn test_ensure_active_is_idempotent() {
        let descriptor = graphql();
        let host = Arc::new(SpyHost::new());
        host.add_files(&descriptor.activation_path);
        let lifecycle = orchestrator(&host);

        lifecycle.ensure_active(&descriptor).unwrap();
        let calls_after_first = host.calls().len();

        lifecycle.ensure_active(&descriptor).unwrap();
        // The second call only inspects state.
        assert_eq!(host.calls().len(), calls_after_first + 1);
        assert_eq!(host.mutations().len(), 1);
    }

    #[test]
    fn test_ensure_active_skips_download_when_files_exist() {
        let descriptor = graphql();
        let host = Arc::new(SpyHost::new());
        host.add_files(&descriptor.activation_path);

        orchestrator(&host).ensure_active(&descriptor).unwrap();

        assert_eq!(host.mutations(), vec![format!("activate {}", descriptor.activation_path)]);
    }

    #[test]
    fn test_download_and_install_failures_are_distinct() {
        let descriptor = graphql();

        let host = Arc::new(SpyHost::new().fail_install(HostError::Download("timed out".into())));
        let err = orchestrator(&host).ensure_active(&descriptor).unwrap_err();
        assert!(matches!(err, LifecycleError::DownloadFailed { ref message, .. } if message == "timed out"));

        let host = Arc::new(SpyHost::new().fail_install(HostError::Install("disk full".into())));
        let err = orchestrator(&host).ensure_active(&descriptor).unwrap_err();
        assert!(matches!(err, LifecycleError::InstallFailed { ref message, .. } if message.contains("disk full")));
        assert!(!host.mutations().iter().any(|c| c.starts_with("activate")));
    }

    #[test]
    fn test_activation_failure_leaves_extension_installed() {
        let descriptor = graphql();
        let host = Arc::new(
            SpyHost::new()
                .with_package(&descriptor.download_url, &descriptor.activation_path)
                .fail_activate(HostError::Activate("fatal error".into())),
        );
        let lifecycle = orchestrator(&host);

        let err = lifecycle.ensure_active(&descriptor).unwrap_err();
        assert!(matches!(err, LifecycleError::ActivateFailed { .. }));
        assert_eq!(lifecycle.current_state(&descriptor), ExtensionState::InstalledInactive);
    }

    #[test]
    fn test_self_update_success() {
        let me = SelfExtension::new("https://example.com/{version}/woonuxt-settings.zip");
        let host = Arc::new(
            SpyHost::new().with_package("https://example.com/2.3.0/woonuxt-settings.zip", &me.activation_path),
        );
        host.add_files(&me.activation_path);
        host.set_active(&me.activation_path);

        let report = orchestrator(&host).self_update(&me, "2.3.0").unwrap();

        assert_eq!(report.step, SelfUpdateStep::Activated);
        assert!(report.deleted && report.installed && report.activated);
        assert_eq!(
            host.mutations(),
            vec![
                "deactivate woonuxt-settings/woonuxt.php".to_string(),
                "delete woonuxt-settings/woonuxt.php".to_string(),
                "install https://example.com/2.3.0/woonuxt-settings.zip".to_string(),
                "activate woonuxt-settings/woonuxt.php".to_string(),
            ]
        );
    }

    #[test]
    fn test_self_update_rejects_bad_versions_before_any_call() {
        let me = SelfExtension::new("https://example.com/{version}.zip");
        let host = Arc::new(SpyHost::new());
        let lifecycle = orchestrator(&host);

        for version in [
            "0.0.0",
            "2.3",
            "v2.3.0",
            "2.3.0-beta",
            "",
            "../2.3.0",
            "٢.٣.٠",
            "２.３.０",
        ] {
            let err = lifecycle.self_update(&me, version).unwrap_err();
            assert!(matches!(err, LifecycleError::InvalidVersion(_)), "{version}");
        }
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_self_update_install_failure_after_delete() {
        let me = SelfExtension::new("https://example.com/{version}.zip");
        let host = Arc::new(SpyHost::new().fail_install(HostError::Download("connection reset".into())));
        host.add_files(&me.activation_path);

        let err = orchestrator(&host).self_update(&me, "2.3.0").unwrap_err();

        let LifecycleError::SelfUpdatePartialFailure(report) = err else {
            panic!("expected partial failure, got {err:?}");
        };
        assert!(report.deleted);
        assert!(!report.installed);
        assert_eq!(report.step, SelfUpdateStep::Deleted);
        assert!(report.last_error.unwrap().contains("connection reset"));
    }

    #[test]
    fn test_self_update_delete_failure_is_partial() {
        let me = SelfExtension::new("https://example.com/{version}.zip");
        let host = Arc::new(SpyHost::new().fail_delete(HostError::Delete("permission denied".into())));

        let err = orchestrator(&host).self_update(&me, "2.3.0").unwrap_err();

        assert!(err.requires_manual_recovery());
        let LifecycleError::SelfUpdatePartialFailure(report) = err else { unreachable!() };
        assert_eq!(report.step, SelfUpdateStep::Deactivated);
        assert!(!report.deleted);
        assert!(!host.mutations().iter().any(|c| c.starts_with("install")));
    }

    #[test]
    fn test_all_active() {
        let registry = ExtensionRegistry::builtin();
        let host = Arc::new(SpyHost::new());
        let lifecycle = orchestrator(&host);

        assert!(!lifecycle.all_active(&registry));
        for descriptor in registry.list_required() {
            host.add_files(&descriptor.activation_path);
            host.set_active(&descriptor.activation_path);
        }
        assert!(lifecycle.all_active(&registry));
        assert!(lifecycle.states(&registry).iter().all(|(_, s)| *s == ExtensionState::Active));
    }
}

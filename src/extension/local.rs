//! Directory-backed host runtime.
//!
//! Each installed unit lives in `<root>/<unit>/`, where `<unit>` comes from
//! the package file name. Activation state is persisted in
//! `<root>/extensions.json`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{HostError, HostRuntime};
use crate::core::{HttpRequest, HttpTransport};

/// Download timeout for extension packages.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

static PACKAGE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<unit>[A-Za-z0-9_-][A-Za-z0-9_.-]*?)(\.[0-9]+\.[0-9]+\.[0-9]+)?\.zip$")
        .expect("package name pattern is valid")
});

/// An installed unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledUnit {
    /// URL the package was downloaded from
    pub source_url: String,
    /// Package file name inside the unit directory
    pub package: String,
    /// SHA-256 of the package
    pub sha256: String,
    /// Installation timestamp
    pub installed_at: u64,
}

/// Persisted host state.
#[derive(Debug, Default, Serialize, Deserialize)]
struct HostState {
    #[serde(default)]
    units: BTreeMap<String, InstalledUnit>,
    #[serde(default)]
    active: BTreeSet<String>,
}

/// Host runtime backed by a local directory.
pub struct LocalHost {
    root: PathBuf,
    transport: Arc<dyn HttpTransport>,
    state: Mutex<HostState>,
}

impl LocalHost {
    /// Open the host directory, creating it if needed.
    pub fn new(root: PathBuf, transport: Arc<dyn HttpTransport>) -> Result<Self, HostError> {
        std::fs::create_dir_all(&root)?;

        let host = Self { root, transport, state: Mutex::new(HostState::default()) };
        host.load_state()?;

        Ok(host)
    }

    /// Get the extensions directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn state_path(&self) -> PathBuf {
        self.root.join("extensions.json")
    }

    fn load_state(&self) -> Result<(), HostError> {
        let path = self.state_path();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let state: HostState =
                serde_json::from_str(&content).map_err(|e| HostError::Io(e.to_string()))?;
            *self.state.lock() = state;
        }

        Ok(())
    }

    fn save_state(&self, state: &HostState) -> Result<(), HostError> {
        let content =
            serde_json::to_string_pretty(state).map_err(|e| HostError::Io(e.to_string()))?;
        crate::core::write_atomic(&self.state_path(), content.as_bytes())?;

        Ok(())
    }

    fn unit_dir(&self, activation_path: &str) -> Option<PathBuf> {
        let unit = activation_path.split('/').next().filter(|u| is_safe_unit(u))?;
        Some(self.root.join(unit))
    }

    /// Details of an installed unit.
    pub fn installed_unit(&self, unit: &str) -> Option<InstalledUnit> {
        self.state.lock().units.get(unit).cloned()
    }
}

impl HostRuntime for LocalHost {
    fn install(&self, download_url: &str) -> Result<(), HostError> {
        let (unit, package) = package_unit_name(download_url)
            .ok_or_else(|| HostError::Install(format!("unsupported package URL: {download_url}")))?;

        let dest_dir = self.root.join(&unit);
        if dest_dir.exists() {
            return Err(HostError::Install(format!(
                "destination folder already exists: {}",
                dest_dir.display()
            )));
        }

        tracing::info!(url = download_url, unit = %unit, "downloading extension package");

        let response = self
            .transport
            .execute(&HttpRequest::get(download_url).timeout(DOWNLOAD_TIMEOUT))
            .map_err(|e| HostError::Download(e.to_string()))?;

        if !response.is_success() {
            return Err(HostError::Download(format!("HTTP {}", response.status)));
        }
        if response.body.is_empty() {
            return Err(HostError::Install("downloaded package is empty".to_string()));
        }

        let sha256 = format!("{:x}", Sha256::digest(&response.body));

        std::fs::create_dir_all(&dest_dir)?;
        if let Err(e) = std::fs::write(dest_dir.join(&package), &response.body) {
            let _ = std::fs::remove_dir_all(&dest_dir);
            return Err(HostError::Install(e.to_string()));
        }

        let mut state = self.state.lock();
        state.units.insert(
            unit.clone(),
            InstalledUnit {
                source_url: download_url.to_string(),
                package,
                sha256,
                installed_at: u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0),
            },
        );
        if let Err(e) = self.save_state(&state) {
            state.units.remove(&unit);
            let _ = std::fs::remove_dir_all(&dest_dir);
            return Err(e);
        }

        tracing::info!(unit = %unit, "extension installed");
        Ok(())
    }

    fn activate(&self, activation_path: &str) -> Result<(), HostError> {
        if !self.file_exists(activation_path) {
            return Err(HostError::Activate(format!("extension files not found: {activation_path}")));
        }

        let mut state = self.state.lock();
        if state.active.insert(activation_path.to_string()) {
            self.save_state(&state)?;
        }

        tracing::info!(path = activation_path, "extension activated");
        Ok(())
    }

    fn deactivate(&self, activation_path: &str) {
        let mut state = self.state.lock();
        if state.active.remove(activation_path) {
            if let Err(e) = self.save_state(&state) {
                tracing::warn!(path = activation_path, error = %e, "failed to persist deactivation");
            }
        }
    }

    fn delete(&self, activation_path: &str) -> Result<(), HostError> {
        let dir = self
            .unit_dir(activation_path)
            .ok_or_else(|| HostError::Delete(format!("invalid activation path: {activation_path}")))?;

        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| HostError::Delete(e.to_string()))?;
        }

        let mut state = self.state.lock();
        state.active.remove(activation_path);
        if let Some(unit) = dir.file_name().and_then(|n| n.to_str()) {
            state.units.remove(unit);
        }
        self.save_state(&state)?;

        tracing::info!(path = activation_path, "extension deleted");
        Ok(())
    }

    fn is_active(&self, activation_path: &str) -> bool {
        self.state.lock().active.contains(activation_path) && self.file_exists(activation_path)
    }

    fn file_exists(&self, activation_path: &str) -> bool {
        self.unit_dir(activation_path).is_some_and(|dir| dir.is_dir())
    }
}

fn is_safe_unit(unit: &str) -> bool {
    !unit.is_empty() && unit != "." && unit != ".." && !unit.contains('\\')
}

/// Derive `(unit, package file name)` from a package URL.
///
/// `woocommerce.9.9.5.zip` unpacks to `woocommerce`, `wp-graphql-woocommerce.zip`
/// to `wp-graphql-woocommerce`.
fn package_unit_name(download_url: &str) -> Option<(String, String)> {
    let parsed = url::Url::parse(download_url).ok()?;
    let file = parsed.path_segments()?.next_back()?.to_string();
    let captures = PACKAGE_NAME.captures(&file)?;
    let unit = captures.name("unit")?.as_str().to_string();

    is_safe_unit(&unit).then_some((unit, file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fakes::FakeTransport;
    use crate::core::HttpResponse;
    use tempfile::TempDir;

    fn host_with(responses: Vec<Result<HttpResponse, crate::core::TransportError>>) -> (TempDir, LocalHost) {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(FakeTransport::new(responses));
        let host = LocalHost::new(dir.path().join("extensions"), transport).unwrap();
        (dir, host)
    }

    #[test]
    fn test_package_unit_name() {
        assert_eq!(
            package_unit_name("https://downloads.wordpress.org/plugin/woocommerce.9.9.5.zip"),
            Some(("woocommerce".into(), "woocommerce.9.9.5.zip".into()))
        );
        assert_eq!(
            package_unit_name("https://github.com/x/y/releases/download/v0.21.2/wp-graphql-woocommerce.zip")
                .map(|(u, _)| u),
            Some("wp-graphql-woocommerce".into())
        );
        assert_eq!(package_unit_name("https://example.com/tool.tar.gz"), None);
        assert_eq!(package_unit_name("not a url"), None);
    }

    #[test]
    fn test_install_then_activate() {
        let (_dir, host) = host_with(vec![Ok(HttpResponse::new(200, b"PK\x03\x04".to_vec()))]);
        let path = "woocommerce/woocommerce.php";

        assert!(!host.file_exists(path));
        host.install("https://downloads.wordpress.org/plugin/woocommerce.9.9.5.zip").unwrap();
        assert!(host.file_exists(path));
        assert!(!host.is_active(path));

        host.activate(path).unwrap();
        assert!(host.is_active(path));

        let unit = host.installed_unit("woocommerce").unwrap();
        assert_eq!(unit.package, "woocommerce.9.9.5.zip");
        assert_eq!(unit.sha256.len(), 64);
    }

    #[test]
    fn test_install_http_error_is_download_failure() {
        let (_dir, host) = host_with(vec![Ok(HttpResponse::new(404, "missing"))]);

        let err = host.install("https://example.com/wp-graphql.2.3.3.zip").unwrap_err();
        assert_eq!(err, HostError::Download("HTTP 404".into()));
        assert!(!host.file_exists("wp-graphql/wp-graphql.php"));
    }

    #[test]
    fn test_install_over_existing_unit_fails() {
        let (_dir, host) = host_with(vec![
            Ok(HttpResponse::new(200, "zip")),
            Ok(HttpResponse::new(200, "zip")),
        ]);
        host.install("https://example.com/wp-graphql.zip").unwrap();

        let err = host.install("https://example.com/wp-graphql.zip").unwrap_err();
        assert!(matches!(err, HostError::Install(m) if m.contains("already exists")));
    }

    #[test]
    fn test_activate_missing_files_fails() {
        let (_dir, host) = host_with(vec![]);
        assert!(matches!(host.activate("ghost/ghost.php"), Err(HostError::Activate(_))));
    }

    #[test]
    fn test_delete_removes_files_and_state() {
        let (_dir, host) = host_with(vec![Ok(HttpResponse::new(200, "zip"))]);
        let path = "woonuxt-settings/woonuxt.php";

        host.install("https://example.com/woonuxt-settings/2.3.0/woonuxt-settings.zip").unwrap();
        host.activate(path).unwrap();
        host.deactivate(path);
        host.delete(path).unwrap();

        assert!(!host.file_exists(path));
        assert!(!host.is_active(path));
        assert!(host.installed_unit("woonuxt-settings").is_none());

        // Deleting again is a no-op.
        host.delete(path).unwrap();
    }

    #[test]
    fn test_state_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("extensions");
        let path = "wp-graphql/wp-graphql.php";

        {
            let transport = Arc::new(FakeTransport::new(vec![Ok(HttpResponse::new(200, "zip"))]));
            let host = LocalHost::new(root.clone(), transport).unwrap();
            host.install("https://example.com/wp-graphql.2.3.3.zip").unwrap();
            host.activate(path).unwrap();
        }

        let host = LocalHost::new(root, Arc::new(FakeTransport::new(vec![]))).unwrap();
        assert!(host.is_active(path));
    }

    #[test]
    fn test_install_rolls_back_when_state_cannot_be_saved() {
        let (_dir, host) = host_with(vec![
            Ok(HttpResponse::new(200, "zip")),
            Ok(HttpResponse::new(200, "zip")),
        ]);
        std::fs::create_dir(host.state_path()).unwrap();

        assert!(host.install("https://example.com/wp-graphql.2.3.3.zip").is_err());
        assert!(!host.root().join("wp-graphql").exists());
        assert!(host.installed_unit("wp-graphql").is_none());

        std::fs::remove_dir(host.state_path()).unwrap();
        host.install("https://example.com/wp-graphql.2.3.3.zip").unwrap();
        assert!(host.file_exists("wp-graphql/wp-graphql.php"));
    }
}

//! Remote version lookup with a read-through cache.

use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{UpdateError, REMOTE_VERSION_CACHE_KEY, SENTINEL_VERSION};
use crate::core::{HttpRequest, HttpTransport, TransientCache, UpdateConfig};

/// Current and latest published version of the host extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Version of the running build
    pub current: String,

    /// Latest published version, or the sentinel when unknown
    pub remote: String,
}

impl VersionInfo {
    pub fn new(current: impl Into<String>, remote: impl Into<String>) -> Self {
        Self { current: current.into(), remote: remote.into() }
    }

    /// Whether `remote` is newer than `current`.
    pub fn update_available(&self) -> bool {
        is_update_available(&self.current, &self.remote)
    }

    /// Whether the remote version could not be determined.
    pub fn remote_unknown(&self) -> bool {
        self.remote == SENTINEL_VERSION
    }
}

/// Strict semantic-version less-than.
///
/// Unparseable input and the sentinel, on either side, never report an update.
pub fn is_update_available(current: &str, remote: &str) -> bool {
    if remote == SENTINEL_VERSION || current == SENTINEL_VERSION {
        return false;
    }

    match (parse_release(current), parse_release(remote)) {
        (Some(current), Some(remote)) => current < remote,
        _ => false,
    }
}

/// Parse a plain `MAJOR.MINOR.PATCH` version.
fn parse_release(version: &str) -> Option<semver::Version> {
    semver::Version::parse(version.trim())
        .ok()
        .filter(|v| v.pre.is_empty() && v.build.is_empty())
}

/// Fetches the latest published version from a raw-content URL.
pub struct RemoteVersionResolver {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn TransientCache>,
    url: String,
    pattern: Regex,
    timeout: Duration,
    ttl: Duration,
}

impl RemoteVersionResolver {
    /// Create a resolver from the `[update]` configuration section.
    pub fn new(
        config: &UpdateConfig,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn TransientCache>,
    ) -> Result<Self, UpdateError> {
        let pattern = Regex::new(&config.version_pattern)?;
        if pattern.captures_len() < 2 {
            return Err(UpdateError::MissingCaptureGroup(config.version_pattern.clone()));
        }

        Ok(Self {
            transport,
            cache,
            url: config.version_url.clone(),
            pattern,
            timeout: config.timeout(),
            ttl: config.cache_ttl(),
        })
    }

    /// Latest published version, or [`SENTINEL_VERSION`] when it cannot be fetched.
    ///
    /// Only real versions are cached, so a failed lookup is retried on the
    /// next call.
    pub fn get_remote_version(&self) -> String {
        if let Some(Value::String(cached)) = self.cache.get(REMOTE_VERSION_CACHE_KEY) {
            if parse_release(&cached).is_some() {
                tracing::debug!(version = %cached, "remote version cache hit");
                return cached;
            }
        }

        tracing::debug!(url = %self.url, "remote version cache miss");

        match self.fetch() {
            Some(version) => {
                self.cache.set(REMOTE_VERSION_CACHE_KEY, Value::String(version.clone()), self.ttl);
                version
            }
            None => SENTINEL_VERSION.to_string(),
        }
    }

    /// Drop the cached version so the next lookup refetches.
    pub fn invalidate(&self) {
        self.cache.delete(REMOTE_VERSION_CACHE_KEY);
    }

    /// Resolve [`VersionInfo`] for the running build.
    pub fn version_info(&self, current: &str) -> VersionInfo {
        VersionInfo::new(current, self.get_remote_version())
    }

    fn fetch(&self) -> Option<String> {
        let request = HttpRequest::get(&self.url).timeout(self.timeout);

        let response = match self.transport.execute(&request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "failed to fetch remote version");
                return None;
            }
        };

        if !response.is_success() {
            tracing::warn!(status = response.status, "remote version feed returned an error");
            return None;
        }

        let body = response.text();
        let version = self
            .pattern
            .captures(&body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string());

        match version {
            Some(v) if v != SENTINEL_VERSION && parse_release(&v).is_some() => Some(v),
            other => {
                tracing::warn!(found = ?other, "no valid version in remote feed");
                None
            }
        }
    }
}

//! Settings save path: sanitize, validate and persist form submissions.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use super::{GlobalAttributeFilter, PersistedSettings, ProductCatalog, DEFAULT_PRIMARY_COLOR};
use crate::core::{HttpRequest, HttpTransport, SettingsStore, StoreError, TransportError, SETTINGS_KEY};

/// Timeout for build-trigger calls.
const BUILD_TRIGGER_TIMEOUT: Duration = Duration::from_secs(15);

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("color pattern is valid")
});

/// Errors from saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Unknown product attribute: '{0}'")]
    UnknownAttribute(String),

    #[error("No attribute filter at position {0}")]
    NoSuchAttribute(usize),

    #[error("Failed to save settings: {0}")]
    Store(#[from] StoreError),
}

/// Errors from triggering a frontend build.
#[derive(Debug, Error)]
pub enum BuildTriggerError {
    #[error("No build hook configured")]
    NotConfigured,

    #[error("Build hook unreachable: {0}")]
    Transport(#[from] TransportError),

    #[error("Build hook returned HTTP {0}")]
    Status(u16),
}

/// Edits the persisted settings.
#[derive(Clone)]
pub struct SettingsEditor {
    store: Arc<dyn SettingsStore>,
    catalog: Arc<dyn ProductCatalog>,
    transport: Arc<dyn HttpTransport>,
}

impl SettingsEditor {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        catalog: Arc<dyn ProductCatalog>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self { store, catalog, transport }
    }

    /// Current settings with defaults applied.
    pub fn load(&self) -> PersistedSettings {
        PersistedSettings::from_value(self.store.get(SETTINGS_KEY).as_ref())
    }

    /// Sanitize and persist a submitted settings object.
    ///
    /// Nothing is written if any attribute filter names an unknown attribute.
    pub fn save(&self, submitted: &Value) -> Result<PersistedSettings, SettingsError> {
        let settings = sanitize(PersistedSettings::from_value(Some(submitted)));
        self.check_attributes(settings.global_attributes.iter())?;

        self.persist(&settings)?;
        tracing::info!(attributes = settings.global_attributes.len(), "settings saved");

        Ok(settings)
    }

    /// Append an attribute filter.
    pub fn add_attribute(&self, filter: GlobalAttributeFilter) -> Result<PersistedSettings, SettingsError> {
        let filter = sanitize_filter(filter);
        self.check_attributes(std::iter::once(&filter))?;

        let mut settings = self.load();
        settings.global_attributes.add(filter);
        self.persist(&settings)?;

        Ok(settings)
    }

    /// Remove the attribute filter at `index`.
    pub fn remove_attribute(&self, index: usize) -> Result<GlobalAttributeFilter, SettingsError> {
        let mut settings = self.load();
        let removed = settings.global_attributes.remove(index).ok_or(SettingsError::NoSuchAttribute(index))?;
        self.persist(&settings)?;

        Ok(removed)
    }

    /// Move the filter at `index` one place up. Returns false if it was already first.
    pub fn move_attribute_up(&self, index: usize) -> Result<bool, SettingsError> {
        self.reorder(index, |filters| filters.move_up(index))
    }

    /// Move the filter at `index` one place down. Returns false if it was already last.
    pub fn move_attribute_down(&self, index: usize) -> Result<bool, SettingsError> {
        self.reorder(index, |filters| filters.move_down(index))
    }

    /// POST to the configured build hook.
    pub fn trigger_build(&self) -> Result<u16, BuildTriggerError> {
        let hook = self.load().build_hook;
        if hook.is_empty() {
            return Err(BuildTriggerError::NotConfigured);
        }

        let response = self
            .transport
            .execute(&HttpRequest::post(&hook).timeout(BUILD_TRIGGER_TIMEOUT))?;

        if !response.is_success() {
            tracing::warn!(status = response.status, "build hook rejected the trigger");
            return Err(BuildTriggerError::Status(response.status));
        }

        tracing::info!(status = response.status, "build triggered");
        Ok(response.status)
    }

    fn reorder(
        &self,
        index: usize,
        op: impl FnOnce(&mut super::AttributeFilters) -> bool,
    ) -> Result<bool, SettingsError> {
        let mut settings = self.load();
        if index >= settings.global_attributes.len() {
            return Err(SettingsError::NoSuchAttribute(index));
        }

        let moved = op(&mut settings.global_attributes);
        if moved {
            self.persist(&settings)?;
        }

        Ok(moved)
    }

    fn check_attributes<'a>(
        &self,
        filters: impl Iterator<Item = &'a GlobalAttributeFilter>,
    ) -> Result<(), SettingsError> {
        let known = self.catalog.attribute_slugs();

        for filter in filters {
            if !known.iter().any(|slug| *slug == filter.attribute_slug) {
                return Err(SettingsError::UnknownAttribute(filter.attribute_slug.clone()));
            }
        }

        Ok(())
    }

    fn persist(&self, settings: &PersistedSettings) -> Result<(), SettingsError> {
        self.store.set(SETTINGS_KEY, settings.to_value())?;
        Ok(())
    }
}

fn sanitize(mut settings: PersistedSettings) -> PersistedSettings {
    if !HEX_COLOR.is_match(&settings.primary_color) {
        settings.primary_color = DEFAULT_PRIMARY_COLOR.to_string();
    }
    settings.logo = sanitize_url(&settings.logo);
    settings.front_end_url = sanitize_url(&settings.front_end_url);
    settings.build_hook = sanitize_url(&settings.build_hook);

    settings.global_attributes = settings.global_attributes.iter().cloned().map(sanitize_filter).collect();

    for link in &mut settings.social {
        link.provider = sanitize_text(&link.provider);
        link.handle = sanitize_text(&link.handle);
        link.url = sanitize_url(&link.url);
    }

    settings
}

fn sanitize_filter(mut filter: GlobalAttributeFilter) -> GlobalAttributeFilter {
    filter.label = sanitize_text(&filter.label);
    filter.attribute_slug = sanitize_text(&filter.attribute_slug);
    filter
}

/// Absolute http(s) URL, or empty.
fn sanitize_url(value: &str) -> String {
    let value = value.trim();
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => value.to_string(),
        _ => String::new(),
    }
}

/// Trimmed single-line text without control characters.
fn sanitize_text(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect::<String>().trim().to_string()
}

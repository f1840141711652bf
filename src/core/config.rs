//! Configuration management.
//!
//! Handles loading configuration from TOML files. Every section is optional
//! and falls back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extension::ExtensionDescriptor;

/// Environment variable that overrides `[security] nonce_secret`.
pub const NONCE_SECRET_ENV: &str = "HEADLESS_SETTINGS_NONCE_SECRET";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Remote version feed and self-update settings
    pub update: UpdateConfig,

    /// Payment provider settings
    pub payments: PaymentsConfig,

    /// Action token settings
    pub security: SecurityConfig,

    /// Values reported by the built-in catalog collaborator
    pub commerce: CommerceConfig,

    /// Site addresses and exported product SEO heads
    pub seo: SeoConfig,

    /// Override of the required-extension catalog (empty = built-in list)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ExtensionDescriptor>,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the settings store, cache and installed extensions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Extra attempts for GET requests that time out or fail to connect
    pub http_retries: u32,
}

/// Remote version feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Raw-content URL of the file carrying the published version
    pub version_url: String,

    /// Regex with one capture group extracting the version from that file
    pub version_pattern: String,

    /// Package download URL; `{version}` is substituted
    pub package_url_template: String,

    /// Version fetch timeout in seconds
    pub timeout_secs: u64,

    /// How long a fetched version is cached, in seconds
    pub cache_ttl_secs: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            version_url: "https://raw.githubusercontent.com/scottyzen/woonuxt-settings/master/woonuxt.php"
                .to_string(),
            version_pattern: r"WOONUXT_SETTINGS_VERSION', '(.*?)'".to_string(),
            package_url_template:
                "https://downloads.wordpress.org/plugin/woonuxt-settings/{version}/woonuxt-settings.zip"
                    .to_string(),
            timeout_secs: 10,
            cache_ttl_secs: 3600,
        }
    }
}

impl UpdateConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Payment provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Base URL of the provider's REST API
    pub api_base: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self { api_base: "https://api.stripe.com/v1".to_string(), timeout_secs: 15 }
    }
}

impl PaymentsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Action token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// HMAC secret for action tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce_secret: Option<String>,

    /// Token lifetime in seconds
    pub nonce_lifetime_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self { nonce_secret: None, nonce_lifetime_secs: 86_400 }
    }
}

impl SecurityConfig {
    /// Resolve the secret: environment first, then the config file.
    pub fn resolve_secret(&self) -> Option<String> {
        std::env::var(NONCE_SECRET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.nonce_secret.clone().filter(|s| !s.is_empty()))
    }

    pub fn nonce_lifetime(&self) -> Duration {
        Duration::from_secs(self.nonce_lifetime_secs)
    }
}

/// Store data reported by the built-in catalog collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommerceConfig {
    /// ISO currency code
    pub currency_code: String,

    /// Currency symbol, possibly HTML-entity encoded
    pub currency_symbol: String,

    /// Price of the highest-priced published product
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_price: Option<f64>,

    /// Number of published products
    pub published_products: u64,

    /// Attribute taxonomy slugs (e.g. `pa_color`)
    pub attributes: Vec<String>,

    /// Current cart total, when a cart is available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_total: Option<f64>,
}

impl Default for CommerceConfig {
    fn default() -> Self {
        Self {
            currency_code: "USD".to_string(),
            currency_symbol: "&#36;".to_string(),
            highest_price: None,
            published_products: 0,
            attributes: Vec::new(),
            cart_total: None,
        }
    }
}

/// Site addresses and exported product SEO heads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeoConfig {
    /// Public home URL of the host site
    pub home_url: String,

    /// Site URL, when it differs from the home URL
    pub site_url: String,

    /// Base URL of uploaded media
    pub uploads_url: String,

    /// Directory of exported `<product id>.html` heads (default `<data_dir>/seo`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heads_dir: Option<PathBuf>,
}

impl SeoConfig {
    pub fn heads_dir(&self, data_dir: &Path) -> PathBuf {
        self.heads_dir.clone().unwrap_or_else(|| data_dir.join("seo"))
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.headless-settings.toml` in current directory
    /// 2. `~/.config/headless-settings/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".headless-settings.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("headless-settings"))
    }

    /// Resolve the data directory: explicit setting, else the platform data dir.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.general
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("headless-settings")))
    }
}

//! Catalog of required extensions.
//!
//! The catalog is built once at startup and passed to every component that
//! acts on caller-supplied slugs. [`ExtensionRegistry::validate_slug`] is the
//! single validation point for that input.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ExtensionDescriptor, LifecycleError, RegistryError};

/// Required WooCommerce version.
const WOOCOMMERCE_VERSION: &str = "9.9.5";

/// Required WPGraphQL version.
const WP_GRAPHQL_VERSION: &str = "2.3.3";

/// Required WooGraphQL version.
const WOO_GRAPHQL_VERSION: &str = "0.21.2";

/// Required WPGraphQL Headless Login version.
const HEADLESS_LOGIN_VERSION: &str = "0.4.3";

const WP_PLUGIN_DOWNLOADS: &str = "https://downloads.wordpress.org/plugin/";

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("slug pattern is valid"));

/// Immutable, validated catalog of required extensions.
#[derive(Debug, Clone)]
pub struct ExtensionRegistry {
    entries: Vec<ExtensionDescriptor>,
}

impl ExtensionRegistry {
    /// Build a catalog, validating every entry.
    pub fn new(entries: Vec<ExtensionDescriptor>) -> Result<Self, RegistryError> {
        let mut seen = std::collections::HashSet::new();

        for entry in &entries {
            if !SLUG_PATTERN.is_match(&entry.slug) {
                return Err(RegistryError::InvalidSlug(entry.slug.clone()));
            }
            if !seen.insert(entry.slug.as_str()) {
                return Err(RegistryError::DuplicateSlug(entry.slug.clone()));
            }
            if !is_http_url(&entry.download_url) {
                return Err(RegistryError::InvalidUrl {
                    slug: entry.slug.clone(),
                    url: entry.download_url.clone(),
                });
            }
            if !is_activation_path(&entry.activation_path) {
                return Err(RegistryError::InvalidActivationPath {
                    slug: entry.slug.clone(),
                    path: entry.activation_path.clone(),
                });
            }
        }

        Ok(Self { entries })
    }

    /// The built-in catalog.
    pub fn builtin() -> Self {
        Self { entries: builtin_entries() }
    }

    /// Catalog from configuration, falling back to the built-in list when empty.
    pub fn from_config(entries: &[ExtensionDescriptor]) -> Result<Self, RegistryError> {
        if entries.is_empty() {
            Ok(Self::builtin())
        } else {
            Self::new(entries.to_vec())
        }
    }

    /// All required extensions in declaration order.
    pub fn list_required(&self) -> &[ExtensionDescriptor] {
        &self.entries
    }

    /// Whether `slug` names a required extension.
    pub fn validate_slug(&self, slug: &str) -> bool {
        self.entries.iter().any(|e| e.slug == slug)
    }

    /// Find an entry by slug.
    pub fn get(&self, slug: &str) -> Option<&ExtensionDescriptor> {
        self.entries.iter().find(|e| e.slug == slug)
    }

    /// Find an entry by slug, rejecting unknown slugs.
    pub fn resolve(&self, slug: &str) -> Result<&ExtensionDescriptor, LifecycleError> {
        self.get(slug).ok_or_else(|| LifecycleError::InvalidSlug(slug.to_string()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The host extension itself, which updates in place rather than from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfExtension {
    /// Slug of the host extension
    pub slug: String,

    /// Activation path of the host extension
    pub activation_path: String,

    /// Download URL template; `{version}` is substituted
    pub package_url_template: String,
}

impl SelfExtension {
    pub fn new(package_url_template: impl Into<String>) -> Self {
        Self {
            slug: "woonuxt-settings".to_string(),
            activation_path: "woonuxt-settings/woonuxt.php".to_string(),
            package_url_template: package_url_template.into(),
        }
    }

    /// Package URL for `version`.
    pub fn package_url(&self, version: &str) -> String {
        self.package_url_template.replace("{version}", version)
    }
}

fn is_http_url(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
}

fn is_activation_path(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('/')
        && !value.split('/').any(|part| part.is_empty() || part == "..")
}

fn builtin_entries() -> Vec<ExtensionDescriptor> {
    vec![
        ExtensionDescriptor {
            slug: "woocommerce".to_string(),
            display_name: "WooCommerce".to_string(),
            description: "An eCommerce toolkit that helps you sell anything.".to_string(),
            download_url: format!("{WP_PLUGIN_DOWNLOADS}woocommerce.{WOOCOMMERCE_VERSION}.zip"),
            activation_path: "woocommerce/woocommerce.php".to_string(),
            icon_url: "https://ps.w.org/woocommerce/assets/icon-256x256.gif".to_string(),
        },
        ExtensionDescriptor {
            slug: "wp-graphql".to_string(),
            display_name: "WPGraphQL".to_string(),
            description: "A GraphQL API for WordPress.".to_string(),
            download_url: format!("{WP_PLUGIN_DOWNLOADS}wp-graphql.{WP_GRAPHQL_VERSION}.zip"),
            activation_path: "wp-graphql/wp-graphql.php".to_string(),
            icon_url: "https://www.wpgraphql.com/logo-wpgraphql.svg".to_string(),
        },
        ExtensionDescriptor {
            slug: "woographql".to_string(),
            display_name: "WooGraphQL".to_string(),
            description: "Enables GraphQL to work with WooCommerce.".to_string(),
            download_url: format!(
                "https://github.com/wp-graphql/wp-graphql-woocommerce/releases/download/v{WOO_GRAPHQL_VERSION}/wp-graphql-woocommerce.zip"
            ),
            activation_path: "wp-graphql-woocommerce/wp-graphql-woocommerce.php".to_string(),
            icon_url: "https://woographql.com/logo.png".to_string(),
        },
        ExtensionDescriptor {
            slug: "wp-graphql-headless-login".to_string(),
            display_name: "WPGraphQL Headless Login".to_string(),
            description: "Headless Login for WPGraphQL.".to_string(),
            download_url: format!(
                "https://github.com/AxeWP/wp-graphql-headless-login/releases/download/{HEADLESS_LOGIN_VERSION}/wp-graphql-headless-login.zip"
            ),
            activation_path: "wp-graphql-headless-login/wp-graphql-headless-login.php".to_string(),
            icon_url: "https://raw.githubusercontent.com/AxeWP/wp-graphql-headless-login/main/packages/admin/assets/logo.svg"
                .to_string(),
        },
    ]
}

//! Aggregated configuration read model.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{GlobalAttributeFilter, PersistedSettings, PublicPaymentSettings, SocialLink};
use crate::core::{SettingsStore, GRAPHQL_SETTINGS_KEY, PAYMENT_SETTINGS_KEY, SETTINGS_KEY};

/// Introspection flag reported when the GraphQL settings are missing.
pub const DEFAULT_INTROSPECTION: &str = "off";

/// A catalog item with a price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CatalogItem {
    pub price: f64,
}

/// Read access to the e-commerce catalog.
pub trait ProductCatalog: Send + Sync {
    /// The highest-priced published item with a positive price.
    fn highest_priced_published_item(&self) -> Option<CatalogItem>;

    /// Attribute taxonomy slugs known to the catalog.
    fn attribute_slugs(&self) -> Vec<String>;

    /// Number of published products.
    fn published_count(&self) -> u64;
}

/// Store currency metadata.
pub trait CurrencyProvider: Send + Sync {
    fn current_currency_code(&self) -> String;

    /// Symbol, possibly HTML-entity encoded.
    fn current_currency_symbol(&self) -> String;
}

/// Inbound request metadata.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// `Host` header, verbatim
    pub host: Option<String>,
}

impl RequestContext {
    pub fn with_host(host: impl Into<String>) -> Self {
        Self { host: Some(host.into()) }
    }
}

/// Everything a headless frontend needs, in one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationSnapshot {
    pub primary_color: String,
    pub logo: String,

    #[serde(rename = "maxPrice", skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u64>,

    #[serde(rename = "productsPerPage")]
    pub products_per_page: u32,

    #[serde(rename = "frontEndUrl")]
    pub front_end_url: String,

    pub build_hook: String,

    #[serde(rename = "domain")]
    pub request_domain: Option<String>,

    pub global_attributes: Vec<GlobalAttributeFilter>,

    #[serde(rename = "publicIntrospectionEnabled")]
    pub public_introspection_enabled: String,

    #[serde(rename = "stripeSettings")]
    pub payment_provider_settings: Option<PublicPaymentSettings>,

    #[serde(rename = "currencyCode")]
    pub currency_code: Option<String>,

    #[serde(rename = "currencySymbol")]
    pub currency_symbol: Option<String>,

    #[serde(rename = "wooCommerceSettingsVersion")]
    pub host_extension_version: String,

    #[serde(rename = "wooNuxtSEO")]
    pub social: Vec<SocialLink>,
}

/// Builds [`ConfigurationSnapshot`]s from the store and the commerce collaborators.
///
/// Building never fails: missing data degrades to defaults or omitted fields.
#[derive(Clone)]
pub struct ConfigurationAggregator {
    store: Arc<dyn SettingsStore>,
    catalog: Arc<dyn ProductCatalog>,
    currency: Arc<dyn CurrencyProvider>,
    version: String,
}

impl ConfigurationAggregator {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        catalog: Arc<dyn ProductCatalog>,
        currency: Arc<dyn CurrencyProvider>,
        version: impl Into<String>,
    ) -> Self {
        Self { store, catalog, currency, version: version.into() }
    }

    /// Build a fresh snapshot for one request.
    pub fn build_snapshot(&self, request: &RequestContext) -> ConfigurationSnapshot {
        let settings = PersistedSettings::from_value(self.store.get(SETTINGS_KEY).as_ref());

        let introspection = self
            .store
            .get(GRAPHQL_SETTINGS_KEY)
            .and_then(|v| v.get("public_introspection_enabled").and_then(|f| f.as_str().map(String::from)))
            .unwrap_or_else(|| DEFAULT_INTROSPECTION.to_string());

        let max_price = self.catalog.highest_priced_published_item().and_then(|item| ceil_price(item.price));
        tracing::debug!(?max_price, "resolved catalog max price");

        ConfigurationSnapshot {
            primary_color: settings.primary_color,
            logo: settings.logo,
            max_price,
            products_per_page: settings.products_per_page,
            front_end_url: settings.front_end_url,
            build_hook: settings.build_hook,
            request_domain: request.host.clone(),
            global_attributes: settings.global_attributes.as_slice().to_vec(),
            public_introspection_enabled: introspection,
            payment_provider_settings: PublicPaymentSettings::from_value(
                self.store.get(PAYMENT_SETTINGS_KEY).as_ref(),
            ),
            currency_code: non_empty(self.currency.current_currency_code()),
            currency_symbol: non_empty(decode_html_entities(&self.currency.current_currency_symbol())),
            host_extension_version: self.version.clone(),
            social: settings.social,
        }
    }
}

/// Whole-unit ceiling of a positive price.
fn ceil_price(price: f64) -> Option<u64> {
    if price.is_finite() && price > 0.0 && price <= u64::MAX as f64 {
        Some(price.ceil() as u64)
    } else {
        None
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Decode named and numeric HTML character references.
///
/// Unknown references are left as written.
pub fn decode_html_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let decoded = tail
            .find(';')
            .filter(|end| *end <= 12)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code);
    }

    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "cent" => '¢',
        "pound" => '£',
        "yen" => '¥',
        "euro" => '€',
        "copy" => '©',
        "reg" => '®',
        _ => return None,
    };
    Some(c)
}

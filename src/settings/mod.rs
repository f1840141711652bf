//! Storefront settings: persisted model, save path and the aggregated snapshot.

mod aggregator;
mod catalog;
mod form;
mod types;

pub use aggregator::{
    decode_html_entities, CatalogItem, ConfigurationAggregator, ConfigurationSnapshot,
    CurrencyProvider, ProductCatalog, RequestContext, DEFAULT_INTROSPECTION,
};
pub use catalog::ConfiguredCatalog;
pub use form::{BuildTriggerError, SettingsEditor, SettingsError};
pub(crate) use types::lenient_bool;
pub use types::{
    AttributeFilters, GlobalAttributeFilter, PersistedSettings, PublicPaymentSettings, SocialLink,
    DEFAULT_PRIMARY_COLOR, DEFAULT_PRODUCTS_PER_PAGE,
};

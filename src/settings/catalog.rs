//! Commerce collaborators backed by configuration.
//!
//! Used by the CLI, which has no live store to query.

use super::{CatalogItem, CurrencyProvider, ProductCatalog};
use crate::core::CommerceConfig;
use crate::payment::CartProvider;

/// Catalog, currency and cart data read from the `[commerce]` section.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredCatalog {
    config: CommerceConfig,
}

impl ConfiguredCatalog {
    pub fn new(config: CommerceConfig) -> Self {
        Self { config }
    }
}

impl ProductCatalog for ConfiguredCatalog {
    fn highest_priced_published_item(&self) -> Option<CatalogItem> {
        self.config.highest_price.filter(|p| *p > 0.0).map(|price| CatalogItem { price })
    }

    fn attribute_slugs(&self) -> Vec<String> {
        self.config.attributes.clone()
    }

    fn published_count(&self) -> u64 {
        self.config.published_products
    }
}

impl CurrencyProvider for ConfiguredCatalog {
    fn current_currency_code(&self) -> String {
        self.config.currency_code.clone()
    }

    fn current_currency_symbol(&self) -> String {
        self.config.currency_symbol.clone()
    }
}

impl CartProvider for ConfiguredCatalog {
    fn cart_total(&self) -> Option<f64> {
        self.config.cart_total
    }
}

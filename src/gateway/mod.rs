//! Configuration gateway.
//!
//! The single entry point used by external callers (the CLI, an admin UI or a
//! GraphQL layer). Each operation here wires caller input to one component and
//! applies the guards that belong at the boundary: action tokens, slug
//! validation and cart checks.

pub mod schema;

use std::sync::Arc;

use thiserror::Error;

use crate::core::{
    Config, HttpTransport, NonceManager, SettingsStore, TransientCache, INSTALL_ACTION,
    SELF_UPDATE_ACTION, STATUS_ACTION,
};
use crate::extension::{
    ExtensionDescriptor, ExtensionRegistry, ExtensionState, ExtensionStatus, HostRuntime,
    LifecycleError, LifecycleOrchestrator, RegistryError, SelfExtension, SelfUpdateReport,
    StatusService,
};
use crate::payment::{CartProvider, IntentMode, PaymentIntentBridge, PaymentIntentResult};
use crate::seo::{render_head, HeadOptions, SeoHeadProvider};
use crate::settings::{
    ConfigurationAggregator, ConfigurationSnapshot, CurrencyProvider, ProductCatalog, RequestContext,
};
use crate::update::{RemoteVersionResolver, UpdateError, VersionInfo, CURRENT_VERSION};

/// Admin page the install trigger redirects to.
pub const SETTINGS_PAGE: &str = "options-general.php?page=woonuxt";

/// Published product count above which connection queries are widened.
const CONNECTION_LIMIT_THRESHOLD: u64 = 100;

/// Currency reported when no cart is available.
const FALLBACK_CURRENCY: &str = "USD";

/// Gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Security check failed")]
    InvalidToken,

    #[error("No action token secret configured (set {} or [security] nonce_secret)", crate::core::NONCE_SECRET_ENV)]
    MissingSecret,

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Invalid extension catalog: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Update(#[from] UpdateError),
}

/// Where the caller should be sent after a successful action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
}

/// External collaborators the gateway is built from.
#[derive(Clone)]
pub struct Collaborators {
    pub host: Arc<dyn HostRuntime>,
    pub transport: Arc<dyn HttpTransport>,
    pub store: Arc<dyn SettingsStore>,
    pub cache: Arc<dyn TransientCache>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub currency: Arc<dyn CurrencyProvider>,
    pub cart: Arc<dyn CartProvider>,
    pub seo: Arc<dyn SeoHeadProvider>,
}

/// Facade over every exposed operation.
pub struct Gateway {
    registry: ExtensionRegistry,
    lifecycle: LifecycleOrchestrator,
    status: StatusService,
    versions: RemoteVersionResolver,
    self_extension: SelfExtension,
    aggregator: ConfigurationAggregator,
    payments: PaymentIntentBridge,
    catalog: Arc<dyn ProductCatalog>,
    currency: Arc<dyn CurrencyProvider>,
    cart: Arc<dyn CartProvider>,
    seo: Arc<dyn SeoHeadProvider>,
    nonces: Option<NonceManager>,
}

impl Gateway {
    /// Wire every component from configuration and collaborators.
    pub fn new(config: &Config, deps: Collaborators) -> Result<Self, GatewayError> {
        let registry = ExtensionRegistry::from_config(&config.extensions)?;
        let lifecycle = LifecycleOrchestrator::new(deps.host.clone());
        let status = StatusService::new(registry.clone(), lifecycle.clone());
        let versions = RemoteVersionResolver::new(&config.update, deps.transport.clone(), deps.cache.clone())?;
        let aggregator = ConfigurationAggregator::new(
            deps.store.clone(),
            deps.catalog.clone(),
            deps.currency.clone(),
            CURRENT_VERSION,
        );
        let payments = PaymentIntentBridge::new(&config.payments, deps.store.clone(), deps.transport.clone());
        let nonces = config
            .security
            .resolve_secret()
            .map(|secret| NonceManager::new(secret, config.security.nonce_lifetime()));

        Ok(Self {
            registry,
            lifecycle,
            status,
            versions,
            self_extension: SelfExtension::new(config.update.package_url_template.clone()),
            aggregator,
            payments,
            catalog: deps.catalog,
            currency: deps.currency,
            cart: deps.cart,
            seo: deps.seo,
            nonces,
        })
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Aggregated settings for one request.
    pub fn settings(&self, request: &RequestContext) -> ConfigurationSnapshot {
        self.aggregator.build_snapshot(request)
    }

    /// Create a payment or setup intent for the current cart.
    pub fn payment_intent(&self, mode: Option<IntentMode>) -> PaymentIntentResult {
        let mode = mode.unwrap_or_default();

        let Some(total) = self.cart.cart_total() else {
            return PaymentIntentResult::failure(0, FALLBACK_CURRENCY, IntentMode::Setup, "cart is not available");
        };

        let currency = self.currency.current_currency_code().to_ascii_uppercase();
        if !total.is_finite() || total <= 0.0 {
            return PaymentIntentResult::failure(0, &currency, mode, "cart amount must be greater than 0");
        }

        self.payments.create_intent(total, &currency, mode)
    }

    /// SEO head markup for a product, rebased and filtered per `options`.
    pub fn full_seo_head(&self, product_id: u64, options: &HeadOptions) -> Option<String> {
        render_head(self.seo.as_ref(), product_id, options)
    }

    /// Status of a required extension, for UI polling.
    pub fn check_extension_status(
        &self,
        slug: &str,
        activation_path: &str,
        token: &str,
    ) -> Result<ExtensionStatus, GatewayError> {
        self.verify(token, STATUS_ACTION)?;
        Ok(self.status.check_status(slug, activation_path)?)
    }

    /// Install and activate a required extension.
    pub fn install_extension(&self, slug: &str, token: &str) -> Result<Redirect, GatewayError> {
        self.verify(token, INSTALL_ACTION)?;

        let descriptor = self.registry.resolve(slug)?;
        self.lifecycle.ensure_active(descriptor)?;

        Ok(Redirect { location: SETTINGS_PAGE.to_string() })
    }

    /// Update the host extension to the latest published version.
    pub fn self_update(&self, token: &str) -> Result<SelfUpdateReport, GatewayError> {
        self.verify(token, SELF_UPDATE_ACTION)?;

        let version = self.versions.get_remote_version();
        Ok(self.lifecycle.self_update(&self.self_extension, &version)?)
    }

    /// Link that retries an install, for error messages.
    pub fn install_url(&self, slug: &str) -> Option<String> {
        let token = self.issue_token(INSTALL_ACTION).ok()?;
        Some(format!(
            "{SETTINGS_PAGE}&install_plugin={}&_wpnonce={}",
            urlencoding::encode(slug),
            urlencoding::encode(&token)
        ))
    }

    /// Issue an action token.
    pub fn issue_token(&self, action: &str) -> Result<String, GatewayError> {
        Ok(self.nonces.as_ref().ok_or(GatewayError::MissingSecret)?.create(action))
    }

    /// Current and latest published version.
    pub fn version_info(&self) -> VersionInfo {
        self.versions.version_info(CURRENT_VERSION)
    }

    /// Drop the cached remote version.
    pub fn refresh_version(&self) {
        self.versions.invalidate();
    }

    /// State of every required extension.
    pub fn extension_states(&self) -> Vec<(&ExtensionDescriptor, ExtensionState)> {
        self.lifecycle.states(&self.registry)
    }

    /// Whether every required extension is active.
    pub fn all_active(&self) -> bool {
        self.lifecycle.all_active(&self.registry)
    }

    /// Page size limit for connection queries.
    ///
    /// Large catalogs get their full published count so a single query can
    /// page through everything.
    pub fn connection_max_query_amount(&self, requested: u64) -> u64 {
        let published = self.catalog.published_count();
        if published > CONNECTION_LIMIT_THRESHOLD {
            published
        } else {
            requested
        }
    }

    fn verify(&self, token: &str, action: &str) -> Result<(), GatewayError> {
        let nonces = self.nonces.as_ref().ok_or(GatewayError::MissingSecret)?;

        if nonces.verify(token, action) {
            Ok(())
        } else {
            tracing::warn!(action, "rejected invalid action token");
            Err(GatewayError::InvalidToken)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fakes::FakeTransport;
    use crate::core::{CommerceConfig, HttpResponse, MemoryCache, MemoryStore, SecurityConfig};
    use crate::extension::testing::SpyHost;
    use crate::seo::{SiteUrls, StaticHeads};
    use crate::settings::ConfiguredCatalog;

    fn gateway_with(commerce: CommerceConfig, host: Arc<SpyHost>) -> Gateway {
        let config = Config {
            security: SecurityConfig { nonce_secret: Some("test-secret".into()), ..SecurityConfig::default() },
            ..Config::default()
        };
        let catalog = Arc::new(ConfiguredCatalog::new(commerce));
        let deps = Collaborators {
            host,
            transport: Arc::new(FakeTransport::new(vec![Ok(HttpResponse::new(
                200,
                "define('WOONUXT_SETTINGS_VERSION', '0.0.0');",
            ))])),
            store: Arc::new(MemoryStore::new()),
            cache: Arc::new(MemoryCache::new()),
            catalog: catalog.clone(),
            currency: catalog.clone(),
            cart: catalog,
            seo: Arc::new(
                StaticHeads::new(SiteUrls { home_url: "https://shop.example.com".into(), ..SiteUrls::default() })
                    .with_head(42, r#"<link rel="canonical" href="https://shop.example.com/p/42/" /><style>x</style>"#),
            ),
        };
        Gateway::new(&config, deps).unwrap()
    }

    #[test]
    fn test_invalid_token_rejected_before_host_calls() {
        let host = Arc::new(SpyHost::new());
        let gateway = gateway_with(CommerceConfig::default(), host.clone());

        assert!(matches!(gateway.install_extension("wp-graphql", "forged"), Err(GatewayError::InvalidToken)));
        assert!(matches!(
            gateway.check_extension_status("wp-graphql", "wp-graphql/wp-graphql.php", "forged"),
            Err(GatewayError::InvalidToken)
        ));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_token_is_action_bound() {
        let host = Arc::new(SpyHost::new());
        let gateway = gateway_with(CommerceConfig::default(), host.clone());
        let status_token = gateway.issue_token(STATUS_ACTION).unwrap();

        assert!(matches!(gateway.install_extension("wp-graphql", &status_token), Err(GatewayError::InvalidToken)));
        assert_eq!(
            gateway.check_extension_status("wp-graphql", "wp-graphql/wp-graphql.php", &status_token).unwrap(),
            ExtensionStatus::NotInstalled
        );
    }

    #[test]
    fn test_install_unknown_slug_touches_nothing() {
        let host = Arc::new(SpyHost::new());
        let gateway = gateway_with(CommerceConfig::default(), host.clone());
        let token = gateway.issue_token(INSTALL_ACTION).unwrap();

        let err = gateway.install_extension("https-evil-example", &token).unwrap_err();

        assert!(matches!(err, GatewayError::Lifecycle(LifecycleError::InvalidSlug(_))));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_install_redirects_to_settings_page() {
        let host = Arc::new(SpyHost::new());
        host.add_files("wp-graphql/wp-graphql.php");
        let gateway = gateway_with(CommerceConfig::default(), host);
        let token = gateway.issue_token(INSTALL_ACTION).unwrap();

        let redirect = gateway.install_extension("wp-graphql", &token).unwrap();
        assert_eq!(redirect.location, SETTINGS_PAGE);
    }

    #[test]
    fn test_self_update_with_unknown_remote_is_rejected() {
        let host = Arc::new(SpyHost::new());
        let gateway = gateway_with(CommerceConfig::default(), host.clone());
        let token = gateway.issue_token(SELF_UPDATE_ACTION).unwrap();

        let err = gateway.self_update(&token).unwrap_err();

        assert!(matches!(err, GatewayError::Lifecycle(LifecycleError::InvalidVersion(v)) if v == "0.0.0"));
        assert!(host.calls().is_empty());
    }

    #[test]
    fn test_payment_intent_cart_guards() {
        let gateway = gateway_with(CommerceConfig::default(), Arc::new(SpyHost::new()));
        let result = gateway.payment_intent(Some(IntentMode::Payment));
        assert_eq!(result.error.as_deref(), Some("cart is not available"));
        assert_eq!(result.currency, "USD");
        assert_eq!(result.mode, IntentMode::Setup);

        let commerce = CommerceConfig { cart_total: Some(0.0), currency_code: "eur".into(), ..CommerceConfig::default() };
        let gateway = gateway_with(commerce, Arc::new(SpyHost::new()));
        let result = gateway.payment_intent(Some(IntentMode::Payment));
        assert_eq!(result.error.as_deref(), Some("cart amount must be greater than 0"));
        assert_eq!(result.currency, "EUR");
        assert_eq!(result.amount, 0);
        assert_eq!(result.mode, IntentMode::Payment);
    }

    #[test]
    fn test_connection_max_query_amount() {
        let small = gateway_with(CommerceConfig { published_products: 40, ..CommerceConfig::default() }, Arc::new(SpyHost::new()));
        assert_eq!(small.connection_max_query_amount(10), 10);

        let large = gateway_with(CommerceConfig { published_products: 250, ..CommerceConfig::default() }, Arc::new(SpyHost::new()));
        assert_eq!(large.connection_max_query_amount(10), 250);
    }

    #[test]
    fn test_full_seo_head() {
        let gateway = gateway_with(CommerceConfig::default(), Arc::new(SpyHost::new()));

        let options = HeadOptions {
            frontend_url: Some("https://front.example.com".into()),
            sanitize: true,
            ..HeadOptions::default()
        };
        assert_eq!(
            gateway.full_seo_head(42, &options).as_deref(),
            Some(r#"<link rel="canonical" href="https://front.example.com/p/42/" />x"#)
        );
        assert!(gateway.full_seo_head(43, &options).is_none());
    }

    #[test]
    #[serial_test::serial]
    fn test_missing_secret() {
        let catalog = Arc::new(ConfiguredCatalog::default());
        let deps = Collaborators {
            host: Arc::new(SpyHost::new()),
            transport: Arc::new(FakeTransport::new(vec![])),
            store: Arc::new(MemoryStore::new()),
            cache: Arc::new(MemoryCache::new()),
            catalog: catalog.clone(),
            currency: catalog.clone(),
            cart: catalog,
            seo: Arc::new(StaticHeads::default()),
        };
        let gateway = Gateway::new(&Config::default(), deps).unwrap();

        // Skipped when the environment supplies a secret.
        if std::env::var(crate::core::NONCE_SECRET_ENV).is_err() {
            assert!(matches!(gateway.issue_token(STATUS_ACTION), Err(GatewayError::MissingSecret)));
            assert!(gateway.install_url("wp-graphql").is_none());
        }
    }
}

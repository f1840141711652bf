//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use headless_settings::core::{
    Config, HttpRequest, HttpResponse, HttpTransport, MemoryCache, MemoryStore, TransportError,
};
use headless_settings::extension::{HostError, HostRuntime};
use headless_settings::payment::CartProvider;
use headless_settings::seo::StaticHeads;
use headless_settings::settings::{CatalogItem, CurrencyProvider, ProductCatalog};
use headless_settings::{Collaborators, Gateway};

pub const SECRET: &str = "integration-secret";

/// Host runtime that records every call and keeps state in memory.
#[derive(Default)]
pub struct RecordingHost {
    files: Mutex<BTreeSet<String>>,
    active: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<String>>,
    packages: Vec<(String, String)>,
    install_error: Option<HostError>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_install(error: HostError) -> Self {
        Self { install_error: Some(error), ..Self::default() }
    }

    /// Packages whose URL ends with `suffix` unpack to `activation_path`.
    pub fn with_package(mut self, suffix: &str, activation_path: &str) -> Self {
        self.packages.push((suffix.to_string(), activation_path.to_string()));
        self
    }

    pub fn with_files(self, activation_path: &str) -> Self {
        self.files.lock().insert(activation_path.to_string());
        self
    }

    pub fn with_active(self, activation_path: &str) -> Self {
        self.active.lock().insert(activation_path.to_string());
        self.with_files(activation_path)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Calls that change host state.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("is_active") && !c.starts_with("file_exists"))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

/// Activation path a package URL unpacks to: `<name>/<name>.php`.
fn unit_path(download_url: &str) -> String {
    let file = download_url.rsplit('/').next().unwrap_or_default();
    let name = file.split('.').next().unwrap_or_default();
    format!("{name}/{name}.php")
}

impl HostRuntime for RecordingHost {
    fn install(&self, download_url: &str) -> Result<(), HostError> {
        self.record(format!("install {download_url}"));
        if let Some(error) = &self.install_error {
            return Err(error.clone());
        }
        let path = self
            .packages
            .iter()
            .find(|(suffix, _)| download_url.ends_with(suffix.as_str()))
            .map_or_else(|| unit_path(download_url), |(_, path)| path.clone());
        self.files.lock().insert(path);
        Ok(())
    }

    fn activate(&self, activation_path: &str) -> Result<(), HostError> {
        self.record(format!("activate {activation_path}"));
        if !self.files.lock().contains(activation_path) {
            return Err(HostError::Activate(format!("{activation_path} is not installed")));
        }
        self.active.lock().insert(activation_path.to_string());
        Ok(())
    }

    fn deactivate(&self, activation_path: &str) {
        self.record(format!("deactivate {activation_path}"));
        self.active.lock().remove(activation_path);
    }

    fn delete(&self, activation_path: &str) -> Result<(), HostError> {
        self.record(format!("delete {activation_path}"));
        self.files.lock().remove(activation_path);
        Ok(())
    }

    fn is_active(&self, activation_path: &str) -> bool {
        self.record(format!("is_active {activation_path}"));
        self.active.lock().contains(activation_path)
    }

    fn file_exists(&self, activation_path: &str) -> bool {
        self.record(format!("file_exists {activation_path}"));
        self.files.lock().contains(activation_path)
    }
}

/// Transport returning scripted responses in order.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), requests: Mutex::default() }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request.clone());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connect("no scripted response".into())))
    }
}

/// Catalog, currency and cart in one fixed value.
#[derive(Clone)]
pub struct Storefront {
    pub highest_price: Option<f64>,
    pub attributes: Vec<String>,
    pub published: u64,
    pub currency: (&'static str, &'static str),
    pub cart_total: Option<f64>,
}

impl Default for Storefront {
    fn default() -> Self {
        Self {
            highest_price: None,
            attributes: vec!["pa_color".to_string()],
            published: 0,
            currency: ("USD", "&#36;"),
            cart_total: None,
        }
    }
}

impl ProductCatalog for Storefront {
    fn highest_priced_published_item(&self) -> Option<CatalogItem> {
        self.highest_price.map(|price| CatalogItem { price })
    }

    fn attribute_slugs(&self) -> Vec<String> {
        self.attributes.clone()
    }

    fn published_count(&self) -> u64 {
        self.published
    }
}

impl CurrencyProvider for Storefront {
    fn current_currency_code(&self) -> String {
        self.currency.0.to_string()
    }

    fn current_currency_symbol(&self) -> String {
        self.currency.1.to_string()
    }
}

impl CartProvider for Storefront {
    fn cart_total(&self) -> Option<f64> {
        self.cart_total
    }
}

/// Everything a gateway test needs to inspect afterwards.
pub struct Harness {
    pub gateway: Gateway,
    pub host: Arc<RecordingHost>,
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    pub fn new(host: RecordingHost, transport: ScriptedTransport, store: MemoryStore, storefront: Storefront) -> Self {
        let mut config = Config::default();
        config.security.nonce_secret = Some(SECRET.to_string());

        let host = Arc::new(host);
        let transport = Arc::new(transport);
        let store = Arc::new(store);
        let storefront = Arc::new(storefront);

        let gateway = Gateway::new(
            &config,
            Collaborators {
                host: host.clone(),
                transport: transport.clone(),
                store: store.clone(),
                cache: Arc::new(MemoryCache::new()),
                catalog: storefront.clone(),
                currency: storefront.clone(),
                cart: storefront,
                seo: Arc::new(StaticHeads::default()),
            },
        )
        .unwrap();

        Self { gateway, host, transport, store }
    }

    pub fn with_host(host: RecordingHost) -> Self {
        Self::new(host, ScriptedTransport::default(), MemoryStore::new(), Storefront::default())
    }

    pub fn token(&self, action: &str) -> String {
        self.gateway.issue_token(action).unwrap()
    }
}

//! Core infrastructure shared by every feature module.
//!
//! This module contains configuration, the outbound HTTP abstraction, the
//! settings store, the transient cache and action tokens.

mod cache;
mod config;
mod http;
mod nonce;
mod retry;
mod store;

pub use cache::{FileCache, MemoryCache, TransientCache};
pub use config::{
    CommerceConfig, Config, GeneralConfig, PaymentsConfig, SecurityConfig, SeoConfig, UpdateConfig,
    NONCE_SECRET_ENV,
};
pub use http::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport, TransportError};
pub use nonce::{NonceManager, INSTALL_ACTION, SELF_UPDATE_ACTION, STATUS_ACTION};
pub use retry::{retry, RetryConfig, RetryResult};
pub(crate) use store::write_atomic;
pub use store::{
    JsonFileStore, MemoryStore, SettingsStore, StoreError, GRAPHQL_SETTINGS_KEY,
    PAYMENT_SETTINGS_KEY, SETTINGS_KEY,
};

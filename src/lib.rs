//! # Headless Settings
//!
//! Settings gateway and required-extension manager for a headless storefront.
//!
//! The crate keeps a host application's required extensions installed and
//! active, keeps the host extension itself current against a remote release
//! feed, and serves one aggregated configuration snapshot plus payment intents
//! to headless frontends.
//!
//! ## Features
//!
//! - **Extension lifecycle**: install, activate and self-update through a narrow
//!   host capability, with partial failures reported step by step
//! - **Version tracking**: remote version lookup with a TTL cache
//! - **Settings snapshot**: persisted settings merged with catalog, currency and
//!   payment provider data
//! - **Payment intents**: payment and setup intents from the provider's REST API
//! - **SEO heads**: product head markup rebased onto the frontend and filtered
//!
//! ## Quick Start
//!
//! ```bash
//! # Show the state of every required extension
//! headless-settings extensions list
//!
//! # Print the settings snapshot as JSON
//! headless-settings settings show --format json
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]

pub mod core;
pub mod extension;
pub mod gateway;
pub mod payment;
pub mod seo;
pub mod settings;
pub mod update;

// Re-export commonly used types
pub use core::Config;
pub use extension::{ExtensionRegistry, LifecycleError, LifecycleOrchestrator, LocalHost};
pub use gateway::{Collaborators, Gateway, GatewayError};
pub use settings::{ConfigurationSnapshot, ConfiguredCatalog};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "headless-settings";

/// Short alias
pub const APP_ALIAS: &str = "hset";

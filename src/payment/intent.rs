//! Payment and setup intents from the payment provider's REST API.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{HttpRequest, HttpTransport, PaymentsConfig, SettingsStore, PAYMENT_SETTINGS_KEY};
use crate::settings::lenient_bool;

/// Which kind of intent to create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentMode {
    /// Charge the cart now
    Payment,
    /// Save a payment method for later
    #[default]
    Setup,
}

impl IntentMode {
    /// Provider endpoint path.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Payment => "/payment_intents",
            Self::Setup => "/setup_intents",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "PAYMENT",
            Self::Setup => "SETUP",
        }
    }
}

impl FromStr for IntentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PAYMENT" => Ok(Self::Payment),
            "SETUP" => Ok(Self::Setup),
            other => Err(format!("unknown intent mode '{other}', expected PAYMENT or SETUP")),
        }
    }
}

impl std::fmt::Display for IntentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform result envelope. `error` is the only failure signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentResult {
    /// Amount in the currency's smallest unit
    pub amount: i64,

    /// Upper-cased ISO currency code
    pub currency: String,

    #[serde(rename = "clientSecret")]
    pub client_secret: Option<String>,

    /// Provider-side intent id
    pub id: Option<String>,

    pub error: Option<String>,

    #[serde(rename = "stripePaymentMethod")]
    pub mode: IntentMode,
}

impl PaymentIntentResult {
    /// A failed result carrying `error`.
    pub fn failure(amount: i64, currency: &str, mode: IntentMode, error: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.to_ascii_uppercase(),
            client_secret: None,
            id: None,
            error: Some(error.into()),
            mode,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.client_secret.is_some()
    }
}

/// Convert a decimal amount to minor units.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Creates intents with the provider. Responses are never cached.
#[derive(Clone)]
pub struct PaymentIntentBridge {
    store: Arc<dyn SettingsStore>,
    transport: Arc<dyn HttpTransport>,
    api_base: String,
    timeout: Duration,
}

impl PaymentIntentBridge {
    pub fn new(config: &PaymentsConfig, store: Arc<dyn SettingsStore>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            store,
            transport,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        }
    }

    /// Create an intent for a positive `amount`.
    ///
    /// Failures are classified in order: disabled provider, missing secret key,
    /// transport error, non-200 status, unparseable body, provider error object.
    pub fn create_intent(&self, amount: f64, currency: &str, mode: IntentMode) -> PaymentIntentResult {
        let minor = to_minor_units(amount);
        let fail = |message: String| PaymentIntentResult::failure(minor, currency, mode, message);

        let settings = self.store.get(PAYMENT_SETTINGS_KEY);
        let enabled = settings.as_ref().and_then(|s| s.get("enabled")).is_some_and(lenient_bool);
        if !enabled {
            tracing::debug!("payment provider not enabled");
            return fail("provider not enabled".to_string());
        }

        let Some(secret) = settings.as_ref().and_then(secret_key) else {
            tracing::warn!("payment provider secret key not configured");
            return fail("secret key not configured".to_string());
        };

        let mut fields = vec![("automatic_payment_methods[enabled]", "true".to_string())];
        if mode == IntentMode::Payment {
            fields.insert(0, ("currency", currency.to_ascii_lowercase()));
            fields.insert(0, ("amount", minor.to_string()));
        }

        let request = HttpRequest::post(format!("{}{}", self.api_base, mode.endpoint()))
            .bearer(&secret)
            .form(&fields)
            .timeout(self.timeout);

        let response = match self.transport.execute(&request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%mode, error = %e, "payment provider unreachable");
                return fail(format!("failed to connect: {e}"));
            }
        };

        if response.status != 200 {
            tracing::warn!(%mode, status = response.status, "payment provider returned an error status");
            return fail(format!("provider returned error code {}", response.status));
        }

        let body: Value = match serde_json::from_slice(&response.body) {
            Ok(body @ Value::Object(_)) => body,
            Ok(_) | Err(_) => {
                tracing::warn!(%mode, "payment provider response is not a JSON object");
                return fail("failed to parse response".to_string());
            }
        };

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown provider error")
                .to_string();
            tracing::warn!(%mode, message = %message, "payment provider rejected the intent");
            return fail(message);
        }

        let client_secret = body.get("client_secret").and_then(Value::as_str).map(String::from);
        let id = body.get("id").and_then(Value::as_str).map(String::from);

        if client_secret.is_none() {
            tracing::warn!(%mode, "payment provider response has no client secret");
            return PaymentIntentResult { id, ..fail("response missing client secret".to_string()) };
        }

        tracing::info!(%mode, id = ?id, "payment intent created");
        PaymentIntentResult {
            amount: minor,
            currency: currency.to_ascii_uppercase(),
            client_secret,
            id,
            error: None,
            mode,
        }
    }
}

/// Secret key for the configured mode (test or live).
fn secret_key(settings: &Value) -> Option<String> {
    let test_mode = settings.get("testmode").is_some_and(lenient_bool);
    let field = if test_mode { "test_secret_key" } else { "secret_key" };

    settings.get(field).and_then(Value::as_str).map(str::trim).filter(|k| !k.is_empty()).map(String::from)
}

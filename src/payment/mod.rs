//! Payment provider bridge.

mod intent;

pub use intent::{to_minor_units, IntentMode, PaymentIntentBridge, PaymentIntentResult};

/// Access to the shopper's cart.
pub trait CartProvider: Send + Sync {
    /// Cart total in major units, or `None` when no cart is available.
    fn cart_total(&self) -> Option<f64>;
}

//! GraphQL type declarations for the gateway's read models.
//!
//! Field names are relied on by external frontends and must not change.

const SDL: &str = r#""""
Woonuxt Global attributes for filtering
"""
type woonuxtOptionsGlobalAttributes {
  label: String
  slug: String
  showCount: Boolean
  hideEmpty: Boolean
  openByDefault: Boolean
}

type woonuxtOptionsStripeSettings {
  enabled: String
  testmode: String
  test_publishable_key: String
  publishable_key: String
}

"""
Woonuxt Social Items
"""
type wooNuxtSocialItems {
  provider: String
  url: String
  handle: String
}

"""
Woonuxt Settings
"""
type woonuxtOptions {
  primary_color: String
  logo: String
  maxPrice: Int
  productsPerPage: Int
  frontEndUrl: String
  build_hook: String
  domain: String
  global_attributes: [woonuxtOptionsGlobalAttributes]
  publicIntrospectionEnabled: String
  stripeSettings: woonuxtOptionsStripeSettings
  currencyCode: String
  currencySymbol: String
  wooCommerceSettingsVersion: String
  wooNuxtSEO: [wooNuxtSocialItems]
}

"""
The Stripe Payment Method. Payment or Setup.
"""
enum StripePaymentMethodEnum {
  PAYMENT
  SETUP
}

type PaymentIntent {
  amount: Int
  currency: String
  clientSecret: String
  id: String
  error: String
  stripePaymentMethod: String
}

extend type Product {
  """
  SEO head output for this product (if an SEO plugin is installed).
  """
  fullYoastHead(
    """
    Frontend base URL to replace site URLs in the head output.
    """
    frontendUrl: String
    """
    Image base URL to replace uploaded media URLs in the head output.
    """
    imageUrl: String
    """
    Whether to sanitize the head output using an allowlist.
    """
    sanitize: Boolean
  ): String
}

type RootQuery {
  woonuxtSettings: woonuxtOptions
  stripePaymentIntent(
    """
    The Stripe Payment Method. PAYMENT or SETUP.
    """
    stripePaymentMethod: StripePaymentMethodEnum = SETUP
  ): PaymentIntent
}
"#;

/// Schema definition of the exposed types and root fields.
pub fn sdl() -> &'static str {
    SDL
}

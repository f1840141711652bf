//! Persisted settings model.
//!
//! Stored settings come from form submissions and older releases, so decoding
//! is field-by-field and lenient: a missing or wrong-typed field takes its
//! default instead of failing the whole record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default brand color.
pub const DEFAULT_PRIMARY_COLOR: &str = "#7F54B2";

/// Default product-list page size.
pub const DEFAULT_PRODUCTS_PER_PAGE: u32 = 24;

/// A product attribute filter shown by the storefront, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAttributeFilter {
    /// Free-text label
    pub label: String,

    /// Catalog attribute taxonomy (e.g. `pa_color`)
    #[serde(rename = "slug")]
    pub attribute_slug: String,

    pub show_count: bool,
    pub hide_empty: bool,
    pub open_by_default: bool,
}

impl GlobalAttributeFilter {
    pub fn new(label: impl Into<String>, attribute_slug: impl Into<String>) -> Self {
        Self { label: label.into(), attribute_slug: attribute_slug.into(), ..Self::default() }
    }

    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            label: field_string(obj, "label"),
            attribute_slug: field_string(obj, "slug"),
            show_count: field_bool(obj, "showCount"),
            hide_empty: field_bool(obj, "hideEmpty"),
            open_by_default: field_bool(obj, "openByDefault"),
        })
    }
}

/// Ordered list of attribute filters.
///
/// Order only changes through the explicit reorder operations, each a single
/// adjacent swap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeFilters(Vec<GlobalAttributeFilter>);

impl AttributeFilters {
    pub fn new(filters: Vec<GlobalAttributeFilter>) -> Self {
        Self(filters)
    }

    /// Append a filter.
    pub fn add(&mut self, filter: GlobalAttributeFilter) {
        self.0.push(filter);
    }

    /// Remove the filter at `index`.
    pub fn remove(&mut self, index: usize) -> Option<GlobalAttributeFilter> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }

    /// Swap the filter at `index` with its predecessor. Returns false at the top or out of range.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.0.len() {
            return false;
        }
        self.0.swap(index - 1, index);
        true
    }

    /// Swap the filter at `index` with its successor. Returns false at the bottom or out of range.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.0.len() {
            return false;
        }
        self.0.swap(index, index + 1);
        true
    }

    pub fn as_slice(&self) -> &[GlobalAttributeFilter] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GlobalAttributeFilter> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<GlobalAttributeFilter> for AttributeFilters {
    fn from_iter<I: IntoIterator<Item = GlobalAttributeFilter>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A social profile link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub provider: String,
    pub handle: String,
    pub url: String,
}

impl SocialLink {
    fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            provider: field_string(obj, "provider"),
            handle: field_string(obj, "handle"),
            url: field_string(obj, "url"),
        })
    }
}

/// User settings as persisted under the settings key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSettings {
    pub primary_color: String,
    pub logo: String,

    #[serde(rename = "productsPerPage")]
    pub products_per_page: u32,

    #[serde(rename = "frontEndUrl")]
    pub front_end_url: String,

    pub build_hook: String,
    pub global_attributes: AttributeFilters,

    #[serde(rename = "wooNuxtSEO")]
    pub social: Vec<SocialLink>,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            logo: String::new(),
            products_per_page: DEFAULT_PRODUCTS_PER_PAGE,
            front_end_url: String::new(),
            build_hook: String::new(),
            global_attributes: AttributeFilters::default(),
            social: Vec::new(),
        }
    }
}

impl PersistedSettings {
    /// Decode a stored blob, defaulting every missing or malformed field.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(obj) = value.and_then(Value::as_object) else {
            return Self::default();
        };

        let primary_color = field_string(obj, "primary_color");
        let products_per_page = obj.get("productsPerPage").and_then(lenient_u32).filter(|n| *n > 0);

        Self {
            primary_color: if primary_color.is_empty() {
                DEFAULT_PRIMARY_COLOR.to_string()
            } else {
                primary_color
            },
            logo: field_string(obj, "logo"),
            products_per_page: products_per_page.unwrap_or(DEFAULT_PRODUCTS_PER_PAGE),
            front_end_url: field_string(obj, "frontEndUrl"),
            build_hook: field_string(obj, "build_hook"),
            global_attributes: list_items(obj.get("global_attributes"))
                .filter_map(GlobalAttributeFilter::from_value)
                .collect(),
            social: list_items(obj.get("wooNuxtSEO")).filter_map(SocialLink::from_value).collect(),
        }
    }

    /// Encode for storage.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Public part of the payment provider settings. Secret keys are never copied here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicPaymentSettings {
    pub enabled: String,
    pub testmode: String,
    pub test_publishable_key: String,
    pub publishable_key: String,
}

impl PublicPaymentSettings {
    /// Read the public fields from the provider settings blob.
    pub fn from_value(value: Option<&Value>) -> Option<Self> {
        let obj = value?.as_object()?;
        Some(Self {
            enabled: field_string(obj, "enabled"),
            testmode: field_string(obj, "testmode"),
            test_publishable_key: field_string(obj, "test_publishable_key"),
            publishable_key: field_string(obj, "publishable_key"),
        })
    }
}

fn field_string(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key).map(lenient_string).unwrap_or_default()
}

fn field_bool(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).is_some_and(lenient_bool)
}

fn lenient_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// `true`, non-zero numbers and `"1"`/`"yes"`/`"on"`/`"true"`.
pub(crate) fn lenient_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "yes" | "on" | "true")
        }
        _ => false,
    }
}

fn lenient_u32(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    u32::try_from(n.unsigned_abs()).ok()
}

/// Items of a list stored as an array or as a keyed object in insertion order.
fn list_items(value: Option<&Value>) -> Box<dyn Iterator<Item = &Value> + '_> {
    match value {
        Some(Value::Array(items)) => Box::new(items.iter()),
        Some(Value::Object(map)) => Box::new(map.values()),
        _ => Box::new(std::iter::empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filters(labels: &[&str]) -> AttributeFilters {
        labels.iter().map(|l| GlobalAttributeFilter::new(*l, format!("pa_{l}"))).collect()
    }

    fn labels(filters: &AttributeFilters) -> Vec<&str> {
        filters.iter().map(|f| f.label.as_str()).collect()
    }

    #[test]
    fn test_defaults_when_absent() {
        let settings = PersistedSettings::from_value(None);
        assert_eq!(settings.primary_color, "#7F54B2");
        assert_eq!(settings.products_per_page, 24);
        assert!(settings.global_attributes.is_empty());
        assert!(settings.social.is_empty());

        assert_eq!(PersistedSettings::from_value(Some(&json!("garbage"))), PersistedSettings::default());
    }

    #[test]
    fn test_attribute_flags_default_false() {
        let stored = json!({
            "global_attributes": [{"label": "Color", "slug": "pa_color", "showCount": true}]
        });

        let settings = PersistedSettings::from_value(Some(&stored));
        let filter = &settings.global_attributes.as_slice()[0];

        assert_eq!(filter.label, "Color");
        assert_eq!(filter.attribute_slug, "pa_color");
        assert!(filter.show_count);
        assert!(!filter.hide_empty);
        assert!(!filter.open_by_default);
    }

    #[test]
    fn test_form_encoded_values() {
        let stored = json!({
            "productsPerPage": "12",
            "primary_color": "",
            "global_attributes": {
                "3": {"label": "Size", "slug": "pa_size", "hideEmpty": "1"},
                "0": {"label": "Color", "slug": "pa_color", "openByDefault": "on"}
            },
            "wooNuxtSEO": {"facebook": {"provider": "facebook", "handle": "shop", "url": "https://facebook.com/shop"}}
        });

        let settings = PersistedSettings::from_value(Some(&stored));

        assert_eq!(settings.products_per_page, 12);
        assert_eq!(settings.primary_color, DEFAULT_PRIMARY_COLOR);
        assert_eq!(labels(&settings.global_attributes), ["Size", "Color"]);
        assert!(settings.global_attributes.as_slice()[0].hide_empty);
        assert!(settings.global_attributes.as_slice()[1].open_by_default);
        assert_eq!(settings.social[0].handle, "shop");
    }

    #[test]
    fn test_wrong_types_fall_back() {
        let stored = json!({"productsPerPage": {"nested": 1}, "logo": 42, "global_attributes": "none"});
        let settings = PersistedSettings::from_value(Some(&stored));

        assert_eq!(settings.products_per_page, DEFAULT_PRODUCTS_PER_PAGE);
        assert_eq!(settings.logo, "42");
        assert!(settings.global_attributes.is_empty());
    }

    #[test]
    fn test_move_up_then_down_restores_order() {
        let mut list = filters(&["color", "size", "brand"]);
        let original = list.clone();

        assert!(list.move_up(2));
        assert_eq!(labels(&list), ["color", "brand", "size"]);
        assert!(list.move_down(1));
        assert_eq!(list, original);
    }

    #[test]
    fn test_reorder_bounds() {
        let mut list = filters(&["color", "size"]);

        assert!(!list.move_up(0));
        assert!(!list.move_down(1));
        assert!(!list.move_up(5));
        assert!(!list.move_down(5));
        assert_eq!(labels(&list), ["color", "size"]);

        assert_eq!(list.remove(0).map(|f| f.label), Some("color".to_string()));
        assert!(list.remove(3).is_none());
    }

    #[test]
    fn test_round_trip_uses_wire_names() {
        let mut settings = PersistedSettings::default();
        settings.global_attributes.add(GlobalAttributeFilter::new("Color", "pa_color"));

        let value = settings.to_value();
        assert_eq!(value["productsPerPage"], 24);
        assert_eq!(value["global_attributes"][0]["slug"], "pa_color");
        assert_eq!(value["global_attributes"][0]["openByDefault"], false);
        assert_eq!(PersistedSettings::from_value(Some(&value)), settings);
    }

    #[test]
    fn test_public_payment_settings_drop_secrets() {
        let stored = json!({"enabled": "yes", "testmode": "yes", "test_secret_key": "sk_test", "publishable_key": "pk"});
        let public = PublicPaymentSettings::from_value(Some(&stored)).unwrap();

        assert_eq!(public.enabled, "yes");
        assert_eq!(public.publishable_key, "pk");
        assert!(!serde_json::to_string(&public).unwrap().contains("sk_test"));
        assert!(PublicPaymentSettings::from_value(None).is_none());
    }
}

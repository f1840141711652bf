//! Product SEO head output.
//!
//! The host's SEO plugin renders a `<head>` fragment per product. Headless
//! frontends receive it with the host's site and media addresses rebased onto
//! their own, and optionally filtered down to an allowlist of tags.

mod heads;
mod sanitize;
mod urls;

pub use heads::{DirectoryHeads, StaticHeads};
pub use sanitize::sanitize_head;
pub use urls::replace_head_urls;

use crate::core::SeoConfig;

/// Source of rendered SEO head markup.
pub trait SeoHeadProvider: Send + Sync {
    /// Head markup for a product. `None` when no SEO plugin is installed or the
    /// product is unknown.
    fn head_html(&self, product_id: u64) -> Option<String>;

    /// Addresses of the host site.
    fn site_urls(&self) -> SiteUrls;
}

/// Host site addresses that appear in rendered heads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteUrls {
    pub home_url: String,
    pub site_url: String,
    pub uploads_base_url: String,
}

impl SiteUrls {
    pub fn from_config(config: &SeoConfig) -> Self {
        let site_url = if config.site_url.trim().is_empty() { &config.home_url } else { &config.site_url };

        Self {
            home_url: config.home_url.trim().to_string(),
            site_url: site_url.trim().to_string(),
            uploads_base_url: config.uploads_url.trim().to_string(),
        }
    }
}

/// Caller arguments of the head field.
#[derive(Debug, Clone, Default)]
pub struct HeadOptions {
    /// Frontend base URL replacing the host's site URLs
    pub frontend_url: Option<String>,

    /// Image base URL replacing the host's uploads base
    pub image_url: Option<String>,

    /// Apply the allowlist filter
    pub sanitize: bool,
}

/// Head markup for `product_id` with the caller's rewrites applied.
///
/// Blank output reads as `None`. Base URLs that are not absolute `http`/`https`
/// are ignored.
pub fn render_head(provider: &dyn SeoHeadProvider, product_id: u64, options: &HeadOptions) -> Option<String> {
    let raw = provider.head_html(product_id)?;
    let mut head = raw.trim().to_string();
    if head.is_empty() {
        return None;
    }

    let frontend_url = accepted_base(options.frontend_url.as_deref());
    let image_url = accepted_base(options.image_url.as_deref());

    if !frontend_url.is_empty() || !image_url.is_empty() {
        head = replace_head_urls(&head, &provider.site_urls(), frontend_url, image_url);
    }
    if options.sanitize {
        head = sanitize_head(&head);
    }

    Some(head)
}

fn accepted_base(raw: Option<&str>) -> &str {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return "";
    };

    match url::Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => raw,
        _ => {
            tracing::warn!(url = raw, "ignoring base URL that is not absolute http(s)");
            ""
        }
    }
}

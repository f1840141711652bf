//! Address rebasing for head markup.

use super::SiteUrls;

/// Stands in for the uploads base while site URLs are rewritten.
const UPLOADS_MARKER: &str = "\u{1}uploads-base\u{1}";

/// Rewrite host addresses in `head`.
///
/// Site URLs (home and site, either scheme) become `frontend_url`. Media under
/// the uploads base is rebased onto `image_url` with the uploads path kept, or
/// left on the host when `image_url` is empty. Empty arguments leave their
/// addresses untouched.
pub fn replace_head_urls(head: &str, site: &SiteUrls, frontend_url: &str, image_url: &str) -> String {
    if head.is_empty() {
        return String::new();
    }

    let mut replaced = head.to_string();

    let uploads_base = untrailed(&site.uploads_base_url);
    let uploads_variants = if uploads_base.is_empty() { Vec::new() } else { scheme_variants(uploads_base) };

    // Uploads usually sit under the site URL; park them before the site pass.
    for variant in &uploads_variants {
        replaced = replaced.replace(variant.as_str(), UPLOADS_MARKER);
    }

    let frontend_url = untrailed(frontend_url);
    if !frontend_url.is_empty() {
        let mut site_urls: Vec<String> = Vec::new();
        for base in [&site.home_url, &site.site_url] {
            let base = untrailed(base);
            if base.is_empty() {
                continue;
            }
            for variant in scheme_variants(base) {
                if !site_urls.contains(&variant) {
                    site_urls.push(variant);
                }
            }
        }

        for site_url in &site_urls {
            replaced = replaced.replace(site_url.as_str(), frontend_url);
        }
    }

    if !uploads_variants.is_empty() {
        let image_url = untrailed(image_url);
        let target = if image_url.is_empty() {
            uploads_base.to_string()
        } else {
            format!("{image_url}{}", uploads_path(uploads_base))
        };
        replaced = replaced.replace(UPLOADS_MARKER, untrailed(&target));
    }

    replaced
}

fn untrailed(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}

/// `url` as given, then with `http` and `https` schemes.
fn scheme_variants(url: &str) -> Vec<String> {
    let mut variants = vec![url.to_string()];

    if let Some((_, rest)) = url.split_once("://") {
        for scheme in ["http", "https"] {
            let variant = format!("{scheme}://{rest}");
            if !variants.contains(&variant) {
                variants.push(variant);
            }
        }
    }

    variants
}

fn uploads_path(uploads_base: &str) -> String {
    url::Url::parse(uploads_base)
        .map(|url| url.path().trim_end_matches('/').to_string())
        .unwrap_or_default()
}

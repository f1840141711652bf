//! Head providers.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{SeoHeadProvider, SiteUrls};

/// Heads held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticHeads {
    site: SiteUrls,
    heads: BTreeMap<u64, String>,
}

impl StaticHeads {
    pub fn new(site: SiteUrls) -> Self {
        Self { site, heads: BTreeMap::new() }
    }

    pub fn with_head(mut self, product_id: u64, html: impl Into<String>) -> Self {
        self.heads.insert(product_id, html.into());
        self
    }
}

impl SeoHeadProvider for StaticHeads {
    fn head_html(&self, product_id: u64) -> Option<String> {
        self.heads.get(&product_id).cloned()
    }

    fn site_urls(&self) -> SiteUrls {
        self.site.clone()
    }
}

/// Heads exported by the host as `<dir>/<product id>.html`.
#[derive(Debug, Clone)]
pub struct DirectoryHeads {
    dir: PathBuf,
    site: SiteUrls,
}

impl DirectoryHeads {
    pub fn new(dir: impl Into<PathBuf>, site: SiteUrls) -> Self {
        Self { dir: dir.into(), site }
    }
}

impl SeoHeadProvider for DirectoryHeads {
    fn head_html(&self, product_id: u64) -> Option<String> {
        let path = self.dir.join(format!("{product_id}.html"));

        match std::fs::read_to_string(&path) {
            Ok(html) => Some(html),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(product_id, "no exported SEO head");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read SEO head");
                None
            }
        }
    }

    fn site_urls(&self) -> SiteUrls {
        self.site.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_directory_heads() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("42.html"), "<title>Hoodie</title>").unwrap();

        let heads = DirectoryHeads::new(dir.path(), SiteUrls::default());
        assert_eq!(heads.head_html(42).as_deref(), Some("<title>Hoodie</title>"));
        assert!(heads.head_html(43).is_none());
    }

    #[test]
    fn test_missing_directory_reads_none() {
        let dir = TempDir::new().unwrap();
        let heads = DirectoryHeads::new(dir.path().join("absent"), SiteUrls::default());
        assert!(heads.head_html(1).is_none());
    }
}

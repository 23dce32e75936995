use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("Failed to fetch sitemap: {url} ({detail})")]
    Fetch { url: String, detail: String },
    #[error("Failed to parse sitemap XML: {0}")]
    Parse(String),
}

/// Seam around sitemap retrieval so the diff logic is testable without a
/// network. Fetches are blocking; callers run them under `spawn_blocking`.
pub trait SitemapFetcher: Send + Sync + 'static {
    fn fetch_text(&self, url: &str) -> Result<String, SitemapError>;
}

pub type SharedSitemapFetcher = Arc<dyn SitemapFetcher>;

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSitemapFetcher;

impl HttpSitemapFetcher {
    pub fn new() -> Self {
        Self
    }
}

impl SitemapFetcher for HttpSitemapFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, SitemapError> {
        let fetch_error = |detail: String| SitemapError::Fetch {
            url: url.to_string(),
            detail,
        };
        let response = reqwest::blocking::get(url).map_err(|err| fetch_error(err.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_error(format!("status {}", response.status())));
        }
        response.text().map_err(|err| fetch_error(err.to_string()))
    }
}

/// Collects `<loc>` values from either sitemap flavor: a flat `<urlset>` of
/// `<url>` entries or a `<sitemapindex>` of `<sitemap>` entries. Any other
/// root element yields an empty list.
pub fn parse_sitemap_urls(xml: &str) -> Result<Vec<String>, SitemapError> {
    let document =
        roxmltree::Document::parse(xml).map_err(|err| SitemapError::Parse(err.to_string()))?;
    let root = document.root_element();
    let entry_name = match root.tag_name().name() {
        "urlset" => "url",
        "sitemapindex" => "sitemap",
        _ => return Ok(Vec::new()),
    };

    let mut urls = Vec::new();
    for entry in root
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == entry_name)
    {
        let loc = entry
            .children()
            .find(|node| node.is_element() && node.tag_name().name() == "loc")
            .and_then(|node| node.text())
            .map(str::trim)
            .unwrap_or_default();
        if !loc.is_empty() {
            urls.push(loc.to_string());
        }
    }
    Ok(urls)
}

/// Reduces a URL to its path with repeated slashes collapsed and the trailing
/// slash stripped; an empty path reads as "/". Non-URL input falls back to
/// the raw string.
pub fn normalize_path(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    let mut collapsed = String::new();
    let mut previous_was_slash = false;
    for ch in parsed.path().chars() {
        if ch == '/' {
            if previous_was_slash {
                continue;
            }
            previous_was_slash = true;
        } else {
            previous_was_slash = false;
        }
        collapsed.push(ch);
    }
    let trimmed = collapsed.strip_suffix('/').unwrap_or(collapsed.as_str());
    if trimmed.is_empty() {
        String::from("/")
    } else {
        trimmed.to_string()
    }
}

/// Origin of the first parseable URL in the list, if any.
pub fn infer_origin(urls: &[String]) -> Option<String> {
    urls.iter().find_map(|raw| {
        Url::parse(raw)
            .ok()
            .map(|url| url.origin().ascii_serialization())
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingUrls {
    pub in_test: Vec<String>,
    pub in_ref: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitemapDiffReport {
    pub test_domain: Option<String>,
    pub ref_domain: Option<String>,
    pub matching_urls: Vec<String>,
    pub missing_urls: MissingUrls,
    pub all_ref_urls: Vec<String>,
    pub all_test_urls: Vec<String>,
}

fn unique_paths(urls: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.iter()
        .map(|url| normalize_path(url.as_str()))
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Set-diffs the two sitemaps by normalized path, preserving first-seen
/// order, and keeps the raw URL lists alongside.
pub fn build_diff_report(ref_urls: Vec<String>, test_urls: Vec<String>) -> SitemapDiffReport {
    let ref_paths = unique_paths(ref_urls.as_slice());
    let test_paths = unique_paths(test_urls.as_slice());
    let ref_set: HashSet<&str> = ref_paths.iter().map(String::as_str).collect();
    let test_set: HashSet<&str> = test_paths.iter().map(String::as_str).collect();

    SitemapDiffReport {
        test_domain: infer_origin(test_urls.as_slice()),
        ref_domain: infer_origin(ref_urls.as_slice()),
        matching_urls: test_paths
            .iter()
            .filter(|path| ref_set.contains(path.as_str()))
            .cloned()
            .collect(),
        missing_urls: MissingUrls {
            in_test: ref_paths
                .iter()
                .filter(|path| !test_set.contains(path.as_str()))
                .cloned()
                .collect(),
            in_ref: test_paths
                .iter()
                .filter(|path| !ref_set.contains(path.as_str()))
                .cloned()
                .collect(),
        },
        all_ref_urls: ref_urls,
        all_test_urls: test_urls,
    }
}

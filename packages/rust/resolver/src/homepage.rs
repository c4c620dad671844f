//! Homepage candidate selection.
//!
//! Search results are full of search-engine redirects, social profiles and
//! business directories. We pick the first candidate that looks like the
//! company's own site and normalize it to `scheme://host[:port]`.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Base used to resolve protocol-relative and relative result links.
const RESULT_LINK_BASE: &str = "https://duckduckgo.com/";

/// Search engines, matched against any host label (covers country TLDs).
const SEARCH_ENGINE_LABELS: &[&str] = &[
    "google", "bing", "duckduckgo", "yahoo", "yandex", "baidu", "ask", "ecosia", "startpage",
];

/// Social networks, encyclopedias, directories and aggregators, matched by domain suffix.
const AGGREGATOR_DOMAINS: &[&str] = &[
    "wikipedia.org",
    "wikidata.org",
    "wikimedia.org",
    "linkedin.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "youtube.com",
    "tiktok.com",
    "pinterest.com",
    "reddit.com",
    "medium.com",
    "crunchbase.com",
    "bloomberg.com",
    "glassdoor.com",
    "indeed.com",
    "yelp.com",
    "zoominfo.com",
    "pitchbook.com",
    "owler.com",
    "dnb.com",
    "craft.co",
    "cbinsights.com",
    "trustpilot.com",
    "g2.com",
    "capterra.com",
    "forbes.com",
    "reuters.com",
];

/// Pick the first plausible homepage from raw search result links.
///
/// Blocked domains are still accepted when the company name itself matches the
/// domain label (so "Google" can resolve to google.com).
pub fn select_homepage(candidates: &[String], company_name: &str) -> Option<String> {
    let slug = company_slug(company_name);
    candidates
        .iter()
        .filter_map(|raw| unwrap_result_link(raw))
        .find(|url| is_plausible_homepage(url, &slug))
        .map(|url| origin(&url))
}

/// Company name reduced to a domain-like slug: `"Acme, Inc."` → `"acmeinc"`.
pub fn company_slug(name: &str) -> String {
    static NON_WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

    NON_WORD_RE
        .replace_all(name, "")
        .to_lowercase()
        .split_whitespace()
        .collect::<String>()
}

/// Parse a result link, unwrapping search-engine redirect wrappers.
fn unwrap_result_link(raw: &str) -> Option<Url> {
    let base = Url::parse(RESULT_LINK_BASE).ok()?;
    let url = base.join(raw.trim()).ok()?;

    let host = url.host_str().unwrap_or_default();
    let is_engine = host_labels(host).any(|l| SEARCH_ENGINE_LABELS.contains(&l));

    if is_engine {
        // DuckDuckGo: /l/?uddg=<target>, Google: /url?q=<target>
        let target_key = match url.path() {
            "/l/" | "/l" => Some("uddg"),
            "/url" => Some("q"),
            _ => None,
        };
        if let Some(key) = target_key {
            if let Some((_, target)) = url.query_pairs().find(|(k, _)| k == key) {
                return Url::parse(&target).ok();
            }
        }
    }

    Some(url)
}

fn is_plausible_homepage(url: &Url, slug: &str) -> bool {
    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    if !host.contains('.') {
        return false;
    }

    let matches_company = !slug.is_empty() && host_labels(host).any(|l| l == slug);

    let is_engine = host_labels(host).any(|l| SEARCH_ENGINE_LABELS.contains(&l));
    let is_aggregator = AGGREGATOR_DOMAINS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")));

    matches_company || !(is_engine || is_aggregator)
}

fn host_labels(host: &str) -> impl Iterator<Item = &str> {
    host.split('.').filter(|l| !l.is_empty())
}

/// Normalize to `scheme://host[:port]`.
fn origin(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    }
}

//! Content fetching: homepage URL → bounded, sanitized visible text.
//!
//! [`Fetcher::fetch`] never fails. Every failure mode becomes a
//! [`FetchStatus`] on the returned [`ScrapedContent`], and the analyzer then
//! receives no content for that record.
//!
//! The timeout passed to `fetch` bounds the whole call: the robots.txt
//! lookup, every retry, and the backoff sleeps between them.

mod robots;
mod text;

use std::net::IpAddr;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, instrument, warn};
use url::Url;

use leadenrich_shared::{
    FetchError, FetchStatus, LeadEnrichError, Result, RetryPolicy, ScrapedContent,
};

pub use robots::RobotsRules;
pub use text::{extract_visible_text, truncate_chars};

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!(
    "LeadEnrich/",
    env!("CARGO_PKG_VERSION"),
    " (+company enrichment bot)"
);

/// Agent token matched against robots.txt `User-agent` lines.
const ROBOTS_AGENT: &str = "leadenrich";

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Bodies larger than this are not worth parsing for a short summary (5 MB).
const MAX_RESPONSE_SIZE: u64 = 5 * 1024 * 1024;

/// Failure of one HTTP attempt, split by whether retrying can help.
#[derive(Debug)]
enum AttemptError {
    Transient(FetchError),
    Permanent(FetchError),
}

impl AttemptError {
    fn into_inner(self) -> FetchError {
        match self {
            Self::Transient(e) | Self::Permanent(e) => e,
        }
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient(e) | Self::Permanent(e) => std::fmt::Display::fmt(e, f),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Polite single-page fetcher.
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
    content_budget: usize,
    respect_robots_txt: bool,
    /// Allow loopback/private targets (mock servers in tests).
    allow_private_hosts: bool,
}

impl Fetcher {
    /// Create a fetcher that keeps at most `content_budget` characters per page.
    pub fn new(retry: RetryPolicy, content_budget: usize, respect_robots_txt: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect_policy())
            .build()
            .map_err(|e| LeadEnrichError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry,
            content_budget,
            respect_robots_txt,
            allow_private_hosts: false,
        })
    }

    /// Allow fetching loopback and private-network addresses.
    pub fn allow_private_hosts(mut self) -> Self {
        self.allow_private_hosts = true;
        self
    }

    /// Fetch `url` and return its visible text, or a failure status.
    #[instrument(skip_all, fields(url = %url, timeout_ms = timeout.as_millis() as u64))]
    pub async fn fetch(&self, url: &str, timeout: Duration) -> ScrapedContent {
        let outcome = match tokio::time::timeout(timeout, self.fetch_text(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        match outcome {
            Ok(text) => {
                info!(chars = text.chars().count(), "page fetched");
                ScrapedContent::ok(url, text)
            }
            Err(e) => {
                let status = match &e {
                    FetchError::Timeout => FetchStatus::Timeout,
                    FetchError::Blocked(_) => FetchStatus::Blocked,
                    FetchError::HttpError(_) => FetchStatus::Error,
                    FetchError::Empty => FetchStatus::Empty,
                };
                warn!(error = %e, ?status, "page fetch failed");
                ScrapedContent::failed(url, status)
            }
        }
    }

    async fn fetch_text(&self, raw_url: &str) -> std::result::Result<String, FetchError> {
        let url = Url::parse(raw_url)
            .map_err(|e| FetchError::HttpError(format!("invalid URL {raw_url}: {e}")))?;

        if !self.allow_private_hosts && is_ssrf_target(&url) {
            return Err(FetchError::Blocked(format!("refusing non-public target {url}")));
        }

        if self.respect_robots_txt && !self.robots_allows(&url).await {
            return Err(FetchError::Blocked("disallowed by robots.txt".into()));
        }

        let body = self
            .retry
            .run(
                "page fetch",
                |e| matches!(e, AttemptError::Transient(_)),
                || self.get_body(&url),
            )
            .await
            .map_err(AttemptError::into_inner)?;

        let text = extract_visible_text(&body, self.content_budget);
        if text.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(text)
    }

    async fn get_body(&self, url: &Url) -> std::result::Result<String, AttemptError> {
        debug!(%url, "requesting page");

        let response = self.client.get(url.as_str()).send().await.map_err(|e| {
            if e.is_redirect() {
                AttemptError::Permanent(FetchError::Blocked(format!("{url}: {e}")))
            } else {
                AttemptError::Transient(FetchError::HttpError(format!("{url}: {e}")))
            }
        })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError::Permanent(FetchError::Blocked(format!("HTTP {status}"))));
        }
        if status.is_server_error() {
            return Err(AttemptError::Transient(FetchError::HttpError(format!("HTTP {status}"))));
        }
        if !status.is_success() {
            return Err(AttemptError::Permanent(FetchError::HttpError(format!("HTTP {status}"))));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_SIZE {
                return Err(AttemptError::Permanent(FetchError::HttpError(format!(
                    "response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
                ))));
            }
        }

        read_capped(response, MAX_RESPONSE_SIZE).await
    }

    /// Check robots.txt at the URL's origin. Unreachable or missing → allowed.
    async fn robots_allows(&self, url: &Url) -> bool {
        let mut robots_url = url.clone();
        robots_url.set_path("/robots.txt");
        robots_url.set_query(None);
        robots_url.set_fragment(None);

        let rules = match self.client.get(robots_url.as_str()).send().await {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(body) => RobotsRules::parse(&body, ROBOTS_AGENT),
                Err(_) => RobotsRules::allow_all(),
            },
            Ok(resp) => {
                debug!(status = %resp.status(), "no robots.txt");
                RobotsRules::allow_all()
            }
            Err(e) => {
                debug!(error = %e, "robots.txt unreachable");
                RobotsRules::allow_all()
            }
        };

        let path = match url.query() {
            Some(q) => format!("{}?{q}", url.path()),
            None => url.path().to_string(),
        };
        rules.is_allowed(&path)
    }
}

/// Read a body as text, giving up once it passes `limit` bytes.
///
/// `Content-Length` is checked up front by the caller; this covers chunked
/// and mislabelled bodies.
async fn read_capped(
    mut response: reqwest::Response,
    limit: u64,
) -> std::result::Result<String, AttemptError> {
    let url = response.url().clone();
    let mut body: Vec<u8> = Vec::new();

    while let Some(chunk) = response.chunk().await.map_err(|e| {
        AttemptError::Transient(FetchError::HttpError(format!("{url}: body read failed: {e}")))
    })? {
        body.extend_from_slice(&chunk);
        if body.len() as u64 > limit {
            return Err(AttemptError::Permanent(FetchError::HttpError(format!(
                "response too large (over {limit} bytes)"
            ))));
        }
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Follow at most [`MAX_REDIRECTS`] hops, and never from a public page into
/// private address space.
fn redirect_policy() -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(|attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.stop();
        }
        let allowed = attempt
            .previous()
            .last()
            .is_none_or(|from| redirect_allowed(from, attempt.url()));
        if allowed {
            attempt.follow()
        } else {
            let target = attempt.url().to_string();
            attempt.error(format!("redirect to non-public target {target}"))
        }
    })
}

/// A hop may land on a private target only when it already starts from one,
/// which happens only for fetchers built with `allow_private_hosts`.
fn redirect_allowed(from: &Url, to: &Url) -> bool {
    !is_ssrf_target(to) || is_ssrf_target(from)
}

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = "<html><head><script>var tracking = 1;</script></head>\
        <body><nav>Home | About</nav><h1>Acme Payments</h1>\
        <p>Card processing for online stores.</p><footer>(c) Acme</footer></body></html>";

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            multiplier: 2.0,
            max_delay: Duration::from_millis(5),
        }
    }

    fn fetcher(budget: usize, robots: bool) -> Fetcher {
        Fetcher::new(fast_retry(), budget, robots)
            .unwrap()
            .allow_private_hosts()
    }

    async fn serve(server: &MockServer, route: &str, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fetches_visible_text() {
        let server = MockServer::start().await;
        serve(&server, "/", ResponseTemplate::new(200).set_body_string(PAGE)).await;

        let content = fetcher(2_000, false)
            .fetch(&server.uri(), Duration::from_secs(5))
            .await;

        assert_eq!(content.status, FetchStatus::Ok);
        assert_eq!(content.text, "Acme Payments Card processing for online stores.");
        assert_eq!(content.url, server.uri());
    }

    #[tokio::test]
    async fn long_page_is_cut_to_budget() {
        let server = MockServer::start().await;
        let body = format!("<html><body><p>{}</p></body></html>", "lorem ipsum ".repeat(1_000));
        serve(&server, "/", ResponseTemplate::new(200).set_body_string(body)).await;

        let content = fetcher(2_000, false)
            .fetch(&server.uri(), Duration::from_secs(5))
            .await;

        assert_eq!(content.status, FetchStatus::Ok);
        assert_eq!(content.text.chars().count(), 2_000);
    }

    #[tokio::test]
    async fn forbidden_and_rate_limited_are_blocked() {
        let server = MockServer::start().await;
        serve(&server, "/forbidden", ResponseTemplate::new(403)).await;
        serve(&server, "/slow-down", ResponseTemplate::new(429)).await;

        let f = fetcher(2_000, false);
        for route in ["/forbidden", "/slow-down"] {
            let content = f
                .fetch(&format!("{}{route}", server.uri()), Duration::from_secs(5))
                .await;
            assert_eq!(content.status, FetchStatus::Blocked, "{route}");
            assert!(content.usable_text().is_none());
        }
    }

    #[tokio::test]
    async fn not_found_is_error_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let content = fetcher(2_000, false)
            .fetch(&server.uri(), Duration::from_secs(5))
            .await;
        assert_eq!(content.status, FetchStatus::Error);
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        let content = fetcher(2_000, false)
            .fetch(&server.uri(), Duration::from_secs(5))
            .await;
        assert_eq!(content.status, FetchStatus::Error);
    }

    #[tokio::test]
    async fn slow_page_times_out() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/",
            ResponseTemplate::new(200)
                .set_body_string(PAGE)
                .set_delay(Duration::from_secs(3)),
        )
        .await;

        let content = fetcher(2_000, false)
            .fetch(&server.uri(), Duration::from_millis(200))
            .await;
        assert_eq!(content.status, FetchStatus::Timeout);
        assert!(content.text.is_empty());
    }

    #[tokio::test]
    async fn page_without_text_is_empty() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/",
            ResponseTemplate::new(200).set_body_string("<html><body><script>x()</script></body></html>"),
        )
        .await;

        let content = fetcher(2_000, false)
            .fetch(&server.uri(), Duration::from_secs(5))
            .await;
        assert_eq!(content.status, FetchStatus::Empty);
    }

    #[tokio::test]
    async fn robots_disallow_blocks_without_fetching_page() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/robots.txt",
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /\n"),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(0)
            .mount(&server)
            .await;

        let content = fetcher(2_000, true)
            .fetch(&server.uri(), Duration::from_secs(5))
            .await;
        assert_eq!(content.status, FetchStatus::Blocked);
    }

    #[tokio::test]
    async fn missing_robots_allows_fetch() {
        let server = MockServer::start().await;
        serve(&server, "/", ResponseTemplate::new(200).set_body_string(PAGE)).await;

        let content = fetcher(2_000, true)
            .fetch(&server.uri(), Duration::from_secs(5))
            .await;
        assert_eq!(content.status, FetchStatus::Ok);
    }

    #[tokio::test]
    async fn private_hosts_blocked_by_default() {
        let f = Fetcher::new(fast_retry(), 2_000, false).unwrap();
        let content = f.fetch("http://127.0.0.1:9/", Duration::from_secs(1)).await;
        assert_eq!(content.status, FetchStatus::Blocked);
    }

    #[tokio::test]
    async fn invalid_url_is_error() {
        let content = fetcher(2_000, false)
            .fetch("not a url", Duration::from_secs(1))
            .await;
        assert_eq!(content.status, FetchStatus::Error);
    }

    #[test]
    fn redirect_into_private_space_is_refused() {
        let public = Url::parse("https://acme.com/").unwrap();
        let private = Url::parse("http://169.254.169.254/latest/meta-data").unwrap();
        let loopback = Url::parse("http://127.0.0.1:8080/admin").unwrap();

        assert!(!redirect_allowed(&public, &private));
        assert!(!redirect_allowed(&public, &loopback));
        assert!(redirect_allowed(&public, &Url::parse("https://www.acme.com/").unwrap()));
        assert!(redirect_allowed(&loopback, &loopback));
    }

    #[tokio::test]
    async fn redirect_within_allowed_host_is_followed() {
        let server = MockServer::start().await;
        serve(
            &server,
            "/",
            ResponseTemplate::new(301).insert_header("location", format!("{}/home", server.uri())),
        )
        .await;
        serve(&server, "/home", ResponseTemplate::new(200).set_body_string(PAGE)).await;

        let content = fetcher(2_000, false)
            .fetch(&server.uri(), Duration::from_secs(5))
            .await;
        assert_eq!(content.status, FetchStatus::Ok);
    }

    #[tokio::test]
    async fn body_past_the_cap_is_rejected() {
        let server = MockServer::start().await;
        serve(&server, "/", ResponseTemplate::new(200).set_body_string("x".repeat(4_096))).await;

        let response = reqwest::get(server.uri()).await.unwrap();
        let err = read_capped(response, 1_024).await.unwrap_err();
        assert!(matches!(
            err,
            AttemptError::Permanent(FetchError::HttpError(ref m)) if m.contains("too large")
        ));

        let response = reqwest::get(server.uri()).await.unwrap();
        assert_eq!(read_capped(response, 8_192).await.unwrap().len(), 4_096);
    }

    #[test]
    fn ssrf_checks() {
        assert!(is_ssrf_target(&Url::parse("file:///etc/passwd").unwrap()));
        assert!(is_ssrf_target(&Url::parse("http://10.0.0.1/").unwrap()));
        assert!(is_ssrf_target(&Url::parse("http://localhost:8080/").unwrap()));
        assert!(is_ssrf_target(&Url::parse("http://[::1]/").unwrap()));
        assert!(!is_ssrf_target(&Url::parse("https://acme.com/").unwrap()));
    }
}

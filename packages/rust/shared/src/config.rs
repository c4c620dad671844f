//! Application configuration for LeadEnrich.
//!
//! User config lives at `~/.leadenrich/leadenrich.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LeadEnrichError, Result};
use crate::retry::RetryPolicy;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadenrich.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadenrich";

// ---------------------------------------------------------------------------
// Backend / provider selectors
// ---------------------------------------------------------------------------

/// Which generative-text capability the analyzer talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerBackend {
    /// Fallback heuristic only.
    None,
    OpenAi,
    OpenRouter,
    Gemini,
}

impl AnalyzerBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::OpenAi => "openai",
            Self::OpenRouter => "openrouter",
            Self::Gemini => "gemini",
        }
    }

    /// Model used when the config does not name one.
    pub fn default_model(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::OpenAi => "gpt-4o-mini",
            Self::OpenRouter => "openai/gpt-4o-mini",
            Self::Gemini => "gemini-1.5-flash",
        }
    }

    /// Env var holding the API key when the config does not name one.
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
        }
    }

    /// API root when the config does not override it.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
        }
    }
}

impl FromStr for AnalyzerBackend {
    type Err = LeadEnrichError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "fallback" => Ok(Self::None),
            "openai" => Ok(Self::OpenAi),
            "openrouter" => Ok(Self::OpenRouter),
            "gemini" => Ok(Self::Gemini),
            other => Err(LeadEnrichError::config(format!(
                "unknown analyzer backend '{other}': expected none, openai, openrouter, or gemini"
            ))),
        }
    }
}

/// Which lookup capability the resolver queries first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    DuckDuckGo,
    /// Skip the search engine; rely on the domain-guess fallback alone.
    None,
}

impl FromStr for SearchProviderKind {
    type Err = LeadEnrichError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "duckduckgo" | "ddg" => Ok(Self::DuckDuckGo),
            "none" => Ok(Self::None),
            other => Err(LeadEnrichError::config(format!(
                "unknown search provider '{other}': expected duckduckgo or none"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Config structs (matching leadenrich.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Processing defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Website lookup settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Generative-text settings.
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Backoff for transient network errors.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Pause after this many records (0 = never pause).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Length of the pause between batches.
    #[serde(default)]
    pub batch_pause_ms: u64,

    /// Politeness delay between consecutive records.
    #[serde(default = "default_inter_record_delay")]
    pub inter_record_delay_ms: u64,

    /// Strict bound on a single page fetch.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Maximum characters of page text kept per company.
    #[serde(default = "default_content_budget")]
    pub content_budget_chars: usize,

    /// Whether to honour robots.txt before fetching a homepage.
    #[serde(default = "default_true")]
    pub respect_robots_txt: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_pause_ms: 0,
            inter_record_delay_ms: default_inter_record_delay(),
            fetch_timeout_secs: default_fetch_timeout(),
            content_budget_chars: default_content_budget(),
            respect_robots_txt: true,
        }
    }
}

fn default_batch_size() -> usize {
    10
}
fn default_inter_record_delay() -> u64 {
    1000
}
fn default_fetch_timeout() -> u64 {
    10
}
fn default_content_budget() -> usize {
    2000
}
fn default_true() -> bool {
    true
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Primary lookup provider.
    #[serde(default = "default_search_provider")]
    pub provider: SearchProviderKind,

    /// Probe `{name}.com`-style domains when the search finds nothing.
    #[serde(default = "default_true")]
    pub domain_guess_fallback: bool,

    /// Timeout for a single search request.
    #[serde(default = "default_search_timeout")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            domain_guess_fallback: true,
            timeout_secs: default_search_timeout(),
        }
    }
}

fn default_search_provider() -> SearchProviderKind {
    SearchProviderKind::DuckDuckGo
}
fn default_search_timeout() -> u64 {
    10
}

/// `[analyzer]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Generative-text backend, or `none` for fallback-only mode.
    #[serde(default = "default_backend")]
    pub backend: AnalyzerBackend,

    /// Model ID; defaults per backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// API root override (proxies, self-hosted gateways).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Bound on a single completion call.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Characters of page text embedded in the prompt.
    #[serde(default = "default_prompt_content_chars")]
    pub prompt_content_chars: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            model: None,
            api_key_env: None,
            base_url: None,
            timeout_secs: default_llm_timeout(),
            prompt_content_chars: default_prompt_content_chars(),
        }
    }
}

impl AnalyzerConfig {
    pub fn resolved_model(&self) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| self.backend.default_model().to_string())
    }

    pub fn resolved_api_key_env(&self) -> String {
        self.api_key_env
            .clone()
            .unwrap_or_else(|| self.backend.default_api_key_env().to_string())
    }

    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.backend.default_base_url().to_string())
    }
}

fn default_backend() -> AnalyzerBackend {
    AnalyzerBackend::OpenRouter
}
fn default_llm_timeout() -> u64 {
    20
}
fn default_prompt_content_chars() -> usize {
    1500
}

/// `[retry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_delay() -> u64 {
    500
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_max_delay() -> u64 {
    5000
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            multiplier: config.multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

// ---------------------------------------------------------------------------
// Enrich config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// An API key read once at startup. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(****)")
    }
}

/// Runtime enrichment configuration: built once per run, immutable thereafter.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Pause after this many records (0 = never).
    pub batch_size: usize,
    pub batch_pause: Duration,
    /// Minimum wait between consecutive records.
    pub inter_record_delay: Duration,
    /// Strict bound on each homepage fetch.
    pub fetch_timeout: Duration,
    /// Character budget for scraped text.
    pub content_budget: usize,
    pub respect_robots_txt: bool,
    /// Backoff for transient network errors inside a stage.
    pub retry: RetryPolicy,
    pub search_provider: SearchProviderKind,
    pub domain_guess_fallback: bool,
    pub search_timeout: Duration,
    pub analyzer_backend: AnalyzerBackend,
    pub model: String,
    pub base_url: String,
    /// Bound on each completion call; expiry means fallback.
    pub llm_timeout: Duration,
    pub prompt_content_chars: usize,
    /// Credential for the analyzer backend, if it needs one.
    pub api_key: Option<ApiKey>,
    /// Only process the first N records.
    pub max_records: Option<usize>,
}

impl From<&AppConfig> for EnrichConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            batch_size: config.defaults.batch_size,
            batch_pause: Duration::from_millis(config.defaults.batch_pause_ms),
            inter_record_delay: Duration::from_millis(config.defaults.inter_record_delay_ms),
            fetch_timeout: Duration::from_secs(config.defaults.fetch_timeout_secs),
            content_budget: config.defaults.content_budget_chars,
            respect_robots_txt: config.defaults.respect_robots_txt,
            retry: RetryPolicy::from(&config.retry),
            search_provider: config.search.provider,
            domain_guess_fallback: config.search.domain_guess_fallback,
            search_timeout: Duration::from_secs(config.search.timeout_secs),
            analyzer_backend: config.analyzer.backend,
            model: config.analyzer.resolved_model(),
            base_url: config.analyzer.resolved_base_url(),
            llm_timeout: Duration::from_secs(config.analyzer.timeout_secs),
            prompt_content_chars: config.analyzer.prompt_content_chars,
            api_key: None,
            max_records: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadenrich/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadEnrichError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadenrich/leadenrich.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadEnrichError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        LeadEnrichError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadEnrichError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadEnrichError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadEnrichError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key for the configured backend from its env var.
///
/// Returns `Ok(None)` when the backend needs no key, and a config error when
/// the backend needs one and the variable is unset or empty.
pub fn resolve_api_key(config: &AnalyzerConfig) -> Result<Option<ApiKey>> {
    if config.backend == AnalyzerBackend::None {
        return Ok(None);
    }
    let var_name = config.resolved_api_key_env();
    match std::env::var(&var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(Some(ApiKey::new(val.trim()))),
        _ => Err(LeadEnrichError::config(format!(
            "{} API key not found. Set the {var_name} environment variable, \
             or run with `--backend none` for heuristic-only analysis.",
            config.backend.as_str()
        ))),
    }
}

//! Shared types, error model, and configuration for LeadEnrich.
//!
//! This crate is the foundation depended on by all other LeadEnrich crates.
//! It provides:
//! - [`LeadEnrichError`]: the run-level error type, plus per-stage error enums
//! - Domain types ([`CompanyRecord`], [`ResolvedSite`], [`ScrapedContent`], [`EnrichmentResult`])
//! - Configuration ([`AppConfig`], [`EnrichConfig`], config loading)
//! - [`RetryPolicy`]: bounded backoff for transient network errors

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnalyzerBackend, AnalyzerConfig, ApiKey, AppConfig, DefaultsConfig, EnrichConfig,
    RetryConfig, SearchConfig, SearchProviderKind, config_dir, config_file_path, init_config,
    load_config, load_config_from, resolve_api_key,
};
pub use error::{AnalysisError, FetchError, LeadEnrichError, ResolutionError, Result};
pub use retry::RetryPolicy;
pub use types::{
    Analysis, AnalysisFields, AnalysisSource, CompanyRecord, EnrichmentResult, FetchStatus,
    ResolutionStatus, ResolvedSite, RunId, RunStats, ScrapedContent, UNKNOWN,
};

//! Error types for LeadEnrich.
//!
//! Library crates use [`LeadEnrichError`] via `thiserror` for faults that reach
//! the caller (configuration and input problems). Stage-level failures have
//! their own small enums ([`ResolutionError`], [`FetchError`], [`AnalysisError`])
//! which each stage converts into a degraded value before returning.
//! The CLI wraps everything with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for faults that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum LeadEnrichError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP client setup error.
    #[error("network error: {0}")]
    Network(String),

    /// Parse error (config, JSON, or HTML).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Input/output table error (missing column, malformed CSV).
    #[error("table error: {0}")]
    Table(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (blank company name, empty input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadEnrichError>;

impl LeadEnrichError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Stage errors
// ---------------------------------------------------------------------------

/// Website resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// The lookup succeeded but produced no plausible homepage.
    #[error("no homepage candidate found")]
    NotFound,

    /// The lookup capability itself failed.
    #[error("lookup failed: {0}")]
    LookupFailure(String),
}

/// Content fetch failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("fetch timed out")]
    Timeout,

    /// HTTP 403/429 or robots.txt disallow.
    #[error("blocked: {0}")]
    Blocked(String),

    /// Non-success status or connection failure.
    #[error("http error: {0}")]
    HttpError(String),

    #[error("page had no visible text")]
    Empty,
}

/// Structured analysis failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// No provider configured, missing/invalid key, network error, or timeout.
    #[error("generative capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// The response could not be turned into the required fields.
    #[error("could not parse analysis: {0}")]
    ParseFailure(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = LeadEnrichError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = LeadEnrichError::validation("company name is blank");
        assert!(err.to_string().contains("blank"));
    }

    #[test]
    fn stage_error_display() {
        assert_eq!(
            ResolutionError::LookupFailure("dns".into()).to_string(),
            "lookup failed: dns"
        );
        assert_eq!(FetchError::Blocked("HTTP 429".into()).to_string(), "blocked: HTTP 429");
        assert!(
            AnalysisError::ParseFailure("missing key industry".into())
                .to_string()
                .contains("industry")
        );
    }
}

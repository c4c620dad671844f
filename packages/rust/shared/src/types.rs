//! Core domain types for the enrichment pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LeadEnrichError, Result};

/// Industry label used when nothing better is known.
pub const UNKNOWN: &str = "Unknown";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one enrichment run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CompanyRecord
// ---------------------------------------------------------------------------

/// One input row: a company name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompanyRecord {
    name: String,
}

impl CompanyRecord {
    /// Build a record, trimming the name. Blank names are rejected.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(LeadEnrichError::validation("company name is blank"));
        }
        Ok(Self {
            name: trimmed.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TryFrom<String> for CompanyRecord {
    type Error = LeadEnrichError;

    fn try_from(name: String) -> Result<Self> {
        Self::new(name)
    }
}

impl From<CompanyRecord> for String {
    fn from(record: CompanyRecord) -> Self {
        record.name
    }
}

// ---------------------------------------------------------------------------
// ResolvedSite
// ---------------------------------------------------------------------------

/// Outcome of website resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Found,
    NotFound,
    Error,
}

/// A company paired with its best-guess homepage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSite {
    pub company: CompanyRecord,
    /// Present only when `resolution_status` is [`ResolutionStatus::Found`].
    pub url: Option<String>,
    pub resolution_status: ResolutionStatus,
}

impl ResolvedSite {
    pub fn found(company: CompanyRecord, url: impl Into<String>) -> Self {
        Self {
            company,
            url: Some(url.into()),
            resolution_status: ResolutionStatus::Found,
        }
    }

    pub fn not_found(company: CompanyRecord) -> Self {
        Self {
            company,
            url: None,
            resolution_status: ResolutionStatus::NotFound,
        }
    }

    pub fn error(company: CompanyRecord) -> Self {
        Self {
            company,
            url: None,
            resolution_status: ResolutionStatus::Error,
        }
    }
}

// ---------------------------------------------------------------------------
// ScrapedContent
// ---------------------------------------------------------------------------

/// Outcome of a page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Ok,
    Timeout,
    Blocked,
    Empty,
    Error,
}

/// Visible text scraped from a homepage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedContent {
    pub url: String,
    /// Sanitized text, bounded by the content budget. Empty unless `status` is `Ok`.
    pub text: String,
    pub status: FetchStatus,
}

impl ScrapedContent {
    pub fn ok(url: impl Into<String>, text: String) -> Self {
        Self {
            url: url.into(),
            text,
            status: FetchStatus::Ok,
        }
    }

    /// A failed fetch carries no text.
    pub fn failed(url: impl Into<String>, status: FetchStatus) -> Self {
        Self {
            url: url.into(),
            text: String::new(),
            status,
        }
    }

    /// Text to hand to the analyzer, or `None` for any failure status.
    pub fn usable_text(&self) -> Option<&str> {
        match self.status {
            FetchStatus::Ok if !self.text.is_empty() => Some(&self.text),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Where an [`EnrichmentResult`]'s derived fields came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisSource {
    /// Parsed from a generative-text response.
    Llm,
    /// Deterministic keyword heuristic.
    Fallback,
    /// No analysis stage completed for this record; fields are name-only placeholders.
    None,
}

impl AnalysisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Llm => "LLM",
            Self::Fallback => "FALLBACK",
            Self::None => "NONE",
        }
    }
}

/// The five structured fields produced by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFields {
    pub summary: String,
    pub target_customer: String,
    pub industry: String,
    pub company_size: String,
    pub automation_pitch: String,
}

/// Analyzer output: fields plus provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub fields: AnalysisFields,
    pub source: AnalysisSource,
}

// ---------------------------------------------------------------------------
// EnrichmentResult
// ---------------------------------------------------------------------------

/// Terminal, per-record output row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub industry: String,
    pub company_size: String,
    pub summary: String,
    pub target_customer: String,
    pub automation_pitch: String,
    pub analysis_source: AnalysisSource,
}

impl EnrichmentResult {
    /// Assemble the output row from a resolved site and its analysis.
    pub fn assemble(site: &ResolvedSite, analysis: Analysis) -> Self {
        let Analysis { fields, source } = analysis;
        Self {
            company: site.company.name().to_string(),
            website: site.url.clone(),
            industry: fields.industry,
            company_size: fields.company_size,
            summary: fields.summary,
            target_customer: fields.target_customer,
            automation_pitch: fields.automation_pitch,
            analysis_source: source,
        }
    }
}

// ---------------------------------------------------------------------------
// RunStats
// ---------------------------------------------------------------------------

/// Aggregate counters over a run's results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub processed: usize,
    pub websites_found: usize,
    pub industries_identified: usize,
    pub llm_analyses: usize,
    pub fallback_analyses: usize,
}

impl RunStats {
    pub fn from_results(results: &[EnrichmentResult]) -> Self {
        let mut stats = Self {
            processed: results.len(),
            ..Default::default()
        };
        for r in results {
            if r.website.as_deref().is_some_and(|w| !w.is_empty()) {
                stats.websites_found += 1;
            }
            if r.industry != UNKNOWN {
                stats.industries_identified += 1;
            }
            match r.analysis_source {
                AnalysisSource::Llm => stats.llm_analyses += 1,
                AnalysisSource::Fallback | AnalysisSource::None => stats.fallback_analyses += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(industry: &str) -> AnalysisFields {
        AnalysisFields {
            summary: "s".into(),
            target_customer: "t".into(),
            industry: industry.into(),
            company_size: "small".into(),
            automation_pitch: "p".into(),
        }
    }

    #[test]
    fn company_record_trims_and_rejects_blank() {
        let rec = CompanyRecord::new("  OpenAI \t").unwrap();
        assert_eq!(rec.name(), "OpenAI");
        assert!(CompanyRecord::new("   ").is_err());
        assert!(CompanyRecord::new("").is_err());
    }

    #[test]
    fn company_record_deserialize_enforces_name_rule() {
        let rec: CompanyRecord = serde_json::from_str(r#"" Stripe ""#).unwrap();
        assert_eq!(rec.name(), "Stripe");
        assert_eq!(serde_json::to_string(&rec).unwrap(), r#""Stripe""#);
        assert!(serde_json::from_str::<CompanyRecord>(r#""   ""#).is_err());
    }

    #[test]
    fn resolved_site_url_only_when_found() {
        let rec = CompanyRecord::new("Acme").unwrap();
        assert_eq!(
            ResolvedSite::found(rec.clone(), "https://acme.com").url.as_deref(),
            Some("https://acme.com")
        );
        assert!(ResolvedSite::not_found(rec.clone()).url.is_none());
        assert_eq!(
            ResolvedSite::error(rec).resolution_status,
            ResolutionStatus::Error
        );
    }

    #[test]
    fn failed_content_has_no_usable_text() {
        let c = ScrapedContent::failed("https://x.com", FetchStatus::Timeout);
        assert!(c.text.is_empty());
        assert!(c.usable_text().is_none());

        let ok = ScrapedContent::ok("https://x.com", "hello".into());
        assert_eq!(ok.usable_text(), Some("hello"));
    }

    #[test]
    fn assemble_copies_site_and_fields() {
        let site = ResolvedSite::found(CompanyRecord::new("Acme").unwrap(), "https://acme.com");
        let row = EnrichmentResult::assemble(
            &site,
            Analysis {
                fields: fields("Retail"),
                source: AnalysisSource::Llm,
            },
        );
        assert_eq!(row.company, "Acme");
        assert_eq!(row.website.as_deref(), Some("https://acme.com"));
        assert_eq!(row.industry, "Retail");
        assert_eq!(row.analysis_source, AnalysisSource::Llm);
    }

    #[test]
    fn analysis_source_serializes_uppercase() {
        let json = serde_json::to_string(&AnalysisSource::Fallback).unwrap();
        assert_eq!(json, r#""FALLBACK""#);
        assert_eq!(AnalysisSource::Llm.as_str(), "LLM");
    }

    #[test]
    fn run_stats_counts() {
        let site = ResolvedSite::found(CompanyRecord::new("A").unwrap(), "https://a.com");
        let missing = ResolvedSite::not_found(CompanyRecord::new("B").unwrap());
        let results = vec![
            EnrichmentResult::assemble(
                &site,
                Analysis {
                    fields: fields("Technology"),
                    source: AnalysisSource::Llm,
                },
            ),
            EnrichmentResult::assemble(
                &missing,
                Analysis {
                    fields: fields(UNKNOWN),
                    source: AnalysisSource::Fallback,
                },
            ),
        ];
        let stats = RunStats::from_results(&results);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.websites_found, 1);
        assert_eq!(stats.industries_identified, 1);
        assert_eq!(stats.llm_analyses, 1);
        assert_eq!(stats.fallback_analyses, 1);
    }

    #[test]
    fn run_id_is_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}

//! End-to-end enrichment run: names → resolve → fetch → analyze → rows.
//!
//! Records are processed one at a time, in input order. Each record's stages
//! run inside their own task so a panic in any stage costs only that record's
//! quality, never its row. Cancellation is honored between records and during
//! pacing delays; the outcome always holds every result completed so far.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use leadenrich_analyzer::{Analyzer, fallback_analysis};
use leadenrich_fetcher::Fetcher;
use leadenrich_resolver::{DomainGuessSearch, DuckDuckGoSearch, NoSearch, Resolver, SearchProvider};
use leadenrich_shared::{
    Analysis, AnalysisSource, CompanyRecord, EnrichConfig, EnrichmentResult, LeadEnrichError,
    ResolvedSite, Result, RunId, RunStats, ScrapedContent, SearchProviderKind,
};

/// Result of [`Enricher::run`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    /// One entry per processed record, in input order.
    pub results: Vec<EnrichmentResult>,
    pub stats: RunStats,
    /// True when cancellation stopped the run before every record was processed.
    pub cancelled: bool,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a record's pipeline starts. `current` is 1-based.
    fn record_started(&self, company: &str, current: usize, total: usize);
    /// Called after a record's result is assembled.
    fn record_completed(&self, result: &EnrichmentResult, current: usize, total: usize);
    /// Called when a batch boundary triggers an extra pause.
    fn batch_pause(&self, completed: usize, total: usize, pause: Duration);
    /// Called once when the run ends (completed or cancelled).
    fn done(&self, outcome: &RunOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn record_started(&self, _company: &str, _current: usize, _total: usize) {}
    fn record_completed(&self, _result: &EnrichmentResult, _current: usize, _total: usize) {}
    fn batch_pause(&self, _completed: usize, _total: usize, _pause: Duration) {}
    fn done(&self, _outcome: &RunOutcome) {}
}

// ---------------------------------------------------------------------------
// Enricher
// ---------------------------------------------------------------------------

/// The per-record stages, shared with each record's task.
struct Stages {
    resolver: Resolver,
    fetcher: Fetcher,
    analyzer: Analyzer,
    fetch_timeout: Duration,
}

impl Stages {
    #[instrument(skip_all, fields(company = %record.name()))]
    async fn process(&self, record: &CompanyRecord) -> EnrichmentResult {
        let site = self.resolver.resolve(record).await;

        let content: Option<ScrapedContent> = match site.url.as_deref() {
            Some(url) => Some(self.fetcher.fetch(url, self.fetch_timeout).await),
            None => None,
        };
        let text = content.as_ref().and_then(ScrapedContent::usable_text);

        let analysis = self.analyzer.analyze(record.name(), text).await;
        EnrichmentResult::assemble(&site, analysis)
    }
}

/// Runs the enrichment pipeline over a list of companies.
pub struct Enricher {
    config: EnrichConfig,
    stages: Arc<Stages>,
}

impl Enricher {
    /// Assemble an enricher from already-built stages.
    pub fn new(config: EnrichConfig, resolver: Resolver, fetcher: Fetcher, analyzer: Analyzer) -> Self {
        let stages = Stages {
            resolver,
            fetcher,
            analyzer,
            fetch_timeout: config.fetch_timeout,
        };
        Self {
            config,
            stages: Arc::new(stages),
        }
    }

    /// Build every stage from configuration.
    ///
    /// Fails only on configuration problems (e.g. a backend without a key).
    pub fn from_config(config: EnrichConfig) -> Result<Self> {
        let primary: Arc<dyn SearchProvider> = match config.search_provider {
            SearchProviderKind::DuckDuckGo => Arc::new(DuckDuckGoSearch::new(
                config.search_timeout,
                config.retry.clone(),
            )?),
            SearchProviderKind::None => Arc::new(NoSearch),
        };
        let mut resolver = Resolver::new(primary);
        if config.domain_guess_fallback {
            resolver = resolver.with_fallback(Arc::new(DomainGuessSearch::new()?));
        }

        let fetcher = Fetcher::new(
            config.retry.clone(),
            config.content_budget,
            config.respect_robots_txt,
        )?;
        let analyzer = Analyzer::from_config(&config)?;

        info!(
            search = ?config.search_provider,
            backend = config.analyzer_backend.as_str(),
            model = %config.model,
            "enricher ready"
        );
        Ok(Self::new(config, resolver, fetcher, analyzer))
    }

    /// Enrich `records` in order.
    ///
    /// Returns one result per processed record. When `cancel` fires, the run
    /// stops before the next record and returns what it has. An empty record
    /// list is rejected before anything is reported.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn run(
        &self,
        records: &[CompanyRecord],
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<RunOutcome> {
        if records.is_empty() {
            return Err(LeadEnrichError::validation("input table has no company rows"));
        }

        let start = Instant::now();
        let run_id = RunId::new();

        let limit = self
            .config
            .max_records
            .map_or(records.len(), |n| n.min(records.len()));
        let records = &records[..limit];
        let total = records.len();

        info!(%run_id, total, "starting enrichment run");

        let mut results = Vec::with_capacity(total);
        let mut cancelled = false;

        for (idx, record) in records.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let current = idx + 1;
            progress.record_started(record.name(), current, total);
            let result = self.enrich_one(record).await;
            progress.record_completed(&result, current, total);
            results.push(result);

            if current == total {
                break;
            }

            let mut wait = self.config.inter_record_delay;
            if self.config.batch_size > 0 && current % self.config.batch_size == 0 {
                progress.batch_pause(current, total, self.config.batch_pause);
                wait += self.config.batch_pause;
            }
            if !wait.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }

        let stats = RunStats::from_results(&results);
        let outcome = RunOutcome {
            run_id,
            results,
            stats,
            cancelled,
            elapsed: start.elapsed(),
        };

        info!(
            run_id = %outcome.run_id,
            processed = outcome.stats.processed,
            websites_found = outcome.stats.websites_found,
            llm = outcome.stats.llm_analyses,
            fallback = outcome.stats.fallback_analyses,
            cancelled = outcome.cancelled,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "enrichment run finished"
        );
        progress.done(&outcome);
        Ok(outcome)
    }

    /// Run one record's stages in their own task; a fault yields a name-only row.
    async fn enrich_one(&self, record: &CompanyRecord) -> EnrichmentResult {
        let stages = Arc::clone(&self.stages);
        let owned = record.clone();

        match tokio::spawn(async move { stages.process(&owned).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!(company = %record.name(), error = %e, "record pipeline faulted, using name-only heuristic");
                EnrichmentResult::assemble(
                    &ResolvedSite::error(record.clone()),
                    Analysis {
                        fields: fallback_analysis(record.name(), None),
                        source: AnalysisSource::None,
                    },
                )
            }
        }
    }
}

//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use leadenrich_core::pipeline::{Enricher, ProgressReporter, RunOutcome};
use leadenrich_core::table::{
    SAMPLE_COMPANIES, default_output_name, read_companies, write_results, write_sample,
};
use leadenrich_shared::{
    AnalyzerBackend, AppConfig, EnrichConfig, EnrichmentResult, init_config, load_config,
    resolve_api_key,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadEnrich: company names in, sales-ready lead rows out.
#[derive(Parser)]
#[command(
    name = "leadenrich",
    version,
    about = "Enrich a list of company names with website, industry, size, and a sales pitch.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Enrich every company in a CSV file.
    Enrich {
        /// Input CSV with a `company_name` (or equivalent) column.
        input: PathBuf,

        /// Output CSV path (defaults to enriched_companies_<timestamp>.csv).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Analyzer backend: none, openai, openrouter, or gemini.
        #[arg(long)]
        backend: Option<String>,

        /// Pause after this many records (0 disables batch pauses).
        #[arg(long)]
        batch_size: Option<usize>,

        /// Delay between records, in seconds.
        #[arg(long)]
        delay: Option<f64>,

        /// Only process the first N companies.
        #[arg(long)]
        limit: Option<usize>,

        /// Fetch homepages without consulting robots.txt.
        #[arg(long)]
        no_robots: bool,

        /// Add an `analysis_source` column (LLM, FALLBACK, NONE).
        #[arg(long)]
        with_source: bool,
    },

    /// Write a sample input CSV.
    Sample {
        /// Destination path.
        #[arg(default_value = "sample_companies.csv")]
        path: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Flag overrides for `enrich`, applied on top of the config file.
struct EnrichOverrides {
    backend: Option<String>,
    batch_size: Option<usize>,
    delay: Option<f64>,
    limit: Option<usize>,
    no_robots: bool,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadenrich=info",
        1 => "leadenrich=debug",
        _ => "leadenrich=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Enrich {
            input,
            output,
            backend,
            batch_size,
            delay,
            limit,
            no_robots,
            with_source,
        } => {
            let overrides = EnrichOverrides {
                backend,
                batch_size,
                delay,
                limit,
                no_robots,
            };
            cmd_enrich(&input, output, overrides, with_source).await
        }
        Command::Sample { path } => cmd_sample(&path).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// enrich
// ---------------------------------------------------------------------------

async fn cmd_enrich(
    input: &Path,
    output: Option<PathBuf>,
    overrides: EnrichOverrides,
    with_source: bool,
) -> Result<()> {
    let mut app_config = load_config()?;
    if let Some(backend) = overrides.backend.as_deref() {
        app_config.analyzer.backend = backend.parse::<AnalyzerBackend>()?;
    }

    let config = build_enrich_config(&app_config, &overrides)?;

    // Everything that can fail fatally happens before the first record.
    let records = read_companies(input)?;
    let enricher = Enricher::from_config(config)?;

    let output_path =
        output.unwrap_or_else(|| PathBuf::from(default_output_name(&chrono::Local::now())));

    info!(
        input = %input.display(),
        output = %output_path.display(),
        companies = records.len(),
        backend = app_config.analyzer.backend.as_str(),
        "starting enrichment"
    );

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let reporter = CliProgress::new();
    let outcome = enricher.run(&records, &cancel, &reporter).await?;

    write_results(&output_path, &outcome.results, with_source)?;
    print_summary(&outcome, &output_path);

    Ok(())
}

/// Merge the config file with command-line overrides and resolve the API key.
fn build_enrich_config(app_config: &AppConfig, overrides: &EnrichOverrides) -> Result<EnrichConfig> {
    let mut config = EnrichConfig::from(app_config);
    config.api_key = resolve_api_key(&app_config.analyzer)?;

    if let Some(batch_size) = overrides.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(secs) = overrides.delay {
        config.inter_record_delay = parse_delay(secs)?;
    }
    if let Some(limit) = overrides.limit {
        if limit == 0 {
            return Err(eyre!("--limit must be at least 1"));
        }
        config.max_records = Some(limit);
    }
    if overrides.no_robots {
        config.respect_robots_txt = false;
    }

    Ok(config)
}

/// `--delay` seconds as a duration; negative, non-finite, or out-of-range values are rejected.
fn parse_delay(secs: f64) -> Result<Duration> {
    if secs < 0.0 {
        return Err(eyre!("--delay must be a non-negative number of seconds, got {secs}"));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| eyre!("--delay must be a non-negative number of seconds, got {secs}"))
}

/// Cancel the run on the first Ctrl-C; the current record finishes and the
/// partial results are still written. A second Ctrl-C exits immediately.
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupt received, stopping after the current company (Ctrl-C again to quit now)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("second interrupt, exiting without writing results");
            std::process::exit(130);
        }
    });
}

fn print_summary(outcome: &RunOutcome, output_path: &Path) {
    let stats = &outcome.stats;

    println!();
    if outcome.cancelled {
        println!("  Enrichment cancelled; partial results saved.");
    } else {
        println!("  Enrichment complete!");
    }
    println!("  Run:                   {}", outcome.run_id);
    println!("  Companies processed:   {}", stats.processed);
    println!("  Websites found:        {}", stats.websites_found);
    println!("  Industries identified: {}", stats.industries_identified);
    println!(
        "  Analyses:              {} LLM / {} fallback",
        stats.llm_analyses, stats.fallback_analyses
    );
    println!("  Output:                {}", output_path.display());
    println!("  Time:                  {:.1}s", outcome.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn record_started(&self, company: &str, _current: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message(format!("Analyzing {company}"));
    }

    fn record_completed(&self, result: &EnrichmentResult, current: usize, _total: usize) {
        self.bar.set_position(current as u64);
        let website = result.website.as_deref().unwrap_or("no website");
        self.bar.println(format!(
            "  {} → {website} [{}]",
            result.company,
            result.analysis_source.as_str()
        ));
    }

    fn batch_pause(&self, completed: usize, total: usize, pause: Duration) {
        self.bar.set_message(format!(
            "Batch done ({completed}/{total}), pausing {:.1}s",
            pause.as_secs_f64()
        ));
    }

    fn done(&self, _outcome: &RunOutcome) {
        self.bar.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// sample / config
// ---------------------------------------------------------------------------

async fn cmd_sample(path: &Path) -> Result<()> {
    write_sample(path)?;
    println!(
        "Sample with {} companies written to: {}",
        SAMPLE_COMPANIES.len(),
        path.display()
    );
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

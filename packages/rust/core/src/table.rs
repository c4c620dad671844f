//! CSV input and output tables.
//!
//! Input: any CSV with a header row and a company-name column. Output: one row
//! per enrichment result, in input order, with a fixed column set.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, TimeZone};
use tracing::info;

use leadenrich_shared::{CompanyRecord, EnrichmentResult, LeadEnrichError, Result};

/// Accepted headers for the name column, in preference order (case-insensitive).
pub const NAME_COLUMN_ALIASES: &[&str] = &[
    "company_name",
    "company name",
    "company",
    "name",
    "organization",
];

/// Output header, without the optional provenance column.
pub const OUTPUT_COLUMNS: [&str; 7] = [
    "company_name",
    "website",
    "industry",
    "company_size",
    "summary_from_llm",
    "target_customer",
    "automation_pitch_from_llm",
];

/// Extra column written with `--with-source`.
pub const SOURCE_COLUMN: &str = "analysis_source";

/// Companies written by `leadenrich sample`.
pub const SAMPLE_COMPANIES: &[&str] = &[
    "OpenAI",
    "Microsoft",
    "Google",
    "Amazon",
    "Slack",
    "Notion",
    "Stripe",
    "Airbnb",
];

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Read company records from a CSV file.
pub fn read_companies(path: &Path) -> Result<Vec<CompanyRecord>> {
    let file = File::open(path).map_err(|e| LeadEnrichError::io(path, e))?;
    let records = read_companies_from(file)?;
    info!(path = %path.display(), count = records.len(), "input table loaded");
    Ok(records)
}

/// Read company records from any CSV source.
///
/// Fails when the name column is missing, the table has no rows, or a row has
/// a blank name. Nothing is processed in those cases.
pub fn read_companies_from<R: Read>(reader: R) -> Result<Vec<CompanyRecord>> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv
        .headers()
        .map_err(|e| LeadEnrichError::Table(format!("unreadable header row: {e}")))?
        .clone();
    let column = name_column(&headers).ok_or_else(|| {
        LeadEnrichError::Table(format!(
            "no company name column; expected one of: {}",
            NAME_COLUMN_ALIASES.join(", ")
        ))
    })?;

    let mut records = Vec::new();
    for (idx, row) in csv.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let row = row.map_err(|e| LeadEnrichError::Table(format!("line {line}: {e}")))?;
        let name = row.get(column).unwrap_or_default();
        let record = CompanyRecord::new(name).map_err(|_| {
            LeadEnrichError::validation(format!("line {line}: company name is blank"))
        })?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(LeadEnrichError::validation("input table has no company rows"));
    }
    Ok(records)
}

fn name_column(headers: &csv::StringRecord) -> Option<usize> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();

    NAME_COLUMN_ALIASES
        .iter()
        .find_map(|alias| normalized.iter().position(|h| h == alias))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Write results to a CSV file, creating parent directories as needed.
pub fn write_results(path: &Path, results: &[EnrichmentResult], with_source: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LeadEnrichError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| LeadEnrichError::io(path, e))?;
    write_results_to(file, results, with_source)?;
    info!(path = %path.display(), rows = results.len(), "results written");
    Ok(())
}

/// Write results as CSV to any sink.
pub fn write_results_to<W: Write>(
    writer: W,
    results: &[EnrichmentResult],
    with_source: bool,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    let table_err = |e: csv::Error| LeadEnrichError::Table(format!("failed to write results: {e}"));

    let mut header: Vec<&str> = OUTPUT_COLUMNS.to_vec();
    if with_source {
        header.push(SOURCE_COLUMN);
    }
    csv.write_record(&header).map_err(table_err)?;

    for r in results {
        let mut row: Vec<&str> = vec![
            r.company.as_str(),
            r.website.as_deref().unwrap_or_default(),
            r.industry.as_str(),
            r.company_size.as_str(),
            r.summary.as_str(),
            r.target_customer.as_str(),
            r.automation_pitch.as_str(),
        ];
        if with_source {
            row.push(r.analysis_source.as_str());
        }
        csv.write_record(&row).map_err(table_err)?;
    }

    csv.flush()
        .map_err(|e| LeadEnrichError::Table(format!("failed to flush results: {e}")))
}

/// Write the sample company list.
pub fn write_sample(path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| LeadEnrichError::io(path, e))?;
    let mut csv = csv::Writer::from_writer(file);
    let table_err = |e: csv::Error| LeadEnrichError::Table(format!("failed to write sample: {e}"));

    csv.write_record([NAME_COLUMN_ALIASES[0]]).map_err(table_err)?;
    for name in SAMPLE_COMPANIES {
        csv.write_record([name]).map_err(table_err)?;
    }
    csv.flush().map_err(|e| LeadEnrichError::io(path, e))
}

/// Default output file name for a run started at `now`.
pub fn default_output_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("enriched_companies_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

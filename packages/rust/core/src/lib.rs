//! Core orchestration for LeadEnrich.
//!
//! This crate ties together website resolution, page fetching, and structured
//! analysis into an end-to-end run ([`pipeline::Enricher`]), and owns the CSV
//! input/output tables ([`table`]).

pub mod pipeline;
pub mod table;

pub use pipeline::{Enricher, ProgressReporter, RunOutcome, SilentProgress};

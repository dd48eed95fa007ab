//! Reading a flattened rating report back into rows.
//!
//! The text is what a document extractor returns for an exported report:
//! page breaks become newlines and table cells are separated by spaces.

pub mod locate;
pub mod tokenize;
pub mod validate;

use tracing::info;

use crate::config::ImportConfig;
use crate::error::{ImportError, RowFailure};
use locate::locate_fields;
use tokenize::{tokenize, Grammar};
use validate::{validate_rows, ValidRow};

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReport {
    pub group_code: String,
    pub subject_name: String,
    pub grammar: Grammar,
    pub total_rows: usize,
    pub rows: Vec<ValidRow>,
    pub failures: Vec<RowFailure>,
}

/// Parses without touching the store. Every error returned here is fatal to
/// the import; row-level problems are collected in `failures`.
pub fn parse_report(text: &str, cfg: &ImportConfig) -> Result<ParsedReport, ImportError> {
    if cfg
        .summary_markers
        .iter()
        .map(|m| m.trim())
        .any(|m| !m.is_empty() && text.contains(m))
    {
        return Err(ImportError::SummaryReport);
    }

    let fields = locate_fields(text, cfg)?;
    let tokens = tokenize(text, &fields.subject_name, cfg);
    let total_rows = tokens.rows().len();
    if total_rows == 0 {
        return Err(ImportError::NoRows);
    }

    let (rows, failures) = validate_rows(&tokens);
    info!(
        group = %fields.group_code,
        subject = %fields.subject_name,
        grammar = ?tokens.grammar(),
        rows = total_rows,
        invalid = failures.len(),
        "parsed rating report"
    );

    Ok(ParsedReport {
        group_code: fields.group_code,
        subject_name: fields.subject_name,
        grammar: tokens.grammar(),
        total_rows,
        rows,
        failures,
    })
}

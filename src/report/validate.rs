use crate::error::{RowError, RowFailure};
use crate::report::tokenize::{Grammar, ParsedRow, TokenizeResult};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;

/// A row that passed validation and is ready to reconcile.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRow {
    pub position: usize,
    pub ordinal: u32,
    pub name: String,
    pub score: f64,
}

/// Accepts `,` as decimal separator. Out-of-range values are rejected, never
/// clamped.
pub fn parse_score(text: &str) -> Result<f64, RowError> {
    let normalized = text.trim().replace(',', ".");
    let value: f64 = normalized.parse().map_err(|_| RowError::InvalidScore {
        text: text.to_string(),
        reason: "not a number".to_string(),
    })?;
    if !value.is_finite() {
        return Err(RowError::InvalidScore {
            text: text.to_string(),
            reason: "not a finite number".to_string(),
        });
    }
    if !(MIN_SCORE..=MAX_SCORE).contains(&value) {
        return Err(RowError::InvalidScore {
            text: text.to_string(),
            reason: format!("outside {MIN_SCORE}..={MAX_SCORE}"),
        });
    }
    Ok(value)
}

pub fn validate_row(row: &ParsedRow, grammar: Grammar) -> Result<ValidRow, RowError> {
    let score = parse_score(&row.raw_score)?;

    let ordinal = match (row.ordinal, grammar) {
        (Some(n), _) => n,
        (None, Grammar::Simple) => u32::try_from(row.position).map_err(|_| {
            RowError::InvalidOrdinal {
                text: row.ordinal_text.clone(),
            }
        })?,
        (None, Grammar::Full) => {
            return Err(RowError::InvalidOrdinal {
                text: row.ordinal_text.clone(),
            })
        }
    };

    let name = row.raw_name.trim();
    if name.is_empty() {
        return Err(RowError::InvalidName);
    }

    Ok(ValidRow {
        position: row.position,
        ordinal,
        name: name.to_string(),
        score,
    })
}

pub fn validate_rows(tokens: &TokenizeResult) -> (Vec<ValidRow>, Vec<RowFailure>) {
    let grammar = tokens.grammar();
    let mut valid = Vec::new();
    let mut failed = Vec::new();
    for row in tokens.rows() {
        match validate_row(row, grammar) {
            Ok(v) => valid.push(v),
            Err(error) => failed.push(RowFailure {
                row: row.position,
                error,
            }),
        }
    }
    (valid, failed)
}

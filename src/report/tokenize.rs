use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::OnceLock;

use crate::config::ImportConfig;

/// Which row layout was used to read the report body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Grammar {
    /// `subject ordinal name score`, as in the full group report.
    Full,
    /// `ordinal name score`, as in the per-subject report.
    Simple,
}

/// A candidate row before validation. `position` is the 1-based emission
/// index; `ordinal` is `None` when the captured digits are 0 or overflow.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub position: usize,
    pub ordinal: Option<u32>,
    pub ordinal_text: String,
    pub raw_name: String,
    pub raw_score: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub ordinal_text: String,
    pub name: String,
    pub score: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FullRow {
    pub subject_token: String,
    pub row: RawRow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenizeResult {
    Full(Vec<ParsedRow>),
    Simple(Vec<ParsedRow>),
}

impl TokenizeResult {
    pub fn grammar(&self) -> Grammar {
        match self {
            TokenizeResult::Full(_) => Grammar::Full,
            TokenizeResult::Simple(_) => Grammar::Simple,
        }
    }

    pub fn rows(&self) -> &[ParsedRow] {
        match self {
            TokenizeResult::Full(rows) | TokenizeResult::Simple(rows) => rows,
        }
    }
}

fn full_row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\S+)[ \t]+(\d+)[ \t]+([^\d\r\n]+?)[ \t]+([-+]?\d+(?:[.,]\d+)?)\b")
            .expect("valid full row regex")
    })
}

fn simple_row_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\d+)[ \t]+([^\d\r\n]+?)[ \t]+([-+]?\d+(?:[.,]\d+)?)\b")
            .expect("valid simple row regex")
    })
}

/// Matches `re` repeatedly from the start of `line`, each match beginning
/// where the previous one ended. Anything after the last match is ignored,
/// so a row followed by a remark or a second row on the same line is kept.
fn scan_line<'t>(re: &Regex, line: &'t str) -> Vec<Captures<'t>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < line.len() {
        let Some(c) = re.captures(&line[pos..]) else {
            break;
        };
        let end = c.get(0).map_or(0, |m| m.end());
        if end == 0 {
            break;
        }
        pos += end;
        out.push(c);
    }
    out
}

/// Reads every `subject ordinal name score` row, several per line allowed.
pub fn attempt_full(text: &str, cfg: &ImportConfig) -> Vec<FullRow> {
    let re = full_row_re();
    text.lines()
        .flat_map(|line| scan_line(re, line))
        .map(|c| FullRow {
            subject_token: c[1].to_string(),
            row: RawRow {
                ordinal_text: c[2].to_string(),
                name: c[3].to_string(),
                score: c[4].to_string(),
            },
        })
        .filter(|r| !cfg.is_header_label(&r.row.name) && !cfg.is_header_label(&r.subject_token))
        .collect()
}

/// Reads every `ordinal name score` row, several per line allowed.
pub fn attempt_simple(text: &str, cfg: &ImportConfig) -> Vec<RawRow> {
    let re = simple_row_re();
    text.lines()
        .flat_map(|line| scan_line(re, line))
        .map(|c| RawRow {
            ordinal_text: c[1].to_string(),
            name: c[2].to_string(),
            score: c[3].to_string(),
        })
        .filter(|r| !cfg.is_header_label(&r.name))
        .collect()
}

/// The full layout wins only when it carries at least one row for `subject`;
/// then only that subject's rows are kept.
pub fn select_grammar(subject: &str, full: Vec<FullRow>, simple: Vec<RawRow>) -> TokenizeResult {
    let matching: Vec<RawRow> = full
        .into_iter()
        .filter(|r| same_subject(&r.subject_token, subject))
        .map(|r| r.row)
        .collect();

    if !matching.is_empty() {
        TokenizeResult::Full(number_rows(matching))
    } else {
        TokenizeResult::Simple(number_rows(simple))
    }
}

pub fn tokenize(text: &str, subject: &str, cfg: &ImportConfig) -> TokenizeResult {
    select_grammar(subject, attempt_full(text, cfg), attempt_simple(text, cfg))
}

fn number_rows(rows: Vec<RawRow>) -> Vec<ParsedRow> {
    rows.into_iter()
        .enumerate()
        .map(|(i, r)| ParsedRow {
            position: i + 1,
            ordinal: r.ordinal_text.parse::<u32>().ok().filter(|n| *n > 0),
            ordinal_text: r.ordinal_text,
            raw_name: r.name,
            raw_score: r.score,
        })
        .collect()
}

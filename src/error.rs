use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use thiserror::Error;

/// Which anchored header field could not be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Group,
    Subject,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Group => "group",
            Field::Subject => "subject",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures that abort a whole import before or during entity resolution.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("report has no {0} field")]
    MissingField(Field),

    #[error("report is a group summary; only per-subject rating reports can be imported")]
    SummaryReport,

    #[error("no rating rows found in report")]
    NoRows,

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("failed to read report: {0}")]
    Io(#[from] std::io::Error),

    #[error("workspace unavailable: {0}")]
    Workspace(String),

    #[error("import aborted: {0}")]
    Aborted(String),
}

impl ImportError {
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::MissingField(_) => "missing_field",
            ImportError::SummaryReport => "summary_report",
            ImportError::NoRows => "no_rows",
            ImportError::Store(_) => "store_error",
            ImportError::Io(_) => "io_error",
            ImportError::Workspace(_) => "workspace_error",
            ImportError::Aborted(_) => "import_aborted",
        }
    }
}

/// Failures confined to one report row; the batch continues past them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("invalid score {text:?}: {reason}")]
    InvalidScore { text: String, reason: String },

    #[error("student name is empty")]
    InvalidName,

    #[error("invalid ordinal {text:?}")]
    InvalidOrdinal { text: String },

    #[error("store error: {0}")]
    Store(String),
}

impl RowError {
    pub fn code(&self) -> &'static str {
        match self {
            RowError::InvalidScore { .. } => "invalid_score",
            RowError::InvalidName => "invalid_name",
            RowError::InvalidOrdinal { .. } => "invalid_ordinal",
            RowError::Store(_) => "store_error",
        }
    }
}

impl From<rusqlite::Error> for RowError {
    fn from(e: rusqlite::Error) -> Self {
        RowError::Store(e.to_string())
    }
}

/// One rejected row, identified by its 1-based position in the report.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub row: usize,
    pub error: RowError,
}

impl Serialize for RowFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("RowFailure", 3)?;
        s.serialize_field("row", &self.row)?;
        s.serialize_field("code", self.error.code())?;
        s.serialize_field("reason", &self.error.to_string())?;
        s.end()
    }
}

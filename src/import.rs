//! The import pipeline: parse a flattened report, then reconcile it into the
//! workspace store.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{error, info};

use crate::config::ImportConfig;
use crate::db;
use crate::error::{ImportError, RowFailure};
use crate::reconcile::reconcile;
use crate::report::tokenize::Grammar;
use crate::report::{parse_report, ParsedReport};
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub group_code: String,
    pub subject_name: String,
    pub grammar: Grammar,
    pub total_rows_found: usize,
    pub rows_imported: usize,
    pub rows_inserted: usize,
    pub rows_updated: usize,
    pub group_created: bool,
    pub subject_created: bool,
    pub avg_score: Option<f64>,
    pub rows_failed: Vec<RowFailure>,
}

#[derive(Debug, Clone)]
pub enum ImportSource {
    Text(String),
    File(PathBuf),
}

impl ImportSource {
    /// Extracted text is expected as UTF-8; stray bytes are replaced.
    pub fn read(&self) -> Result<String, ImportError> {
        match self {
            ImportSource::Text(t) => Ok(t.clone()),
            ImportSource::File(p) => read_report_file(p),
        }
    }
}

fn read_report_file(path: &Path) -> Result<String, ImportError> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn import_text(
    conn: &Connection,
    text: &str,
    cfg: &ImportConfig,
) -> Result<ImportReport, ImportError> {
    let parsed = parse_report(text, cfg)?;
    apply_parsed(conn, parsed)
}

pub fn import_file(
    conn: &Connection,
    path: &Path,
    cfg: &ImportConfig,
) -> Result<ImportReport, ImportError> {
    let text = read_report_file(path)?;
    import_text(conn, &text, cfg)
}

fn apply_parsed(conn: &Connection, parsed: ParsedReport) -> Result<ImportReport, ImportError> {
    let store = Store::new(conn);
    let outcome = reconcile(&store, &parsed.group_code, &parsed.subject_name, &parsed.rows)?;

    let mut rows_failed = parsed.failures;
    rows_failed.extend(outcome.failures.iter().cloned());
    rows_failed.sort_by_key(|f| f.row);

    let report = ImportReport {
        group_code: parsed.group_code,
        subject_name: parsed.subject_name,
        grammar: parsed.grammar,
        total_rows_found: parsed.total_rows,
        rows_imported: outcome.processed(),
        rows_inserted: outcome.inserted,
        rows_updated: outcome.updated,
        group_created: outcome.group_created,
        subject_created: outcome.subject_created,
        avg_score: outcome.avg_score,
        rows_failed,
    };
    info!(
        group = %report.group_code,
        subject = %report.subject_name,
        imported = report.rows_imported,
        failed = report.rows_failed.len(),
        "import finished"
    );
    Ok(report)
}

/// Advisory locks keyed by (group code, subject) so two imports of the same
/// subject never interleave their upserts.
#[derive(Debug, Default)]
pub struct SubjectLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SubjectLocks {
    pub fn lock_for(&self, group_code: &str, subject_name: &str) -> Arc<Mutex<()>> {
        let key = format!(
            "{}\u{1f}{}",
            group_code.trim(),
            subject_name.trim().to_lowercase()
        );
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.entry(key).or_default().clone()
    }
}

/// Runs imports against one workspace, serializing work per subject.
#[derive(Debug, Clone)]
pub struct ImportCoordinator {
    workspace: PathBuf,
    cfg: ImportConfig,
    locks: Arc<SubjectLocks>,
}

impl ImportCoordinator {
    pub fn new(workspace: impl Into<PathBuf>, cfg: ImportConfig) -> Self {
        Self::with_locks(workspace, cfg, Arc::default())
    }

    /// Shares `locks` with every other coordinator built from the same
    /// registry; coordinators on one database must share it.
    pub fn with_locks(
        workspace: impl Into<PathBuf>,
        cfg: ImportConfig,
        locks: Arc<SubjectLocks>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            cfg,
            locks,
        }
    }

    pub fn locks(&self) -> &Arc<SubjectLocks> {
        &self.locks
    }

    pub fn config(&self) -> &ImportConfig {
        &self.cfg
    }

    pub fn set_config(&mut self, cfg: ImportConfig) {
        self.cfg = cfg;
    }

    /// Imports on the caller's connection. Parsing happens before the subject
    /// lock is taken, so a malformed report never waits on another import.
    pub fn run_on(
        &self,
        conn: &Connection,
        source: &ImportSource,
    ) -> Result<ImportReport, ImportError> {
        let text = source.read()?;
        let parsed = parse_report(&text, &self.cfg)?;
        let lock = self.locks.lock_for(&parsed.group_code, &parsed.subject_name);
        let _guard = lock.lock().unwrap_or_else(|p| p.into_inner());
        apply_parsed(conn, parsed)
    }

    /// Imports on a fresh connection to the workspace database.
    pub fn run(&self, source: &ImportSource) -> Result<ImportReport, ImportError> {
        let conn = db::open_db(&self.workspace)
            .and_then(|c| {
                db::set_busy_timeout(&c, self.cfg.busy_timeout_ms)?;
                Ok(c)
            })
            .map_err(|e| ImportError::Workspace(format!("{e:#}")))?;
        self.run_on(&conn, source)
    }

    pub fn spawn(&self, source: ImportSource) -> ImportHandle {
        self.spawn_with(source, |_| {})
    }

    /// Runs the import on a background thread; `on_done` sees the result
    /// before it becomes available through the handle.
    pub fn spawn_with<F>(&self, source: ImportSource, on_done: F) -> ImportHandle
    where
        F: FnOnce(&Result<ImportReport, ImportError>) + Send + 'static,
    {
        let this = self.clone();
        let handle = std::thread::spawn(move || {
            let result = this.run(&source);
            if let Err(e) = &result {
                error!(error = %e, "background import failed");
            }
            on_done(&result);
            result
        });
        ImportHandle { handle }
    }
}

pub struct ImportHandle {
    handle: JoinHandle<Result<ImportReport, ImportError>>,
}

impl ImportHandle {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn wait(self) -> Result<ImportReport, ImportError> {
        self.handle
            .join()
            .unwrap_or_else(|_| Err(ImportError::Aborted("import thread panicked".into())))
    }
}

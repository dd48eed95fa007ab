use tracing::{debug, info, warn};

use crate::error::{ImportError, RowError, RowFailure};
use crate::report::validate::ValidRow;
use crate::store::{Group, Store, Subject};
use crate::summary::refresh_subject_summary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Inserted,
    Updated,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub group: Group,
    pub subject: Subject,
    pub group_created: bool,
    pub subject_created: bool,
    pub inserted: usize,
    pub updated: usize,
    pub failures: Vec<RowFailure>,
    /// Last average written; `None` if every summary refresh failed or no row
    /// was applied.
    pub avg_score: Option<f64>,
}

impl ReconcileOutcome {
    pub fn processed(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Applies validated rows to the store one at a time. Only group/subject
/// resolution can fail the whole call; row failures are collected and the
/// rows before them stay applied.
pub fn reconcile(
    store: &Store<'_>,
    group_code: &str,
    subject_name: &str,
    rows: &[ValidRow],
) -> Result<ReconcileOutcome, ImportError> {
    let student_capacity = i64::try_from(rows.len()).unwrap_or(i64::MAX).max(1);
    let (group, group_created) = store.ensure_group(group_code, student_capacity, 1)?;
    if group_created {
        info!(group = %group.code, student_capacity, "created group");
    }

    let (subject, subject_created) = store.ensure_subject(&group.id, subject_name)?;
    if subject_created {
        info!(group = %group.code, subject = %subject.code, "created subject");
    }

    let mut outcome = ReconcileOutcome {
        group,
        subject,
        group_created,
        subject_created,
        inserted: 0,
        updated: 0,
        failures: Vec::new(),
        avg_score: None,
    };

    for row in rows {
        match apply_row(store, &outcome.subject, row) {
            Ok(RowAction::Inserted) => outcome.inserted += 1,
            Ok(RowAction::Updated) => outcome.updated += 1,
            Err(error) => {
                warn!(row = row.position, ordinal = row.ordinal, error = %error, "rating row not applied");
                outcome.failures.push(RowFailure {
                    row: row.position,
                    error,
                });
                continue;
            }
        }

        match refresh_subject_summary(store, &outcome.group.id, &outcome.subject.id) {
            Ok(avg) => outcome.avg_score = Some(avg),
            Err(e) => warn!(
                subject = %outcome.subject.code,
                error = %e,
                "summary refresh failed; ratings are stored but the average may be stale"
            ),
        }
    }

    Ok(outcome)
}

/// Upserts one rating keyed by (subject, ordinal).
pub fn apply_row(store: &Store<'_>, subject: &Subject, row: &ValidRow) -> Result<RowAction, RowError> {
    match store.find_rating(&subject.id, row.ordinal)? {
        Some(existing) => {
            store.update_rating(&existing.id, &row.name, row.score)?;
            debug!(ordinal = row.ordinal, from = existing.score, to = row.score, "updated rating");
            Ok(RowAction::Updated)
        }
        None => {
            store.insert_rating(&subject.id, row.ordinal, &row.name, row.score)?;
            debug!(ordinal = row.ordinal, score = row.score, "inserted rating");
            Ok(RowAction::Inserted)
        }
    }
}

//! Text renditions of the desktop tool's report layouts.
//!
//! Each function returns what a text extractor yields for the corresponding
//! exported document: one line per paragraph or table row, cells separated
//! by single spaces. Page layout and fonts are not reproduced.

use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;

use crate::store::Store;

pub const SUBJECT_TITLE: &str = "Рейтинги студентов по дисциплине";
pub const SUMMARY_TITLE: &str = "Сводка рейтингов по группе";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportLayout {
    Subject,
    Full,
    Summary,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("subject not found: {0}")]
    SubjectNotFound(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Up to two decimals, without trailing zeros: `90`, `85.5`, `87.75`.
pub fn format_score(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn date_line(generated_at: NaiveDateTime) -> String {
    format!(
        "Дата формирования: {}",
        generated_at.format("%d.%m.%Y %H:%M:%S")
    )
}

pub fn export_subject_text(
    store: &Store<'_>,
    group_code: &str,
    subject_code: &str,
    generated_at: NaiveDateTime,
) -> Result<String, ExportError> {
    let group = store
        .find_group_by_code(group_code)?
        .ok_or_else(|| ExportError::GroupNotFound(group_code.to_string()))?;
    let subject = store
        .find_subject(&group.id, subject_code)?
        .ok_or_else(|| ExportError::SubjectNotFound(subject_code.to_string()))?;

    let mut lines = vec![
        SUBJECT_TITLE.to_string(),
        String::new(),
        format!("Группа: {}", group.code),
        format!("Дисциплина: {}", subject.code),
        date_line(generated_at),
        String::new(),
        "№ п/п ФИО студента Рейтинг".to_string(),
    ];
    for r in store.list_ratings(&subject.id)? {
        lines.push(format!(
            "{} {} {}",
            r.ordinal,
            r.student_name,
            format_score(r.score)
        ));
    }
    Ok(lines.join("\n") + "\n")
}

pub fn export_full_text(store: &Store<'_>, group_code: &str) -> Result<String, ExportError> {
    let group = store
        .find_group_by_code(group_code)?
        .ok_or_else(|| ExportError::GroupNotFound(group_code.to_string()))?;

    let mut lines = vec![
        format!("Полный отчёт по группе {}", group.code),
        String::new(),
        "Дисциплина № ФИО Рейтинг".to_string(),
    ];
    for subject in store.list_subjects(&group.id)? {
        for r in store.list_ratings(&subject.id)? {
            lines.push(format!(
                "{} {} {} {}",
                subject.code,
                r.ordinal,
                r.student_name,
                format_score(r.score)
            ));
        }
    }
    Ok(lines.join("\n") + "\n")
}

pub fn export_summary_text(
    store: &Store<'_>,
    group_code: &str,
    generated_at: NaiveDateTime,
) -> Result<String, ExportError> {
    let group = store
        .find_group_by_code(group_code)?
        .ok_or_else(|| ExportError::GroupNotFound(group_code.to_string()))?;

    let mut lines = vec![
        SUMMARY_TITLE.to_string(),
        String::new(),
        format!("Группа: {}", group.code),
        date_line(generated_at),
        String::new(),
        "Код дисциплины Общий рейтинг".to_string(),
    ];
    for s in store.group_summaries(&group.id)? {
        lines.push(format!(
            "{} {:.2}",
            s.subject_code,
            s.avg_score.unwrap_or(0.0)
        ));
    }
    Ok(lines.join("\n") + "\n")
}

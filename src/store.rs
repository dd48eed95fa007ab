//! Row-level access to groups, subjects, ratings and summaries.
//!
//! `Store` borrows a caller-owned connection; nothing here holds global state.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub code: String,
    pub student_capacity: i64,
    pub subject_capacity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub group_id: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRecord {
    pub id: String,
    pub subject_id: String,
    pub ordinal: u32,
    pub student_name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub group_id: String,
    pub subject_id: String,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupListing {
    pub id: String,
    pub code: String,
    pub student_capacity: i64,
    pub subject_capacity: i64,
    pub subject_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub subject_id: String,
    pub subject_code: String,
    pub avg_score: Option<f64>,
    pub rating_count: i64,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

pub struct Store<'c> {
    conn: &'c Connection,
}

impl<'c> Store<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &'c Connection {
        self.conn
    }

    pub fn find_group_by_code(&self, code: &str) -> rusqlite::Result<Option<Group>> {
        self.conn
            .query_row(
                "SELECT id, group_code, student_count, subject_count
                 FROM groups WHERE group_code = ?",
                [code],
                |r| {
                    Ok(Group {
                        id: r.get(0)?,
                        code: r.get(1)?,
                        student_capacity: r.get(2)?,
                        subject_capacity: r.get(3)?,
                    })
                },
            )
            .optional()
    }

    /// Inserts unless a group with this code already exists; returns the row
    /// either way and whether this call created it.
    pub fn ensure_group(
        &self,
        code: &str,
        student_capacity: i64,
        subject_capacity: i64,
    ) -> rusqlite::Result<(Group, bool)> {
        if let Some(g) = self.find_group_by_code(code)? {
            return Ok((g, false));
        }
        let ts = now();
        let inserted = self.conn.execute(
            "INSERT INTO groups(id, group_code, student_count, subject_count, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, ?)
             ON CONFLICT(group_code) DO NOTHING",
            (
                Uuid::new_v4().to_string(),
                code,
                student_capacity,
                subject_capacity,
                &ts,
                &ts,
            ),
        )?;
        let group = self
            .find_group_by_code(code)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok((group, inserted > 0))
    }

    pub fn find_subject(&self, group_id: &str, code: &str) -> rusqlite::Result<Option<Subject>> {
        let wanted = code.trim().to_lowercase();
        let mut stmt = self.conn.prepare(
            "SELECT id, group_id, subject_code FROM subjects
             WHERE group_id = ? ORDER BY rowid",
        )?;
        let subjects = stmt
            .query_map([group_id], |r| {
                Ok(Subject {
                    id: r.get(0)?,
                    group_id: r.get(1)?,
                    code: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        // SQLite's NOCASE only folds ASCII; subject codes are often Cyrillic.
        Ok(subjects
            .into_iter()
            .find(|s| s.code.trim().to_lowercase() == wanted))
    }

    pub fn ensure_subject(&self, group_id: &str, code: &str) -> rusqlite::Result<(Subject, bool)> {
        if let Some(s) = self.find_subject(group_id, code)? {
            return Ok((s, false));
        }
        let inserted = self.conn.execute(
            "INSERT INTO subjects(id, group_id, subject_code, created_at)
             VALUES(?, ?, ?, ?)
             ON CONFLICT(group_id, subject_code) DO NOTHING",
            (Uuid::new_v4().to_string(), group_id, code, now()),
        )?;
        let subject = self
            .find_subject(group_id, code)?
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
        Ok((subject, inserted > 0))
    }

    pub fn find_subject_by_codes(
        &self,
        group_code: &str,
        subject_code: &str,
    ) -> rusqlite::Result<Option<(Group, Subject)>> {
        let Some(group) = self.find_group_by_code(group_code)? else {
            return Ok(None);
        };
        Ok(self
            .find_subject(&group.id, subject_code)?
            .map(|s| (group, s)))
    }

    pub fn list_subjects(&self, group_id: &str) -> rusqlite::Result<Vec<Subject>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, group_id, subject_code FROM subjects
             WHERE group_id = ? ORDER BY subject_code",
        )?;
        let rows = stmt
            .query_map([group_id], |r| {
                Ok(Subject {
                    id: r.get(0)?,
                    group_id: r.get(1)?,
                    code: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_rating(
        &self,
        subject_id: &str,
        ordinal: u32,
    ) -> rusqlite::Result<Option<RatingRecord>> {
        self.conn
            .query_row(
                "SELECT id, subject_id, ordinal, COALESCE(student_name, ''), score
                 FROM ratings WHERE subject_id = ? AND ordinal = ?",
                (subject_id, ordinal),
                rating_from_row,
            )
            .optional()
    }

    pub fn insert_rating(
        &self,
        subject_id: &str,
        ordinal: u32,
        student_name: &str,
        score: f64,
    ) -> rusqlite::Result<String> {
        let id = Uuid::new_v4().to_string();
        let ts = now();
        self.conn.execute(
            "INSERT INTO ratings(id, subject_id, ordinal, student_name, score, created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            (&id, subject_id, ordinal, student_name, score, &ts, &ts),
        )?;
        Ok(id)
    }

    pub fn update_rating(&self, id: &str, student_name: &str, score: f64) -> rusqlite::Result<()> {
        self.conn.execute(
            "UPDATE ratings SET score = ?, student_name = ?, updated_at = ? WHERE id = ?",
            (score, student_name, now(), id),
        )?;
        Ok(())
    }

    pub fn list_ratings(&self, subject_id: &str) -> rusqlite::Result<Vec<RatingRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, subject_id, ordinal, COALESCE(student_name, ''), score
             FROM ratings WHERE subject_id = ? ORDER BY ordinal",
        )?;
        let rows = stmt
            .query_map([subject_id], rating_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn subject_scores(&self, subject_id: &str) -> rusqlite::Result<Vec<f64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT score FROM ratings WHERE subject_id = ?")?;
        let rows = stmt
            .query_map([subject_id], |r| r.get::<_, f64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn upsert_summary(
        &self,
        group_id: &str,
        subject_id: &str,
        avg_score: f64,
    ) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT INTO summaries(id, group_id, subject_id, avg_score, updated_at)
             VALUES(?, ?, ?, ?, ?)
             ON CONFLICT(group_id, subject_id) DO UPDATE SET
               avg_score = excluded.avg_score,
               updated_at = excluded.updated_at",
            (
                Uuid::new_v4().to_string(),
                group_id,
                subject_id,
                avg_score,
                now(),
            ),
        )?;
        Ok(())
    }

    pub fn get_summary(&self, group_id: &str, subject_id: &str) -> rusqlite::Result<Option<Summary>> {
        self.conn
            .query_row(
                "SELECT group_id, subject_id, avg_score FROM summaries
                 WHERE group_id = ? AND subject_id = ?",
                (group_id, subject_id),
                |r| {
                    Ok(Summary {
                        group_id: r.get(0)?,
                        subject_id: r.get(1)?,
                        avg_score: r.get(2)?,
                    })
                },
            )
            .optional()
    }

    pub fn list_groups(&self) -> rusqlite::Result<Vec<GroupListing>> {
        let mut stmt = self.conn.prepare(
            "SELECT
               g.id,
               g.group_code,
               g.student_count,
               g.subject_count,
               (SELECT COUNT(*) FROM subjects s WHERE s.group_id = g.id) AS subject_total
             FROM groups g
             ORDER BY g.group_code",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(GroupListing {
                    id: r.get(0)?,
                    code: r.get(1)?,
                    student_capacity: r.get(2)?,
                    subject_capacity: r.get(3)?,
                    subject_count: r.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Stored averages per subject of a group. Subjects that never had a
    /// rating have no summary row and report `None`.
    pub fn group_summaries(&self, group_id: &str) -> rusqlite::Result<Vec<SubjectSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT
               s.id,
               s.subject_code,
               sm.avg_score,
               (SELECT COUNT(*) FROM ratings r WHERE r.subject_id = s.id) AS rating_count
             FROM subjects s
             LEFT JOIN summaries sm ON sm.subject_id = s.id AND sm.group_id = s.group_id
             WHERE s.group_id = ?
             ORDER BY s.subject_code",
        )?;
        let rows = stmt
            .query_map([group_id], |r| {
                Ok(SubjectSummary {
                    subject_id: r.get(0)?,
                    subject_code: r.get(1)?,
                    avg_score: r.get(2)?,
                    rating_count: r.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn rating_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<RatingRecord> {
    Ok(RatingRecord {
        id: r.get(0)?,
        subject_id: r.get(1)?,
        ordinal: r.get(2)?,
        student_name: r.get(3)?,
        score: r.get(4)?,
    })
}

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DB_FILE_NAME: &str = "ratings.sqlite3";

pub fn db_path(workspace: &Path) -> PathBuf {
    workspace.join(DB_FILE_NAME)
}

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let conn = Connection::open(db_path(workspace))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Concurrent imports on distinct subjects share the file; writers wait for
/// the lock instead of failing with SQLITE_BUSY.
pub fn set_busy_timeout(conn: &Connection, millis: u64) -> anyhow::Result<()> {
    conn.busy_timeout(Duration::from_millis(millis))?;
    Ok(())
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS groups(
            id TEXT PRIMARY KEY,
            group_code TEXT NOT NULL UNIQUE,
            student_count INTEGER NOT NULL,
            subject_count INTEGER NOT NULL,
            created_at TEXT,
            updated_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            group_id TEXT NOT NULL,
            subject_code TEXT NOT NULL,
            created_at TEXT,
            FOREIGN KEY(group_id) REFERENCES groups(id) ON DELETE CASCADE,
            UNIQUE(group_id, subject_code)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_subjects_group ON subjects(group_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ratings(
            id TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL,
            ordinal INTEGER NOT NULL,
            score REAL NOT NULL CHECK(score >= 0 AND score <= 100),
            created_at TEXT,
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
            UNIQUE(subject_id, ordinal)
        )",
        [],
    )?;
    // Workspaces created before names were kept on rating rows lack these.
    ensure_ratings_student_name(conn)?;
    ensure_ratings_updated_at(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ratings_subject ON ratings(subject_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS summaries(
            id TEXT PRIMARY KEY,
            group_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            avg_score REAL NOT NULL,
            updated_at TEXT,
            FOREIGN KEY(group_id) REFERENCES groups(id) ON DELETE CASCADE,
            FOREIGN KEY(subject_id) REFERENCES subjects(id) ON DELETE CASCADE,
            UNIQUE(group_id, subject_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn ensure_ratings_student_name(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "ratings", "student_name")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE ratings ADD COLUMN student_name TEXT", [])?;
    Ok(())
}

fn ensure_ratings_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "ratings", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE ratings ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(
            serde_json::from_str(&s).with_context(|| format!("settings key {key} is not JSON"))?,
        )),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, value.to_string()),
    )?;
    Ok(())
}

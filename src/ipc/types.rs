use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;
use serde::Deserialize;

use crate::import::{ImportCoordinator, ImportHandle, SubjectLocks};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub importer: Option<ImportCoordinator>,
    /// One registry per canonical workspace path, kept across reselects so
    /// jobs still running hold the same locks as new imports.
    pub subject_locks: HashMap<PathBuf, Arc<SubjectLocks>>,
    /// Background imports whose final status has not been read yet.
    pub jobs: HashMap<String, ImportHandle>,
}

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod import;
pub mod ipc;
pub mod reconcile;
pub mod report;
pub mod store;
pub mod summary;

pub mod core;
pub mod groups;
pub mod jobs;
pub mod ratings;
pub mod settings;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Source folder not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Source is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid rule '{name}': {message}")]
    InvalidRule { name: String, message: String },

    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Plan format error: {0}")]
    PlanFormat(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Remote classification error: {0}")]
    Remote(#[from] crate::remote::RemoteError),

    #[error("Operation cancelled")]
    Cancelled,
}

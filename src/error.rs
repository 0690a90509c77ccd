use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridmorphError {
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Task data error: {0}")]
    TaskData(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GridmorphError>;

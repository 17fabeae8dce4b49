use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the IngFarm crates.
#[derive(Error, Debug)]
pub enum FarmError {
    /// A cow, sensor or other record with the given id does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// A caller-supplied value (date, id, kind) could not be parsed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A record with the same id is already stored.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed or written.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FarmError {
    /// Shorthand for a missing cow.
    pub fn cow_not_found(id: impl ToString) -> Self {
        FarmError::NotFound {
            entity: "Cow",
            id: id.to_string(),
        }
    }

    /// Arithmetic on `what` left the representable decimal range.
    pub fn overflow(what: &str) -> Self {
        FarmError::InvalidArgument(format!("{} overflow", what))
    }
}

/// Convenience alias used throughout the farm crates.
pub type Result<T> = std::result::Result<T, FarmError>;

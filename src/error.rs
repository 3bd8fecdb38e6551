use serde::Serialize;
use thiserror::Error;

/// One material the inventory cannot cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    pub material: String,
    pub required: i64,
    pub available: i64,
}

impl std::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (required: {}, available: {})",
            self.material, self.required, self.available
        )
    }
}

/// Errors surfaced by tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Missing or malformed input (empty names, non-integer or negative levels).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// One or more materials are short; nothing was deducted.
    #[error("not enough materials: {}", join_shortfalls(.0))]
    InsufficientResources(Vec<Shortfall>),

    /// Returned when a referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Wrapper around sqlx errors.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TrackerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        TrackerError::InvalidInput(message.into())
    }

    /// Shortfalls carried by an insufficiency failure, empty otherwise.
    pub fn shortfalls(&self) -> &[Shortfall] {
        match self {
            TrackerError::InsufficientResources(missing) => missing,
            _ => &[],
        }
    }
}

fn join_shortfalls(missing: &[Shortfall]) -> String {
    missing
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

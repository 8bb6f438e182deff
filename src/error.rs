use thiserror::Error;

/// Failure outcomes shared by services and handlers.
///
/// The first six variants carry a message that is safe to show to the
/// client. The last two are internal faults and are reported generically.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Too many attempts, try again later")]
    TooManyRequests,

    #[error("Request timed out")]
    Timeout,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

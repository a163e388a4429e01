use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// A recurrence rule or other input violates its invariants. Nothing was written.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested operation cannot apply to the current task/rule combination.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ambiguous short ID. Did you mean one of these?")]
    AmbiguousId(Vec<(String, String)>), // Vec of (ID, Title)

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

impl CoreError {
    /// Store failures are the only errors a caller can expect to succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Persistence(_) | CoreError::Io(_))
    }

    /// SQLite reported the database busy or locked. This includes a deferred
    /// transaction whose snapshot went stale before it could start writing.
    pub fn is_busy(&self) -> bool {
        match self {
            CoreError::Persistence(sqlx::Error::Database(db)) => db
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map_or(false, |code| matches!(code & 0xff, 5 | 6)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_store_failures_are_retryable() {
        assert!(CoreError::Persistence(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!CoreError::Validation("interval".to_string()).is_retryable());
        assert!(!CoreError::InvalidState("gone".to_string()).is_retryable());
    }

    #[test]
    fn test_only_database_errors_can_be_busy() {
        assert!(!CoreError::Persistence(sqlx::Error::PoolTimedOut).is_busy());
        assert!(!CoreError::Persistence(sqlx::Error::RowNotFound).is_busy());
        assert!(!CoreError::InvalidState("already completed".to_string()).is_busy());
    }
}

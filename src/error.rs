use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// PTY spawn or control failures.
    #[error("PTY error: {0}")]
    Pty(String),

    /// Git command failures.
    #[error("Git error: {0}")]
    Git(String),

    /// Configuration file problems.
    #[error("Config error: {0}")]
    Config(String),
}

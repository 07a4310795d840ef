use thiserror::Error as ThisError;

pub type TestUtilsResult<T> = Result<T, TestUtilsError>;

#[derive(Debug, ThisError)]
pub enum TestUtilsError {
    #[error("Logging error: {0}")]
    LoggingError(String),
    #[error("Timed out after {0:?} waiting for {1}")]
    Timeout(std::time::Duration, String),
    #[error("Unknown error: {0}")]
    UnknownError(String),
}

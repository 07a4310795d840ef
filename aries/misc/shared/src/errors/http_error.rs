use thiserror::Error as ThisError;

pub type HttpResult<T> = Result<T, HttpError>;

#[derive(Debug, ThisError)]
#[error("HTTP error: {msg}")]
pub struct HttpError {
    msg: String,
    status: Option<u16>,
}

impl HttpError {
    pub fn from_msg<D: std::fmt::Display>(msg: D) -> Self {
        Self {
            msg: msg.to_string(),
            status: None,
        }
    }

    pub fn from_status<D: std::fmt::Display>(status: u16, msg: D) -> Self {
        Self {
            msg: msg.to_string(),
            status: Some(status),
        }
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }

    /// HTTP status of the failed exchange, `None` when no response was received.
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

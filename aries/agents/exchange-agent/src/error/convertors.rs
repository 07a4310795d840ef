use std::convert::From;

use shared::errors::http_error::HttpError;

use crate::{backend::error::BackendError, error::*};

impl From<BackendError> for AgentError {
    fn from(err: BackendError) -> AgentError {
        error!("Backend Error: {}", err.message());
        let kind = AgentErrorKind::BackendError;
        let message = format!("{}: {}", err.name(), err.backend_message());
        AgentError { message, kind }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(serde_err: serde_json::Error) -> AgentError {
        let kind = AgentErrorKind::SerializationError;
        let message = format!("(De)serialization failed; err: {:?}", serde_err.to_string());
        AgentError { message, kind }
    }
}

impl From<HttpError> for AgentError {
    fn from(err: HttpError) -> AgentError {
        warn!("HTTP Error: {}", err);
        let kind = AgentErrorKind::NetworkError;
        let message = format!("HTTP Error; err: {:?}", err.msg());
        AgentError { message, kind }
    }
}

impl From<url::ParseError> for AgentError {
    fn from(err: url::ParseError) -> AgentError {
        let kind = AgentErrorKind::ValidationError;
        let message = format!("Invalid URL; err: {:?}", err.to_string());
        AgentError { message, kind }
    }
}

impl From<base64::DecodeError> for AgentError {
    fn from(err: base64::DecodeError) -> AgentError {
        let kind = AgentErrorKind::SerializationError;
        let message = format!("Base64 decoding failed; err: {:?}", err.to_string());
        AgentError { message, kind }
    }
}

impl From<std::string::FromUtf8Error> for AgentError {
    fn from(err: std::string::FromUtf8Error) -> AgentError {
        let kind = AgentErrorKind::SerializationError;
        let message = format!("Payload is not valid utf-8; err: {:?}", err.to_string());
        AgentError { message, kind }
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> AgentError {
        error!("Storage IO Error: {}", err);
        let kind = AgentErrorKind::BackendError;
        let message = format!("Storage IO failed; err: {:?}", err.to_string());
        AgentError { message, kind }
    }
}

impl From<tokio::time::error::Elapsed> for AgentError {
    fn from(_: tokio::time::error::Elapsed) -> AgentError {
        let kind = AgentErrorKind::NetworkError;
        let message = "Operation timed out".to_string();
        AgentError { message, kind }
    }
}

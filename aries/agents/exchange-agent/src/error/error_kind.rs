#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AgentErrorKind {
    #[error("Backend operation failed")]
    BackendError,
    #[error("Message delivery failed")]
    NetworkError,
    #[error("Operation not supported in current record state")]
    ProtocolStateError,
    #[error("Validation failed")]
    ValidationError,
    #[error("Mediator registration failed")]
    RegistrationError,
    #[error("Object not found")]
    NotFound,
    #[error("Unable to lock storage")]
    LockError,
    #[error("(De)serialization failed")]
    SerializationError,
    #[error("Invalid arguments passed")]
    InvalidArguments,
}

use super::AgentError;

pub type AgentResult<T> = Result<T, AgentError>;

pub mod encryption_envelope;
pub mod inbound;
pub mod mediator_client;
pub mod outbound;
pub mod routing;

use async_trait::async_trait;
use url::Url;

use crate::error::AgentResult;

/// Request/response delivery of packed messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `message` to `endpoint` and returns the response body, which is empty unless the
    /// receiver answers on the same connection.
    async fn send_message(&self, message: Vec<u8>, endpoint: &Url) -> AgentResult<Vec<u8>>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HttpTransport;

#[async_trait]
impl Transport for HttpTransport {
    async fn send_message(&self, message: Vec<u8>, endpoint: &Url) -> AgentResult<Vec<u8>> {
        Ok(shared::http_client::post_message(message, endpoint).await?)
    }
}

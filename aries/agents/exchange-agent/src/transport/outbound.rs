use std::sync::Arc;

use crate::{
    backend::BaseBackend,
    error::{AgentError, AgentErrorKind, AgentResult},
    messages::AriesMessage,
    protocols::connection::ConnectionRecord,
    transport::{encryption_envelope::EncryptionEnvelope, Transport},
};

/// Packs protocol messages for the peer of a connection and delivers them.
pub struct OutboundTransport {
    backend: Arc<dyn BaseBackend>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for OutboundTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundTransport").finish_non_exhaustive()
    }
}

impl OutboundTransport {
    pub fn new(backend: Arc<dyn BaseBackend>, transport: Arc<dyn Transport>) -> Self {
        Self { backend, transport }
    }

    pub async fn send_message(
        &self,
        connection: &ConnectionRecord,
        message: &AriesMessage,
    ) -> AgentResult<()> {
        let their_did_doc = connection.their_did_doc.as_ref().ok_or_else(|| {
            AgentError::from_msg(
                AgentErrorKind::ProtocolStateError,
                &format!("Connection {} has no peer to send to", connection.id),
            )
        })?;
        info!(
            "Sending {:?} message on connection {} to {}",
            message.family(),
            connection.id,
            their_did_doc.service_endpoint
        );
        let payload = serde_json::to_vec(message)?;
        let EncryptionEnvelope(envelope) = EncryptionEnvelope::create(
            self.backend.as_ref(),
            &payload,
            Some(connection.pairwise_verkey()),
            their_did_doc,
        )
        .await?;
        self.transport
            .send_message(envelope, &their_did_doc.service_endpoint)
            .await
            .map(|_| ())
            .map_err(|err| {
                error!(
                    "Delivery on connection {} failed: {}",
                    connection.id, err
                );
                AgentError::from_msg(AgentErrorKind::NetworkError, &err.message)
            })
    }
}

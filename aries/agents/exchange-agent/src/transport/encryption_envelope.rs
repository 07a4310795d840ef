use crate::{
    backend::{types::UnpackedMessage, BaseBackend},
    error::AgentResult,
    messages::{connection::DidDoc, routing::Forward},
};

/// A message packed for a peer and wrapped once per routing key of the peer's DID document.
#[derive(Debug)]
pub struct EncryptionEnvelope(pub Vec<u8>);

impl EncryptionEnvelope {
    pub async fn create(
        backend: &dyn BaseBackend,
        message: &[u8],
        sender_key: Option<&str>,
        did_doc: &DidDoc,
    ) -> AgentResult<EncryptionEnvelope> {
        let recipient_key = did_doc.recipient_key()?;
        trace!(
            "EncryptionEnvelope::create >> recipient_key: {}, routing_keys: {:?}",
            recipient_key,
            did_doc.routing_keys
        );

        let packed = Self::encrypt_for_pairwise(backend, message, sender_key, recipient_key).await?;
        Self::wrap_into_forward_messages(backend, packed, recipient_key, &did_doc.routing_keys)
            .await
            .map(EncryptionEnvelope)
    }

    async fn encrypt_for_pairwise(
        backend: &dyn BaseBackend,
        message: &[u8],
        sender_key: Option<&str>,
        recipient_key: &str,
    ) -> AgentResult<Vec<u8>> {
        Ok(backend
            .pack(message, &[recipient_key.to_string()], sender_key)
            .await?)
    }

    async fn wrap_into_forward_messages(
        backend: &dyn BaseBackend,
        mut data: Vec<u8>,
        recipient_key: &str,
        routing_keys: &[String],
    ) -> AgentResult<Vec<u8>> {
        let mut forward_to_key = recipient_key;

        for routing_key in routing_keys {
            debug!(
                "Wrapping message in forward to {}, anoncrypted for {}",
                forward_to_key, routing_key
            );
            data = Self::wrap_into_forward(backend, data, forward_to_key, routing_key).await?;
            forward_to_key = routing_key;
        }
        Ok(data)
    }

    async fn wrap_into_forward(
        backend: &dyn BaseBackend,
        data: Vec<u8>,
        forward_to_key: &str,
        routing_key: &str,
    ) -> AgentResult<Vec<u8>> {
        let message = Forward::new(forward_to_key, serde_json::from_slice(&data)?);
        let message = serde_json::to_vec(&message)?;
        Ok(backend
            .pack(&message, &[routing_key.to_string()], None)
            .await?)
    }

    /// Decrypts `packed`, peeling off forward layers addressed to keys this wallet holds.
    pub async fn unpack(backend: &dyn BaseBackend, packed: &[u8]) -> AgentResult<UnpackedMessage> {
        let mut unpacked = backend.unpack(packed).await?;
        while let Some(forward) = Forward::try_from_message(&unpacked.message) {
            trace!("EncryptionEnvelope::unpack >> unwrapping forward to {}", forward.to);
            let inner = serde_json::to_vec(&forward.msg)?;
            unpacked = backend.unpack(&inner).await?;
        }
        Ok(unpacked)
    }
}

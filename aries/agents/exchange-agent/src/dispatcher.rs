use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    backend::{types::UnpackedMessage, BaseBackend},
    error::*,
    handlers::{
        connection::ServiceConnections, credential::ServiceCredentials, proof::ServiceProofs,
    },
    messages::{
        connection::Connection, cred_issuance::CredentialIssuance, present_proof::PresentProof,
        AriesMessage,
    },
    transport::{encryption_envelope::EncryptionEnvelope, inbound::InboundMessageHandler},
};

/// Routes decrypted inbound messages to the service owning their protocol.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn BaseBackend>,
    connections: Arc<ServiceConnections>,
    credentials: Arc<ServiceCredentials>,
    proofs: Arc<ServiceProofs>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn BaseBackend>,
        connections: Arc<ServiceConnections>,
        credentials: Arc<ServiceCredentials>,
        proofs: Arc<ServiceProofs>,
    ) -> Self {
        Self {
            backend,
            connections,
            credentials,
            proofs,
        }
    }

    pub async fn dispatch(&self, packed: &[u8]) -> AgentResult<()> {
        let unpacked = EncryptionEnvelope::unpack(self.backend.as_ref(), packed).await?;
        let message: AriesMessage = serde_json::from_str(&unpacked.message)?;
        debug!(
            "Dispatching {:?} message on thread {}",
            message.family(),
            message.thread_id()
        );
        self.dispatch_message(message, &unpacked).await
    }

    async fn dispatch_message(
        &self,
        message: AriesMessage,
        unpacked: &UnpackedMessage,
    ) -> AgentResult<()> {
        match message {
            AriesMessage::Connection(message) => self.dispatch_connection(message, unpacked).await,
            AriesMessage::CredentialIssuance(message) => {
                let connection_id = self.connections.resolve_connection_id(unpacked)?;
                self.dispatch_credential(&connection_id, message).await
            }
            AriesMessage::PresentProof(message) => {
                let connection_id = self.connections.resolve_connection_id(unpacked)?;
                self.dispatch_proof(&connection_id, message).await
            }
        }
    }

    async fn dispatch_connection(
        &self,
        message: Connection,
        unpacked: &UnpackedMessage,
    ) -> AgentResult<()> {
        let record = match message {
            Connection::Invitation(invitation) => {
                return Err(AgentError::from_msg(
                    AgentErrorKind::ValidationError,
                    &format!(
                        "Invitation {} must be received out of band, not as an inbound message",
                        invitation.id
                    ),
                ))
            }
            Connection::Request(request) => {
                self.connections
                    .process_request(request, &unpacked.recipient_verkey)
                    .await?
            }
            Connection::Response(response) => self.connections.process_response(response).await?,
            Connection::Ack(ack) => self.connections.process_ack(ack).await?,
            Connection::ProblemReport(report) => {
                self.connections.process_problem_report(report).await?
            }
        };
        info!("Connection {} moved to {:?}", record.id, record.state);
        Ok(())
    }

    async fn dispatch_credential(
        &self,
        connection_id: &str,
        message: CredentialIssuance,
    ) -> AgentResult<()> {
        let record = match message {
            CredentialIssuance::OfferCredential(offer) => {
                self.credentials.process_offer(connection_id, offer).await?
            }
            CredentialIssuance::RequestCredential(request) => {
                self.credentials
                    .process_request(connection_id, request)
                    .await?
            }
            CredentialIssuance::IssueCredential(credential) => {
                self.credentials
                    .process_credential(connection_id, credential)
                    .await?
            }
            CredentialIssuance::Ack(ack) => self.credentials.process_ack(connection_id, ack).await?,
            CredentialIssuance::ProblemReport(report) => {
                self.credentials
                    .process_problem_report(connection_id, report)
                    .await?
            }
        };
        info!("Credential {} moved to {:?}", record.id, record.state);
        Ok(())
    }

    async fn dispatch_proof(&self, connection_id: &str, message: PresentProof) -> AgentResult<()> {
        let record = match message {
            PresentProof::RequestPresentation(request) => {
                self.proofs.process_request(connection_id, request).await?
            }
            PresentProof::Presentation(presentation) => {
                self.proofs
                    .process_presentation(connection_id, presentation)
                    .await?
            }
            PresentProof::Ack(ack) => self.proofs.process_ack(connection_id, ack).await?,
            PresentProof::ProblemReport(report) => {
                self.proofs
                    .process_problem_report(connection_id, report)
                    .await?
            }
        };
        info!("Proof {} moved to {:?}", record.id, record.state);
        Ok(())
    }
}

#[async_trait]
impl InboundMessageHandler for Dispatcher {
    async fn receive_message(&self, packed: Vec<u8>) -> AgentResult<()> {
        self.dispatch(&packed).await
    }
}

use std::sync::Arc;

use crate::{
    backend::{types::UnpackedMessage, BaseBackend},
    error::*,
    messages::{
        connection::{Invitation, Request, Response},
        notification::{Ack, ProblemReport},
        AriesMessage,
    },
    protocols::connection::{transition, ConnectionEvent, ConnectionRecord, ConnectionRole},
    storage::{agent_storage_inmem::AgentStorageInMem, AgentStorage},
    transport::{outbound::OutboundTransport, routing::Routing},
};

pub const DEFAULT_INVITEE_ALIAS: &str = "INVITEE";

pub struct ServiceConnections {
    backend: Arc<dyn BaseBackend>,
    routing: Arc<Routing>,
    outbound: Arc<OutboundTransport>,
    connections: AgentStorageInMem<ConnectionRecord>,
    label: String,
    auto_accept: bool,
}

impl std::fmt::Debug for ServiceConnections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConnections")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl ServiceConnections {
    pub fn new(
        backend: Arc<dyn BaseBackend>,
        routing: Arc<Routing>,
        outbound: Arc<OutboundTransport>,
        label: &str,
        auto_accept: bool,
    ) -> Self {
        Self {
            backend,
            routing,
            outbound,
            connections: AgentStorageInMem::new("connections"),
            label: label.to_string(),
            auto_accept,
        }
    }

    /// Creates an inviter record; its invitation is shared out of band, see [`Invitation::to_url`].
    pub async fn create_connection(
        &self,
        alias: &str,
        auto_accept: Option<bool>,
    ) -> AgentResult<ConnectionRecord> {
        let pairwise_verkey = self.backend.create_key().await?;
        let record = ConnectionRecord::create_inviter(
            alias,
            &self.label,
            auto_accept.unwrap_or(self.auto_accept),
            self.routing.did_doc(&pairwise_verkey)?,
        );
        self.connections.insert(&record.id, record.clone())?;
        info!(
            "Created connection {} with invitation {}",
            record.id, record.invitation.id
        );
        Ok(record)
    }

    pub async fn receive_invitation(
        &self,
        invitation: Invitation,
        alias: Option<&str>,
        auto_accept: Option<bool>,
    ) -> AgentResult<ConnectionRecord> {
        let pairwise_verkey = self.backend.create_key().await?;
        let record = ConnectionRecord::from_invitation(
            alias.unwrap_or(DEFAULT_INVITEE_ALIAS),
            auto_accept.unwrap_or(self.auto_accept),
            invitation,
            self.routing.did_doc(&pairwise_verkey)?,
        )?;
        self.connections.insert(&record.id, record.clone())?;
        info!(
            "Received invitation {} from {}, connection {}",
            record.invitation.id, record.invitation.label, record.id
        );
        if record.auto_accept {
            return self.accept_invitation(&record.id).await;
        }
        Ok(record)
    }

    pub async fn receive_invitation_from_url(
        &self,
        invitation_url: &str,
        alias: Option<&str>,
        auto_accept: Option<bool>,
    ) -> AgentResult<ConnectionRecord> {
        let invitation = Invitation::from_url(invitation_url)?;
        self.receive_invitation(invitation, alias, auto_accept).await
    }

    pub async fn accept_invitation(&self, connection_id: &str) -> AgentResult<ConnectionRecord> {
        let label = self.label.clone();
        self.apply(connection_id, ConnectionEvent::AcceptInvitation { label })
            .await
    }

    pub async fn accept_request(&self, connection_id: &str) -> AgentResult<ConnectionRecord> {
        self.apply(connection_id, ConnectionEvent::AcceptRequest).await
    }

    pub async fn accept_response(&self, connection_id: &str) -> AgentResult<ConnectionRecord> {
        self.apply(connection_id, ConnectionEvent::AcceptResponse).await
    }

    pub async fn abandon(&self, connection_id: &str) -> AgentResult<ConnectionRecord> {
        self.apply(connection_id, ConnectionEvent::Abandon).await
    }

    pub async fn process_request(
        &self,
        request: Request,
        recipient_verkey: &str,
    ) -> AgentResult<ConnectionRecord> {
        let invitation_id = request.thread.pthid.clone();
        let connection = self
            .find_one(|record| {
                record.role == ConnectionRole::Inviter
                    && (record.pairwise_verkey() == recipient_verkey
                        || Some(&record.invitation.id) == invitation_id.as_ref())
            })?
            .ok_or_else(|| {
                AgentError::from_msg(
                    AgentErrorKind::NotFound,
                    &format!(
                        "No invitation matches connection request {} for key {}",
                        request.id, recipient_verkey
                    ),
                )
            })?;
        let record = self
            .apply(&connection.id, ConnectionEvent::RequestReceived(request))
            .await?;
        if record.auto_accept {
            return self.accept_request(&record.id).await;
        }
        Ok(record)
    }

    pub async fn process_response(&self, response: Response) -> AgentResult<ConnectionRecord> {
        let connection = self.get_by_thread_id(&response.thread.thid, ConnectionRole::Invitee)?;
        let record = self
            .apply(&connection.id, ConnectionEvent::ResponseReceived(response))
            .await?;
        if record.auto_accept {
            return self.accept_response(&record.id).await;
        }
        Ok(record)
    }

    pub async fn process_ack(&self, ack: Ack) -> AgentResult<ConnectionRecord> {
        let connection = self.get_by_thread_id(&ack.thread.thid, ConnectionRole::Inviter)?;
        self.apply(&connection.id, ConnectionEvent::AckReceived(ack))
            .await
    }

    pub async fn process_problem_report(
        &self,
        report: ProblemReport,
    ) -> AgentResult<ConnectionRecord> {
        let thread_id = report.thread.thid.clone();
        let connection = self
            .find_one(|record| {
                record.thread_id.as_deref() == Some(thread_id.as_str())
                    || record.invitation.id == thread_id
            })?
            .ok_or_else(|| {
                AgentError::from_msg(
                    AgentErrorKind::NotFound,
                    &format!("No connection found for thread {}", thread_id),
                )
            })?;
        self.apply(&connection.id, ConnectionEvent::ProblemReportReceived(report))
            .await
    }

    pub async fn send_message(
        &self,
        connection_id: &str,
        message: &AriesMessage,
    ) -> AgentResult<()> {
        let connection = self.get_by_id(connection_id)?;
        self.outbound.send_message(&connection, message).await
    }

    pub fn get_by_id(&self, connection_id: &str) -> AgentResult<ConnectionRecord> {
        self.connections.get(connection_id)
    }

    pub fn list(&self) -> AgentResult<Vec<ConnectionRecord>> {
        self.connections.list_all()
    }

    pub fn exists_by_id(&self, connection_id: &str) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn get_by_thread_id(
        &self,
        thread_id: &str,
        role: ConnectionRole,
    ) -> AgentResult<ConnectionRecord> {
        self.find_one(|record| {
            record.role == role && record.thread_id.as_deref() == Some(thread_id)
        })?
        .ok_or_else(|| {
            AgentError::from_msg(
                AgentErrorKind::NotFound,
                &format!("No {:?} connection found for thread {}", role, thread_id),
            )
        })
    }

    /// Finds the connection a decrypted message arrived on, by the sender's key or, failing
    /// that, by the pairwise key it was encrypted for.
    pub fn resolve_connection_id(&self, unpacked: &UnpackedMessage) -> AgentResult<String> {
        if let Some(sender_verkey) = unpacked.sender_verkey.as_deref() {
            let by_sender = self.find_one(|record| {
                record.their_did_doc.as_ref().is_some_and(|did_doc| {
                    did_doc.recipient_keys.iter().any(|key| key == sender_verkey)
                })
            })?;
            if let Some(record) = by_sender {
                return Ok(record.id);
            }
        }
        self.find_one(|record| record.pairwise_verkey() == unpacked.recipient_verkey)?
            .map(|record| record.id)
            .ok_or_else(|| {
                AgentError::from_msg(
                    AgentErrorKind::NotFound,
                    &format!(
                        "No connection found for sender {:?} / recipient {}",
                        unpacked.sender_verkey, unpacked.recipient_verkey
                    ),
                )
            })
    }

    fn find_one<F>(&self, predicate: F) -> AgentResult<Option<ConnectionRecord>>
    where
        F: FnMut(&ConnectionRecord) -> bool,
    {
        Ok(self.connections.find_by(predicate)?.into_iter().next())
    }

    async fn apply(
        &self,
        connection_id: &str,
        event: ConnectionEvent,
    ) -> AgentResult<ConnectionRecord> {
        let (record, message) = self.connections.update(connection_id, |record| {
            let (next, message) = transition(record, event)?;
            Ok((next.clone(), (next, message)))
        })?;
        debug!("Connection {} is now {:?}", record.id, record.state);
        if let Some(message) = message {
            self.outbound.send_message(&record, &message).await?;
        }
        Ok(record)
    }
}

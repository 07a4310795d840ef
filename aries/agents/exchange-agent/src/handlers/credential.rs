use std::sync::Arc;

use super::{connection::ServiceConnections, ledger::ServiceLedger};
use crate::{
    error::*,
    messages::{
        cred_issuance::{IssueCredential, OfferCredential, RequestCredential},
        notification::{Ack, ProblemReport},
    },
    protocols::issuance::{
        transition, CredentialEvent, CredentialRecord, CredentialRole, OfferCredentialParams,
    },
    storage::{agent_storage_inmem::AgentStorageInMem, AgentStorage},
};

pub struct ServiceCredentials {
    ledger: Arc<ServiceLedger>,
    service_connections: Arc<ServiceConnections>,
    credentials: AgentStorageInMem<CredentialRecord>,
    auto_accept: bool,
}

impl std::fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("credentials", &self.credentials)
            .field("auto_accept", &self.auto_accept)
            .finish_non_exhaustive()
    }
}

impl ServiceCredentials {
    pub fn new(
        ledger: Arc<ServiceLedger>,
        service_connections: Arc<ServiceConnections>,
        auto_accept: bool,
    ) -> Self {
        Self {
            ledger,
            service_connections,
            credentials: AgentStorageInMem::new("credentials"),
            auto_accept,
        }
    }

    /// Starts an issuance as issuer. The record is stored before the offer goes out, so a
    /// delivery failure leaves it in `OfferSent`.
    pub async fn offer_credential(
        &self,
        connection_id: &str,
        params: OfferCredentialParams,
    ) -> AgentResult<CredentialRecord> {
        trace!(
            "ServiceCredentials::offer_credential >> connection_id: {}, cred_def_id: {}",
            connection_id,
            params.cred_def_id
        );
        self.ensure_connection_complete(connection_id)?;
        let cred_def = self
            .ledger
            .get_credential_definition(&params.cred_def_id)
            .await?;
        let (record, offer) =
            CredentialRecord::create_offer(connection_id, params, Some(cred_def.schema_id))?;
        self.credentials.insert(&record.id, record.clone())?;
        info!(
            "Offering credential {} on connection {}",
            record.id, connection_id
        );
        self.service_connections
            .send_message(connection_id, &offer)
            .await?;
        Ok(record)
    }

    pub async fn accept_offer(&self, credential_id: &str) -> AgentResult<CredentialRecord> {
        self.apply(credential_id, CredentialEvent::AcceptOffer)
            .await
    }

    pub async fn decline_offer(
        &self,
        credential_id: &str,
        reason: &str,
    ) -> AgentResult<CredentialRecord> {
        self.apply(
            credential_id,
            CredentialEvent::DeclineOffer {
                reason: reason.to_string(),
            },
        )
        .await
    }

    pub async fn accept_request(&self, credential_id: &str) -> AgentResult<CredentialRecord> {
        self.apply(credential_id, CredentialEvent::AcceptRequest)
            .await
    }

    pub async fn accept_credential(&self, credential_id: &str) -> AgentResult<CredentialRecord> {
        self.apply(credential_id, CredentialEvent::AcceptCredential)
            .await
    }

    pub async fn process_offer(
        &self,
        connection_id: &str,
        offer: OfferCredential,
    ) -> AgentResult<CredentialRecord> {
        if let Some(existing) =
            self.find_by_thread_id(connection_id, &offer.id, CredentialRole::Holder)?
        {
            warn!(
                "Ignoring redelivered credential offer {} on connection {}",
                offer.id, connection_id
            );
            return Ok(existing);
        }
        let record = CredentialRecord::from_offer(Some(connection_id), offer)?;
        self.credentials.insert(&record.id, record.clone())?;
        info!(
            "Received credential offer {} on connection {}",
            record.id, connection_id
        );
        if self.auto_accept {
            return self.accept_offer(&record.id).await;
        }
        Ok(record)
    }

    pub async fn process_request(
        &self,
        connection_id: &str,
        request: RequestCredential,
    ) -> AgentResult<CredentialRecord> {
        let credential = self.get_by_thread_id(
            connection_id,
            &request.thread.thid,
            CredentialRole::Issuer,
        )?;
        let record = self
            .apply(&credential.id, CredentialEvent::RequestReceived(request))
            .await?;
        if self.auto_accept {
            return self.accept_request(&record.id).await;
        }
        Ok(record)
    }

    pub async fn process_credential(
        &self,
        connection_id: &str,
        credential: IssueCredential,
    ) -> AgentResult<CredentialRecord> {
        let existing = self.get_by_thread_id(
            connection_id,
            &credential.thread.thid,
            CredentialRole::Holder,
        )?;
        let record = self
            .apply(&existing.id, CredentialEvent::CredentialReceived(credential))
            .await?;
        if self.auto_accept {
            return self.accept_credential(&record.id).await;
        }
        Ok(record)
    }

    pub async fn process_ack(
        &self,
        connection_id: &str,
        ack: Ack,
    ) -> AgentResult<CredentialRecord> {
        let credential =
            self.get_by_thread_id(connection_id, &ack.thread.thid, CredentialRole::Issuer)?;
        self.apply(&credential.id, CredentialEvent::AckReceived(ack))
            .await
    }

    pub async fn process_problem_report(
        &self,
        connection_id: &str,
        report: ProblemReport,
    ) -> AgentResult<CredentialRecord> {
        let thread_id = report.thread.thid.clone();
        let credential = self
            .credentials
            .find_by(|record| {
                record.thread_id == thread_id
                    && record.connection_id.as_deref() == Some(connection_id)
            })?
            .into_iter()
            .next()
            .ok_or_else(|| Self::thread_not_found(connection_id, &thread_id))?;
        self.apply(&credential.id, CredentialEvent::ProblemReportReceived(report))
            .await
    }

    /// Credentials usable in presentations, in the order they were stored.
    pub fn held_credentials(&self) -> AgentResult<Vec<CredentialRecord>> {
        self.credentials
            .find_by(CredentialRecord::is_held_credential)
    }

    pub fn get_by_id(&self, credential_id: &str) -> AgentResult<CredentialRecord> {
        self.credentials.get(credential_id)
    }

    pub fn list(&self) -> AgentResult<Vec<CredentialRecord>> {
        self.credentials.list_all()
    }

    pub fn exists_by_id(&self, credential_id: &str) -> bool {
        self.credentials.contains_key(credential_id)
    }

    fn get_by_thread_id(
        &self,
        connection_id: &str,
        thread_id: &str,
        role: CredentialRole,
    ) -> AgentResult<CredentialRecord> {
        self.find_by_thread_id(connection_id, thread_id, role)?
            .ok_or_else(|| Self::thread_not_found(connection_id, thread_id))
    }

    fn find_by_thread_id(
        &self,
        connection_id: &str,
        thread_id: &str,
        role: CredentialRole,
    ) -> AgentResult<Option<CredentialRecord>> {
        Ok(self
            .credentials
            .find_by(|record| {
                record.role == role
                    && record.thread_id == thread_id
                    && record.connection_id.as_deref() == Some(connection_id)
            })?
            .into_iter()
            .next())
    }

    fn thread_not_found(connection_id: &str, thread_id: &str) -> AgentError {
        AgentError::from_msg(
            AgentErrorKind::NotFound,
            &format!(
                "No credential exchange on connection {} with thread {}",
                connection_id, thread_id
            ),
        )
    }

    fn ensure_connection_complete(&self, connection_id: &str) -> AgentResult<()> {
        let connection = self.service_connections.get_by_id(connection_id)?;
        if connection.is_complete() {
            Ok(())
        } else {
            Err(AgentError::from_msg(
                AgentErrorKind::ProtocolStateError,
                &format!(
                    "Connection {} is {:?}, credentials need a complete connection",
                    connection_id, connection.state
                ),
            ))
        }
    }

    async fn apply(
        &self,
        credential_id: &str,
        event: CredentialEvent,
    ) -> AgentResult<CredentialRecord> {
        let (record, message) = self.credentials.update(credential_id, |record| {
            let (next, message) = transition(record, event)?;
            Ok((next.clone(), (next, message)))
        })?;
        debug!("Credential {} is now {:?}", record.id, record.state);
        if let (Some(message), Some(connection_id)) = (message, record.connection_id.as_deref()) {
            self.service_connections
                .send_message(connection_id, &message)
                .await?;
        }
        Ok(record)
    }
}

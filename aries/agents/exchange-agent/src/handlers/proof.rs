use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use super::{connection::ServiceConnections, credential::ServiceCredentials};
use crate::{
    error::*,
    messages::{
        notification::{Ack, ProblemReport},
        present_proof::{Presentation, ProofAttributeInfo, RequestPresentation},
        AriesMessage,
    },
    protocols::proof_presentation::{self, transition, ProofEvent, ProofRecord, ProofRole},
    storage::{agent_storage_inmem::AgentStorageInMem, AgentStorage},
};

pub struct ServiceProofs {
    service_connections: Arc<ServiceConnections>,
    service_credentials: Arc<ServiceCredentials>,
    proofs: AgentStorageInMem<ProofRecord>,
    auto_accept: bool,
}

impl std::fmt::Debug for ServiceProofs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProofs")
            .field("proofs", &self.proofs)
            .field("auto_accept", &self.auto_accept)
            .finish_non_exhaustive()
    }
}

impl ServiceProofs {
    pub fn new(
        service_connections: Arc<ServiceConnections>,
        service_credentials: Arc<ServiceCredentials>,
        auto_accept: bool,
    ) -> Self {
        Self {
            service_connections,
            service_credentials,
            proofs: AgentStorageInMem::new("proofs"),
            auto_accept,
        }
    }

    pub async fn request_proof(
        &self,
        connection_id: &str,
        name: &str,
        requested_attributes: BTreeMap<String, ProofAttributeInfo>,
    ) -> AgentResult<ProofRecord> {
        trace!(
            "ServiceProofs::request_proof >> connection_id: {}, name: {}",
            connection_id,
            name
        );
        let connection = self.service_connections.get_by_id(connection_id)?;
        if !connection.is_complete() {
            return Err(AgentError::from_msg(
                AgentErrorKind::ProtocolStateError,
                &format!(
                    "Connection {} is {:?}, proofs need a complete connection",
                    connection_id, connection.state
                ),
            ));
        }
        let (record, request) =
            ProofRecord::create_request(connection_id, name, requested_attributes)?;
        self.proofs.insert(&record.id, record.clone())?;
        info!("Requesting proof {} on connection {}", record.id, connection_id);
        self.service_connections
            .send_message(connection_id, &request)
            .await?;
        Ok(record)
    }

    /// Presents held credentials for a received request. `selection` maps referents to
    /// credential record ids; unselected referents take the first matching credential.
    pub async fn accept_proof_request(
        &self,
        proof_id: &str,
        selection: Option<HashMap<String, String>>,
    ) -> AgentResult<ProofRecord> {
        let held = self.service_credentials.held_credentials()?;
        let (record, message) = self.proofs.update(proof_id, |record| {
            let (next, message) =
                proof_presentation::accept_request(record, &held, selection.as_ref())?;
            Ok((next.clone(), (next, message)))
        })?;
        self.deliver(record, message).await
    }

    pub async fn decline_proof_request(
        &self,
        proof_id: &str,
        reason: &str,
    ) -> AgentResult<ProofRecord> {
        self.apply(
            proof_id,
            ProofEvent::DeclineRequest {
                reason: reason.to_string(),
            },
        )
        .await
    }

    pub async fn accept_presentation(&self, proof_id: &str) -> AgentResult<ProofRecord> {
        self.apply(proof_id, ProofEvent::AcceptPresentation).await
    }

    pub async fn process_request(
        &self,
        connection_id: &str,
        request: RequestPresentation,
    ) -> AgentResult<ProofRecord> {
        if let Some(existing) =
            self.find_by_thread_id(connection_id, &request.id, Some(ProofRole::Prover))?
        {
            warn!(
                "Ignoring redelivered proof request {} on connection {}",
                request.id, connection_id
            );
            return Ok(existing);
        }
        let record = ProofRecord::from_request(Some(connection_id), request);
        self.proofs.insert(&record.id, record.clone())?;
        info!(
            "Received proof request {} ({}) on connection {}",
            record.id, record.name, connection_id
        );
        if self.auto_accept {
            return self.accept_proof_request(&record.id, None).await;
        }
        Ok(record)
    }

    pub async fn process_presentation(
        &self,
        connection_id: &str,
        presentation: Presentation,
    ) -> AgentResult<ProofRecord> {
        let proof = self.get_by_thread_id(
            connection_id,
            &presentation.thread.thid,
            Some(ProofRole::Verifier),
        )?;
        let record = self
            .apply(&proof.id, ProofEvent::PresentationReceived(presentation))
            .await?;
        if self.auto_accept {
            return self.accept_presentation(&record.id).await;
        }
        Ok(record)
    }

    pub async fn process_ack(&self, connection_id: &str, ack: Ack) -> AgentResult<ProofRecord> {
        let proof =
            self.get_by_thread_id(connection_id, &ack.thread.thid, Some(ProofRole::Prover))?;
        self.apply(&proof.id, ProofEvent::AckReceived(ack)).await
    }

    pub async fn process_problem_report(
        &self,
        connection_id: &str,
        report: ProblemReport,
    ) -> AgentResult<ProofRecord> {
        let proof = self.get_by_thread_id(connection_id, &report.thread.thid, None)?;
        self.apply(&proof.id, ProofEvent::ProblemReportReceived(report))
            .await
    }

    pub fn get_by_id(&self, proof_id: &str) -> AgentResult<ProofRecord> {
        self.proofs.get(proof_id)
    }

    pub fn list(&self) -> AgentResult<Vec<ProofRecord>> {
        self.proofs.list_all()
    }

    pub fn exists_by_id(&self, proof_id: &str) -> bool {
        self.proofs.contains_key(proof_id)
    }

    fn get_by_thread_id(
        &self,
        connection_id: &str,
        thread_id: &str,
        role: Option<ProofRole>,
    ) -> AgentResult<ProofRecord> {
        self.find_by_thread_id(connection_id, thread_id, role)?
            .ok_or_else(|| {
                AgentError::from_msg(
                    AgentErrorKind::NotFound,
                    &format!(
                        "No proof exchange on connection {} with thread {}",
                        connection_id, thread_id
                    ),
                )
            })
    }

    fn find_by_thread_id(
        &self,
        connection_id: &str,
        thread_id: &str,
        role: Option<ProofRole>,
    ) -> AgentResult<Option<ProofRecord>> {
        Ok(self
            .proofs
            .find_by(|record| {
                role.map_or(true, |role| record.role == role)
                    && record.thread_id == thread_id
                    && record.connection_id.as_deref() == Some(connection_id)
            })?
            .into_iter()
            .next())
    }

    async fn apply(&self, proof_id: &str, event: ProofEvent) -> AgentResult<ProofRecord> {
        let (record, message) = self.proofs.update(proof_id, |record| {
            let (next, message) = transition(record, event)?;
            Ok((next.clone(), (next, message)))
        })?;
        self.deliver(record, message).await
    }

    async fn deliver(
        &self,
        record: ProofRecord,
        message: Option<AriesMessage>,
    ) -> AgentResult<ProofRecord> {
        debug!("Proof {} is now {:?}", record.id, record.state);
        if let (Some(message), Some(connection_id)) = (message, record.connection_id.as_deref()) {
            self.service_connections
                .send_message(connection_id, &message)
                .await?;
        }
        Ok(record)
    }
}

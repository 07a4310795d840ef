use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{issuance::CredentialRecord, state_not_supported};
use crate::{
    error::{AgentError, AgentErrorKind, AgentResult},
    messages::{
        decorators::Thread,
        notification::{Ack, ProblemReport},
        present_proof::{
            Presentation, PresentProof, ProofAttributeInfo, RequestPresentation,
            RevealedAttribute,
        },
        AriesMessage,
    },
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProofState {
    RequestSent,
    RequestReceived,
    PresentationSent,
    PresentationReceived,
    Done,
    Abandoned,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProofRole {
    Verifier,
    Prover,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRecord {
    pub id: String,
    pub connection_id: Option<String>,
    pub role: ProofRole,
    pub thread_id: String,
    pub state: ProofState,
    pub name: String,
    pub requested_attributes: BTreeMap<String, ProofAttributeInfo>,
    pub presented_values: BTreeMap<String, RevealedAttribute>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub enum ProofEvent {
    AcceptRequest {
        revealed: BTreeMap<String, RevealedAttribute>,
    },
    DeclineRequest {
        reason: String,
    },
    PresentationReceived(Presentation),
    AcceptPresentation,
    AckReceived(Ack),
    ProblemReportReceived(ProblemReport),
}

impl ProofEvent {
    fn name(&self) -> &'static str {
        match self {
            ProofEvent::AcceptRequest { .. } => "accepting proof request",
            ProofEvent::DeclineRequest { .. } => "declining proof request",
            ProofEvent::PresentationReceived(_) => "presentation",
            ProofEvent::AcceptPresentation => "accepting presentation",
            ProofEvent::AckReceived(_) => "presentation ack",
            ProofEvent::ProblemReportReceived(_) => "problem report",
        }
    }
}

impl ProofRecord {
    pub fn create_request(
        connection_id: &str,
        name: &str,
        requested_attributes: BTreeMap<String, ProofAttributeInfo>,
    ) -> AgentResult<(Self, AriesMessage)> {
        if requested_attributes.is_empty() {
            return Err(AgentError::from_msg(
                AgentErrorKind::ValidationError,
                "Proof request must ask for at least one attribute",
            ));
        }
        let request = RequestPresentation {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            requested_attributes: requested_attributes.clone(),
        };
        let record = Self {
            id: uuid::Uuid::new_v4().to_string(),
            connection_id: Some(connection_id.to_string()),
            role: ProofRole::Verifier,
            thread_id: request.id.clone(),
            state: ProofState::RequestSent,
            name: name.to_string(),
            requested_attributes,
            presented_values: BTreeMap::new(),
            created_at: Utc::now(),
        };
        Ok((record, PresentProof::RequestPresentation(request).into()))
    }

    pub fn from_request(connection_id: Option<&str>, request: RequestPresentation) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            connection_id: connection_id.map(ToString::to_string),
            role: ProofRole::Prover,
            thread_id: request.id,
            state: ProofState::RequestReceived,
            name: request.name,
            requested_attributes: request.requested_attributes,
            presented_values: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, ProofState::Done | ProofState::Abandoned)
    }

    /// Every requested referent must be revealed under the requested attribute name, from a
    /// credential passing all of the referent's restrictions.
    fn check_covers_request(
        &self,
        revealed: &BTreeMap<String, RevealedAttribute>,
    ) -> AgentResult<()> {
        for (referent, info) in &self.requested_attributes {
            match revealed.get(referent) {
                Some(attribute) if attribute.name != info.name => {
                    return Err(AgentError::from_msg(
                        AgentErrorKind::ValidationError,
                        &format!(
                            "Referent {} reveals attribute {}, expected {}",
                            referent, attribute.name, info.name
                        ),
                    ))
                }
                Some(attribute)
                    if !info.restrictions.iter().all(|filter| {
                        filter.matches(&attribute.cred_def_id, attribute.schema_id.as_deref())
                    }) =>
                {
                    return Err(AgentError::from_msg(
                        AgentErrorKind::ValidationError,
                        &format!(
                            "Referent {} is revealed from credential definition {}, which the \
                             request does not allow",
                            referent, attribute.cred_def_id
                        ),
                    ))
                }
                Some(_) => {}
                None => {
                    return Err(AgentError::from_msg(
                        AgentErrorKind::ValidationError,
                        &format!("Presentation does not reveal requested referent {}", referent),
                    ))
                }
            }
        }
        Ok(())
    }
}

pub fn transition(
    record: &ProofRecord,
    event: ProofEvent,
) -> AgentResult<(ProofRecord, Option<AriesMessage>)> {
    trace!(
        "proof_presentation::transition >> id: {}, state: {:?}, event: {}",
        record.id,
        record.state,
        event.name()
    );
    let mut next = record.clone();
    let outbound = match (record.state, &event) {
        (ProofState::RequestReceived, ProofEvent::AcceptRequest { revealed }) => {
            record.check_covers_request(revealed)?;
            next.state = ProofState::PresentationSent;
            next.presented_values = revealed.clone();
            Some(PresentProof::Presentation(Presentation {
                id: uuid::Uuid::new_v4().to_string(),
                revealed_attributes: revealed.clone(),
                thread: Thread::new(record.thread_id.clone()),
            }))
        }
        (ProofState::RequestReceived, ProofEvent::DeclineRequest { reason }) => {
            next.state = ProofState::Abandoned;
            Some(PresentProof::ProblemReport(ProblemReport::new(
                &record.thread_id,
                reason,
            )))
        }
        (ProofState::RequestSent, ProofEvent::PresentationReceived(presentation)) => {
            record.check_covers_request(&presentation.revealed_attributes)?;
            next.state = ProofState::PresentationReceived;
            next.presented_values = presentation.revealed_attributes.clone();
            None
        }
        (ProofState::PresentationReceived, ProofEvent::AcceptPresentation) => {
            next.state = ProofState::Done;
            Some(PresentProof::Ack(Ack::new(&record.thread_id)))
        }
        (ProofState::PresentationSent, ProofEvent::AckReceived(_)) => {
            next.state = ProofState::Done;
            None
        }
        (_, ProofEvent::ProblemReportReceived(report)) if !record.is_terminal() => {
            info!(
                "Proof {} abandoned by peer: {}",
                record.id, report.description
            );
            next.state = ProofState::Abandoned;
            None
        }
        (state, _) => {
            return Err(state_not_supported(
                "Proof",
                &record.id,
                &state,
                event.name(),
            ))
        }
    };
    Ok((next, outbound.map(AriesMessage::from)))
}

/// Answers a received proof request with credentials picked by
/// [`resolve_requested_attributes`].
pub fn accept_request(
    record: &ProofRecord,
    held: &[CredentialRecord],
    selection: Option<&HashMap<String, String>>,
) -> AgentResult<(ProofRecord, Option<AriesMessage>)> {
    if record.state != ProofState::RequestReceived {
        return Err(state_not_supported(
            "Proof",
            &record.id,
            &record.state,
            "accepting proof request",
        ));
    }
    let revealed = resolve_requested_attributes(&record.requested_attributes, held, selection)?;
    transition(record, ProofEvent::AcceptRequest { revealed })
}

fn satisfies(credential: &CredentialRecord, info: &ProofAttributeInfo) -> bool {
    credential.attribute(&info.name).is_some()
        && info.restrictions.iter().all(|filter| {
            filter.matches(&credential.cred_def_id, credential.schema_id.as_deref())
        })
}

fn reveal(credential: &CredentialRecord, info: &ProofAttributeInfo) -> Option<RevealedAttribute> {
    let attribute = credential.attribute(&info.name)?;
    let attachment = credential
        .attachments
        .iter()
        .find(|attachment| attachment.id == attribute.value)
        .cloned();
    Some(RevealedAttribute {
        name: info.name.clone(),
        raw: attribute.value.clone(),
        credential_id: credential.id.clone(),
        cred_def_id: credential.cred_def_id.clone(),
        schema_id: credential.schema_id.clone(),
        attachment,
    })
}

/// Picks a held credential for every requested attribute.
///
/// `held` is expected in store insertion order; the first credential containing the attribute
/// and satisfying all its restrictions wins. `selection` maps referents to credential record ids
/// and takes precedence, but the selected credential must still satisfy the request.
pub fn resolve_requested_attributes(
    requested: &BTreeMap<String, ProofAttributeInfo>,
    held: &[CredentialRecord],
    selection: Option<&HashMap<String, String>>,
) -> AgentResult<BTreeMap<String, RevealedAttribute>> {
    let mut revealed = BTreeMap::new();
    for (referent, info) in requested {
        let selected = selection.and_then(|selection| selection.get(referent));
        let credential = match selected {
            Some(credential_id) => held
                .iter()
                .find(|credential| &credential.id == credential_id)
                .filter(|credential| satisfies(credential, info))
                .ok_or_else(|| {
                    AgentError::from_msg(
                        AgentErrorKind::ValidationError,
                        &format!(
                            "Selected credential {} cannot satisfy referent {}",
                            credential_id, referent
                        ),
                    )
                })?,
            None => held
                .iter()
                .find(|credential| satisfies(credential, info))
                .ok_or_else(|| {
                    AgentError::from_msg(
                        AgentErrorKind::ValidationError,
                        &format!(
                            "No held credential satisfies requested attribute {} ({})",
                            referent, info.name
                        ),
                    )
                })?,
        };
        debug!(
            "Referent {} resolved to credential {}",
            referent, credential.id
        );
        if let Some(attribute) = reveal(credential, info) {
            revealed.insert(referent.clone(), attribute);
        }
    }
    Ok(revealed)
}

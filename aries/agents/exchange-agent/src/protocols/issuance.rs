use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state_not_supported;
use crate::{
    error::{AgentError, AgentErrorKind, AgentResult},
    messages::{
        cred_issuance::{
            CredentialAttribute, CredentialIssuance, CredentialPreview, IssueCredential,
            OfferCredential, RequestCredential,
        },
        decorators::{Attachment, Thread},
        notification::{Ack, ProblemReport},
        AriesMessage,
    },
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialState {
    OfferSent,
    OfferReceived,
    RequestSent,
    RequestReceived,
    CredentialIssued,
    CredentialReceived,
    Done,
    Abandoned,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialRole {
    Issuer,
    Holder,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: String,
    pub connection_id: Option<String>,
    pub role: CredentialRole,
    pub thread_id: String,
    pub state: CredentialState,
    pub cred_def_id: String,
    pub schema_id: Option<String>,
    pub attributes: Vec<CredentialAttribute>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub enum CredentialEvent {
    AcceptOffer,
    DeclineOffer { reason: String },
    RequestReceived(RequestCredential),
    AcceptRequest,
    CredentialReceived(IssueCredential),
    AcceptCredential,
    AckReceived(Ack),
    ProblemReportReceived(ProblemReport),
}

impl CredentialEvent {
    fn name(&self) -> &'static str {
        match self {
            CredentialEvent::AcceptOffer => "accepting offer",
            CredentialEvent::DeclineOffer { .. } => "declining offer",
            CredentialEvent::RequestReceived(_) => "credential request",
            CredentialEvent::AcceptRequest => "accepting request",
            CredentialEvent::CredentialReceived(_) => "issued credential",
            CredentialEvent::AcceptCredential => "accepting credential",
            CredentialEvent::AckReceived(_) => "credential ack",
            CredentialEvent::ProblemReportReceived(_) => "problem report",
        }
    }
}

/// What an issuer puts into a credential offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, typed_builder::TypedBuilder)]
pub struct OfferCredentialParams {
    #[builder(setter(into))]
    pub cred_def_id: String,
    pub attributes: Vec<CredentialAttribute>,
    #[builder(default)]
    pub attachments: Vec<Attachment>,
    #[builder(default, setter(strip_option, into))]
    pub comment: Option<String>,
}

fn validate_attribute_names(attributes: &[CredentialAttribute]) -> AgentResult<()> {
    let mut seen = HashSet::new();
    for attribute in attributes {
        if !seen.insert(attribute.name.as_str()) {
            return Err(AgentError::from_msg(
                AgentErrorKind::ValidationError,
                &format!("Duplicate credential attribute name: {}", attribute.name),
            ));
        }
    }
    Ok(())
}

impl CredentialRecord {
    pub fn create_offer(
        connection_id: &str,
        params: OfferCredentialParams,
        schema_id: Option<String>,
    ) -> AgentResult<(Self, AriesMessage)> {
        if params.cred_def_id.is_empty() {
            return Err(AgentError::from_msg(
                AgentErrorKind::ValidationError,
                "Credential offer requires a credential definition id",
            ));
        }
        validate_attribute_names(&params.attributes)?;
        let offer = OfferCredential {
            id: uuid::Uuid::new_v4().to_string(),
            comment: params.comment,
            credential_preview: CredentialPreview {
                attributes: params.attributes.clone(),
            },
            cred_def_id: params.cred_def_id.clone(),
            schema_id: schema_id.clone(),
            attachments: params.attachments.clone(),
        };
        let record = Self {
            id: uuid::Uuid::new_v4().to_string(),
            connection_id: Some(connection_id.to_string()),
            role: CredentialRole::Issuer,
            thread_id: offer.id.clone(),
            state: CredentialState::OfferSent,
            cred_def_id: params.cred_def_id,
            schema_id,
            attributes: params.attributes,
            attachments: params.attachments,
            created_at: Utc::now(),
        };
        Ok((record, CredentialIssuance::OfferCredential(offer).into()))
    }

    pub fn from_offer(connection_id: Option<&str>, offer: OfferCredential) -> AgentResult<Self> {
        validate_attribute_names(&offer.credential_preview.attributes)?;
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            connection_id: connection_id.map(ToString::to_string),
            role: CredentialRole::Holder,
            thread_id: offer.id,
            state: CredentialState::OfferReceived,
            cred_def_id: offer.cred_def_id,
            schema_id: offer.schema_id,
            attributes: offer.credential_preview.attributes,
            attachments: offer.attachments,
            created_at: Utc::now(),
        })
    }

    /// Holder record which can be used to answer proof requests.
    pub fn is_held_credential(&self) -> bool {
        self.role == CredentialRole::Holder
            && matches!(
                self.state,
                CredentialState::CredentialReceived | CredentialState::Done
            )
    }

    pub fn attribute(&self, name: &str) -> Option<&CredentialAttribute> {
        self.attributes.iter().find(|attribute| attribute.name == name)
    }

    fn is_terminal(&self) -> bool {
        matches!(self.state, CredentialState::Done | CredentialState::Abandoned)
    }

    fn expect_cred_def(&self, cred_def_id: &str) -> AgentResult<()> {
        if cred_def_id == self.cred_def_id {
            Ok(())
        } else {
            Err(AgentError::from_msg(
                AgentErrorKind::ValidationError,
                &format!(
                    "Credential {} is bound to credential definition {}, message refers to {}",
                    self.id, self.cred_def_id, cred_def_id
                ),
            ))
        }
    }
}

pub fn transition(
    record: &CredentialRecord,
    event: CredentialEvent,
) -> AgentResult<(CredentialRecord, Option<AriesMessage>)> {
    trace!(
        "issuance::transition >> id: {}, state: {:?}, event: {}",
        record.id,
        record.state,
        event.name()
    );
    let thread = Thread::new(record.thread_id.clone());
    let mut next = record.clone();
    let outbound = match (record.state, &event) {
        (CredentialState::OfferReceived, CredentialEvent::AcceptOffer) => {
            next.state = CredentialState::RequestSent;
            Some(CredentialIssuance::RequestCredential(RequestCredential {
                id: uuid::Uuid::new_v4().to_string(),
                cred_def_id: record.cred_def_id.clone(),
                thread,
            }))
        }
        (CredentialState::OfferReceived, CredentialEvent::DeclineOffer { reason }) => {
            next.state = CredentialState::Abandoned;
            Some(CredentialIssuance::ProblemReport(ProblemReport::new(
                &record.thread_id,
                reason,
            )))
        }
        (CredentialState::OfferSent, CredentialEvent::RequestReceived(request)) => {
            record.expect_cred_def(&request.cred_def_id)?;
            next.state = CredentialState::RequestReceived;
            None
        }
        (CredentialState::RequestReceived, CredentialEvent::AcceptRequest) => {
            next.state = CredentialState::CredentialIssued;
            Some(CredentialIssuance::IssueCredential(IssueCredential {
                id: uuid::Uuid::new_v4().to_string(),
                cred_def_id: record.cred_def_id.clone(),
                attributes: record.attributes.clone(),
                attachments: record.attachments.clone(),
                thread,
            }))
        }
        (CredentialState::RequestSent, CredentialEvent::CredentialReceived(credential)) => {
            record.expect_cred_def(&credential.cred_def_id)?;
            validate_attribute_names(&credential.attributes)?;
            next.state = CredentialState::CredentialReceived;
            next.attributes = credential.attributes.clone();
            next.attachments = credential.attachments.clone();
            None
        }
        (CredentialState::CredentialReceived, CredentialEvent::AcceptCredential) => {
            next.state = CredentialState::Done;
            Some(CredentialIssuance::Ack(Ack::new(&record.thread_id)))
        }
        (CredentialState::CredentialIssued, CredentialEvent::AckReceived(_)) => {
            next.state = CredentialState::Done;
            None
        }
        (_, CredentialEvent::ProblemReportReceived(report)) if !record.is_terminal() => {
            info!(
                "Credential {} abandoned by peer: {}",
                record.id, report.description
            );
            next.state = CredentialState::Abandoned;
            None
        }
        (state, _) => {
            return Err(state_not_supported(
                "Credential",
                &record.id,
                &state,
                event.name(),
            ))
        }
    };
    Ok((next, outbound.map(AriesMessage::from)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn attributes() -> Vec<CredentialAttribute> {
        vec![
            CredentialAttribute::builder().name("name").value("Alice").build(),
            CredentialAttribute::builder().name("surname").value("Smith").build(),
        ]
    }

    fn offer() -> (CredentialRecord, OfferCredential) {
        let params = OfferCredentialParams::builder()
            .cred_def_id("CD1")
            .attributes(attributes())
            .build();
        let (record, msg) = CredentialRecord::create_offer("conn-1", params, None).unwrap();
        match msg {
            AriesMessage::CredentialIssuance(CredentialIssuance::OfferCredential(offer)) => {
                (record, offer)
            }
            other => panic!("expected offer, got {:?}", other),
        }
    }

    fn request_for(record: &CredentialRecord, cred_def_id: &str) -> RequestCredential {
        RequestCredential {
            id: "request-1".into(),
            cred_def_id: cred_def_id.into(),
            thread: Thread::new(record.thread_id.clone()),
        }
    }

    #[test]
    fn test_offer_preview_matches_holder_record() {
        let (issuer, offer) = offer();
        assert_eq!(issuer.state, CredentialState::OfferSent);

        let holder = CredentialRecord::from_offer(Some("conn-2"), offer).unwrap();

        assert_eq!(holder.state, CredentialState::OfferReceived);
        assert_eq!(holder.thread_id, issuer.thread_id);
        assert_eq!(holder.attributes, issuer.attributes);
        assert_eq!(holder.cred_def_id, "CD1");
    }

    #[test]
    fn test_full_issuance() {
        let (issuer, offer) = offer();
        let holder = CredentialRecord::from_offer(Some("conn-2"), offer).unwrap();

        let (holder, msg) = transition(&holder, CredentialEvent::AcceptOffer).unwrap();
        assert_eq!(holder.state, CredentialState::RequestSent);
        let request = match msg {
            Some(AriesMessage::CredentialIssuance(CredentialIssuance::RequestCredential(r))) => r,
            other => panic!("expected request, got {:?}", other),
        };

        let (issuer, msg) =
            transition(&issuer, CredentialEvent::RequestReceived(request)).unwrap();
        assert_eq!(issuer.state, CredentialState::RequestReceived);
        assert!(msg.is_none());

        let (issuer, msg) = transition(&issuer, CredentialEvent::AcceptRequest).unwrap();
        assert_eq!(issuer.state, CredentialState::CredentialIssued);
        let credential = match msg {
            Some(AriesMessage::CredentialIssuance(CredentialIssuance::IssueCredential(c))) => c,
            other => panic!("expected credential, got {:?}", other),
        };

        let (holder, _) =
            transition(&holder, CredentialEvent::CredentialReceived(credential)).unwrap();
        assert_eq!(holder.state, CredentialState::CredentialReceived);
        assert!(holder.is_held_credential());

        let (holder, msg) = transition(&holder, CredentialEvent::AcceptCredential).unwrap();
        assert_eq!(holder.state, CredentialState::Done);
        let ack = match msg {
            Some(AriesMessage::CredentialIssuance(CredentialIssuance::Ack(ack))) => ack,
            other => panic!("expected ack, got {:?}", other),
        };

        let (issuer, _) = transition(&issuer, CredentialEvent::AckReceived(ack)).unwrap();
        assert_eq!(issuer.state, CredentialState::Done);
    }

    #[test]
    fn test_accept_offer_twice_fails() {
        let (_, offer) = offer();
        let holder = CredentialRecord::from_offer(Some("conn-2"), offer).unwrap();

        let (holder, _) = transition(&holder, CredentialEvent::AcceptOffer).unwrap();
        let before = holder.clone();
        let err = transition(&holder, CredentialEvent::AcceptOffer).unwrap_err();

        assert_eq!(err.kind(), AgentErrorKind::ProtocolStateError);
        assert_eq!(holder, before);
    }

    #[test]
    fn test_request_for_other_cred_def_is_rejected() {
        let (issuer, _) = offer();

        let err = transition(
            &issuer,
            CredentialEvent::RequestReceived(request_for(&issuer, "CD2")),
        )
        .unwrap_err();

        assert_eq!(err.kind(), AgentErrorKind::ValidationError);
    }

    #[test]
    fn test_duplicate_attribute_names_are_rejected() {
        let mut attributes = attributes();
        attributes.push(CredentialAttribute::builder().name("name").value("Bob").build());
        let params = OfferCredentialParams::builder()
            .cred_def_id("CD1")
            .attributes(attributes)
            .build();

        let err = CredentialRecord::create_offer("conn-1", params, None).unwrap_err();

        assert_eq!(err.kind(), AgentErrorKind::ValidationError);
    }

    #[test]
    fn test_decline_offer_sends_problem_report() {
        let (_, offer) = offer();
        let holder = CredentialRecord::from_offer(Some("conn-2"), offer).unwrap();

        let (holder, msg) = transition(
            &holder,
            CredentialEvent::DeclineOffer {
                reason: "not interested".into(),
            },
        )
        .unwrap();

        assert_eq!(holder.state, CredentialState::Abandoned);
        match msg {
            Some(AriesMessage::CredentialIssuance(CredentialIssuance::ProblemReport(report))) => {
                assert_eq!(report.thread.thid, holder.thread_id);
                assert_eq!(report.description, "not interested");
            }
            other => panic!("expected problem report, got {:?}", other),
        }
    }

    #[test]
    fn test_problem_report_abandons_issuer() {
        let (issuer, _) = offer();
        let report = ProblemReport::new(&issuer.thread_id, "declined");

        let (issuer, msg) =
            transition(&issuer, CredentialEvent::ProblemReportReceived(report.clone())).unwrap();
        assert_eq!(issuer.state, CredentialState::Abandoned);
        assert!(msg.is_none());

        let err = transition(&issuer, CredentialEvent::ProblemReportReceived(report)).unwrap_err();
        assert_eq!(err.kind(), AgentErrorKind::ProtocolStateError);
    }

    #[test]
    fn test_issuer_cannot_accept_offer() {
        let (issuer, _) = offer();

        let err = transition(&issuer, CredentialEvent::AcceptOffer).unwrap_err();

        assert_eq!(err.kind(), AgentErrorKind::ProtocolStateError);
    }
}

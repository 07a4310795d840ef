use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state_not_supported;
use crate::{
    error::{AgentError, AgentErrorKind, AgentResult},
    messages::{
        connection::{Connection, DidDoc, Invitation, Request, Response},
        decorators::Thread,
        notification::{Ack, ProblemReport},
        AriesMessage,
    },
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionState {
    Invited,
    Requested,
    Responded,
    Complete,
    Abandoned,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionRole {
    Inviter,
    Invitee,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: String,
    pub alias: String,
    pub role: ConnectionRole,
    pub state: ConnectionState,
    pub invitation: Invitation,
    pub auto_accept: bool,
    pub our_did_doc: DidDoc,
    pub their_did_doc: Option<DidDoc>,
    pub thread_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub enum ConnectionEvent {
    RequestReceived(Request),
    AcceptRequest,
    AckReceived(Ack),
    AcceptInvitation { label: String },
    ResponseReceived(Response),
    AcceptResponse,
    ProblemReportReceived(ProblemReport),
    Abandon,
}

impl ConnectionEvent {
    fn name(&self) -> &'static str {
        match self {
            ConnectionEvent::RequestReceived(_) => "connection request",
            ConnectionEvent::AcceptRequest => "accepting request",
            ConnectionEvent::AckReceived(_) => "connection ack",
            ConnectionEvent::AcceptInvitation { .. } => "accepting invitation",
            ConnectionEvent::ResponseReceived(_) => "connection response",
            ConnectionEvent::AcceptResponse => "accepting response",
            ConnectionEvent::ProblemReportReceived(_) => "problem report",
            ConnectionEvent::Abandon => "abandonment",
        }
    }
}

impl ConnectionRecord {
    /// New inviter record; the invitation lists our own keys and endpoint.
    pub fn create_inviter(
        alias: &str,
        label: &str,
        auto_accept: bool,
        our_did_doc: DidDoc,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            alias: alias.to_string(),
            role: ConnectionRole::Inviter,
            state: ConnectionState::Invited,
            invitation: Invitation::new(label, &our_did_doc),
            auto_accept,
            our_did_doc,
            their_did_doc: None,
            thread_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn from_invitation(
        alias: &str,
        auto_accept: bool,
        invitation: Invitation,
        our_did_doc: DidDoc,
    ) -> AgentResult<Self> {
        if invitation.recipient_keys.is_empty() {
            return Err(AgentError::from_msg(
                AgentErrorKind::ValidationError,
                &format!("Invitation {} has no recipient keys", invitation.id),
            ));
        }
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            alias: alias.to_string(),
            role: ConnectionRole::Invitee,
            state: ConnectionState::Invited,
            their_did_doc: Some(invitation.did_doc()),
            invitation,
            auto_accept,
            our_did_doc,
            thread_id: None,
            created_at: Utc::now(),
        })
    }

    pub fn pairwise_verkey(&self) -> &str {
        self.our_did_doc
            .recipient_keys
            .first()
            .map_or("", String::as_str)
    }

    pub fn is_complete(&self) -> bool {
        self.state == ConnectionState::Complete
    }

    fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Complete | ConnectionState::Abandoned
        )
    }

    fn expect_thread(&self, thid: &str, event: &ConnectionEvent) -> AgentResult<()> {
        match self.thread_id.as_deref() {
            Some(thread_id) if thread_id == thid => Ok(()),
            _ => Err(AgentError::from_msg(
                AgentErrorKind::ValidationError,
                &format!(
                    "Connection {} received {} for foreign thread {}",
                    self.id,
                    event.name(),
                    thid
                ),
            )),
        }
    }
}

pub fn transition(
    record: &ConnectionRecord,
    event: ConnectionEvent,
) -> AgentResult<(ConnectionRecord, Option<AriesMessage>)> {
    trace!(
        "connection::transition >> id: {}, state: {:?}, event: {}",
        record.id,
        record.state,
        event.name()
    );
    let mut next = record.clone();
    let outbound = match (record.role, record.state, &event) {
        (
            ConnectionRole::Inviter,
            ConnectionState::Invited,
            ConnectionEvent::RequestReceived(request),
        ) => {
            request.connection.recipient_key()?;
            next.state = ConnectionState::Requested;
            next.thread_id = Some(request.thread.thid.clone());
            next.their_did_doc = Some(request.connection.clone());
            None
        }
        (ConnectionRole::Inviter, ConnectionState::Requested, ConnectionEvent::AcceptRequest) => {
            let thread_id = record.thread_id.clone().unwrap_or_default();
            next.state = ConnectionState::Responded;
            Some(
                Connection::Response(Response {
                    id: uuid::Uuid::new_v4().to_string(),
                    connection: record.our_did_doc.clone(),
                    thread: Thread::new(thread_id),
                })
                .into(),
            )
        }
        (
            ConnectionRole::Inviter,
            ConnectionState::Responded,
            ConnectionEvent::AckReceived(ack),
        ) => {
            record.expect_thread(&ack.thread.thid, &event)?;
            next.state = ConnectionState::Complete;
            None
        }
        (
            ConnectionRole::Invitee,
            ConnectionState::Invited,
            ConnectionEvent::AcceptInvitation { label },
        ) => {
            let request_id = uuid::Uuid::new_v4().to_string();
            next.state = ConnectionState::Requested;
            next.thread_id = Some(request_id.clone());
            Some(
                Connection::Request(Request {
                    id: request_id.clone(),
                    label: label.clone(),
                    connection: record.our_did_doc.clone(),
                    thread: Thread::with_parent(request_id, record.invitation.id.clone()),
                })
                .into(),
            )
        }
        (
            ConnectionRole::Invitee,
            ConnectionState::Requested,
            ConnectionEvent::ResponseReceived(response),
        ) => {
            record.expect_thread(&response.thread.thid, &event)?;
            response.connection.recipient_key()?;
            next.state = ConnectionState::Responded;
            next.their_did_doc = Some(response.connection.clone());
            None
        }
        (ConnectionRole::Invitee, ConnectionState::Responded, ConnectionEvent::AcceptResponse) => {
            next.state = ConnectionState::Complete;
            Some(Connection::Ack(Ack::new(record.thread_id.as_deref().unwrap_or_default())).into())
        }
        (_, _, ConnectionEvent::ProblemReportReceived(report)) if !record.is_terminal() => {
            info!(
                "Connection {} abandoned by peer: {}",
                record.id, report.description
            );
            next.state = ConnectionState::Abandoned;
            None
        }
        (_, _, ConnectionEvent::Abandon) if !record.is_terminal() => {
            next.state = ConnectionState::Abandoned;
            None
        }
        (_, state, _) => {
            return Err(state_not_supported(
                "Connection",
                &record.id,
                &state,
                event.name(),
            ))
        }
    };
    Ok((next, outbound))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use url::Url;

    use super::*;

    fn did_doc(key: &str) -> DidDoc {
        DidDoc {
            recipient_keys: vec![key.to_string()],
            routing_keys: vec![],
            service_endpoint: Url::parse("http://localhost:8080").unwrap(),
        }
    }

    fn inviter() -> ConnectionRecord {
        ConnectionRecord::create_inviter("INVITER", "faber", true, did_doc("inviter-key"))
    }

    fn invitee(invitation: Invitation) -> ConnectionRecord {
        ConnectionRecord::from_invitation("INVITEE", true, invitation, did_doc("invitee-key"))
            .unwrap()
    }

    fn unwrap_request(msg: Option<AriesMessage>) -> Request {
        match msg {
            Some(AriesMessage::Connection(Connection::Request(request))) => request,
            other => panic!("expected request, got {:?}", other),
        }
    }

    fn unwrap_response(msg: Option<AriesMessage>) -> Response {
        match msg {
            Some(AriesMessage::Connection(Connection::Response(response))) => response,
            other => panic!("expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_full_exchange() {
        let inviter = inviter();
        assert_eq!(inviter.state, ConnectionState::Invited);
        let invitee = invitee(inviter.invitation.clone());
        assert_eq!(invitee.their_did_doc, Some(did_doc("inviter-key")));

        let (invitee, msg) = transition(
            &invitee,
            ConnectionEvent::AcceptInvitation {
                label: "alice".into(),
            },
        )
        .unwrap();
        assert_eq!(invitee.state, ConnectionState::Requested);
        let request = unwrap_request(msg);
        assert_eq!(request.thread.pthid.as_deref(), Some(inviter.invitation.id.as_str()));

        let (inviter, msg) =
            transition(&inviter, ConnectionEvent::RequestReceived(request.clone())).unwrap();
        assert_eq!(inviter.state, ConnectionState::Requested);
        assert!(msg.is_none());
        assert_eq!(inviter.their_did_doc, Some(did_doc("invitee-key")));

        let (inviter, msg) = transition(&inviter, ConnectionEvent::AcceptRequest).unwrap();
        assert_eq!(inviter.state, ConnectionState::Responded);
        let response = unwrap_response(msg);
        assert_eq!(response.thread.thid, request.id);

        let (invitee, msg) =
            transition(&invitee, ConnectionEvent::ResponseReceived(response)).unwrap();
        assert_eq!(invitee.state, ConnectionState::Responded);
        assert!(msg.is_none());

        let (invitee, msg) = transition(&invitee, ConnectionEvent::AcceptResponse).unwrap();
        assert_eq!(invitee.state, ConnectionState::Complete);
        let ack = match msg {
            Some(AriesMessage::Connection(Connection::Ack(ack))) => ack,
            other => panic!("expected ack, got {:?}", other),
        };

        let (inviter, msg) = transition(&inviter, ConnectionEvent::AckReceived(ack)).unwrap();
        assert_eq!(inviter.state, ConnectionState::Complete);
        assert!(msg.is_none());
    }

    #[test]
    fn test_invalid_event_leaves_record_unchanged() {
        let record = inviter();
        let before = record.clone();

        let err = transition(&record, ConnectionEvent::AcceptRequest).unwrap_err();

        assert_eq!(err.kind(), AgentErrorKind::ProtocolStateError);
        assert_eq!(record, before);
    }

    #[test]
    fn test_invitee_cannot_accept_request() {
        let record = invitee(inviter().invitation);

        let err = transition(&record, ConnectionEvent::AcceptRequest).unwrap_err();

        assert_eq!(err.kind(), AgentErrorKind::ProtocolStateError);
    }

    #[test]
    fn test_response_for_foreign_thread_is_rejected() {
        let record = invitee(inviter().invitation);
        let (record, _) = transition(
            &record,
            ConnectionEvent::AcceptInvitation {
                label: "alice".into(),
            },
        )
        .unwrap();
        let response = Response {
            id: "response-1".into(),
            connection: did_doc("inviter-key"),
            thread: Thread::new("other-thread"),
        };

        let err = transition(&record, ConnectionEvent::ResponseReceived(response)).unwrap_err();

        assert_eq!(err.kind(), AgentErrorKind::ValidationError);
    }

    #[test]
    fn test_abandon() {
        let record = inviter();

        let (abandoned, msg) = transition(&record, ConnectionEvent::Abandon).unwrap();
        assert_eq!(abandoned.state, ConnectionState::Abandoned);
        assert!(msg.is_none());

        let err = transition(&abandoned, ConnectionEvent::Abandon).unwrap_err();
        assert_eq!(err.kind(), AgentErrorKind::ProtocolStateError);
    }

    #[test]
    fn test_invitation_without_keys_is_rejected() {
        let mut invitation = inviter().invitation;
        invitation.recipient_keys.clear();

        let err =
            ConnectionRecord::from_invitation("INVITEE", true, invitation, did_doc("k"))
                .unwrap_err();

        assert_eq!(err.kind(), AgentErrorKind::ValidationError);
    }
}

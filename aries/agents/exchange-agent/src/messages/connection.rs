use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{
    decorators::Thread,
    notification::{Ack, ProblemReport},
    AriesMessage,
};
use crate::error::{AgentError, AgentErrorKind, AgentResult};

const INVITATION_QUERY_PARAM: &str = "c_i";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum Connection {
    #[serde(rename = "https://didcomm.org/connections/1.0/invitation")]
    Invitation(Invitation),
    #[serde(rename = "https://didcomm.org/connections/1.0/request")]
    Request(Request),
    #[serde(rename = "https://didcomm.org/connections/1.0/response")]
    Response(Response),
    #[serde(rename = "https://didcomm.org/connections/1.0/ack")]
    Ack(Ack),
    #[serde(rename = "https://didcomm.org/connections/1.0/problem_report")]
    ProblemReport(ProblemReport),
}

/// Keys and endpoint a peer uses to reach one side of a connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDoc {
    pub recipient_keys: Vec<String>,
    #[serde(default)]
    pub routing_keys: Vec<String>,
    pub service_endpoint: Url,
}

impl DidDoc {
    pub fn recipient_key(&self) -> AgentResult<&str> {
        self.recipient_keys.first().map(String::as_str).ok_or_else(|| {
            AgentError::from_msg(
                AgentErrorKind::ValidationError,
                "DID document does not contain any recipient key",
            )
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    #[serde(rename = "@id")]
    pub id: String,
    pub label: String,
    pub recipient_keys: Vec<String>,
    pub service_endpoint: Url,
    #[serde(default)]
    pub routing_keys: Vec<String>,
}

impl Invitation {
    pub fn new(label: &str, did_doc: &DidDoc) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: label.to_string(),
            recipient_keys: did_doc.recipient_keys.clone(),
            service_endpoint: did_doc.service_endpoint.clone(),
            routing_keys: did_doc.routing_keys.clone(),
        }
    }

    /// Shareable form: the service endpoint with the invitation in the `c_i` query parameter.
    pub fn to_url(&self) -> AgentResult<Url> {
        let message = AriesMessage::Connection(Connection::Invitation(self.clone()));
        let encoded = URL_SAFE.encode(serde_json::to_vec(&message)?);
        let mut url = self.service_endpoint.clone();
        url.query_pairs_mut()
            .append_pair(INVITATION_QUERY_PARAM, &encoded);
        Ok(url)
    }

    pub fn from_url(invitation_url: &str) -> AgentResult<Self> {
        let url = Url::parse(invitation_url)?;
        let encoded = url
            .query_pairs()
            .find(|(key, _)| key == INVITATION_QUERY_PARAM)
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| {
                AgentError::from_msg(
                    AgentErrorKind::ValidationError,
                    &format!("Invitation URL {} has no {} parameter", url, INVITATION_QUERY_PARAM),
                )
            })?;
        let decoded = URL_SAFE
            .decode(&encoded)
            .or_else(|_| URL_SAFE_NO_PAD.decode(&encoded))
            .or_else(|_| STANDARD.decode(&encoded))?;
        match serde_json::from_slice::<AriesMessage>(&decoded)? {
            AriesMessage::Connection(Connection::Invitation(invitation)) => Ok(invitation),
            other => Err(AgentError::from_msg(
                AgentErrorKind::ValidationError,
                &format!("Invitation URL carries an unexpected message: {:?}", other),
            )),
        }
    }

    /// The inviter as seen by the invitee before a response arrives.
    pub fn did_doc(&self) -> DidDoc {
        DidDoc {
            recipient_keys: self.recipient_keys.clone(),
            routing_keys: self.routing_keys.clone(),
            service_endpoint: self.service_endpoint.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "@id")]
    pub id: String,
    pub label: String,
    pub connection: DidDoc,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "@id")]
    pub id: String,
    pub connection: DidDoc,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn invitation() -> Invitation {
        let did_doc = DidDoc {
            recipient_keys: vec!["8HH5gYEeNc3z7PYXmd54d4x6qAfCNrqQqEB3nS7Zfu7K".to_string()],
            routing_keys: vec!["routing-key".to_string(), "mediator-key".to_string()],
            service_endpoint: Url::parse("http://mediator.example.org:3000").unwrap(),
        };
        Invitation::new("INVITER", &did_doc)
    }

    #[test]
    fn test_invitation_url_round_trip() {
        let invitation = invitation();

        let url = invitation.to_url().unwrap();
        assert!(url.as_str().starts_with("http://mediator.example.org:3000/?c_i="));

        assert_eq!(Invitation::from_url(url.as_str()).unwrap(), invitation);
    }

    #[test]
    fn test_invitation_url_accepts_standard_base64() {
        let invitation = invitation();
        let json = serde_json::to_vec(&Connection::Invitation(invitation.clone())).unwrap();
        let url = format!(
            "http://mediator.example.org:3000?c_i={}",
            url::form_urlencoded::byte_serialize(STANDARD.encode(json).as_bytes())
                .collect::<String>()
        );

        assert_eq!(Invitation::from_url(&url).unwrap(), invitation);
    }

    #[test]
    fn test_invitation_url_accepts_legacy_message_type() {
        let invitation = invitation();
        let mut value = serde_json::to_value(Connection::Invitation(invitation.clone())).unwrap();
        value["@type"] = serde_json::Value::from(
            "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/connections/1.0/invitation",
        );
        let url = format!(
            "http://mediator:3000?c_i={}",
            URL_SAFE.encode(serde_json::to_vec(&value).unwrap())
        );

        assert_eq!(Invitation::from_url(&url).unwrap(), invitation);
    }

    #[test]
    fn test_invitation_url_with_other_message_is_rejected() {
        let ack = serde_json::json!({
            "@type": "https://didcomm.org/connections/1.0/ack",
            "@id": "ack-1",
            "status": "OK",
            "~thread": { "thid": "thread-1" }
        });
        let url = format!(
            "http://mediator:3000?c_i={}",
            URL_SAFE.encode(serde_json::to_vec(&ack).unwrap())
        );

        let err = Invitation::from_url(&url).unwrap_err();
        assert_eq!(err.kind(), AgentErrorKind::ValidationError);
    }

    #[test]
    fn test_invitation_url_without_payload_is_rejected() {
        let err = Invitation::from_url("http://mediator.example.org:3000/invite").unwrap_err();

        assert_eq!(err.kind(), AgentErrorKind::ValidationError);
    }

    #[test]
    fn test_invitation_serializes_with_type() {
        let value = serde_json::to_value(Connection::Invitation(invitation())).unwrap();

        assert_eq!(value["@type"], "https://didcomm.org/connections/1.0/invitation");
        assert_eq!(value["label"], "INVITER");
        assert_eq!(value["serviceEndpoint"], "http://mediator.example.org:3000/");
    }
}

pub mod connection;
pub mod cred_issuance;
pub mod decorators;
pub mod mediation;
pub mod notification;
pub mod present_proof;
pub mod routing;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use self::{
    connection::Connection, cred_issuance::CredentialIssuance, present_proof::PresentProof,
};

const DIDCOMM_PREFIX: &str = "https://didcomm.org/";
const LEGACY_PREFIX: &str = "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageFamily {
    Connection,
    CredentialIssuance,
    PresentProof,
}

/// The `family/version/name` triple at the end of an `@type` URI.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MessageType<'a> {
    pub family: &'a str,
    pub version: &'a str,
    pub name: &'a str,
}

impl<'a> MessageType<'a> {
    pub fn parse(msg_type: &'a str) -> Self {
        let mut parts = msg_type.rsplitn(4, '/');
        let name = parts.next().unwrap_or_default();
        let version = parts.next().unwrap_or_default();
        let family = parts.next().unwrap_or_default();
        Self {
            family,
            version,
            name,
        }
    }

    pub fn family(&self) -> Option<MessageFamily> {
        match (self.family, self.version) {
            ("connections", "1.0") => Some(MessageFamily::Connection),
            ("issue-credential", "1.0") => Some(MessageFamily::CredentialIssuance),
            ("present-proof", "1.0") => Some(MessageFamily::PresentProof),
            _ => None,
        }
    }

    pub fn is_forward(&self) -> bool {
        self.family == "routing" && self.name == "forward"
    }
}

fn normalize_msg_type(msg_type: &str) -> String {
    match msg_type.strip_prefix(LEGACY_PREFIX) {
        Some(rest) => format!("{}{}", DIDCOMM_PREFIX, rest),
        None => msg_type.to_string(),
    }
}

/// Every protocol message the agent exchanges with its peers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AriesMessage {
    Connection(Connection),
    CredentialIssuance(CredentialIssuance),
    PresentProof(PresentProof),
}

impl<'de> Deserialize<'de> for AriesMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut value = Value::deserialize(deserializer)?;
        let msg_type = value
            .get("@type")
            .and_then(Value::as_str)
            .map(normalize_msg_type)
            .ok_or_else(|| D::Error::missing_field("@type"))?;
        let family = MessageType::parse(&msg_type).family().ok_or_else(|| {
            D::Error::custom(format!("Unsupported message type: {}", msg_type))
        })?;
        value["@type"] = Value::String(msg_type);

        match family {
            MessageFamily::Connection => {
                Connection::deserialize(value).map(AriesMessage::Connection)
            }
            MessageFamily::CredentialIssuance => {
                CredentialIssuance::deserialize(value).map(AriesMessage::CredentialIssuance)
            }
            MessageFamily::PresentProof => {
                PresentProof::deserialize(value).map(AriesMessage::PresentProof)
            }
        }
        .map_err(D::Error::custom)
    }
}

impl AriesMessage {
    pub fn family(&self) -> MessageFamily {
        match self {
            AriesMessage::Connection(_) => MessageFamily::Connection,
            AriesMessage::CredentialIssuance(_) => MessageFamily::CredentialIssuance,
            AriesMessage::PresentProof(_) => MessageFamily::PresentProof,
        }
    }

    /// Id of the exchange the message belongs to; a message starting an exchange is its own thread.
    pub fn thread_id(&self) -> &str {
        match self {
            AriesMessage::Connection(msg) => match msg {
                Connection::Invitation(invitation) => &invitation.id,
                Connection::Request(request) => &request.thread.thid,
                Connection::Response(response) => &response.thread.thid,
                Connection::Ack(ack) => &ack.thread.thid,
                Connection::ProblemReport(report) => &report.thread.thid,
            },
            AriesMessage::CredentialIssuance(msg) => match msg {
                CredentialIssuance::OfferCredential(offer) => &offer.id,
                CredentialIssuance::RequestCredential(request) => &request.thread.thid,
                CredentialIssuance::IssueCredential(credential) => &credential.thread.thid,
                CredentialIssuance::Ack(ack) => &ack.thread.thid,
                CredentialIssuance::ProblemReport(report) => &report.thread.thid,
            },
            AriesMessage::PresentProof(msg) => match msg {
                PresentProof::RequestPresentation(request) => &request.id,
                PresentProof::Presentation(presentation) => &presentation.thread.thid,
                PresentProof::Ack(ack) => &ack.thread.thid,
                PresentProof::ProblemReport(report) => &report.thread.thid,
            },
        }
    }
}

impl From<Connection> for AriesMessage {
    fn from(msg: Connection) -> Self {
        AriesMessage::Connection(msg)
    }
}

impl From<CredentialIssuance> for AriesMessage {
    fn from(msg: CredentialIssuance) -> Self {
        AriesMessage::CredentialIssuance(msg)
    }
}

impl From<PresentProof> for AriesMessage {
    fn from(msg: PresentProof) -> Self {
        AriesMessage::PresentProof(msg)
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FORWARD_MSG_TYPE: &str = "https://didcomm.org/routing/1.0/forward";

/// Envelope asking a mediator to pass `msg` on to the holder of key `to`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Forward {
    #[serde(rename = "@type")]
    pub msg_type: String,
    #[serde(rename = "@id")]
    pub id: String,
    pub to: String,
    pub msg: Value,
}

impl Forward {
    pub fn new(to: &str, msg: Value) -> Self {
        Self {
            msg_type: FORWARD_MSG_TYPE.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            to: to.to_string(),
            msg,
        }
    }

    /// Parses `message` as a forward, returning `None` for any other message type.
    pub fn try_from_message(message: &str) -> Option<Self> {
        serde_json::from_str::<Forward>(message)
            .ok()
            .filter(|forward| super::MessageType::parse(&forward.msg_type).is_forward())
    }
}

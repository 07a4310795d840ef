use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::decorators::Thread;

/// Messages exchanged with the mediator itself, as opposed to messages routed through it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum MediatorMessage {
    #[serde(rename = "https://didcomm.org/coordinate-mediation/1.0/keylist-update")]
    KeylistUpdate(KeylistUpdate),
    #[serde(rename = "https://didcomm.org/coordinate-mediation/1.0/keylist-update-response")]
    KeylistUpdateResponse(KeylistUpdateResponse),
    #[serde(rename = "https://didcomm.org/messagepickup/1.0/batch-pickup")]
    BatchPickup(BatchPickup),
    #[serde(rename = "https://didcomm.org/messagepickup/1.0/batch")]
    Batch(Batch),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeylistUpdateAction {
    Add,
    Remove,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeylistUpdateResult {
    ClientError,
    ServerError,
    NoChange,
    Success,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeylistUpdateItem {
    pub recipient_key: String,
    pub action: KeylistUpdateAction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeylistUpdate {
    #[serde(rename = "@id")]
    pub id: String,
    pub updates: Vec<KeylistUpdateItem>,
}

impl KeylistUpdate {
    pub fn add(recipient_key: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            updates: vec![KeylistUpdateItem {
                recipient_key: recipient_key.to_string(),
                action: KeylistUpdateAction::Add,
            }],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeylistUpdateResponseItem {
    pub recipient_key: String,
    pub action: KeylistUpdateAction,
    pub result: KeylistUpdateResult,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeylistUpdateResponse {
    #[serde(rename = "@id")]
    pub id: String,
    pub updated: Vec<KeylistUpdateResponseItem>,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl KeylistUpdateResponse {
    /// A key counts as registered when it was added, or was already present.
    pub fn is_registered(&self, recipient_key: &str) -> bool {
        self.updated.iter().any(|item| {
            item.recipient_key == recipient_key
                && item.action == KeylistUpdateAction::Add
                && matches!(
                    item.result,
                    KeylistUpdateResult::Success | KeylistUpdateResult::NoChange
                )
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPickup {
    #[serde(rename = "@id")]
    pub id: String,
    pub batch_size: u32,
}

impl BatchPickup {
    pub fn new(batch_size: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            batch_size,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    #[serde(rename = "@id")]
    pub id: String,
    pub message: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "messages~attach")]
    pub messages: Vec<BatchItem>,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

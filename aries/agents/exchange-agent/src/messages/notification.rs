use serde::{Deserialize, Serialize};

use super::decorators::Thread;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AckStatus {
    Ok,
    Fail,
    Pending,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(rename = "@id")]
    pub id: String,
    pub status: AckStatus,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl Ack {
    pub fn new(thread_id: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: AckStatus::Ok,
            thread: Thread::new(thread_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemReport {
    #[serde(rename = "@id")]
    pub id: String,
    pub description: String,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl ProblemReport {
    pub fn new(thread_id: &str, description: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.to_string(),
            thread: Thread::new(thread_id),
        }
    }
}

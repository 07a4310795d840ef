use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub thid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pthid: Option<String>,
}

impl Thread {
    pub fn new(thid: impl Into<String>) -> Self {
        Self {
            thid: thid.into(),
            pthid: None,
        }
    }

    pub fn with_parent(thid: impl Into<String>, pthid: impl Into<String>) -> Self {
        Self {
            thid: thid.into(),
            pthid: Some(pthid.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentData {
    pub base64: String,
}

/// Binary content linked to a credential, e.g. a profile picture.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct Attachment {
    #[serde(rename = "@id")]
    #[builder(default = uuid::Uuid::new_v4().to_string(), setter(into))]
    pub id: String,
    #[builder(setter(into))]
    pub filename: String,
    #[serde(rename = "mime-type")]
    #[builder(setter(into))]
    pub mime_type: String,
    pub byte_count: u64,
    #[builder(default = Utc::now())]
    pub lastmod_time: DateTime<Utc>,
    pub data: AttachmentData,
}

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::{
    decorators::{Attachment, Thread},
    notification::{Ack, ProblemReport},
};

pub const MIME_TYPE_TEXT_PLAIN: &str = "text/plain";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum CredentialIssuance {
    #[serde(rename = "https://didcomm.org/issue-credential/1.0/offer-credential")]
    OfferCredential(OfferCredential),
    #[serde(rename = "https://didcomm.org/issue-credential/1.0/request-credential")]
    RequestCredential(RequestCredential),
    #[serde(rename = "https://didcomm.org/issue-credential/1.0/issue-credential")]
    IssueCredential(IssueCredential),
    #[serde(rename = "https://didcomm.org/issue-credential/1.0/ack")]
    Ack(Ack),
    #[serde(rename = "https://didcomm.org/issue-credential/1.0/problem-report")]
    ProblemReport(ProblemReport),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct CredentialAttribute {
    #[builder(setter(into))]
    pub name: String,
    #[serde(rename = "mime-type", default = "default_mime_type")]
    #[builder(default = default_mime_type(), setter(into))]
    pub mime_type: String,
    #[builder(setter(into))]
    pub value: String,
}

fn default_mime_type() -> String {
    MIME_TYPE_TEXT_PLAIN.to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPreview {
    pub attributes: Vec<CredentialAttribute>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferCredential {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub credential_preview: CredentialPreview,
    pub cred_def_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(rename = "~attach", default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCredential {
    #[serde(rename = "@id")]
    pub id: String,
    pub cred_def_id: String,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCredential {
    #[serde(rename = "@id")]
    pub id: String,
    pub cred_def_id: String,
    pub attributes: Vec<CredentialAttribute>,
    #[serde(rename = "~attach", default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

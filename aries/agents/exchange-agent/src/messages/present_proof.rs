use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    decorators::{Attachment, Thread},
    notification::{Ack, ProblemReport},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum PresentProof {
    #[serde(rename = "https://didcomm.org/present-proof/1.0/request-presentation")]
    RequestPresentation(RequestPresentation),
    #[serde(rename = "https://didcomm.org/present-proof/1.0/presentation")]
    Presentation(Presentation),
    #[serde(rename = "https://didcomm.org/present-proof/1.0/ack")]
    Ack(Ack),
    #[serde(rename = "https://didcomm.org/present-proof/1.0/problem-report")]
    ProblemReport(ProblemReport),
}

/// Restricts which credentials may satisfy a requested attribute. Unset fields match anything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
}

impl AttributeFilter {
    pub fn cred_def(cred_def_id: &str) -> Self {
        Self {
            cred_def_id: Some(cred_def_id.to_string()),
            schema_id: None,
        }
    }

    pub fn matches(&self, cred_def_id: &str, schema_id: Option<&str>) -> bool {
        let cred_def_ok = self
            .cred_def_id
            .as_deref()
            .map_or(true, |expected| expected == cred_def_id);
        let schema_ok = self
            .schema_id
            .as_deref()
            .map_or(true, |expected| Some(expected) == schema_id);
        cred_def_ok && schema_ok
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofAttributeInfo {
    pub name: String,
    #[serde(default)]
    pub restrictions: Vec<AttributeFilter>,
}

impl ProofAttributeInfo {
    pub fn new(name: &str, restrictions: Vec<AttributeFilter>) -> Self {
        Self {
            name: name.to_string(),
            restrictions,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPresentation {
    #[serde(rename = "@id")]
    pub id: String,
    pub name: String,
    pub requested_attributes: BTreeMap<String, ProofAttributeInfo>,
}

/// A revealed value; `attachment` is set when the value refers to an attachment of the
/// source credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedAttribute {
    pub name: String,
    pub raw: String,
    pub credential_id: String,
    pub cred_def_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    #[serde(rename = "@id")]
    pub id: String,
    pub revealed_attributes: BTreeMap<String, RevealedAttribute>,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

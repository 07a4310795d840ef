use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct WalletConfig {
    #[builder(setter(into))]
    pub id: String,
    #[builder(setter(into))]
    pub key: String,
}

/// Result of decrypting a packed message with one of the wallet's keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpackedMessage {
    pub message: String,
    pub sender_verkey: Option<String>,
    pub recipient_verkey: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct SchemaTemplate {
    #[builder(setter(into))]
    pub name: String,
    #[builder(setter(into))]
    pub version: String,
    pub attributes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub id: String,
    pub name: String,
    pub version: String,
    pub attributes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct CredentialDefinitionTemplate {
    #[builder(setter(into))]
    pub schema_id: String,
    #[builder(default = String::from("tag"), setter(into))]
    pub tag: String,
    #[builder(default = String::from("CL"), setter(into))]
    pub signature_type: String,
    #[builder(default)]
    pub support_revocation: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDefinition {
    pub id: String,
    pub schema_id: String,
    pub tag: String,
    pub signature_type: String,
    pub support_revocation: bool,
}

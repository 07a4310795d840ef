use std::{
    collections::{HashMap, HashSet},
    string::FromUtf8Error,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use exchange_agent::backend::{
    types::{
        CredentialDefinition, CredentialDefinitionTemplate, Schema, SchemaTemplate,
        UnpackedMessage, WalletConfig,
    },
    BackendCapability,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum EnvelopeError {
    #[error("Envelope is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Envelope payload is not base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Envelope payload is not UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

#[derive(Debug, ThisError)]
pub enum MockBackendError {
    #[error("Wallet {0} not found")]
    WalletNotFound(String),
    #[error("Wallet {0} already exists")]
    WalletAlreadyExists(String),
    #[error("Invalid key for wallet {0}")]
    InvalidWalletKey(String),
    #[error("No wallet is open")]
    WalletNotOpen,
    #[error("None of the recipient keys {0:?} belongs to this wallet")]
    UnknownRecipient(Vec<String>),
    #[error("Ledger has no {kind} {id}")]
    LedgerRecordNotFound { kind: &'static str, id: String },
    #[error("Malformed envelope")]
    MalformedEnvelope(#[from] EnvelopeError),
    #[error("Mock backend state is poisoned")]
    Poisoned,
}

pub type MockBackendResult<T> = Result<T, MockBackendError>;

/// Plaintext stand-in for an encrypted DIDComm envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub recipients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    pub payload: String,
}

impl Envelope {
    pub fn pack(
        message: &[u8],
        recipients: &[String],
        sender: Option<&str>,
    ) -> Result<Vec<u8>, EnvelopeError> {
        let envelope = Envelope {
            recipients: recipients.to_vec(),
            sender: sender.map(ToString::to_string),
            payload: STANDARD.encode(message),
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    pub fn open(packed: &[u8]) -> Result<Envelope, EnvelopeError> {
        Ok(serde_json::from_slice(packed)?)
    }

    pub fn message(&self) -> Result<String, EnvelopeError> {
        Ok(String::from_utf8(STANDARD.decode(&self.payload)?)?)
    }
}

pub fn generate_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn lock<T>(mutex: &Mutex<T>) -> MockBackendResult<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| MockBackendError::Poisoned)
}

/// Ledger shared by every [`MockBackend`] of a test.
#[derive(Debug, Default)]
pub struct MockLedger {
    schemas: Mutex<HashMap<String, Schema>>,
    cred_defs: Mutex<HashMap<String, CredentialDefinition>>,
}

impl MockLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[derive(Debug, Default)]
struct WalletState {
    wallets: HashMap<String, String>,
    opened: Option<String>,
    keys: HashSet<String>,
}

/// Backend keeping wallets and keys in memory and packing messages as plaintext [`Envelope`]s.
#[derive(Debug)]
pub struct MockBackend {
    ledger: Arc<MockLedger>,
    wallet: Mutex<WalletState>,
}

impl MockBackend {
    pub fn new(ledger: Arc<MockLedger>) -> Self {
        Self {
            ledger,
            wallet: Mutex::new(WalletState::default()),
        }
    }

    fn ensure_open(state: &WalletState) -> MockBackendResult<()> {
        state
            .opened
            .as_ref()
            .map(|_| ())
            .ok_or(MockBackendError::WalletNotOpen)
    }
}

#[async_trait]
impl BackendCapability for MockBackend {
    type Error = MockBackendError;

    async fn create_wallet(&self, config: &WalletConfig) -> MockBackendResult<()> {
        let mut state = lock(&self.wallet)?;
        if state.wallets.contains_key(&config.id) {
            return Err(MockBackendError::WalletAlreadyExists(config.id.clone()));
        }
        state.wallets.insert(config.id.clone(), config.key.clone());
        Ok(())
    }

    async fn open_wallet(&self, config: &WalletConfig) -> MockBackendResult<()> {
        let mut state = lock(&self.wallet)?;
        match state.wallets.get(&config.id) {
            None => Err(MockBackendError::WalletNotFound(config.id.clone())),
            Some(key) if key != &config.key => {
                Err(MockBackendError::InvalidWalletKey(config.id.clone()))
            }
            Some(_) => {
                state.opened = Some(config.id.clone());
                Ok(())
            }
        }
    }

    async fn delete_wallet(&self, config: &WalletConfig) -> MockBackendResult<()> {
        let mut state = lock(&self.wallet)?;
        if state.wallets.remove(&config.id).is_none() {
            return Err(MockBackendError::WalletNotFound(config.id.clone()));
        }
        if state.opened.as_deref() == Some(config.id.as_str()) {
            state.opened = None;
            state.keys.clear();
        }
        Ok(())
    }

    async fn create_key(&self) -> MockBackendResult<String> {
        let mut state = lock(&self.wallet)?;
        Self::ensure_open(&state)?;
        let key = generate_key();
        state.keys.insert(key.clone());
        Ok(key)
    }

    async fn pack(
        &self,
        message: &[u8],
        recipient_keys: &[String],
        sender_key: Option<&str>,
    ) -> MockBackendResult<Vec<u8>> {
        Self::ensure_open(&*lock(&self.wallet)?)?;
        Ok(Envelope::pack(message, recipient_keys, sender_key)?)
    }

    async fn unpack(&self, packed: &[u8]) -> MockBackendResult<UnpackedMessage> {
        let state = lock(&self.wallet)?;
        Self::ensure_open(&state)?;
        let envelope = Envelope::open(packed)?;
        let recipient_verkey = envelope
            .recipients
            .iter()
            .find(|key| state.keys.contains(*key))
            .cloned()
            .ok_or_else(|| MockBackendError::UnknownRecipient(envelope.recipients.clone()))?;
        Ok(UnpackedMessage {
            message: envelope.message()?,
            sender_verkey: envelope.sender,
            recipient_verkey,
        })
    }

    async fn get_schema(&self, schema_id: &str) -> MockBackendResult<Schema> {
        lock(&self.ledger.schemas)?
            .get(schema_id)
            .cloned()
            .ok_or_else(|| MockBackendError::LedgerRecordNotFound {
                kind: "schema",
                id: schema_id.to_string(),
            })
    }

    async fn get_credential_definition(
        &self,
        cred_def_id: &str,
    ) -> MockBackendResult<CredentialDefinition> {
        lock(&self.ledger.cred_defs)?
            .get(cred_def_id)
            .cloned()
            .ok_or_else(|| MockBackendError::LedgerRecordNotFound {
                kind: "credential definition",
                id: cred_def_id.to_string(),
            })
    }

    async fn register_schema(&self, template: &SchemaTemplate) -> MockBackendResult<Schema> {
        let schema = Schema {
            id: format!("schema:{}:{}:{}", generate_key(), template.name, template.version),
            name: template.name.clone(),
            version: template.version.clone(),
            attributes: template.attributes.clone(),
        };
        lock(&self.ledger.schemas)?.insert(schema.id.clone(), schema.clone());
        Ok(schema)
    }

    async fn register_credential_definition(
        &self,
        template: &CredentialDefinitionTemplate,
    ) -> MockBackendResult<CredentialDefinition> {
        self.get_schema(&template.schema_id).await?;
        let cred_def = CredentialDefinition {
            id: format!(
                "creddef:{}:{}:{}",
                generate_key(),
                template.signature_type,
                template.tag
            ),
            schema_id: template.schema_id.clone(),
            tag: template.tag.clone(),
            signature_type: template.signature_type.clone(),
            support_revocation: template.support_revocation,
        };
        lock(&self.ledger.cred_defs)?.insert(cred_def.id.clone(), cred_def.clone());
        Ok(cred_def)
    }
}

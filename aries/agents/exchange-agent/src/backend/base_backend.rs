use async_trait::async_trait;

use super::{
    error::BackendResult,
    types::{
        CredentialDefinition, CredentialDefinitionTemplate, Schema, SchemaTemplate,
        UnpackedMessage, WalletConfig,
    },
};

/// Operations the agent consumes from the external wallet and ledger backend.
///
/// Implementations report failures with their own error type. The agent never calls a
/// capability directly; it goes through
/// [`ErrorNormalizingBackend`](super::ErrorNormalizingBackend), which exposes the same surface
/// as [`BaseBackend`].
#[async_trait]
pub trait BackendCapability: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn create_wallet(&self, config: &WalletConfig) -> Result<(), Self::Error>;

    async fn open_wallet(&self, config: &WalletConfig) -> Result<(), Self::Error>;

    async fn delete_wallet(&self, config: &WalletConfig) -> Result<(), Self::Error>;

    /// Generates a new key pair in the wallet and returns its verkey.
    async fn create_key(&self) -> Result<String, Self::Error>;

    async fn pack(
        &self,
        message: &[u8],
        recipient_keys: &[String],
        sender_key: Option<&str>,
    ) -> Result<Vec<u8>, Self::Error>;

    async fn unpack(&self, packed: &[u8]) -> Result<UnpackedMessage, Self::Error>;

    async fn get_schema(&self, schema_id: &str) -> Result<Schema, Self::Error>;

    async fn get_credential_definition(
        &self,
        cred_def_id: &str,
    ) -> Result<CredentialDefinition, Self::Error>;

    async fn register_schema(&self, template: &SchemaTemplate) -> Result<Schema, Self::Error>;

    async fn register_credential_definition(
        &self,
        template: &CredentialDefinitionTemplate,
    ) -> Result<CredentialDefinition, Self::Error>;
}

/// The backend surface as seen by the agent: every failure is a
/// [`BackendError`](super::BackendError).
#[async_trait]
pub trait BaseBackend: Send + Sync {
    async fn create_wallet(&self, config: &WalletConfig) -> BackendResult<()>;

    async fn open_wallet(&self, config: &WalletConfig) -> BackendResult<()>;

    async fn delete_wallet(&self, config: &WalletConfig) -> BackendResult<()>;

    async fn create_key(&self) -> BackendResult<String>;

    async fn pack(
        &self,
        message: &[u8],
        recipient_keys: &[String],
        sender_key: Option<&str>,
    ) -> BackendResult<Vec<u8>>;

    async fn unpack(&self, packed: &[u8]) -> BackendResult<UnpackedMessage>;

    async fn get_schema(&self, schema_id: &str) -> BackendResult<Schema>;

    async fn get_credential_definition(&self, cred_def_id: &str)
        -> BackendResult<CredentialDefinition>;

    async fn register_schema(&self, template: &SchemaTemplate) -> BackendResult<Schema>;

    async fn register_credential_definition(
        &self,
        template: &CredentialDefinitionTemplate,
    ) -> BackendResult<CredentialDefinition>;
}

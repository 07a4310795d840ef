use async_trait::async_trait;

use super::{
    base_backend::{BackendCapability, BaseBackend},
    error::{BackendError, BackendResult},
    types::{
        CredentialDefinition, CredentialDefinitionTemplate, Schema, SchemaTemplate,
        UnpackedMessage, WalletConfig,
    },
};

/// Maps every failure of the wrapped capability into a [`BackendError`].
#[derive(Debug)]
pub struct ErrorNormalizingBackend<B> {
    inner: B,
}

impl<B> ErrorNormalizingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B> BaseBackend for ErrorNormalizingBackend<B>
where
    B: BackendCapability,
{
    async fn create_wallet(&self, config: &WalletConfig) -> BackendResult<()> {
        trace!("ErrorNormalizingBackend::create_wallet >> wallet: {}", config.id);
        self.inner
            .create_wallet(config)
            .await
            .map_err(BackendError::normalize)
    }

    async fn open_wallet(&self, config: &WalletConfig) -> BackendResult<()> {
        trace!("ErrorNormalizingBackend::open_wallet >> wallet: {}", config.id);
        self.inner
            .open_wallet(config)
            .await
            .map_err(BackendError::normalize)
    }

    async fn delete_wallet(&self, config: &WalletConfig) -> BackendResult<()> {
        trace!("ErrorNormalizingBackend::delete_wallet >> wallet: {}", config.id);
        self.inner
            .delete_wallet(config)
            .await
            .map_err(BackendError::normalize)
    }

    async fn create_key(&self) -> BackendResult<String> {
        self.inner.create_key().await.map_err(BackendError::normalize)
    }

    async fn pack(
        &self,
        message: &[u8],
        recipient_keys: &[String],
        sender_key: Option<&str>,
    ) -> BackendResult<Vec<u8>> {
        trace!(
            "ErrorNormalizingBackend::pack >> recipient_keys: {:?}, sender_key: {:?}",
            recipient_keys,
            sender_key
        );
        self.inner
            .pack(message, recipient_keys, sender_key)
            .await
            .map_err(BackendError::normalize)
    }

    async fn unpack(&self, packed: &[u8]) -> BackendResult<UnpackedMessage> {
        self.inner.unpack(packed).await.map_err(BackendError::normalize)
    }

    async fn get_schema(&self, schema_id: &str) -> BackendResult<Schema> {
        trace!("ErrorNormalizingBackend::get_schema >> schema_id: {}", schema_id);
        self.inner
            .get_schema(schema_id)
            .await
            .map_err(BackendError::normalize)
    }

    async fn get_credential_definition(
        &self,
        cred_def_id: &str,
    ) -> BackendResult<CredentialDefinition> {
        trace!(
            "ErrorNormalizingBackend::get_credential_definition >> cred_def_id: {}",
            cred_def_id
        );
        self.inner
            .get_credential_definition(cred_def_id)
            .await
            .map_err(BackendError::normalize)
    }

    async fn register_schema(&self, template: &SchemaTemplate) -> BackendResult<Schema> {
        trace!(
            "ErrorNormalizingBackend::register_schema >> name: {}, version: {}",
            template.name,
            template.version
        );
        self.inner
            .register_schema(template)
            .await
            .map_err(BackendError::normalize)
    }

    async fn register_credential_definition(
        &self,
        template: &CredentialDefinitionTemplate,
    ) -> BackendResult<CredentialDefinition> {
        trace!(
            "ErrorNormalizingBackend::register_credential_definition >> schema_id: {}",
            template.schema_id
        );
        self.inner
            .register_credential_definition(template)
            .await
            .map_err(BackendError::normalize)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::{AgentError, AgentErrorKind};

    #[derive(Debug, thiserror::Error)]
    #[error("ledger pool timed out")]
    struct PoolTimeout;

    #[derive(Debug, thiserror::Error)]
    enum LedgerFailure {
        #[error("ledger request failed")]
        Request(#[source] PoolTimeout),
        #[error("wallet is locked")]
        WalletLocked,
    }

    struct FailingBackend;

    #[async_trait]
    impl BackendCapability for FailingBackend {
        type Error = LedgerFailure;

        async fn create_wallet(&self, _config: &WalletConfig) -> Result<(), LedgerFailure> {
            Err(LedgerFailure::WalletLocked)
        }

        async fn open_wallet(&self, _config: &WalletConfig) -> Result<(), LedgerFailure> {
            Err(LedgerFailure::WalletLocked)
        }

        async fn delete_wallet(&self, _config: &WalletConfig) -> Result<(), LedgerFailure> {
            Ok(())
        }

        async fn create_key(&self) -> Result<String, LedgerFailure> {
            Ok("verkey".to_string())
        }

        async fn pack(
            &self,
            _message: &[u8],
            _recipient_keys: &[String],
            _sender_key: Option<&str>,
        ) -> Result<Vec<u8>, LedgerFailure> {
            Err(LedgerFailure::WalletLocked)
        }

        async fn unpack(&self, _packed: &[u8]) -> Result<UnpackedMessage, LedgerFailure> {
            Err(LedgerFailure::WalletLocked)
        }

        async fn get_schema(&self, _schema_id: &str) -> Result<Schema, LedgerFailure> {
            Err(LedgerFailure::Request(PoolTimeout))
        }

        async fn get_credential_definition(
            &self,
            _cred_def_id: &str,
        ) -> Result<CredentialDefinition, LedgerFailure> {
            Err(LedgerFailure::Request(PoolTimeout))
        }

        async fn register_schema(
            &self,
            _template: &SchemaTemplate,
        ) -> Result<Schema, LedgerFailure> {
            Err(LedgerFailure::Request(PoolTimeout))
        }

        async fn register_credential_definition(
            &self,
            _template: &CredentialDefinitionTemplate,
        ) -> Result<CredentialDefinition, LedgerFailure> {
            Err(LedgerFailure::Request(PoolTimeout))
        }
    }

    #[tokio::test]
    async fn test_failure_is_normalized_with_cause_chain() {
        let backend: Arc<dyn BaseBackend> = Arc::new(ErrorNormalizingBackend::new(FailingBackend));

        let err = backend.get_schema("schema-1").await.unwrap_err();

        assert_eq!(err.name(), "BackendError");
        assert_eq!(err.message(), "ledger request failed");
        assert_eq!(err.backend_message(), "ledger request failed");
        assert_eq!(err.causes(), &["ledger pool timed out".to_string()]);
        assert_eq!(err.find_root_cause(), "ledger pool timed out");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_successful_calls_pass_through() {
        let backend = ErrorNormalizingBackend::new(FailingBackend);

        assert_eq!(backend.create_key().await.unwrap(), "verkey");
    }

    #[tokio::test]
    async fn test_backend_error_converts_to_agent_error() {
        let backend = ErrorNormalizingBackend::new(FailingBackend);
        let config = WalletConfig::builder().id("wallet").key("key").build();

        let err: AgentError = backend.open_wallet(&config).await.unwrap_err().into();

        assert_eq!(err.kind(), AgentErrorKind::BackendError);
        assert!(err.message.contains("wallet is locked"));
    }
}

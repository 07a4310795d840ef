use std::{path::Path, sync::Arc};

use crate::{
    backend::{
        types::{CredentialDefinition, CredentialDefinitionTemplate, Schema, SchemaTemplate},
        BaseBackend, FileSystem,
    },
    error::*,
};

const CRED_DEF_CACHE_FILE: &str = "credential-definition-id";

/// Schemas and credential definitions, read from and written to the ledger through the backend.
pub struct ServiceLedger {
    backend: Arc<dyn BaseBackend>,
    file_system: Arc<dyn FileSystem>,
}

impl std::fmt::Debug for ServiceLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceLedger")
            .field("cache", &self.file_system.base_path())
            .finish_non_exhaustive()
    }
}

impl ServiceLedger {
    pub fn new(backend: Arc<dyn BaseBackend>, file_system: Arc<dyn FileSystem>) -> Self {
        Self {
            backend,
            file_system,
        }
    }

    pub async fn register_schema(&self, template: &SchemaTemplate) -> AgentResult<Schema> {
        if template.attributes.is_empty() {
            return Err(AgentError::from_msg(
                AgentErrorKind::ValidationError,
                "Schema must define at least one attribute",
            ));
        }
        let schema = self.backend.register_schema(template).await?;
        info!("Registered schema {} ({} {})", schema.id, schema.name, schema.version);
        Ok(schema)
    }

    pub async fn get_schema(&self, schema_id: &str) -> AgentResult<Schema> {
        Ok(self.backend.get_schema(schema_id).await?)
    }

    /// Registers a credential definition and remembers its id for
    /// [`Self::cached_credential_definition_id`].
    pub async fn register_credential_definition(
        &self,
        template: &CredentialDefinitionTemplate,
    ) -> AgentResult<CredentialDefinition> {
        let cred_def = self
            .backend
            .register_credential_definition(template)
            .await?;
        info!(
            "Registered credential definition {} for schema {}",
            cred_def.id, cred_def.schema_id
        );
        self.file_system
            .write(Path::new(CRED_DEF_CACHE_FILE), &cred_def.id)
            .await?;
        Ok(cred_def)
    }

    pub async fn get_credential_definition(
        &self,
        cred_def_id: &str,
    ) -> AgentResult<CredentialDefinition> {
        Ok(self.backend.get_credential_definition(cred_def_id).await?)
    }

    pub async fn cached_credential_definition_id(&self) -> AgentResult<Option<String>> {
        let path = Path::new(CRED_DEF_CACHE_FILE);
        if !self.file_system.exists(path).await? {
            return Ok(None);
        }
        let cred_def_id = self.file_system.read(path).await?;
        Ok(Some(cred_def_id.trim().to_string()).filter(|id| !id.is_empty()))
    }
}

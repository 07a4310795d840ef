use std::sync::Arc;

use crate::{
    agent::AgentConfig,
    backend::BaseBackend,
    dispatcher::Dispatcher,
    error::*,
    handlers::{
        connection::ServiceConnections, credential::ServiceCredentials, ledger::ServiceLedger,
        proof::ServiceProofs,
    },
    transport::{
        inbound::{InboundTransport, InboundTransportState},
        routing::Routing,
    },
};

/// Owns every service of one agent. Cloning shares the same services.
#[derive(Clone)]
pub struct Agent {
    pub(super) config: AgentConfig,
    pub(super) backend: Arc<dyn BaseBackend>,
    pub(super) routing: Arc<Routing>,
    pub(super) ledger: Arc<ServiceLedger>,
    pub(super) connections: Arc<ServiceConnections>,
    pub(super) credentials: Arc<ServiceCredentials>,
    pub(super) proofs: Arc<ServiceProofs>,
    pub(super) dispatcher: Arc<Dispatcher>,
    pub(super) inbound: Option<Arc<InboundTransport>>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("label", &self.config.label)
            .field("mediator_url", &self.config.mediator_url)
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn routing(&self) -> Arc<Routing> {
        self.routing.clone()
    }

    pub fn ledger(&self) -> Arc<ServiceLedger> {
        self.ledger.clone()
    }

    pub fn connections(&self) -> Arc<ServiceConnections> {
        self.connections.clone()
    }

    pub fn credentials(&self) -> Arc<ServiceCredentials> {
        self.credentials.clone()
    }

    pub fn proofs(&self) -> Arc<ServiceProofs> {
        self.proofs.clone()
    }

    /// Handles one packed message delivered directly to this agent's endpoint.
    pub async fn receive_message(&self, packed: &[u8]) -> AgentResult<()> {
        self.dispatcher.dispatch(packed).await
    }

    /// Registers with the configured mediator and starts polling it.
    pub async fn start_inbound_transport(&self) -> AgentResult<()> {
        self.inbound_transport()?.start().await
    }

    pub async fn inbound_transport_state(&self) -> InboundTransportState {
        match &self.inbound {
            Some(inbound) => inbound.state().await,
            None => InboundTransportState::Stopped,
        }
    }

    pub async fn shutdown(&self) -> AgentResult<()> {
        info!("Shutting down agent {}", self.config.label);
        if let Some(inbound) = &self.inbound {
            inbound.stop().await?;
        }
        Ok(())
    }

    pub async fn delete_wallet(&self) -> AgentResult<()> {
        self.shutdown().await?;
        self.backend.delete_wallet(&self.config.wallet).await?;
        Ok(())
    }

    fn inbound_transport(&self) -> AgentResult<&Arc<InboundTransport>> {
        self.inbound.as_ref().ok_or_else(|| {
            AgentError::from_msg(
                AgentErrorKind::InvalidArguments,
                &format!(
                    "Agent {} has no mediator configured, inbound transport unavailable",
                    self.config.label
                ),
            )
        })
    }
}

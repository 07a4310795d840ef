use std::sync::Arc;

use crate::{
    agent::{Agent, AgentConfig},
    backend::{BackendCapability, BaseBackend, ErrorNormalizingBackend, FileSystem, LocalFileSystem},
    dispatcher::Dispatcher,
    error::*,
    handlers::{
        connection::ServiceConnections, credential::ServiceCredentials, ledger::ServiceLedger,
        proof::ServiceProofs,
    },
    transport::{
        inbound::{InboundTransport, PollingConfig},
        mediator_client::{HttpMediatorClient, MediatorClient},
        outbound::OutboundTransport,
        routing::Routing,
        HttpTransport, Transport,
    },
};

impl Agent {
    /// Builds an agent talking HTTP to its peers and mediator, on top of `backend`.
    pub async fn initialize<B>(config: AgentConfig, backend: B) -> AgentResult<Agent>
    where
        B: BackendCapability + 'static,
    {
        let file_system = Arc::new(LocalFileSystem::new(config.storage_path.clone()));
        Self::initialize_with(
            config,
            Arc::new(ErrorNormalizingBackend::new(backend)),
            Arc::new(HttpTransport),
            Arc::new(HttpMediatorClient),
            file_system,
        )
        .await
    }

    pub async fn initialize_with(
        config: AgentConfig,
        backend: Arc<dyn BaseBackend>,
        transport: Arc<dyn Transport>,
        mediator_client: Arc<dyn MediatorClient>,
        file_system: Arc<dyn FileSystem>,
    ) -> AgentResult<Agent> {
        info!(
            "Agent::initialize >> label: {}, wallet: {}",
            config.label, config.wallet.id
        );
        if let Err(err) = backend.open_wallet(&config.wallet).await {
            info!(
                "Wallet {} could not be opened ({}), creating it",
                config.wallet.id,
                err.message()
            );
            backend.create_wallet(&config.wallet).await?;
            backend.open_wallet(&config.wallet).await?;
        }

        let routing = Arc::new(Routing::new(config.endpoint.clone()));
        let outbound = Arc::new(OutboundTransport::new(backend.clone(), transport.clone()));
        let ledger = Arc::new(ServiceLedger::new(backend.clone(), file_system));
        let connections = Arc::new(ServiceConnections::new(
            backend.clone(),
            routing.clone(),
            outbound,
            &config.label,
            config.auto_accept_connections,
        ));
        let credentials = Arc::new(ServiceCredentials::new(
            ledger.clone(),
            connections.clone(),
            config.auto_accept_credentials,
        ));
        let proofs = Arc::new(ServiceProofs::new(
            connections.clone(),
            credentials.clone(),
            config.auto_accept_proofs,
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            backend.clone(),
            connections.clone(),
            credentials.clone(),
            proofs.clone(),
        ));
        let inbound = config.mediator_url.clone().map(|mediator_url| {
            let polling_config = PollingConfig::builder()
                .mediator_url(mediator_url)
                .poll_interval(config.poll_interval())
                .poll_timeout(config.poll_timeout())
                .build();
            Arc::new(InboundTransport::new(
                polling_config,
                backend.clone(),
                transport,
                mediator_client,
                routing.clone(),
                dispatcher.clone(),
            ))
        });

        Ok(Self {
            config,
            backend,
            routing,
            ledger,
            connections,
            credentials,
            proofs,
            dispatcher,
            inbound,
        })
    }
}

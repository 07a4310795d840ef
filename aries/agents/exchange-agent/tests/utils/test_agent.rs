use std::{sync::Arc, time::Duration};

use exchange_agent::{
    backend::{types::WalletConfig, ErrorNormalizingBackend, LocalFileSystem},
    Agent, AgentConfig,
};
use test_utils::{
    in_memory_network::InMemoryNetwork,
    logger::init_logger,
    mock_backend::{MockBackend, MockLedger},
};
use tokio::time::Instant;
use url::Url;

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const WAIT_STEP: Duration = Duration::from_millis(10);
pub const TEST_POLL_INTERVAL_MS: u64 = 10;

/// One mediator, one ledger and the endpoints of every agent taking part in a test.
#[derive(Debug)]
pub struct TestNetwork {
    pub network: Arc<InMemoryNetwork>,
    pub ledger: Arc<MockLedger>,
}

impl TestNetwork {
    pub fn new() -> Self {
        init_logger();
        let mediator_url = Url::parse("http://mediator.test/").unwrap();
        Self {
            network: Arc::new(InMemoryNetwork::new(mediator_url).unwrap()),
            ledger: MockLedger::new(),
        }
    }

    pub fn mediator_url(&self) -> Url {
        self.network.mediator_url().clone()
    }
}

pub fn agent_config(label: &str, mediator_url: Option<Url>) -> AgentConfig {
    let wallet_id = format!("{}-{}", label, uuid::Uuid::new_v4());
    let endpoint = Url::parse(&format!("http://{}.test/", label.to_lowercase())).unwrap();
    let config = AgentConfig::builder()
        .label(label)
        .endpoint(endpoint)
        .poll_interval_ms(TEST_POLL_INTERVAL_MS)
        .wallet(WalletConfig::builder().id(&wallet_id).key("test-key").build())
        .storage_path(std::env::temp_dir().join(&wallet_id))
        .build();
    match mediator_url {
        Some(mediator_url) => AgentConfig {
            mediator_url: Some(mediator_url),
            ..config
        },
        None => config,
    }
}

pub async fn create_agent_with_config(net: &TestNetwork, config: AgentConfig) -> Agent {
    let backend = Arc::new(ErrorNormalizingBackend::new(MockBackend::new(
        net.ledger.clone(),
    )));
    let file_system = Arc::new(LocalFileSystem::new(config.storage_path.clone()));
    Agent::initialize_with(
        config,
        backend,
        net.network.clone(),
        net.network.clone(),
        file_system,
    )
    .await
    .unwrap()
}

/// Agent reachable through the mediator, already polling it.
pub async fn create_test_agent(net: &TestNetwork, label: &str) -> Agent {
    let config = agent_config(label, Some(net.mediator_url()));
    let agent = create_agent_with_config(net, config).await;
    agent.start_inbound_transport().await.unwrap();
    agent
}

/// Agent receiving messages on its own endpoint; the test delivers its inbox by hand.
pub async fn create_direct_agent(net: &TestNetwork, label: &str) -> Agent {
    let agent = create_agent_with_config(net, agent_config(label, None)).await;
    net.network.add_endpoint(&agent.config().endpoint).unwrap();
    agent
}

pub async fn deliver_inbox(net: &TestNetwork, agent: &Agent) -> usize {
    let messages = net.network.take_inbox(&agent.config().endpoint).unwrap();
    let count = messages.len();
    for message in messages {
        agent.receive_message(&message).await.unwrap();
    }
    count
}

pub async fn wait_until<F>(description: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while !condition() {
        if Instant::now() > deadline {
            panic!("Timed out after {:?} waiting for {}", WAIT_TIMEOUT, description);
        }
        tokio::time::sleep(WAIT_STEP).await;
    }
}

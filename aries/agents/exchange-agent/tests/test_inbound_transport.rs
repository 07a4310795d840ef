use exchange_agent::{
    protocols::issuance::{CredentialState, OfferCredentialParams},
    transport::inbound::InboundTransportState,
    Agent, AgentErrorKind,
};
use pretty_assertions::assert_eq;
use test_utils::mock_backend::MockBackend;

use crate::utils::{
    scenarios::{attributes, create_connected_agents, create_credential_definition},
    test_agent::{agent_config, create_agent_with_config, create_test_agent, TestNetwork},
};

pub mod utils;

#[tokio::test]
async fn test_registration_failure_leaves_transport_stopped() {
    let net = TestNetwork::new();
    let agent =
        create_agent_with_config(&net, agent_config("Faber", Some(net.mediator_url()))).await;

    net.network.set_offline(true);
    let err = agent.start_inbound_transport().await.unwrap_err();
    assert_eq!(err.kind(), AgentErrorKind::RegistrationError);
    assert_eq!(
        agent.inbound_transport_state().await,
        InboundTransportState::Stopped
    );
    assert!(agent.routing().mediation().unwrap().is_none());

    net.network.set_offline(false);
    agent.start_inbound_transport().await.unwrap();
    assert_eq!(
        agent.inbound_transport_state().await,
        InboundTransportState::Running
    );

    agent.shutdown().await.unwrap();
    assert_eq!(
        agent.inbound_transport_state().await,
        InboundTransportState::Stopped
    );
}

#[tokio::test]
async fn test_agent_without_mediator_has_no_inbound_transport() {
    let net = TestNetwork::new();
    let agent = create_agent_with_config(&net, agent_config("Acme", None)).await;

    let err = agent.start_inbound_transport().await.unwrap_err();
    assert_eq!(err.kind(), AgentErrorKind::InvalidArguments);
    assert_eq!(
        agent.inbound_transport_state().await,
        InboundTransportState::Stopped
    );
}

#[tokio::test]
async fn test_mediated_did_doc_routes_through_mediator() {
    let net = TestNetwork::new();
    let agent = create_test_agent(&net, "Faber").await;

    let mediation = agent.routing().mediation().unwrap().unwrap();
    let connection = agent
        .connections()
        .create_connection("alice", None)
        .await
        .unwrap();
    assert_eq!(
        connection.our_did_doc.routing_keys,
        vec![mediation.routing_key.clone(), net.network.mediator_key().to_string()]
    );
    assert_eq!(connection.our_did_doc.service_endpoint, mediation.endpoint);

    agent.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_messages_queue_while_polling_is_stopped() {
    let net = TestNetwork::new();
    let faber = create_test_agent(&net, "Faber").await;
    let alice = create_test_agent(&net, "Alice").await;
    let (faber_connection, _) = create_connected_agents(&faber, &alice).await;
    let cred_def = create_credential_definition(&faber).await;

    alice.shutdown().await.unwrap();
    let routing_key = alice.routing().mediation().unwrap().unwrap().routing_key;
    faber
        .credentials()
        .offer_credential(
            &faber_connection.id,
            OfferCredentialParams::builder()
                .cred_def_id(&cred_def.id)
                .attributes(attributes(&[("name", "Alice")]))
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(net.network.queued_messages(&routing_key).unwrap(), 1);
    assert!(alice.credentials().list().unwrap().is_empty());

    faber.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_delivery_failure_keeps_committed_state() {
    let net = TestNetwork::new();
    let faber = create_test_agent(&net, "Faber").await;
    let alice = create_test_agent(&net, "Alice").await;
    let (faber_connection, _) = create_connected_agents(&faber, &alice).await;
    let cred_def = create_credential_definition(&faber).await;

    net.network.set_offline(true);
    let err = faber
        .credentials()
        .offer_credential(
            &faber_connection.id,
            OfferCredentialParams::builder()
                .cred_def_id(&cred_def.id)
                .attributes(attributes(&[("name", "Alice")]))
                .build(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), AgentErrorKind::NetworkError);

    let records = faber.credentials().list().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, CredentialState::OfferSent);

    net.network.set_offline(false);
    faber.shutdown().await.unwrap();
    alice.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_initialize_creates_missing_wallet() {
    let net = TestNetwork::new();
    let config = agent_config("Acme", None);
    let agent = Agent::initialize(config.clone(), MockBackend::new(net.ledger.clone()))
        .await
        .unwrap();
    assert_eq!(agent.config(), &config);

    let connection = agent
        .connections()
        .create_connection("alice", None)
        .await
        .unwrap();
    assert_eq!(connection.our_did_doc.service_endpoint, config.endpoint);

    agent.delete_wallet().await.unwrap();
    let err = agent.connections().create_connection("bob", None).await.unwrap_err();
    assert_eq!(err.kind(), AgentErrorKind::BackendError);
}

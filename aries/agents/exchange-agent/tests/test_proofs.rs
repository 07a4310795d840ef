use std::collections::HashMap;

use exchange_agent::{
    messages::present_proof::{AttributeFilter, ProofAttributeInfo},
    protocols::proof_presentation::{ProofRole, ProofState},
    Agent, AgentErrorKind,
};
use pretty_assertions::assert_eq;

use crate::utils::{
    scenarios::{
        create_connected_agents, create_connected_direct_invitee, create_credential_definition,
        issue_credential, requested_attribute, wait_for_proof,
    },
    test_agent::{create_direct_agent, create_test_agent, TestNetwork},
};

pub mod utils;

struct ProofSetup {
    faber: Agent,
    alice: Agent,
    faber_connection_id: String,
    cred_def_id: String,
}

async fn setup_with_credentials(net: &TestNetwork, names: &[&str]) -> ProofSetup {
    let faber = create_test_agent(net, "Faber").await;
    let alice = create_test_agent(net, "Alice").await;
    let (faber_connection, _) = create_connected_agents(&faber, &alice).await;
    let cred_def = create_credential_definition(&faber).await;
    for name in names {
        issue_credential(
            &faber,
            &alice,
            &faber_connection.id,
            &cred_def.id,
            &[("name", *name), ("age", "28")],
        )
        .await;
    }
    ProofSetup {
        faber,
        alice,
        faber_connection_id: faber_connection.id,
        cred_def_id: cred_def.id,
    }
}

impl ProofSetup {
    async fn request_name(&self, restriction: AttributeFilter) -> String {
        let request = self
            .faber
            .proofs()
            .request_proof(
                &self.faber_connection_id,
                "name check",
                requested_attribute(
                    "name_referent",
                    ProofAttributeInfo::new("name", vec![restriction]),
                ),
            )
            .await
            .unwrap();
        assert_eq!(request.role, ProofRole::Verifier);
        assert_eq!(request.state, ProofState::RequestSent);
        request.thread_id
    }

    async fn shutdown(&self) {
        self.faber.shutdown().await.unwrap();
        self.alice.shutdown().await.unwrap();
    }
}

#[tokio::test]
async fn test_proof_presentation() {
    let net = TestNetwork::new();
    let setup = setup_with_credentials(&net, &["Alice"]).await;

    let thread_id = setup
        .request_name(AttributeFilter::cred_def(&setup.cred_def_id))
        .await;
    let received = wait_for_proof(&setup.alice, &thread_id, ProofState::RequestReceived).await;
    assert_eq!(received.role, ProofRole::Prover);
    assert_eq!(received.name, "name check");

    let sent = setup
        .alice
        .proofs()
        .accept_proof_request(&received.id, None)
        .await
        .unwrap();
    assert_eq!(sent.state, ProofState::PresentationSent);
    assert_eq!(sent.presented_values["name_referent"].raw, "Alice");

    let presented =
        wait_for_proof(&setup.faber, &thread_id, ProofState::PresentationReceived).await;
    assert_eq!(presented.presented_values, sent.presented_values);

    let done = setup
        .faber
        .proofs()
        .accept_presentation(&presented.id)
        .await
        .unwrap();
    assert_eq!(done.state, ProofState::Done);
    wait_for_proof(&setup.alice, &thread_id, ProofState::Done).await;

    setup.shutdown().await;
}

#[tokio::test]
async fn test_first_matching_credential_wins_unless_selected() {
    let net = TestNetwork::new();
    let setup = setup_with_credentials(&net, &["Alice", "Alicia"]).await;
    let held = setup.alice.credentials().held_credentials().unwrap();
    assert_eq!(held.len(), 2);

    let thread_id = setup
        .request_name(AttributeFilter::cred_def(&setup.cred_def_id))
        .await;
    let received = wait_for_proof(&setup.alice, &thread_id, ProofState::RequestReceived).await;
    let sent = setup
        .alice
        .proofs()
        .accept_proof_request(&received.id, None)
        .await
        .unwrap();
    assert_eq!(sent.presented_values["name_referent"].raw, "Alice");
    assert_eq!(sent.presented_values["name_referent"].credential_id, held[0].id);

    let thread_id = setup
        .request_name(AttributeFilter::cred_def(&setup.cred_def_id))
        .await;
    let received = wait_for_proof(&setup.alice, &thread_id, ProofState::RequestReceived).await;
    let selection = HashMap::from([("name_referent".to_string(), held[1].id.clone())]);
    let sent = setup
        .alice
        .proofs()
        .accept_proof_request(&received.id, Some(selection))
        .await
        .unwrap();
    assert_eq!(sent.presented_values["name_referent"].raw, "Alicia");

    setup.shutdown().await;
}

#[tokio::test]
async fn test_unsatisfiable_request_keeps_record() {
    let net = TestNetwork::new();
    let setup = setup_with_credentials(&net, &["Alice"]).await;

    let thread_id = setup
        .request_name(AttributeFilter::cred_def("creddef:other-issuer"))
        .await;
    let received = wait_for_proof(&setup.alice, &thread_id, ProofState::RequestReceived).await;

    let err = setup
        .alice
        .proofs()
        .accept_proof_request(&received.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), AgentErrorKind::ValidationError);
    assert_eq!(setup.alice.proofs().get_by_id(&received.id).unwrap(), received);

    setup.shutdown().await;
}

#[tokio::test]
async fn test_decline_proof_request() {
    let net = TestNetwork::new();
    let setup = setup_with_credentials(&net, &["Alice"]).await;

    let thread_id = setup
        .request_name(AttributeFilter::cred_def(&setup.cred_def_id))
        .await;
    let received = wait_for_proof(&setup.alice, &thread_id, ProofState::RequestReceived).await;

    let declined = setup
        .alice
        .proofs()
        .decline_proof_request(&received.id, "no thanks")
        .await
        .unwrap();
    assert_eq!(declined.state, ProofState::Abandoned);
    wait_for_proof(&setup.faber, &thread_id, ProofState::Abandoned).await;

    setup.shutdown().await;
}

#[tokio::test]
async fn test_redelivered_proof_request_keeps_one_record() {
    let net = TestNetwork::new();
    let faber = create_test_agent(&net, "Faber").await;
    let alice = create_direct_agent(&net, "Alice").await;
    let (faber_connection, _) = create_connected_direct_invitee(&net, &faber, &alice).await;

    let request = faber
        .proofs()
        .request_proof(
            &faber_connection.id,
            "name check",
            requested_attribute("name_referent", ProofAttributeInfo::new("name", vec![])),
        )
        .await
        .unwrap();
    let messages = net.network.take_inbox(&alice.config().endpoint).unwrap();
    assert_eq!(messages.len(), 1);
    alice.receive_message(&messages[0]).await.unwrap();
    alice.receive_message(&messages[0]).await.unwrap();

    let received = alice.proofs().list().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].thread_id, request.thread_id);
    assert_eq!(received[0].state, ProofState::RequestReceived);

    faber.shutdown().await.unwrap();
}

use std::collections::BTreeMap;

use exchange_agent::{
    backend::types::{CredentialDefinition, CredentialDefinitionTemplate, SchemaTemplate},
    messages::{cred_issuance::CredentialAttribute, present_proof::ProofAttributeInfo},
    protocols::{
        connection::{ConnectionRecord, ConnectionState},
        issuance::{CredentialRecord, CredentialState, OfferCredentialParams},
        proof_presentation::{ProofRecord, ProofState},
    },
    Agent,
};
use pretty_assertions::assert_eq;

use super::test_agent::{deliver_inbox, wait_until, TestNetwork};

pub fn attributes(values: &[(&str, &str)]) -> Vec<CredentialAttribute> {
    values
        .iter()
        .map(|(name, value)| CredentialAttribute::builder().name(*name).value(*value).build())
        .collect()
}

pub async fn wait_for_connection_state(agent: &Agent, connection_id: &str, state: ConnectionState) {
    let connections = agent.connections();
    wait_until(&format!("connection {} in {:?}", connection_id, state), || {
        connections
            .get_by_id(connection_id)
            .is_ok_and(|record| record.state == state)
    })
    .await;
}

/// Runs the connection protocol with auto-accept on both sides; returns the inviter's and the
/// invitee's connection records.
pub async fn create_connected_agents(
    inviter: &Agent,
    invitee: &Agent,
) -> (ConnectionRecord, ConnectionRecord) {
    let inviter_connection = inviter
        .connections()
        .create_connection("invitee", None)
        .await
        .unwrap();
    let invitation_url = inviter_connection.invitation.to_url().unwrap();
    let invitee_connection = invitee
        .connections()
        .receive_invitation_from_url(invitation_url.as_str(), None, None)
        .await
        .unwrap();

    wait_for_connection_state(inviter, &inviter_connection.id, ConnectionState::Complete).await;
    wait_for_connection_state(invitee, &invitee_connection.id, ConnectionState::Complete).await;
    (
        inviter.connections().get_by_id(&inviter_connection.id).unwrap(),
        invitee.connections().get_by_id(&invitee_connection.id).unwrap(),
    )
}

/// Connects a polling inviter with an invitee whose inbox the test delivers by hand.
pub async fn create_connected_direct_invitee(
    net: &TestNetwork,
    inviter: &Agent,
    invitee: &Agent,
) -> (ConnectionRecord, ConnectionRecord) {
    let inviter_connection = inviter
        .connections()
        .create_connection("invitee", None)
        .await
        .unwrap();
    let invitee_connection = invitee
        .connections()
        .receive_invitation(inviter_connection.invitation.clone(), None, None)
        .await
        .unwrap();

    wait_until("connection response in the inbox of the invitee", || {
        net.network.inbox_len(&invitee.config().endpoint).unwrap() == 1
    })
    .await;
    assert_eq!(deliver_inbox(net, invitee).await, 1);
    wait_for_connection_state(inviter, &inviter_connection.id, ConnectionState::Complete).await;
    (
        inviter.connections().get_by_id(&inviter_connection.id).unwrap(),
        invitee.connections().get_by_id(&invitee_connection.id).unwrap(),
    )
}

pub async fn create_credential_definition(issuer: &Agent) -> CredentialDefinition {
    let schema = issuer
        .ledger()
        .register_schema(
            &SchemaTemplate::builder()
                .name("identity")
                .version("1.0")
                .attributes(vec!["name".to_string(), "age".to_string()])
                .build(),
        )
        .await
        .unwrap();
    issuer
        .ledger()
        .register_credential_definition(
            &CredentialDefinitionTemplate::builder()
                .schema_id(schema.id)
                .build(),
        )
        .await
        .unwrap()
}

pub async fn wait_for_credential(
    agent: &Agent,
    thread_id: &str,
    state: CredentialState,
) -> CredentialRecord {
    let credentials = agent.credentials();
    let find = || {
        credentials
            .list()
            .unwrap()
            .into_iter()
            .find(|record| record.thread_id == thread_id && record.state == state)
    };
    wait_until(&format!("credential on thread {} in {:?}", thread_id, state), || {
        find().is_some()
    })
    .await;
    find().unwrap()
}

pub async fn wait_for_proof(agent: &Agent, thread_id: &str, state: ProofState) -> ProofRecord {
    let proofs = agent.proofs();
    let find = || {
        proofs
            .list()
            .unwrap()
            .into_iter()
            .find(|record| record.thread_id == thread_id && record.state == state)
    };
    wait_until(&format!("proof on thread {} in {:?}", thread_id, state), || {
        find().is_some()
    })
    .await;
    find().unwrap()
}

/// Offers, requests, issues and acknowledges one credential; returns the issuer's and the
/// holder's final records.
pub async fn issue_credential(
    issuer: &Agent,
    holder: &Agent,
    issuer_connection_id: &str,
    cred_def_id: &str,
    values: &[(&str, &str)],
) -> (CredentialRecord, CredentialRecord) {
    let offer = issuer
        .credentials()
        .offer_credential(
            issuer_connection_id,
            OfferCredentialParams::builder()
                .cred_def_id(cred_def_id)
                .attributes(attributes(values))
                .build(),
        )
        .await
        .unwrap();
    let received =
        wait_for_credential(holder, &offer.thread_id, CredentialState::OfferReceived).await;
    holder.credentials().accept_offer(&received.id).await.unwrap();

    let requested =
        wait_for_credential(issuer, &offer.thread_id, CredentialState::RequestReceived).await;
    issuer.credentials().accept_request(&requested.id).await.unwrap();

    let issued =
        wait_for_credential(holder, &offer.thread_id, CredentialState::CredentialReceived).await;
    holder.credentials().accept_credential(&issued.id).await.unwrap();

    let issuer_record = wait_for_credential(issuer, &offer.thread_id, CredentialState::Done).await;
    let holder_record = holder.credentials().get_by_id(&issued.id).unwrap();
    (issuer_record, holder_record)
}

pub fn requested_attribute(
    referent: &str,
    info: ProofAttributeInfo,
) -> BTreeMap<String, ProofAttributeInfo> {
    BTreeMap::from([(referent.to_string(), info)])
}

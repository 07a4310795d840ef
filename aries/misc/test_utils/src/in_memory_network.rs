use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use exchange_agent::{
    error::{AgentError, AgentErrorKind, AgentResult},
    messages::{
        connection::{DidDoc, Invitation},
        decorators::Thread,
        mediation::{
            Batch, BatchItem, KeylistUpdate, KeylistUpdateAction, KeylistUpdateResponse,
            KeylistUpdateResponseItem, KeylistUpdateResult, MediatorMessage,
        },
        routing::Forward,
    },
    transport::{mediator_client::MediatorClient, Transport},
};
use serde_json::Value;
use url::Url;

use crate::mock_backend::{generate_key, Envelope};

#[derive(Debug, Default)]
struct NetworkState {
    registered_keys: HashSet<String>,
    queues: HashMap<String, VecDeque<Value>>,
    inboxes: HashMap<Url, VecDeque<Vec<u8>>>,
}

/// A mediator and a set of agent endpoints living in one process.
///
/// Messages posted to the mediator endpoint are handled like a real mediator would: keylist
/// updates register routing keys, forwards are queued per routing key and batch pickups drain
/// those queues. Messages posted to an endpoint added with [`InMemoryNetwork::add_endpoint`]
/// wait in its inbox until taken with [`InMemoryNetwork::take_inbox`].
#[derive(Debug)]
pub struct InMemoryNetwork {
    mediator_url: Url,
    mediator_endpoint: Url,
    mediator_key: String,
    offline: AtomicBool,
    state: Mutex<NetworkState>,
}

fn network_error(message: String) -> AgentError {
    AgentError::from_msg(AgentErrorKind::NetworkError, &message)
}

impl InMemoryNetwork {
    pub fn new(mediator_url: Url) -> AgentResult<Self> {
        let mediator_endpoint = mediator_url.join("didcomm")?;
        Ok(Self {
            mediator_url,
            mediator_endpoint,
            mediator_key: generate_key(),
            offline: AtomicBool::new(false),
            state: Mutex::new(NetworkState::default()),
        })
    }

    pub fn mediator_url(&self) -> &Url {
        &self.mediator_url
    }

    pub fn mediator_key(&self) -> &str {
        &self.mediator_key
    }

    /// While offline every call fails as if the host was unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn add_endpoint(&self, endpoint: &Url) -> AgentResult<()> {
        self.state()?.inboxes.entry(endpoint.clone()).or_default();
        Ok(())
    }

    pub fn take_inbox(&self, endpoint: &Url) -> AgentResult<Vec<Vec<u8>>> {
        Ok(self
            .state()?
            .inboxes
            .get_mut(endpoint)
            .map(|inbox| inbox.drain(..).collect())
            .unwrap_or_default())
    }

    pub fn inbox_len(&self, endpoint: &Url) -> AgentResult<usize> {
        Ok(self.state()?.inboxes.get(endpoint).map_or(0, VecDeque::len))
    }

    pub fn queued_messages(&self, routing_key: &str) -> AgentResult<usize> {
        Ok(self
            .state()?
            .queues
            .get(routing_key)
            .map_or(0, VecDeque::len))
    }

    fn state(&self) -> AgentResult<MutexGuard<'_, NetworkState>> {
        self.state.lock().map_err(|_| {
            AgentError::from_msg(AgentErrorKind::LockError, "In-memory network state is poisoned")
        })
    }

    fn ensure_online(&self, url: &Url) -> AgentResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(network_error(format!("{} is unreachable", url)));
        }
        Ok(())
    }

    fn pack_for(&self, message: &MediatorMessage, recipient: &str) -> AgentResult<Vec<u8>> {
        Envelope::pack(
            &serde_json::to_vec(message)?,
            &[recipient.to_string()],
            Some(&self.mediator_key),
        )
        .map_err(|err| network_error(format!("Mediator failed to pack response: {}", err)))
    }

    fn handle_mediator_message(&self, packed: &[u8]) -> AgentResult<Vec<u8>> {
        let envelope = Envelope::open(packed)
            .map_err(|err| network_error(format!("Mediator rejected envelope: {}", err)))?;
        if !envelope.recipients.contains(&self.mediator_key) {
            return Err(network_error(format!(
                "Mediator cannot decrypt message for {:?}",
                envelope.recipients
            )));
        }
        let message = envelope
            .message()
            .map_err(|err| network_error(format!("Mediator rejected payload: {}", err)))?;

        if let Some(forward) = Forward::try_from_message(&message) {
            return self.queue_forward(forward).map(|()| Vec::new());
        }
        let sender = envelope.sender.ok_or_else(|| {
            network_error("Mediator requires an authenticated sender".to_string())
        })?;
        match serde_json::from_str::<MediatorMessage>(&message)? {
            MediatorMessage::KeylistUpdate(update) => {
                let response = self.update_keylist(update)?;
                self.pack_for(&MediatorMessage::KeylistUpdateResponse(response), &sender)
            }
            MediatorMessage::BatchPickup(pickup) => {
                let batch = self.pickup(&sender, pickup.batch_size, &pickup.id)?;
                self.pack_for(&MediatorMessage::Batch(batch), &sender)
            }
            other => Err(AgentError::from_msg(
                AgentErrorKind::ValidationError,
                &format!("Mediator does not handle {:?}", other),
            )),
        }
    }

    fn queue_forward(&self, forward: Forward) -> AgentResult<()> {
        let mut state = self.state()?;
        if !state.registered_keys.contains(&forward.to) {
            return Err(network_error(format!(
                "Mediator has no route for key {}",
                forward.to
            )));
        }
        debug!("Mediator queued message for {}", forward.to);
        state
            .queues
            .entry(forward.to)
            .or_default()
            .push_back(forward.msg);
        Ok(())
    }

    fn update_keylist(&self, update: KeylistUpdate) -> AgentResult<KeylistUpdateResponse> {
        let mut state = self.state()?;
        let updated = update
            .updates
            .into_iter()
            .map(|item| {
                let changed = match item.action {
                    KeylistUpdateAction::Add => {
                        state.registered_keys.insert(item.recipient_key.clone())
                    }
                    KeylistUpdateAction::Remove => {
                        state.registered_keys.remove(&item.recipient_key)
                    }
                };
                KeylistUpdateResponseItem {
                    recipient_key: item.recipient_key,
                    action: item.action,
                    result: if changed {
                        KeylistUpdateResult::Success
                    } else {
                        KeylistUpdateResult::NoChange
                    },
                }
            })
            .collect();
        Ok(KeylistUpdateResponse {
            id: uuid::Uuid::new_v4().to_string(),
            updated,
            thread: Thread::new(update.id),
        })
    }

    fn pickup(&self, routing_key: &str, batch_size: u32, pickup_id: &str) -> AgentResult<Batch> {
        let mut state = self.state()?;
        if !state.registered_keys.contains(routing_key) {
            return Err(network_error(format!(
                "Mediator does not know key {}",
                routing_key
            )));
        }
        let queue = state.queues.entry(routing_key.to_string()).or_default();
        let count = queue.len().min(batch_size as usize);
        let messages = queue
            .drain(..count)
            .map(|message| BatchItem {
                id: uuid::Uuid::new_v4().to_string(),
                message,
            })
            .collect();
        Ok(Batch {
            id: uuid::Uuid::new_v4().to_string(),
            messages,
            thread: Thread::new(pickup_id),
        })
    }
}

#[async_trait]
impl Transport for InMemoryNetwork {
    async fn send_message(&self, message: Vec<u8>, endpoint: &Url) -> AgentResult<Vec<u8>> {
        self.ensure_online(endpoint)?;
        if endpoint == &self.mediator_endpoint {
            return self.handle_mediator_message(&message);
        }
        match self.state()?.inboxes.get_mut(endpoint) {
            Some(inbox) => {
                inbox.push_back(message);
                Ok(Vec::new())
            }
            None => Err(network_error(format!("Connection refused by {}", endpoint))),
        }
    }
}

#[async_trait]
impl MediatorClient for InMemoryNetwork {
    async fn fetch_invitation(&self, mediator_url: &Url) -> AgentResult<String> {
        self.ensure_online(mediator_url)?;
        if mediator_url != &self.mediator_url {
            return Err(network_error(format!("Unknown host {}", mediator_url)));
        }
        let did_doc = DidDoc {
            recipient_keys: vec![self.mediator_key.clone()],
            routing_keys: Vec::new(),
            service_endpoint: self.mediator_endpoint.clone(),
        };
        Ok(Invitation::new("mediator", &did_doc).to_url()?.to_string())
    }

    async fn fetch_verkey(&self, mediator_url: &Url) -> AgentResult<String> {
        self.ensure_online(mediator_url)?;
        if mediator_url != &self.mediator_url {
            return Err(network_error(format!("Unknown host {}", mediator_url)));
        }
        Ok(self.mediator_key.clone())
    }
}

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use typed_builder::TypedBuilder;
use url::Url;

use super::{
    mediator_client::MediatorClient,
    routing::{MediationRecord, Routing},
    Transport,
};
use crate::{
    backend::BaseBackend,
    error::{AgentError, AgentErrorKind, AgentResult},
    messages::{
        connection::Invitation,
        mediation::{BatchPickup, KeylistUpdate, MediatorMessage},
    },
};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
pub const DEFAULT_BATCH_SIZE: u32 = 10;

/// Receives every packed message downloaded from the mediator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InboundMessageHandler: Send + Sync {
    async fn receive_message(&self, packed: Vec<u8>) -> AgentResult<()>;
}

#[derive(Clone, Debug, TypedBuilder)]
pub struct PollingConfig {
    pub mediator_url: Url,
    #[builder(default = DEFAULT_POLL_INTERVAL)]
    pub poll_interval: Duration,
    #[builder(default)]
    pub poll_timeout: Option<Duration>,
    #[builder(default = DEFAULT_BATCH_SIZE)]
    pub batch_size: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InboundTransportState {
    Stopped,
    Running,
}

struct PollingWorker {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Registers with a mediator and polls it for messages queued for this agent.
pub struct InboundTransport {
    config: PollingConfig,
    backend: Arc<dyn BaseBackend>,
    transport: Arc<dyn Transport>,
    mediator_client: Arc<dyn MediatorClient>,
    routing: Arc<Routing>,
    handler: Arc<dyn InboundMessageHandler>,
    worker: Mutex<Option<PollingWorker>>,
}

impl std::fmt::Debug for InboundTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InboundTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct MessagePoller {
    backend: Arc<dyn BaseBackend>,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn InboundMessageHandler>,
    mediation: MediationRecord,
    batch_size: u32,
}

impl MessagePoller {
    async fn exchange(&self, message: &MediatorMessage) -> AgentResult<Option<MediatorMessage>> {
        let packed = self
            .backend
            .pack(
                &serde_json::to_vec(message)?,
                &self.mediation.mediator_recipient_keys,
                Some(&self.mediation.routing_key),
            )
            .await?;
        let response = self
            .transport
            .send_message(packed, &self.mediation.endpoint)
            .await?;
        if response.is_empty() {
            return Ok(None);
        }
        let unpacked = self.backend.unpack(&response).await?;
        Ok(Some(serde_json::from_str(&unpacked.message)?))
    }

    /// Downloads one batch and hands its messages to the handler one by one.
    async fn download_messages(&self) -> AgentResult<usize> {
        let pickup = MediatorMessage::BatchPickup(BatchPickup::new(self.batch_size));
        let batch = match self.exchange(&pickup).await? {
            Some(MediatorMessage::Batch(batch)) => batch,
            None => return Ok(0),
            Some(other) => {
                return Err(AgentError::from_msg(
                    AgentErrorKind::NetworkError,
                    &format!("Mediator answered pickup with unexpected message: {:?}", other),
                ))
            }
        };
        let count = batch.messages.len();
        for item in batch.messages {
            let packed = match serde_json::to_vec(&item.message) {
                Ok(packed) => packed,
                Err(err) => {
                    error!("Skipping malformed queued message {}: {}", item.id, err);
                    continue;
                }
            };
            if let Err(err) = self.handler.receive_message(packed).await {
                error!("Failed to process queued message {}: {}", item.id, err);
            }
        }
        Ok(count)
    }

    async fn poll_once(&self, poll_timeout: Option<Duration>) -> AgentResult<usize> {
        match poll_timeout {
            Some(limit) => tokio::time::timeout(limit, self.download_messages())
                .await
                .map_err(AgentError::from)
                .and_then(|result| result),
            None => self.download_messages().await,
        }
    }
}

async fn run_polling_loop(
    poller: MessagePoller,
    poll_interval: Duration,
    poll_timeout: Option<Duration>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(
        "Polling mediator {} every {:?}",
        poller.mediation.endpoint, poll_interval
    );
    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        match poller.poll_once(poll_timeout).await {
            Ok(0) => trace!("run_polling_loop >> no queued messages"),
            Ok(count) => debug!("run_polling_loop >> processed {} queued messages", count),
            Err(err) => warn!("Polling mediator failed, retrying in {:?}: {}", poll_interval, err),
        }
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }
    info!("Polling loop for {} stopped", poller.mediation.endpoint);
}

impl InboundTransport {
    pub fn new(
        config: PollingConfig,
        backend: Arc<dyn BaseBackend>,
        transport: Arc<dyn Transport>,
        mediator_client: Arc<dyn MediatorClient>,
        routing: Arc<Routing>,
        handler: Arc<dyn InboundMessageHandler>,
    ) -> Self {
        Self {
            config,
            backend,
            transport,
            mediator_client,
            routing,
            handler,
            worker: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> InboundTransportState {
        match self.worker.lock().await.as_ref() {
            Some(worker) if !worker.handle.is_finished() => InboundTransportState::Running,
            _ => InboundTransportState::Stopped,
        }
    }

    /// Registers with the mediator and starts polling. A failed registration is not retried and
    /// leaves the transport stopped.
    pub async fn start(&self) -> AgentResult<()> {
        let mut worker = self.worker.lock().await;
        if worker
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
        {
            warn!("InboundTransport::start >> already running");
            return Ok(());
        }

        let mediation = self.register().await.map_err(|err| {
            error!(
                "Registration with mediator {} failed, inbound transport stays stopped: {}",
                self.config.mediator_url, err
            );
            AgentError::from_msg(AgentErrorKind::RegistrationError, &err.message)
        })?;
        self.routing.set_mediation(mediation.clone())?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller = MessagePoller {
            backend: self.backend.clone(),
            transport: self.transport.clone(),
            handler: self.handler.clone(),
            mediation,
            batch_size: self.config.batch_size,
        };
        let handle = tokio::spawn(run_polling_loop(
            poller,
            self.config.poll_interval,
            self.config.poll_timeout,
            shutdown_rx,
        ));
        *worker = Some(PollingWorker {
            shutdown_tx,
            handle,
        });
        Ok(())
    }

    /// Signals the polling loop and waits until its current iteration has completed.
    pub async fn stop(&self) -> AgentResult<()> {
        let worker = self.worker.lock().await.take();
        match worker {
            Some(PollingWorker {
                shutdown_tx,
                handle,
            }) => {
                if shutdown_tx.send(true).is_err() {
                    debug!("InboundTransport::stop >> polling loop already finished");
                }
                if let Err(err) = handle.await {
                    error!("Polling loop terminated abnormally: {}", err);
                }
                info!("Inbound transport stopped");
            }
            None => debug!("InboundTransport::stop >> not running"),
        }
        Ok(())
    }

    async fn register(&self) -> AgentResult<MediationRecord> {
        let mediator_url = &self.config.mediator_url;
        info!("Registering with mediator {}", mediator_url);

        let invitation_url = self.mediator_client.fetch_invitation(mediator_url).await?;
        let mediator_verkey = self.mediator_client.fetch_verkey(mediator_url).await?;
        let invitation = Invitation::from_url(invitation_url.trim())?;
        let routing_key = self.backend.create_key().await?;

        let update = MediatorMessage::KeylistUpdate(KeylistUpdate::add(&routing_key));
        let packed = self
            .backend
            .pack(
                &serde_json::to_vec(&update)?,
                &invitation.recipient_keys,
                Some(&routing_key),
            )
            .await?;
        let response = self
            .transport
            .send_message(packed, &invitation.service_endpoint)
            .await?;
        let unpacked = self.backend.unpack(&response).await?;

        match serde_json::from_str::<MediatorMessage>(&unpacked.message)? {
            MediatorMessage::KeylistUpdateResponse(response)
                if response.is_registered(&routing_key) =>
            {
                info!(
                    "Registered routing key {} with mediator {}",
                    routing_key, invitation.service_endpoint
                );
                Ok(MediationRecord {
                    endpoint: invitation.service_endpoint,
                    mediator_verkey,
                    mediator_recipient_keys: invitation.recipient_keys,
                    routing_key,
                })
            }
            other => Err(AgentError::from_msg(
                AgentErrorKind::RegistrationError,
                &format!("Mediator did not register routing key: {:?}", other),
            )),
        }
    }
}

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::{AgentError, AgentErrorKind, AgentResult},
    messages::connection::DidDoc,
};

/// Outcome of a successful registration with a mediator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediationRecord {
    pub endpoint: Url,
    pub mediator_verkey: String,
    pub mediator_recipient_keys: Vec<String>,
    pub routing_key: String,
}

/// Decides how peers reach this agent: directly at its endpoint, or through the mediator once
/// registration succeeded.
#[derive(Debug)]
pub struct Routing {
    endpoint: Url,
    mediation: RwLock<Option<MediationRecord>>,
}

impl Routing {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            mediation: RwLock::new(None),
        }
    }

    pub fn mediation(&self) -> AgentResult<Option<MediationRecord>> {
        self.mediation
            .read()
            .map(|mediation| mediation.clone())
            .map_err(|_| {
                AgentError::from_msg(AgentErrorKind::LockError, "Unable to read mediation state")
            })
    }

    pub fn set_mediation(&self, record: MediationRecord) -> AgentResult<()> {
        let mut mediation = self.mediation.write().map_err(|_| {
            AgentError::from_msg(AgentErrorKind::LockError, "Unable to write mediation state")
        })?;
        *mediation = Some(record);
        Ok(())
    }

    /// Our side of a new connection using `recipient_key` as the pairwise key.
    pub fn did_doc(&self, recipient_key: &str) -> AgentResult<DidDoc> {
        let did_doc = match self.mediation()? {
            Some(mediation) => DidDoc {
                recipient_keys: vec![recipient_key.to_string()],
                routing_keys: vec![mediation.routing_key, mediation.mediator_verkey],
                service_endpoint: mediation.endpoint,
            },
            None => DidDoc {
                recipient_keys: vec![recipient_key.to_string()],
                routing_keys: vec![],
                service_endpoint: self.endpoint.clone(),
            },
        };
        Ok(did_doc)
    }
}

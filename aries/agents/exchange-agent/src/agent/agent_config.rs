use std::{env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use url::Url;

use crate::{
    backend::types::WalletConfig,
    error::{AgentError, AgentErrorKind, AgentResult},
    transport::inbound::DEFAULT_POLL_INTERVAL_MS,
};

const DEFAULT_ENDPOINT: &str = "http://localhost:8080/";

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_storage_path() -> PathBuf {
    env::temp_dir().join("exchange-agent")
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct AgentConfig {
    #[builder(setter(into))]
    pub label: String,
    /// Endpoint peers deliver to when no mediator is configured.
    pub endpoint: Url,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub mediator_url: Option<Url>,
    #[builder(default = true)]
    #[serde(default = "default_true")]
    pub auto_accept_connections: bool,
    #[builder(default)]
    #[serde(default)]
    pub auto_accept_credentials: bool,
    #[builder(default)]
    #[serde(default)]
    pub auto_accept_proofs: bool,
    #[builder(default = default_poll_interval_ms())]
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub poll_timeout_ms: Option<u64>,
    pub wallet: WalletConfig,
    #[builder(default = default_storage_path(), setter(into))]
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
}

fn parse_millis(name: &str, value: &str) -> AgentResult<u64> {
    value.parse().map_err(|err| {
        AgentError::from_msg(
            AgentErrorKind::InvalidArguments,
            &format!("{} must be a number of milliseconds, got {}: {}", name, value, err),
        )
    })
}

impl AgentConfig {
    /// Reads the configuration from `AGENT_*`, `MEDIATOR_URL`, `WALLET_*`, `POLL_*_MS` and
    /// `STORAGE_PATH`, falling back to defaults for anything unset.
    pub fn from_env() -> AgentResult<Self> {
        let id = uuid::Uuid::new_v4().to_string();
        let label = env::var("AGENT_LABEL").unwrap_or_else(|_| format!("agent-{}", id));
        let endpoint =
            Url::parse(&env::var("AGENT_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.into()))?;
        let mediator_url = env::var("MEDIATOR_URL")
            .ok()
            .map(|url| Url::parse(&url))
            .transpose()?;
        let wallet = WalletConfig::builder()
            .id(env::var("WALLET_NAME").unwrap_or_else(|_| format!("wallet-{}", id)))
            .key(env::var("WALLET_KEY").unwrap_or_else(|_| id.clone()))
            .build();
        let poll_interval_ms = match env::var("POLL_INTERVAL_MS") {
            Ok(value) => parse_millis("POLL_INTERVAL_MS", &value)?,
            Err(_) => default_poll_interval_ms(),
        };
        let poll_timeout_ms = env::var("POLL_TIMEOUT_MS")
            .ok()
            .map(|value| parse_millis("POLL_TIMEOUT_MS", &value))
            .transpose()?;
        let storage_path = env::var("STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_storage_path());
        Ok(Self {
            label,
            endpoint,
            mediator_url,
            auto_accept_connections: true,
            auto_accept_credentials: false,
            auto_accept_proofs: false,
            poll_interval_ms,
            poll_timeout_ms,
            wallet,
            storage_path,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Option<Duration> {
        self.poll_timeout_ms.map(Duration::from_millis)
    }
}

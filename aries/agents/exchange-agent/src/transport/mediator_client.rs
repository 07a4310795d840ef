use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::AgentResult;

/// The mediator's plain HTTP endpoints used before any DIDComm exchange with it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediatorClient: Send + Sync {
    /// `GET {mediator}/invitation`, the mediator's invitation URL.
    async fn fetch_invitation(&self, mediator_url: &Url) -> AgentResult<String>;

    /// `GET {mediator}/`, the mediator's verkey.
    async fn fetch_verkey(&self, mediator_url: &Url) -> AgentResult<String>;
}

#[derive(Deserialize)]
struct MediatorInfo {
    verkey: String,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct HttpMediatorClient;

fn endpoint(mediator_url: &Url, path: &str) -> AgentResult<Url> {
    let base = mediator_url.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{}/{}", base, path))?)
}

#[async_trait]
impl MediatorClient for HttpMediatorClient {
    async fn fetch_invitation(&self, mediator_url: &Url) -> AgentResult<String> {
        let url = endpoint(mediator_url, "invitation")?;
        Ok(shared::http_client::get_text(&url).await?)
    }

    async fn fetch_verkey(&self, mediator_url: &Url) -> AgentResult<String> {
        let url = endpoint(mediator_url, "")?;
        let info: MediatorInfo = shared::http_client::get_json(&url).await?;
        Ok(info.verkey)
    }
}

//! Whether the sponsoring service currently offers to pay transaction fees.

use {
    crate::{domain::authorization, util},
    anyhow::Context,
    serde::Deserialize,
};

pub enum Policy {
    /// A fixed answer from configuration.
    Fixed(bool),
    /// Asks the sponsoring service on every transaction.
    Api {
        client: reqwest::Client,
        endpoint: reqwest::Url,
    },
}

impl Policy {
    pub fn api(endpoint: reqwest::Url) -> Self {
        Self::Api {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[derive(Deserialize)]
struct Response {
    allowed: bool,
}

#[async_trait::async_trait]
impl authorization::FreeGas for Policy {
    async fn allowed(&self) -> anyhow::Result<bool> {
        match self {
            Policy::Fixed(allowed) => Ok(*allowed),
            Policy::Api { client, endpoint } => {
                let response = util::http::roundtrip!(
                    <Response, serde_json::Value>;
                    client.get(endpoint.clone())
                )
                .await
                .map_err(|err| match err {
                    util::http::RoundtripError::Http(err) => anyhow::Error::from(err),
                    util::http::RoundtripError::Api(body) => {
                        anyhow::anyhow!("sponsorship error: {body}")
                    }
                })
                .context("checking whether free gas is allowed")?;
                tracing::debug!(allowed = response.allowed, "fetched free gas policy");
                Ok(response.allowed)
            }
        }
    }
}

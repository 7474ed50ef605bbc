//! Bindings to the payer status service publishing the sponsoring accounts
//! and the surge pricing state of every network.

use {
    crate::{
        domain::{flow, payer},
        util,
    },
    anyhow::Context,
    futures::TryFutureExt,
    moka::future::Cache,
    std::{sync::Arc, time::Duration},
};

pub struct Api {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl Api {
    pub fn new(endpoint: reqwest::Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait::async_trait]
impl payer::StatusProvider for Api {
    async fn status(&self, network: flow::Network) -> anyhow::Result<payer::Status> {
        let status = util::http::roundtrip!(
            <dto::Status, serde_json::Value>;
            self.client
                .get(self.endpoint.clone())
                .query(&[("network", network.as_str())])
        )
        .await
        .map_err(|err| match err {
            util::http::RoundtripError::Http(err) => anyhow::Error::from(err),
            util::http::RoundtripError::Api(body) => anyhow::anyhow!("payer status error: {body}"),
        })
        .context("fetching payer status")?;
        Ok(status.into_domain())
    }
}

/// Keeps payer statuses for a fixed time to live. Concurrent lookups of the
/// same network share one request.
pub struct Cached {
    inner: Arc<dyn payer::StatusProvider>,
    statuses: Cache<flow::Network, payer::Status>,
}

impl Cached {
    pub fn new(inner: Arc<dyn payer::StatusProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            statuses: Cache::builder().max_capacity(8).time_to_live(ttl).build(),
        }
    }
}

#[async_trait::async_trait]
impl payer::StatusProvider for Cached {
    async fn status(&self, network: flow::Network) -> anyhow::Result<payer::Status> {
        self.statuses
            .try_get_with(network, self.inner.status(network))
            .map_err(|err: Arc<anyhow::Error>| anyhow::anyhow!("{err:#}"))
            .await
    }
}

mod dto {
    use {
        crate::domain::{flow, payer},
        serde::Deserialize,
        serde_with::{DisplayFromStr, serde_as},
    };

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Status {
        #[serde(default)]
        surge: Surge,
        fee_payer: Key,
        bridge_payer: Key,
    }

    #[derive(Default, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Surge {
        #[serde(default)]
        active: bool,
        multiplier: Option<f64>,
    }

    #[serde_as]
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Key {
        #[serde_as(as = "DisplayFromStr")]
        address: flow::Address,
        key_index: u32,
    }

    impl Status {
        pub fn into_domain(self) -> payer::Status {
            payer::Status {
                surge: payer::Surge {
                    active: self.surge.active,
                    multiplier: self.surge.multiplier,
                },
                fee_payer: self.fee_payer.into(),
                bridge_payer: self.bridge_payer.into(),
            }
        }
    }

    impl From<Key> for flow::AccountKey {
        fn from(key: Key) -> Self {
            Self {
                address: key.address,
                key_index: key.key_index,
            }
        }
    }
}

//! Bindings to a remote signing service holding the key of a sponsoring
//! account (fee payer or bridge payer).

use {
    crate::{
        domain::{authorization, flow, signer},
        util,
    },
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
    std::sync::atomic::{self, AtomicU64},
    tracing::Instrument,
};

pub struct Config {
    /// Base URL of the signing service.
    pub endpoint: reqwest::Url,
}

pub struct Remote {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl Remote {
    pub fn new(config: Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint,
        }
    }
}

#[async_trait::async_trait]
impl signer::Signer for Remote {
    async fn sign(&self, key: &flow::AccountKey, message: &[u8]) -> Result<Vec<u8>, signer::Error> {
        static ID: AtomicU64 = AtomicU64::new(0);
        let id = ID.fetch_add(1, atomic::Ordering::Relaxed);

        let request = dto::SignRequest {
            key: dto::Key::from(key),
            message: message.to_vec(),
        };
        let response = util::http::roundtrip!(
            <dto::SignResponse, dto::Error>;
            self.client
                .post(util::url::join(&self.endpoint, "sign"))
                .json(&request)
        )
        .instrument(tracing::trace_span!("sign", id = %id))
        .await
        .map_err(into_signer_error)?;
        tracing::debug!(%key, "obtained remote signature");
        Ok(response.signature)
    }
}

#[async_trait::async_trait]
impl authorization::FeePayerAuthorizer for Remote {
    async fn authorize(&self, key: &flow::AccountKey) -> Result<(), signer::Error> {
        static ID: AtomicU64 = AtomicU64::new(0);
        let id = ID.fetch_add(1, atomic::Ordering::Relaxed);

        // Grants are signalled by the status code only; the response body
        // may be empty.
        let response = self
            .client
            .post(util::url::join(&self.endpoint, "authorize"))
            .json(&dto::Key::from(key))
            .send()
            .instrument(tracing::trace_span!("authorize", id = %id))
            .await
            .map_err(|err| signer::Error::Other(err.into()))?;
        let status = response.status();
        if status.is_success() {
            tracing::debug!(%key, "fee payer authorized transaction");
            return Ok(());
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(?err, %status, "failed to read authorization response");
                String::new()
            }
        };
        tracing::trace!(%status, %body, "authorization refused");
        Err(match serde_json::from_str::<dto::Error>(&body) {
            Ok(err) if !util::http::is_backpressure(status) => {
                into_signer_error(util::http::RoundtripError::Api(err))
            }
            _ => into_signer_error(util::http::Error::Status(status, body).into()),
        })
    }
}

fn into_signer_error(err: util::http::RoundtripError<dto::Error>) -> signer::Error {
    match err {
        util::http::RoundtripError::Http(util::http::Error::Status(status, _))
            if util::http::is_backpressure(status) =>
        {
            signer::Error::RateLimited
        }
        util::http::RoundtripError::Http(util::http::Error::Status(status, body))
            if status.is_client_error() =>
        {
            signer::Error::Rejected(format!("{status}: {body}"))
        }
        util::http::RoundtripError::Http(err) => signer::Error::Other(err.into()),
        util::http::RoundtripError::Api(err) => signer::Error::Rejected(err.message),
    }
}

mod dto {
    use super::*;

    #[serde_as]
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Key {
        #[serde_as(as = "serde_with::DisplayFromStr")]
        pub address: flow::Address,
        pub key_index: u32,
    }

    impl From<&flow::AccountKey> for Key {
        fn from(key: &flow::AccountKey) -> Self {
            Self {
                address: key.address,
                key_index: key.key_index,
            }
        }
    }

    #[serde_as]
    #[derive(Serialize)]
    pub struct SignRequest {
        #[serde(flatten)]
        pub key: Key,
        #[serde_as(as = "util::serialize::Hex")]
        pub message: Vec<u8>,
    }

    #[serde_as]
    #[derive(Deserialize)]
    pub struct SignResponse {
        #[serde_as(as = "util::serialize::Hex")]
        pub signature: Vec<u8>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Error {
        pub message: String,
    }
}

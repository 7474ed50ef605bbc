//! Bindings to the Flow Access REST API.

use {
    crate::{
        domain::{chain, flow, signer, transaction},
        util,
    },
    anyhow::Context,
    reqwest::StatusCode,
    std::sync::atomic::{self, AtomicU64},
    tracing::Instrument,
};

mod cadence;
mod dto;
mod envelope;

pub struct Config {
    /// Base URL of the access node, e.g. `https://rest-mainnet.onflow.org`.
    pub endpoint: reqwest::Url,
    pub network: flow::Network,
}

/// A Flow access node client submitting signed transactions and tracking
/// their results.
pub struct Client {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    network: flow::Network,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint,
            network: config.network,
        }
    }

    async fn latest_sealed_block(&self) -> Result<dto::BlockHeader, Error> {
        let blocks = util::http::roundtrip!(
            <Vec<dto::Block>, dto::Error>;
            self.client
                .get(util::url::join(&self.endpoint, "v1/blocks"))
                .query(&[("height", "sealed")])
        )
        .await?;
        blocks
            .into_iter()
            .next()
            .map(|block| block.header)
            .ok_or(Error::NoSealedBlock)
    }

    /// Returns the current sequence number of the proposal key.
    async fn sequence_number(&self, key: &flow::AccountKey) -> Result<u64, Error> {
        let account = util::http::roundtrip!(
            <dto::Account, dto::Error>;
            self.client
                .get(util::url::join(
                    &self.endpoint,
                    &format!("v1/accounts/{}", hex::encode(key.address.0)),
                ))
                .query(&[("expand", "keys")])
        )
        .await?;
        account
            .keys
            .iter()
            .find(|candidate| candidate.index == key.key_index && !candidate.revoked)
            .map(|candidate| candidate.sequence_number)
            .ok_or(Error::MissingKey(*key))
    }

    /// Builds the transaction payload and collects all signatures. Every
    /// authorization except the payer's signs the payload, the payer signs
    /// the envelope.
    async fn sign(&self, config: &transaction::Config) -> Result<dto::Transaction, Error> {
        let transaction::Body::BatchCall {
            batch,
            evm_gas_limit,
        } = &config.body;
        let block = self.latest_sealed_block().await?;
        let sequence_number = self.sequence_number(&config.proposer.key).await?;
        tracing::debug!(
            block = %util::fmt::Hex(&block.id),
            height = block.height,
            sequence_number,
            "fetched reference block and proposal key"
        );

        let payload = envelope::Payload {
            script: cadence::script(config.kind, self.network).into_bytes(),
            arguments: cadence::arguments(batch, *evm_gas_limit)?,
            reference_block: block
                .id
                .as_slice()
                .try_into()
                .map_err(|_| Error::MalformedBlockId)?,
            gas_limit: config.gas_limit,
            proposal_key: envelope::ProposalKey {
                key: config.proposer.key,
                sequence_number,
            },
            payer: config.payer.key.address,
            authorizers: config
                .authorizations
                .iter()
                .map(|authorization| authorization.key.address)
                .collect(),
        };

        let mut payload_signers = Vec::<&transaction::Authorization>::new();
        for authorization in std::iter::once(&config.proposer).chain(&config.authorizations) {
            let key = authorization.key;
            if key.address != payload.payer && !payload_signers.iter().any(|s| s.key == key) {
                payload_signers.push(authorization);
            }
        }

        let message = payload.message();
        let mut payload_signatures = Vec::with_capacity(payload_signers.len());
        for authorization in payload_signers {
            let signature = authorization.sign(&message).await?;
            payload_signatures.push(envelope::Signature {
                signer_index: payload
                    .signer_index(signature.key.address)
                    .ok_or(Error::UnknownSigner(signature.key))?,
                key: signature.key,
                signature: signature.signature,
            });
        }
        envelope::sort(&mut payload_signatures);

        let envelope_signature = config
            .payer
            .sign(&payload.envelope_message(&payload_signatures))
            .await?;

        let to_dto = |signature: envelope::Signature| dto::Signature {
            signature: signature.signature,
            ..dto::Signature::from(&signature.key)
        };
        Ok(dto::Transaction {
            script: payload.script,
            arguments: payload.arguments,
            reference_block_id: block.id,
            gas_limit: payload.gas_limit,
            payer: payload.payer,
            proposal_key: dto::ProposalKey {
                address: config.proposer.key.address,
                key_index: config.proposer.key.key_index,
                sequence_number,
            },
            authorizers: payload.authorizers,
            payload_signatures: payload_signatures.into_iter().map(to_dto).collect(),
            envelope_signatures: vec![dto::Signature {
                signature: envelope_signature.signature,
                ..dto::Signature::from(&envelope_signature.key)
            }],
        })
    }

    async fn send(&self, transaction: &dto::Transaction) -> Result<flow::TransactionId, Error> {
        let submitted = util::http::roundtrip!(
            <dto::SubmittedTransaction, dto::Error>;
            self.client
                .post(util::url::join(&self.endpoint, "v1/transactions"))
                .json(transaction)
        )
        .await?;
        Ok(submitted.id)
    }

    async fn result(&self, id: flow::TransactionId) -> Result<flow::TransactionResult, Error> {
        let result = util::http::roundtrip!(
            <dto::TransactionResult, dto::Error>;
            self.client.get(util::url::join(
                &self.endpoint,
                &format!("v1/transaction_results/{id}"),
            ))
        )
        .await;
        match result {
            Ok(result) => Ok(result.into_domain()?),
            // The access node does not know about transactions that were not
            // yet picked up by a collection node.
            Err(err) if status(&err) == Some(StatusCode::NOT_FOUND) => {
                Ok(flow::TransactionResult {
                    status: flow::Status::Unknown,
                    status_code: 0,
                    error_message: None,
                    events: Vec::new(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait::async_trait]
impl chain::Chain for Client {
    async fn submit(
        &self,
        config: &transaction::Config,
    ) -> Result<flow::TransactionId, chain::Error> {
        // Set up a tracing span to correlate the requests of one submission.
        static ID: AtomicU64 = AtomicU64::new(0);
        let id = ID.fetch_add(1, atomic::Ordering::Relaxed);

        async {
            let transaction = self.sign(config).await?;
            self.send(&transaction).await
        }
        .instrument(tracing::trace_span!("submit", id = %id))
        .await
        .map_err(|err| match err {
            Error::Signing(signer::Error::RateLimited) => chain::Error::RateLimited,
            err => anyhow::Error::new(err)
                .context("submitting transaction")
                .into(),
        })
    }

    async fn status(&self, id: flow::TransactionId) -> anyhow::Result<flow::TransactionResult> {
        self.result(id)
            .await
            .with_context(|| format!("fetching result of transaction {id}"))
    }
}

fn status(err: &util::http::RoundtripError<dto::Error>) -> Option<StatusCode> {
    match err {
        util::http::RoundtripError::Http(err) => err.status(),
        util::http::RoundtripError::Api(err) => StatusCode::from_u16(err.code).ok(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no sealed block available")]
    NoSealedBlock,
    #[error("reference block ID is not 32 bytes long")]
    MalformedBlockId,
    #[error("account key {0} not found or revoked")]
    MissingKey(flow::AccountKey),
    #[error("{0} is not a signer of the transaction")]
    UnknownSigner(flow::AccountKey),
    #[error("failed to encode transaction arguments: {0}")]
    Arguments(#[from] serde_json::Error),
    #[error("failed to sign transaction: {0}")]
    Signing(#[from] signer::Error),
    #[error(transparent)]
    Event(#[from] dto::MalformedEvent),
    #[error("access node error {}: {}", .0.code, .0.message)]
    Api(dto::Error),
    #[error(transparent)]
    Http(util::http::Error),
}

impl From<util::http::RoundtripError<dto::Error>> for Error {
    fn from(err: util::http::RoundtripError<dto::Error>) -> Self {
        match err {
            util::http::RoundtripError::Http(err) => Self::Http(err),
            util::http::RoundtripError::Api(err) => Self::Api(err),
        }
    }
}

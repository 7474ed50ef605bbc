//! Migration of COA assets to an EVM address in a single Flow transaction.
//!
//! Fund movements are irreversible, so every stage is logged with enough
//! detail to reconstruct what was submitted after the fact.

use {
    crate::{
        domain::{
            asset::Assets,
            authorization::{self, Resolver},
            calldata::{self, CallBatch},
            chain::{self, Chain},
            confirmation::{self, Waiter},
            correlation::{self, AssetResult},
            eth,
            flow,
            transaction,
        },
        infra::metrics,
        util,
    },
    serde::Serialize,
    std::{sync::Arc, time::Duration},
};

#[derive(Clone, Debug)]
pub struct Config {
    pub kind: transaction::Kind,
    /// Flow computation limit of the migration transaction.
    pub gas_limit: u64,
    /// EVM gas limit of every individual call.
    pub evm_gas_limit: u64,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

pub struct Migrator {
    config: Config,
    resolver: Resolver,
    chain: Arc<dyn Chain>,
    waiter: Waiter,
}

/// A submitted migration transaction.
#[derive(Clone, Debug)]
pub struct Submitted {
    pub id: flow::TransactionId,
    pub batch: CallBatch,
    pub payment: authorization::Payment,
}

/// The per-asset report of a sealed migration.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Migration {
    #[serde(serialize_with = "serialize_display")]
    pub transaction: flow::TransactionId,
    pub sponsored: bool,
    pub results: Vec<AssetResult>,
}

impl Migration {
    pub fn failures(&self) -> impl Iterator<Item = &AssetResult> {
        self.results.iter().filter(|result| !result.success)
    }
}

impl Migrator {
    pub fn new(config: Config, resolver: Resolver, chain: Arc<dyn Chain>) -> Self {
        Self {
            config,
            resolver,
            waiter: Waiter::new(chain.clone()),
            chain,
        }
    }

    /// Moves `assets` from the COA at `sender` to `receiver` and reports the
    /// outcome of every individual transfer.
    pub async fn migrate(
        &self,
        assets: &Assets,
        sender: &str,
        receiver: &str,
    ) -> Result<Migration, Error> {
        let submitted = self.submit(assets, sender, receiver).await?;
        self.report(assets, &submitted).await
    }

    /// Validates and encodes the assets, resolves signing roles and submits
    /// the migration transaction. Nothing touches the chain if validation
    /// fails.
    pub async fn submit(
        &self,
        assets: &Assets,
        sender: &str,
        receiver: &str,
    ) -> Result<Submitted, Error> {
        metrics::migration_started();
        self.try_submit(assets, sender, receiver)
            .await
            .inspect_err(metrics::migration_failed)
    }

    async fn try_submit(
        &self,
        assets: &Assets,
        sender: &str,
        receiver: &str,
    ) -> Result<Submitted, Error> {
        let sender = eth::validate(sender).map_err(calldata::Error::from)?;
        let receiver = eth::validate(receiver).map_err(calldata::Error::from)?;
        tracing::info!(
            %sender,
            %receiver,
            erc20 = assets.erc20.len(),
            erc721 = assets.erc721.len(),
            erc1155 = assets.erc1155.len(),
            "migrating assets"
        );
        if assets.is_empty() {
            return Err(Error::NoAssets);
        }

        let batch = calldata::build_batch(assets, sender, receiver)?;
        for (index, ((target, value, data), asset)) in batch.iter().zip(assets.iter()).enumerate() {
            tracing::info!(
                index,
                standard = ?asset.standard(),
                asset = asset.address(),
                id = asset.id(),
                amount = asset.amount(),
                %target,
                %value,
                data = %util::fmt::Hex(data),
                "encoded call"
            );
        }

        let roles = self.resolver.resolve(self.config.kind).await?;
        let result = self.send(&batch, &roles).await;
        let (id, roles) = match result {
            Ok(id) => (id, roles),
            Err(chain::Error::RateLimited) if roles.payment.is_sponsored() => {
                let roles = self.resolver.self_pay_after_rate_limit(roles).await?;
                let id = self
                    .send(&batch, &roles)
                    .await
                    .map_err(Error::Submission)?;
                (id, roles)
            }
            Err(err) => return Err(Error::Submission(err)),
        };
        tracing::info!(
            transaction = %id,
            calls = batch.len(),
            payer = %roles.payer.key,
            "submitted migration transaction"
        );

        Ok(Submitted {
            id,
            batch,
            payment: roles.payment,
        })
    }

    async fn send(
        &self,
        batch: &CallBatch,
        roles: &authorization::Roles,
    ) -> Result<flow::TransactionId, chain::Error> {
        let transaction = transaction::Config {
            kind: self.config.kind,
            body: transaction::Body::BatchCall {
                batch: batch.clone(),
                evm_gas_limit: self.config.evm_gas_limit,
            },
            gas_limit: self.config.gas_limit,
            proposer: roles.proposer.clone(),
            authorizations: roles.authorizations.clone(),
            payer: roles.payer.clone(),
        };
        tracing::debug!(?transaction, "submitting transaction");
        self.chain.submit(&transaction).await
    }

    /// Waits for the submitted transaction to be sealed and correlates its
    /// EVM execution events with the assets. Failed transfers are part of
    /// the report and are never retried.
    pub async fn report(&self, assets: &Assets, submitted: &Submitted) -> Result<Migration, Error> {
        let result = self.try_report(assets, submitted).await;
        match &result {
            Ok(migration) => metrics::migration_succeeded(migration),
            Err(err) => metrics::migration_failed(err),
        }
        result
    }

    async fn try_report(&self, assets: &Assets, submitted: &Submitted) -> Result<Migration, Error> {
        let result = self
            .waiter
            .wait(submitted.id, self.config.timeout, self.config.poll_interval)
            .await?;
        if !result.is_successful() {
            tracing::warn!(
                transaction = %submitted.id,
                status = ?result.status,
                status_code = result.status_code,
                error = ?result.error_message,
                "migration transaction failed"
            );
            return Err(Error::Failed {
                id: submitted.id,
                status: result.status,
                message: result.error_message.unwrap_or_default(),
            });
        }

        let results = correlation::correlate(&result.events, &submitted.batch, assets)?;
        for result in &results {
            if result.success {
                tracing::info!(
                    index = result.index,
                    asset = %result.address,
                    id = ?result.id,
                    amount = ?result.amount,
                    gas = ?result.gas_consumed,
                    "asset transferred"
                );
            } else {
                tracing::warn!(
                    index = result.index,
                    asset = %result.address,
                    id = ?result.id,
                    amount = ?result.amount,
                    code = ?result.error_code,
                    message = ?result.error_message,
                    failure = ?result.failure,
                    "asset transfer failed"
                );
                metrics::transfer_failed(result);
            }
        }

        Ok(Migration {
            transaction: submitted.id,
            sponsored: submitted.payment.is_sponsored(),
            results,
        })
    }
}

fn serialize_display<S: serde::Serializer>(
    value: &impl std::fmt::Display,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] calldata::Error),
    #[error("no assets to migrate")]
    NoAssets,
    #[error(transparent)]
    Authorization(#[from] authorization::Error),
    #[error("failed to submit transaction: {0:#}")]
    Submission(chain::Error),
    #[error(transparent)]
    Confirmation(#[from] confirmation::Error),
    #[error("transaction {id} failed with status {status:?}: {message}")]
    Failed {
        id: flow::TransactionId,
        status: flow::Status,
        message: String,
    },
    #[error(transparent)]
    Correlation(#[from] correlation::UnmatchedEventCount),
}

impl Error {
    /// for instrumentization purposes
    pub fn format_variant(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Validation",
            Self::NoAssets => "NoAssets",
            Self::Authorization(authorization::Error::UserCancelled) => "UserCancelled",
            Self::Authorization(_) => "Authorization",
            Self::Submission(_) => "Submission",
            Self::Confirmation(confirmation::Error::Timeout { .. }) => "Timeout",
            Self::Confirmation(_) => "Confirmation",
            Self::Failed { .. } => "Failed",
            Self::Correlation(_) => "UnmatchedEventCount",
        }
    }
}

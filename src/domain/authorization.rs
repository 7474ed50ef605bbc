//! Resolution of the signing roles of a transaction.
//!
//! Every transaction has a proposer (the active account), one or more
//! authorizers and a payer. Fees are sponsored by a third-party fee payer
//! whenever possible. During surge pricing, or when free gas is disabled,
//! the proposer pays. If the fee payer turns out to be rate limited while
//! obtaining its authorization, the user decides whether to pay themselves
//! or to abort.

use {
    crate::{
        domain::{
            flow,
            payer,
            signer::{self, Signer},
            transaction::{self, Authorization},
        },
        infra::metrics,
    },
    std::sync::Arc,
};

/// The active account.
#[derive(Clone, Copy, Debug)]
pub struct Account {
    pub address: flow::Address,
    /// Set when the active account is a child account managed by a parent.
    pub parent: Option<flow::Address>,
    /// Index of the locally held key on the signing account.
    pub key_index: u32,
}

impl Account {
    /// The account proposing and authorizing transactions: the parent for
    /// child accounts, the account itself otherwise.
    pub fn signing_key(&self) -> flow::AccountKey {
        flow::AccountKey {
            address: self.parent.unwrap_or(self.address),
            key_index: self.key_index,
        }
    }
}

/// Whether fee sponsoring is currently offered to this client.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FreeGas: Send + Sync {
    async fn allowed(&self) -> anyhow::Result<bool>;
}

/// Obtains the fee payer's agreement to sponsor a transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FeePayerAuthorizer: Send + Sync {
    async fn authorize(&self, key: &flow::AccountKey) -> Result<(), signer::Error>;
}

/// Asks the user whether to pay fees themselves while sponsoring is rate
/// limited.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SurgePrompt: Send + Sync {
    async fn approve_self_pay(&self, surge: &payer::Surge) -> bool;
}

/// The collaborators the resolver depends on.
pub struct Backends {
    /// Signs with the locally held key of the active account.
    pub proposer: Arc<dyn Signer>,
    pub fee_payer: Arc<dyn Signer>,
    pub fee_payer_authorizer: Arc<dyn FeePayerAuthorizer>,
    pub bridge_payer: Arc<dyn Signer>,
    pub payer_status: Arc<dyn payer::StatusProvider>,
    pub free_gas: Arc<dyn FreeGas>,
    pub prompt: Arc<dyn SurgePrompt>,
}

/// The signing roles of one transaction.
#[derive(Clone, Debug)]
pub struct Roles {
    pub proposer: Authorization,
    /// Always starts with the proposer.
    pub authorizations: Vec<Authorization>,
    pub payer: Authorization,
    pub payment: Payment,
    /// Surge status the roles were resolved under.
    pub surge: payer::Surge,
}

/// Who ends up paying the transaction fees, and why.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Payment {
    Sponsored,
    SurgePricing,
    FreeGasDisabled,
    ApprovedDuringRateLimit,
}

impl Payment {
    pub fn is_sponsored(self) -> bool {
        self == Payment::Sponsored
    }
}

pub struct Resolver {
    network: flow::Network,
    account: Account,
    backends: Backends,
}

impl Resolver {
    pub fn new(network: flow::Network, account: Account, backends: Backends) -> Self {
        Self {
            network,
            account,
            backends,
        }
    }

    /// Resolves the proposer, authorizers and payer for a transaction of the
    /// given kind.
    pub async fn resolve(&self, kind: transaction::Kind) -> Result<Roles, Error> {
        let proposer = Authorization::new(
            self.account.signing_key(),
            self.backends.proposer.clone(),
        );
        tracing::debug!(proposer = %proposer.key, "resolved proposer");

        let status = self
            .backends
            .payer_status
            .status(self.network)
            .await
            .map_err(Error::PayerStatus)?;
        tracing::debug!(
            surge = status.surge.active,
            multiplier = ?status.surge.multiplier,
            fee_payer = %status.fee_payer,
            bridge_payer = %status.bridge_payer,
            "fetched payer status"
        );

        let mut authorizations = vec![proposer.clone()];
        if kind.requires_bridge_payer() {
            let bridge_payer =
                Authorization::new(status.bridge_payer, self.backends.bridge_payer.clone());
            tracing::debug!(bridge_payer = %bridge_payer.key, "resolved bridge payer");
            authorizations.push(bridge_payer);
        }

        let (payer, payment) = self.resolve_payer(&status, &proposer).await?;
        tracing::info!(
            ?kind,
            proposer = %proposer.key,
            payer = %payer.key,
            ?payment,
            authorizers = authorizations.len(),
            "resolved transaction roles"
        );

        Ok(Roles {
            proposer,
            authorizations,
            payer,
            payment,
            surge: status.surge,
        })
    }

    /// Re-resolves the payer of sponsored roles after the fee payer turned
    /// out to be rate limited while signing. The proposer pays if the user
    /// approves.
    pub async fn self_pay_after_rate_limit(&self, roles: Roles) -> Result<Roles, Error> {
        tracing::warn!(
            fee_payer = %roles.payer.key,
            "fee payer signature is rate limited; asking user to pay fees"
        );
        self.prompt_self_pay(&roles.surge).await?;
        Ok(Roles {
            payer: roles.proposer.clone(),
            payment: Payment::ApprovedDuringRateLimit,
            ..roles
        })
    }

    async fn resolve_payer(
        &self,
        status: &payer::Status,
        proposer: &Authorization,
    ) -> Result<(Authorization, Payment), Error> {
        if status.surge.active {
            return Ok((proposer.clone(), Payment::SurgePricing));
        }

        let allowed = self
            .backends
            .free_gas
            .allowed()
            .await
            .map_err(Error::FreeGas)?;
        if !allowed {
            return Ok((proposer.clone(), Payment::FreeGasDisabled));
        }

        match self
            .backends
            .fee_payer_authorizer
            .authorize(&status.fee_payer)
            .await
        {
            Ok(()) => Ok((
                Authorization::new(status.fee_payer, self.backends.fee_payer.clone()),
                Payment::Sponsored,
            )),
            Err(signer::Error::RateLimited) => {
                tracing::warn!(
                    fee_payer = %status.fee_payer,
                    "fee payer is rate limited; asking user to pay fees"
                );
                self.prompt_self_pay(&status.surge).await?;
                Ok((proposer.clone(), Payment::ApprovedDuringRateLimit))
            }
            Err(err) => Err(Error::Authorization(err)),
        }
    }

    async fn prompt_self_pay(&self, surge: &payer::Surge) -> Result<(), Error> {
        let approved = self.backends.prompt.approve_self_pay(surge).await;
        metrics::surge_prompt(approved);
        if !approved {
            tracing::info!("user declined to pay fees");
            return Err(Error::UserCancelled);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to fetch payer status: {0:#}")]
    PayerStatus(anyhow::Error),
    #[error("failed to check whether free gas is allowed: {0:#}")]
    FreeGas(anyhow::Error),
    #[error("fee payer authorization failed: {0}")]
    Authorization(#[source] signer::Error),
    #[error("user declined to pay fees while sponsoring is rate limited")]
    UserCancelled,
}

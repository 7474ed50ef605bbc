//! Third-party payer accounts and the surge pricing state.

use crate::domain::flow;

/// The payer configuration of a network as published by the payer service.
#[derive(Clone, Debug, PartialEq)]
pub struct Status {
    pub surge: Surge,
    /// The account sponsoring transaction fees.
    pub fee_payer: flow::AccountKey,
    /// The account sponsoring bridging fees.
    pub bridge_payer: flow::AccountKey,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Surge {
    /// While active, fees are not sponsored and users pay themselves.
    pub active: bool,
    /// Current fee multiplier, if published.
    pub multiplier: Option<f64>,
}

/// Provides the current payer status of a network.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait StatusProvider: Send + Sync {
    async fn status(&self, network: flow::Network) -> anyhow::Result<Status>;
}

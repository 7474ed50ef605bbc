use {
    crate::domain::{authorization, flow, migration},
    std::time::Duration,
};

pub mod file;

/// The migrator configuration.
pub struct Config {
    pub network: flow::Network,
    pub access_node: reqwest::Url,
    pub payer_status: reqwest::Url,
    pub payer_status_ttl: Duration,
    pub account: authorization::Account,
    pub private_key: Option<String>,
    pub free_gas: FreeGas,
    pub fee_payer: reqwest::Url,
    pub bridge_payer: reqwest::Url,
    pub migration: migration::Config,
}

/// Where the free gas policy comes from.
#[derive(Debug, PartialEq)]
pub enum FreeGas {
    Fixed(bool),
    Api(reqwest::Url),
}

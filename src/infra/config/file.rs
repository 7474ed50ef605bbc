use {
    crate::domain::{authorization, flow, migration, transaction},
    serde::Deserialize,
    serde_with::{DisplayFromStr, serde_as},
    std::{path::Path, time::Duration},
};

#[serde_as]
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Config {
    network: flow::Network,

    /// Base URL of the Flow Access REST API.
    #[serde_as(as = "DisplayFromStr")]
    access_node_url: reqwest::Url,

    /// The service publishing payer accounts and surge pricing.
    #[serde_as(as = "DisplayFromStr")]
    payer_status_url: reqwest::Url,

    /// How long payer statuses are reused.
    #[serde(with = "humantime_serde", default = "default_payer_status_ttl")]
    payer_status_ttl: Duration,

    account: Account,

    sponsorship: Sponsorship,

    fee_payer: Service,

    bridge_payer: Service,

    #[serde(default)]
    transaction: Transaction,
}

#[serde_as]
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Account {
    /// Flow address of the active account.
    #[serde_as(as = "DisplayFromStr")]
    address: flow::Address,

    /// Parent account signing on behalf of a child account.
    #[serde_as(as = "Option<DisplayFromStr>")]
    parent: Option<flow::Address>,

    #[serde(default)]
    key_index: u32,

    /// Hex encoded secp256k1 private key of the signing account. Can also be
    /// passed on the command line.
    #[serde(default)]
    private_key: Option<String>,
}

#[serde_as]
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Sponsorship {
    /// Asks this service whether fees are sponsored.
    #[serde_as(as = "Option<DisplayFromStr>")]
    url: Option<reqwest::Url>,

    /// Fixed answer used instead of a sponsorship service.
    #[serde(default)]
    free_gas: Option<bool>,
}

#[serde_as]
#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Service {
    #[serde_as(as = "DisplayFromStr")]
    url: reqwest::Url,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Transaction {
    /// Whether the bridge payer co-authorizes migrations.
    #[serde(default)]
    bridge_payer: bool,

    #[serde(default = "default_gas_limit")]
    gas_limit: u64,

    #[serde(default = "default_evm_gas_limit")]
    evm_gas_limit: u64,

    #[serde(with = "humantime_serde", default = "default_timeout")]
    timeout: Duration,

    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    poll_interval: Duration,
}

impl Default for Transaction {
    fn default() -> Self {
        Self {
            bridge_payer: false,
            gas_limit: default_gas_limit(),
            evm_gas_limit: default_evm_gas_limit(),
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_payer_status_ttl() -> Duration {
    Duration::from_secs(30)
}

fn default_gas_limit() -> u64 {
    9999
}

fn default_evm_gas_limit() -> u64 {
    15_000_000
}

fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

/// Load the migrator configuration from a TOML file.
///
/// # Panics
///
/// This method panics if the config is invalid or on I/O errors.
pub async fn load(path: &Path) -> super::Config {
    let data = tokio::fs::read_to_string(path)
        .await
        .unwrap_or_else(|e| panic!("I/O error while reading {path:?}: {e:?}"));
    let config = parse::<Config>(&data, path);

    let free_gas = match (config.sponsorship.url, config.sponsorship.free_gas) {
        (Some(url), None) => super::FreeGas::Api(url),
        (None, Some(allowed)) => super::FreeGas::Fixed(allowed),
        _ => panic!(
            "invalid configuration {path:?}: exactly one of sponsorship.url and \
             sponsorship.free-gas must be set"
        ),
    };
    let kind = if config.transaction.bridge_payer {
        transaction::Kind::BridgedBatchCall
    } else {
        transaction::Kind::BatchCall
    };

    super::Config {
        network: config.network,
        access_node: config.access_node_url,
        payer_status: config.payer_status_url,
        payer_status_ttl: config.payer_status_ttl,
        account: authorization::Account {
            address: config.account.address,
            parent: config.account.parent,
            key_index: config.account.key_index,
        },
        private_key: config.account.private_key,
        free_gas,
        fee_payer: config.fee_payer.url,
        bridge_payer: config.bridge_payer.url,
        migration: migration::Config {
            kind,
            gas_limit: config.transaction.gas_limit,
            evm_gas_limit: config.transaction.evm_gas_limit,
            timeout: config.transaction.timeout,
            poll_interval: config.transaction.poll_interval,
        },
    }
}

fn parse<T>(data: &str, path: &Path) -> T
where
    T: for<'de> Deserialize<'de>,
{
    match toml::de::from_str(data) {
        Ok(config) => {
            tracing::debug!(?path, "loaded configuration");
            config
        }
        Err(err) => panic!("invalid configuration {path:?}: {err}"),
    }
}

//! CLI arguments for the `migrator` binary.

use {
    clap::{Parser, Subcommand},
    std::{path::PathBuf, time::Duration},
};

/// Migrate tokens and NFTs held by a Cadence-owned account to an EVM address.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// Log filter to use.
    #[clap(long, env, default_value = "warn,migrator=info")]
    pub log: String,

    /// Path to the TOML configuration file.
    #[clap(long, env)]
    pub config: PathBuf,

    /// Hex encoded private key of the signing account. Takes precedence over
    /// the configuration file.
    #[clap(long, env = "FLOW_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Print the collected Prometheus metrics to stderr before exiting.
    #[clap(long)]
    pub print_metrics: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
#[clap(rename_all = "lowercase")]
pub enum Command {
    /// Migrate assets and print the per-asset report as JSON.
    Migrate {
        /// JSON file listing the `erc20`, `erc721` and `erc1155` assets to
        /// migrate.
        #[clap(long)]
        assets: PathBuf,

        /// EVM address of the COA holding the assets.
        #[clap(long)]
        sender: String,

        /// EVM address receiving the assets.
        #[clap(long)]
        receiver: String,

        /// Pay fees without asking if sponsoring is rate limited.
        #[clap(long, conflicts_with = "decline_surge")]
        approve_surge: bool,

        /// Abort without asking if sponsoring is rate limited.
        #[clap(long)]
        decline_surge: bool,
    },
    /// Wait for a submitted transaction to become final and print its status.
    Wait {
        /// Flow transaction ID.
        #[clap(long)]
        transaction: String,

        /// Overrides the configured confirmation timeout.
        #[clap(long, value_parser = humantime::parse_duration)]
        timeout: Option<Duration>,

        /// Overrides the configured polling interval.
        #[clap(long, value_parser = humantime::parse_duration)]
        poll_interval: Option<Duration>,
    },
}

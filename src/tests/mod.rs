//! Scenario tests running the HTTP backends against a mock server.

use {crate::domain::flow, std::net::SocketAddr};

mod migration;
mod mock;

/// Private key of the proposal key of [`account`].
const PRIVATE_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// Base URL of a mock server.
fn url(address: &SocketAddr) -> reqwest::Url {
    format!("http://{address}/").parse().unwrap()
}

fn account() -> flow::AccountKey {
    flow::AccountKey {
        address: flow::Address([0, 0, 0, 0, 0, 0, 0, 0x2a]),
        key_index: 0,
    }
}

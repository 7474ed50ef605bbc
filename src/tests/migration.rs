//! Complete migrations through the HTTP backends, signing with a local key.

use {
    super::{PRIVATE_KEY, account, flow_client, mock, url},
    crate::{
        domain::{
            asset::Assets,
            authorization::{self, Resolver},
            flow,
            migration::{self, Migrator},
            transaction,
        },
        infra::{self, free_gas, payer, prompt, signer},
    },
    base64::prelude::*,
    serde_json::json,
    std::{sync::Arc, time::Duration},
};

const SENDER: &str = "0x00000000000000000000000230bfb7ac9b5ac9f9";
const RECEIVER: &str = "0x84c6a2e6765E88427c41bB38C82a78b570e24709";

fn assets() -> Assets {
    serde_json::from_value(json!({
        "erc20": [{"address": "0x0000000000000000000000000000000000000000", "amount": "0.5"}],
        "erc721": [{"address": "0x2B7CfEF2f9DdB2E4bD8F2a5A4E3E3E3E3E3E3E3E", "id": "42"}],
    }))
    .unwrap()
}

fn migrator(server: &mock::http::ServerHandle, free_gas: bool, approve: bool) -> Migrator {
    migrator_of_kind(server, transaction::Kind::BatchCall, free_gas, approve)
}

fn migrator_of_kind(
    server: &mock::http::ServerHandle,
    kind: transaction::Kind,
    free_gas: bool,
    approve: bool,
) -> Migrator {
    let remote = Arc::new(signer::Remote::new(signer::remote::Config {
        endpoint: url(&server.address),
    }));
    let resolver = Resolver::new(
        flow::Network::Mainnet,
        authorization::Account {
            address: account().address,
            parent: None,
            key_index: account().key_index,
        },
        authorization::Backends {
            proposer: Arc::new(signer::Local::from_private_key(PRIVATE_KEY).unwrap()),
            fee_payer: remote.clone(),
            fee_payer_authorizer: remote.clone(),
            bridge_payer: remote,
            payer_status: Arc::new(payer::Api::new(url(&server.address).join("payers").unwrap())),
            free_gas: Arc::new(free_gas::Policy::Fixed(free_gas)),
            prompt: Arc::new(prompt::Fixed(approve)),
        },
    );
    let chain = Arc::new(infra::flow::Client::new(infra::flow::Config {
        endpoint: url(&server.address),
        network: flow::Network::Mainnet,
    }));
    Migrator::new(
        migration::Config {
            kind,
            gas_limit: 9999,
            evm_gas_limit: 15_000_000,
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(10),
        },
        resolver,
        chain,
    )
}

fn payer_status() -> mock::http::Expectation {
    mock::http::Expectation::Get {
        path: mock::http::Path::exact("payers?network=mainnet"),
        res: mock::http::Response::ok(json!({
            "surge": {"active": false},
            "feePayer": {"address": "0xfefefefefefefefe", "keyIndex": 2},
            "bridgePayer": {"address": "0x00000000000000bb", "keyIndex": 5},
        })),
    }
}

/// A signature request of the remote signer for the given key.
fn sign(address: &str, key_index: u32, res: mock::http::Response) -> mock::http::Expectation {
    mock::http::Expectation::Post {
        path: mock::http::Path::exact("sign"),
        req: mock::http::RequestBody::Partial(
            json!({"address": address, "keyIndex": key_index}),
            vec!["message"],
        ),
        res,
    }
}

fn signature(byte: u8) -> mock::http::Response {
    mock::http::Response::ok(json!({"signature": hex::encode([byte; 64])}))
}

fn authorize(res: mock::http::Response) -> mock::http::Expectation {
    mock::http::Expectation::Post {
        path: mock::http::Path::exact("authorize"),
        req: mock::http::RequestBody::Exact(json!({
            "address": "0xfefefefefefefefe",
            "keyIndex": 2,
        })),
        res,
    }
}

#[tokio::test]
async fn migrates_with_partial_failure() {
    let server = mock::http::setup(vec![
        payer_status(),
        flow_client::sealed_block(),
        flow_client::account_keys(false),
        flow_client::submission(),
        flow_client::sealed_result(vec![
            ("0", ""),
            ("306", "execution reverted: ERC721: caller is not token owner"),
        ]),
    ])
    .await;

    let migration = migrator(&server, false, false)
        .migrate(&assets(), SENDER, RECEIVER)
        .await
        .unwrap();

    assert_eq!(migration.transaction, flow_client::id());
    assert!(!migration.sponsored);
    assert_eq!(migration.results.len(), 2);
    assert!(migration.results[0].success);
    let failures = migration.failures().collect::<Vec<_>>();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].index, 1);
    assert_eq!(failures[0].id.as_deref(), Some("42"));
    assert_eq!(failures[0].error_code, Some(306));
}

#[tokio::test]
async fn sponsored_migration_is_paid_by_fee_payer() {
    let server = mock::http::setup(vec![
        payer_status(),
        authorize(mock::http::Response::status(200)),
        flow_client::sealed_block(),
        flow_client::account_keys(false),
        // The fee payer signs the envelope.
        sign("0xfefefefefefefefe", 2, signature(0xab)),
        mock::http::Expectation::Post {
            path: mock::http::Path::exact("v1/transactions"),
            req: mock::http::RequestBody::Partial(
                json!({
                    "payer": "fefefefefefefefe",
                    "proposal_key": {
                        "address": "000000000000002a",
                        "key_index": "0",
                        "sequence_number": "7",
                    },
                    "authorizers": ["000000000000002a"],
                    "envelope_signatures": [{
                        "address": "fefefefefefefefe",
                        "key_index": "2",
                        "signature": BASE64_STANDARD.encode([0xab; 64]),
                    }],
                }),
                vec![
                    "script",
                    "arguments",
                    "reference_block_id",
                    "gas_limit",
                    "payload_signatures",
                ],
            ),
            res: mock::http::Response::ok(json!({"id": flow_client::id().to_string()})),
        },
        flow_client::sealed_result(vec![("0", ""), ("0", "")]),
    ])
    .await;

    let migration = migrator(&server, true, false)
        .migrate(&assets(), SENDER, RECEIVER)
        .await
        .unwrap();

    assert!(migration.sponsored);
    assert_eq!(migration.failures().count(), 0);
}

#[tokio::test]
async fn declined_surge_prompt_submits_nothing() {
    let server = mock::http::setup(vec![
        payer_status(),
        authorize(mock::http::Response::status(429)),
    ])
    .await;

    let err = migrator(&server, true, false)
        .migrate(&assets(), SENDER, RECEIVER)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        migration::Error::Authorization(authorization::Error::UserCancelled)
    ));
}

#[tokio::test]
async fn approved_surge_prompt_pays_with_proposer() {
    let server = mock::http::setup(vec![
        payer_status(),
        authorize(mock::http::Response::status(429)),
        flow_client::sealed_block(),
        flow_client::account_keys(false),
        flow_client::submission(),
        flow_client::sealed_result(vec![("0", ""), ("0", "")]),
    ])
    .await;

    let migration = migrator(&server, true, true)
        .migrate(&assets(), SENDER, RECEIVER)
        .await
        .unwrap();

    assert!(!migration.sponsored);
    assert!(migration.results.iter().all(|result| result.success));
}

#[tokio::test]
async fn bridged_sponsored_migration_collects_payload_signatures() {
    let server = mock::http::setup(vec![
        payer_status(),
        authorize(mock::http::Response::status(200)),
        flow_client::sealed_block(),
        flow_client::account_keys(false),
        // The proposer signs the payload locally, then the bridge payer
        // co-signs it.
        sign("0x00000000000000bb", 5, signature(0xcd)),
        sign("0xfefefefefefefefe", 2, signature(0xab)),
        mock::http::Expectation::Post {
            path: mock::http::Path::exact("v1/transactions"),
            req: mock::http::RequestBody::Partial(
                json!({
                    "payer": "fefefefefefefefe",
                    "proposal_key": {
                        "address": "000000000000002a",
                        "key_index": "0",
                        "sequence_number": "7",
                    },
                    "authorizers": ["000000000000002a", "00000000000000bb"],
                    "payload_signatures": [
                        {
                            "address": "000000000000002a",
                            "key_index": "0",
                        },
                        {
                            "address": "00000000000000bb",
                            "key_index": "5",
                            "signature": BASE64_STANDARD.encode([0xcd; 64]),
                        },
                    ],
                    "envelope_signatures": [{
                        "address": "fefefefefefefefe",
                        "key_index": "2",
                        "signature": BASE64_STANDARD.encode([0xab; 64]),
                    }],
                }),
                vec![
                    "script",
                    "arguments",
                    "reference_block_id",
                    "gas_limit",
                    // Produced by the local key.
                    "payload_signatures.0.signature",
                ],
            ),
            res: mock::http::Response::ok(json!({"id": flow_client::id().to_string()})),
        },
        flow_client::sealed_result(vec![("0", ""), ("0", "")]),
    ])
    .await;

    let migration = migrator_of_kind(&server, transaction::Kind::BridgedBatchCall, true, false)
        .migrate(&assets(), SENDER, RECEIVER)
        .await
        .unwrap();

    assert!(migration.sponsored);
    assert_eq!(migration.failures().count(), 0);
}

#[tokio::test]
async fn rate_limited_fee_payer_signature_resubmits_after_approval() {
    let server = mock::http::setup(vec![
        payer_status(),
        authorize(mock::http::Response::status(200)),
        flow_client::sealed_block(),
        flow_client::account_keys(false),
        sign("0xfefefefefefefefe", 2, mock::http::Response::status(429)),
        // Re-signed and paid by the proposer.
        flow_client::sealed_block(),
        flow_client::account_keys(false),
        flow_client::submission(),
        flow_client::sealed_result(vec![("0", ""), ("0", "")]),
    ])
    .await;

    let migration = migrator(&server, true, true)
        .migrate(&assets(), SENDER, RECEIVER)
        .await
        .unwrap();

    assert!(!migration.sponsored);
    assert!(migration.results.iter().all(|result| result.success));
}

#[tokio::test]
async fn rate_limited_fee_payer_signature_cancels_when_declined() {
    let server = mock::http::setup(vec![
        payer_status(),
        authorize(mock::http::Response::status(200)),
        flow_client::sealed_block(),
        flow_client::account_keys(false),
        sign("0xfefefefefefefefe", 2, mock::http::Response::status(503)),
    ])
    .await;

    let err = migrator(&server, true, false)
        .migrate(&assets(), SENDER, RECEIVER)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        migration::Error::Authorization(authorization::Error::UserCancelled)
    ));
}

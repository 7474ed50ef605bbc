//! The Cadence transaction executing a call batch from the signer's COA and
//! its JSON-Cadence encoded arguments.

use {
    crate::domain::{calldata::CallBatch, flow, transaction},
    serde_json::{Value, json},
};

/// Renders the transaction script for `kind` on `network`.
///
/// Calls are executed in batch order and their results are not checked, so a
/// failing call does not revert the others. Each call emits an
/// `EVM.TransactionExecuted` event carrying its outcome.
pub fn script(kind: transaction::Kind, network: flow::Network) -> String {
    let prepare = match kind {
        transaction::Kind::BatchCall => "prepare(signer: auth(BorrowValue) &Account)",
        transaction::Kind::BridgedBatchCall => {
            "prepare(signer: auth(BorrowValue) &Account, bridgePayer: &Account)"
        }
    };
    format!(
        r#"import EVM from {evm}

transaction(addresses: [String], values: [UInt], datas: [[UInt8]], gasLimit: UInt64) {{
    let coa: auth(EVM.Call) &EVM.CadenceOwnedAccount

    {prepare} {{
        self.coa = signer.storage.borrow<auth(EVM.Call) &EVM.CadenceOwnedAccount>(from: /storage/evm)
            ?? panic("Could not borrow reference to the signer's COA")
    }}

    execute {{
        for i, address in addresses {{
            self.coa.call(
                to: EVM.EVMAddress(bytes: address.decodeHex().toConstantSized<[UInt8; 20]>()!),
                data: datas[i],
                gasLimit: gasLimit,
                value: EVM.Balance(attoflow: UInt(values[i]))
            )
        }}
    }}
}}
"#,
        evm = network.evm_contract(),
    )
}

/// Encodes the script arguments for executing `batch` with a per-call EVM
/// gas limit.
pub fn arguments(batch: &CallBatch, evm_gas_limit: u64) -> Result<Vec<Vec<u8>>, serde_json::Error> {
    let addresses = array(
        batch
            .iter()
            .map(|(address, _, _)| string(hex::encode(address))),
    );
    let values = array(batch.iter().map(|(_, value, _)| uint("UInt", value)));
    let datas = array(
        batch
            .iter()
            .map(|(_, _, data)| array(data.iter().map(|byte| uint("UInt8", byte)))),
    );
    let gas_limit = uint("UInt64", evm_gas_limit);

    [addresses, values, datas, gas_limit]
        .iter()
        .map(serde_json::to_vec)
        .collect()
}

fn array(values: impl Iterator<Item = Value>) -> Value {
    json!({ "type": "Array", "value": values.collect::<Vec<_>>() })
}

fn string(value: String) -> Value {
    json!({ "type": "String", "value": value })
}

/// JSON-Cadence encodes integers as decimal strings.
fn uint(kind: &str, value: impl ToString) -> Value {
    json!({ "type": kind, "value": value.to_string() })
}

//! Correlation of EVM execution events with the migrated assets.
//!
//! The COA emits one `EVM.TransactionExecuted` event per call, in call order.
//! Events are matched to batch entries by position: several calls may target
//! the same contract, so the target address cannot identify an entry.

use {
    crate::domain::{
        asset::{Assets, Standard},
        calldata::CallBatch,
        flow,
    },
    serde::Serialize,
};

/// The outcome of the transfer of one asset.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResult {
    /// Position of the asset in batch order.
    pub index: usize,
    pub standard: Standard,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_consumed: Option<u64>,
}

/// A best-effort classification of a failed call for diagnostics. Never
/// affects whether a call counts as failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Reverted,
    Arithmetic,
    OutOfGas,
    InsufficientBalance,
    Other,
}

impl FailureKind {
    pub fn classify(message: Option<&str>) -> Self {
        let message = message.unwrap_or_default().to_lowercase();
        if message.contains("execution reverted") {
            Self::Reverted
        } else if message.contains("arithmetic") {
            Self::Arithmetic
        } else if message.contains("out of gas") {
            Self::OutOfGas
        } else if message.contains("insufficient") {
            Self::InsufficientBalance
        } else {
            Self::Other
        }
    }
}

/// Maps the EVM execution events of a transaction onto the assets of the
/// batch it executed.
pub fn correlate(
    events: &[flow::Event],
    batch: &CallBatch,
    assets: &Assets,
) -> Result<Vec<AssetResult>, UnmatchedEventCount> {
    let executions = events
        .iter()
        .filter_map(flow::Event::evm_execution)
        .collect::<Vec<_>>();
    if executions.len() != batch.len() || batch.len() != assets.len() {
        return Err(UnmatchedEventCount {
            expected: batch.len(),
            actual: executions.len(),
        });
    }

    Ok(assets
        .iter()
        .zip(executions)
        .enumerate()
        .map(|(index, (asset, execution))| {
            let success = execution.error_code == 0;
            let error_message = execution
                .error_message
                .clone()
                .filter(|message| !message.is_empty());
            AssetResult {
                index,
                standard: asset.standard(),
                address: asset.address().to_owned(),
                id: asset.id().map(str::to_owned),
                amount: asset.amount().map(str::to_owned),
                success,
                error_code: (!success).then_some(execution.error_code),
                failure: (!success).then(|| FailureKind::classify(error_message.as_deref())),
                error_message: error_message.filter(|_| !success),
                gas_consumed: execution.gas_consumed,
            }
        })
        .collect())
}

#[derive(Debug, Eq, PartialEq, thiserror::Error)]
#[error("expected {expected} EVM execution events but found {actual}")]
pub struct UnmatchedEventCount {
    pub expected: usize,
    pub actual: usize,
}

//! The Cadence transaction configuration assembled for one migration.

use {
    crate::domain::{calldata::CallBatch, flow, signer},
    std::{
        fmt::{self, Debug, Formatter},
        sync::Arc,
    },
};

/// The kind of transaction being submitted. Determines which signing roles
/// are needed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
    /// COA batch call paid by the payer only.
    BatchCall,
    /// COA batch call whose bridging fees are covered by the bridge payer,
    /// which co-authorizes the transaction.
    BridgedBatchCall,
}

impl Kind {
    pub fn requires_bridge_payer(self) -> bool {
        matches!(self, Kind::BridgedBatchCall)
    }
}

/// The body of a transaction.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// Execute every call of the batch from the signer's COA, each with the
    /// given EVM gas limit. Individual calls may fail without reverting the
    /// transaction.
    BatchCall { batch: CallBatch, evm_gas_limit: u64 },
}

/// A fully assembled transaction ready to be signed and submitted.
#[derive(Clone, Debug)]
pub struct Config {
    pub kind: Kind,
    pub body: Body,
    /// Flow computation limit. Fixed and independent of the batch size.
    pub gas_limit: u64,
    pub proposer: Authorization,
    pub authorizations: Vec<Authorization>,
    pub payer: Authorization,
}

/// An account key together with the means to sign for it.
#[derive(Clone)]
pub struct Authorization {
    pub temp_id: String,
    pub key: flow::AccountKey,
    signer: Arc<dyn signer::Signer>,
}

impl Authorization {
    pub fn new(key: flow::AccountKey, signer: Arc<dyn signer::Signer>) -> Self {
        Self {
            temp_id: key.to_string(),
            key,
            signer,
        }
    }

    /// Signs a transaction message with this authorization's key.
    pub async fn sign(&self, message: &[u8]) -> Result<CompositeSignature, signer::Error> {
        let signature = self.signer.sign(&self.key, message).await?;
        Ok(CompositeSignature {
            key: self.key,
            signature,
        })
    }
}

impl Debug for Authorization {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("temp_id", &self.temp_id)
            .field("key", &self.key)
            .finish()
    }
}

/// A signature together with the key that produced it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompositeSignature {
    pub key: flow::AccountKey,
    pub signature: Vec<u8>,
}

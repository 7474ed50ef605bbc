use {
    crate::domain::{flow, signer},
    alloy::{
        primitives::B256,
        signers::{SignerSync, local::PrivateKeySigner},
    },
    sha2::{Digest, Sha256},
    std::{fmt, str::FromStr},
};

/// Signs with a locally held `ECDSA_secp256k1` key. The matching account key
/// must use the `SHA2_256` hashing algorithm.
pub struct Local {
    signer: PrivateKeySigner,
}

impl Local {
    /// Loads a hex encoded private key, with or without `0x` prefix.
    pub fn from_private_key(key: &str) -> Result<Self, InvalidPrivateKey> {
        let signer = PrivateKeySigner::from_str(key.trim()).map_err(|_| InvalidPrivateKey)?;
        Ok(Self { signer })
    }
}

impl fmt::Debug for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Local").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl signer::Signer for Local {
    async fn sign(&self, key: &flow::AccountKey, message: &[u8]) -> Result<Vec<u8>, signer::Error> {
        let hash = B256::from_slice(&Sha256::digest(message));
        let signature = self
            .signer
            .sign_hash_sync(&hash)
            .map_err(|err| signer::Error::Other(err.into()))?;
        tracing::trace!(%key, %hash, "signed message locally");
        // Flow expects the raw `r || s` encoding without recovery id.
        Ok(signature.as_bytes()[..64].to_vec())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid secp256k1 private key")]
pub struct InvalidPrivateKey;

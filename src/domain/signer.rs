//! Signing backends producing Flow account signatures.

use crate::domain::flow;

/// Signs Flow transaction messages on behalf of an account key.
///
/// Implementations either hold the key material locally or forward the
/// message to a remote signing service.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Signer: Send + Sync {
    /// Signs the domain-tagged transaction message and returns the raw
    /// signature bytes.
    async fn sign(&self, key: &flow::AccountKey, message: &[u8]) -> Result<Vec<u8>, Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The signing service asks clients to back off. During surge pricing
    /// sponsored signatures are rate limited.
    #[error("signing service is rate limited")]
    RateLimited,
    #[error("signing request rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

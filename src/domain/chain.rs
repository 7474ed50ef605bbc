use crate::domain::{flow, transaction};

/// Access to the Flow chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Chain: Send + Sync {
    /// Signs the transaction with all of its authorizations and submits it.
    async fn submit(&self, transaction: &transaction::Config) -> Result<flow::TransactionId, Error>;

    /// Fetches the current status of a transaction, including the events it
    /// emitted so far.
    async fn status(&self, id: flow::TransactionId) -> anyhow::Result<flow::TransactionResult>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A remote signer of the transaction is rate limited.
    #[error("signing service is rate limited")]
    RateLimited,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

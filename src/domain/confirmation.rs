//! Waiting for a submitted transaction to become final.

use {
    crate::{
        domain::{chain::Chain, flow},
        infra::metrics,
    },
    std::{sync::Arc, time::Duration},
    tokio::time::Instant,
};

pub struct Waiter {
    chain: Arc<dyn Chain>,
}

impl Waiter {
    pub fn new(chain: Arc<dyn Chain>) -> Self {
        Self { chain }
    }

    /// Polls the transaction status every `poll_interval` until it is sealed
    /// or expired. Intermediate statuses are only logged. Gives up with
    /// [`Error::Timeout`] once `timeout` has elapsed.
    pub async fn wait(
        &self,
        id: flow::TransactionId,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<flow::TransactionResult, Error> {
        let start = Instant::now();
        let poll = async {
            let mut last = None;
            loop {
                let result = self.chain.status(id).await.map_err(Error::Chain)?;
                if last != Some(result.status) {
                    tracing::debug!(
                        transaction = %id,
                        status = ?result.status,
                        "transaction status"
                    );
                    last = Some(result.status);
                }
                if result.status.is_terminal() {
                    return Ok(result);
                }
                tokio::time::sleep(poll_interval).await;
            }
        };

        let result = tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| Error::Timeout { id, timeout })?;
        metrics::confirmation_time(start.elapsed());
        result
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transaction {id} was not sealed within {timeout:?}")]
    Timeout {
        id: flow::TransactionId,
        timeout: Duration,
    },
    #[error("failed to fetch transaction status: {0:#}")]
    Chain(anyhow::Error),
}

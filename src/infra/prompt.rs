//! Asking the user whether to pay fees while sponsoring is unavailable.

use {
    crate::domain::{authorization, payer},
    tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
};

/// Asks on the terminal. Anything but an explicit yes declines.
pub struct Terminal;

#[async_trait::async_trait]
impl authorization::SurgePrompt for Terminal {
    async fn approve_self_pay(&self, surge: &payer::Surge) -> bool {
        let question = question(surge);
        let mut stderr = tokio::io::stderr();
        if let Err(err) = stderr.write_all(question.as_bytes()).await {
            tracing::warn!(?err, "failed to write prompt");
            return false;
        }
        if let Err(err) = stderr.flush().await {
            tracing::warn!(?err, "failed to flush prompt");
        }

        let mut answer = String::new();
        match BufReader::new(tokio::io::stdin())
            .read_line(&mut answer)
            .await
        {
            Ok(_) => is_yes(&answer),
            Err(err) => {
                tracing::warn!(?err, "failed to read prompt answer");
                false
            }
        }
    }
}

/// A preconfigured answer for non-interactive use.
pub struct Fixed(pub bool);

#[async_trait::async_trait]
impl authorization::SurgePrompt for Fixed {
    async fn approve_self_pay(&self, surge: &payer::Surge) -> bool {
        tracing::info!(
            approved = self.0,
            multiplier = ?surge.multiplier,
            "answered self-pay prompt from configuration"
        );
        self.0
    }
}

fn question(surge: &payer::Surge) -> String {
    let multiplier = surge
        .multiplier
        .map(|multiplier| format!(" Fees are currently {multiplier}x the usual amount."))
        .unwrap_or_default();
    format!(
        "Fee sponsoring is rate limited.{multiplier} Pay the transaction fees yourself? [y/N] "
    )
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

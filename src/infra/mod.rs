pub mod cli;
pub mod config;
pub mod flow;
pub mod free_gas;
pub mod metrics;
pub mod payer;
pub mod prompt;
pub mod signer;

pub mod asset;
pub mod authorization;
pub mod calldata;
pub mod chain;
pub mod confirmation;
pub mod correlation;
pub mod eth;
pub mod flow;
pub mod migration;
pub mod payer;
pub mod signer;
pub mod transaction;
